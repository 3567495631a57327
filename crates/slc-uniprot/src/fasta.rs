//! FASTA records indexed by UniProt accession.

use std::{collections::HashMap, io::BufRead};

use tracing::debug;

use crate::{Error, Result};

/// FASTA records keyed by the accession in their `>db|ACCESSION|name`
/// header. Each record is kept verbatim, header and sequence lines with
/// their newlines.
#[derive(Debug, Default)]
pub struct FastaIndex {
  records: HashMap<String, String>,
}

/// `>sp|P43003|EAA1_HUMAN ...` → `P43003`.
fn header_accession(header: &str) -> Option<&str> {
  let id = header.strip_prefix('>')?.split_whitespace().next()?;
  let acc = id.split('|').nth(1)?;
  (!acc.is_empty()).then_some(acc)
}

impl FastaIndex {
  pub fn new() -> Self { Self::default() }

  /// Index every record of `reader` whose accession passes `accept`. The
  /// first record seen for an accession wins, across calls too. Returns the
  /// number of records added.
  ///
  /// A blank line ends the current record; anything up to the next header
  /// is ignored.
  pub fn read<R: BufRead>(&mut self, reader: R, accept: impl Fn(&str) -> bool) -> Result<usize> {
    let mut added = 0;
    let mut current: Option<(String, String)> = None;

    let mut flush = |current: &mut Option<(String, String)>, records: &mut HashMap<_, _>| {
      if let Some((acc, text)) = current.take()
        && accept(&acc)
        && !records.contains_key(&acc)
      {
        records.insert(acc, text);
        added += 1;
      }
    };

    for (i, line) in reader.lines().enumerate() {
      let line = line?;
      if line.starts_with('>') {
        flush(&mut current, &mut self.records);
        let acc = header_accession(&line).ok_or_else(|| Error::MalformedLine {
          line:    i + 1,
          tag:     "FASTA header",
          content: line.clone(),
        })?;
        current = Some((acc.to_owned(), format!("{line}\n")));
      } else if line.trim().is_empty() {
        flush(&mut current, &mut self.records);
      } else if let Some((_, text)) = current.as_mut() {
        text.push_str(&line);
        text.push('\n');
      }
    }
    flush(&mut current, &mut self.records);

    debug!(added, total = self.records.len(), "indexed FASTA records");
    Ok(added)
  }

  pub fn get(&self, accession: &str) -> Option<&str> {
    self.records.get(accession).map(String::as_str)
  }

  pub fn contains(&self, accession: &str) -> bool { self.records.contains_key(accession) }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  const FASTA: &str = "\
>sp|P43003|EAA1_HUMAN Excitatory amino acid transporter 1 OS=Homo sapiens
MTKSNGEEPK
MGGRMERFQQ
>tr|Q9XYZ1|Q9XYZ1_DROME Uncharacterized protein
MSTV

stray text after a blank line
>sp|P43003|EAA1_HUMAN duplicate
MXXX
";

  #[test]
  fn keys_records_by_accession_and_keeps_first() {
    let mut index = FastaIndex::new();
    let added = index.read(FASTA.as_bytes(), |_| true).unwrap();
    assert_eq!(added, 2);
    assert_eq!(
      index.get("P43003"),
      Some(
        ">sp|P43003|EAA1_HUMAN Excitatory amino acid transporter 1 OS=Homo sapiens\n\
         MTKSNGEEPK\nMGGRMERFQQ\n"
      )
    );
    assert_eq!(index.get("Q9XYZ1"), Some(">tr|Q9XYZ1|Q9XYZ1_DROME Uncharacterized protein\nMSTV\n"));
  }

  #[test]
  fn first_record_wins_across_files() {
    let mut index = FastaIndex::new();
    index.read(">sp|P1|A\nAAA\n".as_bytes(), |_| true).unwrap();
    let added = index.read(">sp|P1|B\nBBB\n".as_bytes(), |_| true).unwrap();
    assert_eq!(added, 0);
    assert_eq!(index.get("P1"), Some(">sp|P1|A\nAAA\n"));
  }

  #[test]
  fn filter_limits_indexed_accessions() {
    let mut index = FastaIndex::new();
    index.read(FASTA.as_bytes(), |acc| acc == "Q9XYZ1").unwrap();
    assert_eq!(index.len(), 1);
    assert!(!index.contains("P43003"));
  }

  #[test]
  fn header_without_accession_is_malformed() {
    let mut index = FastaIndex::new();
    let err = index.read("MKT\n>P43003\nMKT\n".as_bytes(), |_| true).unwrap_err();
    assert!(matches!(err, Error::MalformedLine { line: 2, .. }));
  }
}
