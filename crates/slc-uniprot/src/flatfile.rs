//! UniProtKB flat-file reader.
//!
//! Only the lines the history tables care about are interpreted:
//!
//! ```text
//! ID   EAA1_HUMAN              Reviewed;         542 AA.
//! AC   P43003; Q15849; Q8NHY6;
//! DE   RecName: Full=Excitatory amino acid transporter 1 {ECO:0000305};
//! DE   Flags: Fragment;
//! GN   Name=SLC1A3; Synonyms=EAAT1, GLAST;
//! OX   NCBI_TaxID=9606;
//! DR   HGNC; HGNC:10941; SLC1A3.
//! //
//! ```
//!
//! Everything else is skipped.

use std::io::{BufRead, Lines};

use crate::{Error, Result};

/// Cross-reference databases collected from `DR` lines.
pub const DBREF_DATABASES: [&str; 5] = ["HGNC", "GeneID", "UniGene", "FlyBase", "KEGG"];

/// One flat-file entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatEntry {
  /// Entry name from the `ID` line, e.g. `EAA1_HUMAN`.
  pub uniprot_id: Option<String>,
  pub reviewed:   bool,
  /// Primary accession first, then secondary ones.
  pub accessions: Vec<String>,
  /// Recommended (or submitted) full name, with ` (Fragment)` appended for
  /// fragments.
  pub name:       Option<String>,
  pub symbol:     Option<String>,
  pub tax_id:     Option<i64>,
  /// `(db, xref)` pairs in file order, without duplicates.
  pub dbrefs:     Vec<(String, String)>,
}

/// Iterator over the entries of a flat file.
pub struct FlatEntries<R> {
  lines:  Lines<R>,
  lineno: usize,
}

impl<R: BufRead> FlatEntries<R> {
  pub fn new(reader: R) -> Self { Self { lines: reader.lines(), lineno: 0 } }
}

/// Entry state between `ID` and `//`.
#[derive(Default)]
struct Builder {
  entry:    FlatEntry,
  fragment: bool,
  started:  bool,
}

impl Builder {
  fn finish(self) -> FlatEntry {
    let mut entry = self.entry;
    if self.fragment
      && let Some(name) = entry.name.as_mut()
    {
      name.push_str(" (Fragment)");
    }
    entry
  }
}

fn malformed(line: usize, tag: &'static str, content: &str) -> Error {
  Error::MalformedLine { line, tag, content: content.to_owned() }
}

/// Value of `key=` in the first whitespace-separated token, sans `;`.
fn assigned<'a>(rest: &'a str, key: &str) -> Option<&'a str> {
  let token = rest.split_whitespace().next()?;
  let value = token.strip_prefix(key)?.strip_prefix('=')?;
  let value = value.trim_end_matches([';', ',']);
  (!value.is_empty()).then_some(value)
}

/// `Full=Some name {ECO:0000305};` → `Some name`.
fn full_name(rest: &str) -> Option<String> {
  let value = rest.trim_start().strip_prefix("Full=")?;
  let value = value.split('{').next().unwrap_or(value);
  let value = value.trim().trim_end_matches(';').trim();
  (!value.is_empty()).then(|| value.to_owned())
}

impl Builder {
  fn line(&mut self, lineno: usize, line: &str) -> Result<()> {
    let (tag, rest) = match line.split_at_checked(5) {
      Some((tag, rest)) => (tag.trim_end(), rest),
      None => (line.trim_end(), ""),
    };
    if !tag.is_empty() {
      self.started = true;
    }

    match tag {
      "ID" => {
        let mut tokens = rest.split_whitespace();
        let id = tokens.next().ok_or_else(|| malformed(lineno, "ID", line))?;
        self.entry.uniprot_id = Some(id.trim_end_matches(';').to_owned());
        self.entry.reviewed = tokens.next() == Some("Reviewed;");
      }
      "AC" => {
        for acc in rest.split(';').map(str::trim).filter(|a| !a.is_empty()) {
          if !self.entry.accessions.iter().any(|a| a == acc) {
            self.entry.accessions.push(acc.to_owned());
          }
        }
      }
      "DE" => {
        let rest = rest.trim_start();
        if let Some(name) = rest
          .strip_prefix("RecName:")
          .or_else(|| rest.strip_prefix("SubName:"))
          && self.entry.name.is_none()
        {
          self.entry.name = full_name(name);
        } else if let Some(flags) = rest.strip_prefix("Flags:")
          && flags.split(';').any(|f| f.trim() == "Fragment")
        {
          self.fragment = true;
        }
      }
      "GN" => {
        if self.entry.symbol.is_none()
          && let Some(symbol) = assigned(rest, "Name")
        {
          self.entry.symbol = Some(symbol.to_owned());
        }
      }
      "OX" => {
        if let Some(value) = assigned(rest, "NCBI_TaxID") {
          let tax_id = value.parse().map_err(|_| Error::InvalidTaxId {
            line:  lineno,
            value: value.to_owned(),
          })?;
          self.entry.tax_id = Some(tax_id);
        }
      }
      "DR" => {
        let mut parts = rest.split(';').map(str::trim);
        let db = parts.next().unwrap_or_default();
        if DBREF_DATABASES.contains(&db) {
          let xref = parts
            .next()
            .filter(|x| !x.is_empty())
            .ok_or_else(|| malformed(lineno, "DR", line))?;
          let pair = (db.to_owned(), xref.to_owned());
          if !self.entry.dbrefs.contains(&pair) {
            self.entry.dbrefs.push(pair);
          }
        }
      }
      _ => {}
    }
    Ok(())
  }
}

impl<R: BufRead> Iterator for FlatEntries<R> {
  type Item = Result<FlatEntry>;

  fn next(&mut self) -> Option<Self::Item> {
    let mut builder = Builder::default();
    loop {
      let line = match self.lines.next() {
        Some(Ok(line)) => line,
        Some(Err(e)) => return Some(Err(e.into())),
        None if builder.started => {
          return Some(Err(malformed(self.lineno, "//", "unterminated entry at end of input")));
        }
        None => return None,
      };
      self.lineno += 1;

      if line.starts_with("//") {
        return Some(Ok(builder.finish()));
      }
      if let Err(e) = builder.line(self.lineno, &line) {
        // Skip to the end of the broken entry so iteration can go on.
        for line in self.lines.by_ref() {
          self.lineno += 1;
          if line.is_ok_and(|l| l.starts_with("//")) {
            break;
          }
        }
        return Some(Err(e));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const ENTRIES: &str = "\
ID   EAA1_HUMAN              Reviewed;         542 AA.
AC   P43003; Q15849;
AC   Q8NHY6;
DT   01-NOV-1995, integrated into UniProtKB/Swiss-Prot.
DE   RecName: Full=Excitatory amino acid transporter 1 {ECO:0000305};
DE   AltName: Full=Sodium-dependent glutamate/aspartate transporter 1;
GN   Name=SLC1A3 {ECO:0000312|HGNC:HGNC:10941}; Synonyms=EAAT1, GLAST;
OX   NCBI_TaxID=9606;
DR   HGNC; HGNC:10941; SLC1A3.
DR   GeneID; 6507; -.
DR   PDB; 5LLM; X-ray; 3.10 A; A/B/C=1-542.
DR   HGNC; HGNC:10941; SLC1A3.
SQ   SEQUENCE   542 AA;  59572 MW;  2B5C6C1D3E4F5A6B CRC64;
     MTKSNGEEPK MGGRMERFQQ GVRKRTLLAK KKVQNITKED VKSYLFRNAF VLLTVTAVIV
//
ID   Q9XYZ1_DROME            Unreviewed;       120 AA.
AC   Q9XYZ1;
DE   SubName: Full=Uncharacterized protein;
DE   Flags: Fragment;
OX   NCBI_TaxID=7227 {ECO:0000313|EMBL:AAF00000.1};
DR   FlyBase; FBgn0000001; CG0001.
DR   KEGG; dme:Dmel_CG0001; -.
//
";

  fn parse(input: &str) -> Vec<Result<FlatEntry>> { FlatEntries::new(input.as_bytes()).collect() }

  #[test]
  fn parses_reviewed_entry() {
    let entries = parse(ENTRIES);
    assert_eq!(entries.len(), 2);
    let e = entries[0].as_ref().unwrap();

    assert_eq!(e.uniprot_id.as_deref(), Some("EAA1_HUMAN"));
    assert!(e.reviewed);
    assert_eq!(e.accessions, vec!["P43003", "Q15849", "Q8NHY6"]);
    assert_eq!(e.name.as_deref(), Some("Excitatory amino acid transporter 1"));
    assert_eq!(e.symbol.as_deref(), Some("SLC1A3"));
    assert_eq!(e.tax_id, Some(9606));
    assert_eq!(
      e.dbrefs,
      vec![
        ("HGNC".to_owned(), "HGNC:10941".to_owned()),
        ("GeneID".to_owned(), "6507".to_owned()),
      ]
    );
  }

  #[test]
  fn parses_unreviewed_fragment() {
    let entries = parse(ENTRIES);
    let e = entries[1].as_ref().unwrap();

    assert!(!e.reviewed);
    assert_eq!(e.name.as_deref(), Some("Uncharacterized protein (Fragment)"));
    assert_eq!(e.symbol, None);
    assert_eq!(e.tax_id, Some(7227));
    assert_eq!(e.dbrefs.len(), 2);
    assert_eq!(e.dbrefs[1], ("KEGG".to_owned(), "dme:Dmel_CG0001".to_owned()));
  }

  #[test]
  fn invalid_tax_id_skips_only_that_entry() {
    let input = "ID   A_HUMAN Reviewed;\nAC   P1;\nOX   NCBI_TaxID=human;\n//\n\
                 ID   B_HUMAN Reviewed;\nAC   P2;\n//\n";
    let entries = parse(input);
    assert_eq!(entries.len(), 2);
    assert!(matches!(
      &entries[0],
      Err(Error::InvalidTaxId { line: 3, value }) if value == "human"
    ));
    assert_eq!(entries[1].as_ref().unwrap().accessions, vec!["P2"]);
  }

  #[test]
  fn unterminated_entry_is_an_error() {
    let entries = parse("ID   A_HUMAN Reviewed;\nAC   P1;\n");
    assert_eq!(entries.len(), 1);
    assert!(matches!(entries[0], Err(Error::MalformedLine { .. })));
  }

  #[test]
  fn empty_input_has_no_entries() {
    assert!(parse("").is_empty());
    assert!(parse("\n\n").is_empty());
  }
}
