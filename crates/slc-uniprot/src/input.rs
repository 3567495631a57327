//! Input file classification and transparent gzip decoding.

use std::{
  fs::File,
  io::{BufRead, BufReader},
  path::Path,
};

use flate2::read::MultiGzDecoder;

use crate::{Error, Result};

/// What a release file contains, judged by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
  Fasta,
  FlatFile,
}

impl InputKind {
  /// Classify `path` by extension, ignoring a trailing `.gz`.
  pub fn of(path: &Path) -> Result<Self> {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().to_ascii_lowercase())
      .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);

    if name.ends_with(".fasta") || name.ends_with(".fa") {
      Ok(Self::Fasta)
    } else if name.ends_with(".txt") || name.ends_with(".dat") {
      Ok(Self::FlatFile)
    } else {
      Err(Error::UnsupportedInput(path.to_path_buf()))
    }
  }
}

fn is_gzipped(path: &Path) -> bool {
  path
    .extension()
    .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Open `path` for line reading, decompressing `.gz` files on the fly.
pub fn open(path: &Path) -> Result<Box<dyn BufRead + Send>> {
  let file = File::open(path)?;
  if is_gzipped(path) {
    // UniProt ships multi-member archives.
    Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
  } else {
    Ok(Box::new(BufReader::new(file)))
  }
}

#[cfg(test)]
mod tests {
  use std::io::{Read, Write};

  use flate2::{Compression, write::GzEncoder};

  use super::*;

  #[test]
  fn classifies_by_extension() {
    assert_eq!(InputKind::of(Path::new("a/uniprot_sprot.fasta.gz")).unwrap(), InputKind::Fasta);
    assert_eq!(InputKind::of(Path::new("human.FA")).unwrap(), InputKind::Fasta);
    assert_eq!(InputKind::of(Path::new("uniprot_sprot.dat.gz")).unwrap(), InputKind::FlatFile);
    assert_eq!(InputKind::of(Path::new("entries.txt")).unwrap(), InputKind::FlatFile);
    assert!(matches!(
      InputKind::of(Path::new("notes.md")),
      Err(Error::UnsupportedInput(_))
    ));
  }

  #[test]
  fn opens_gzipped_and_plain_files() {
    let dir = tempfile::tempdir().unwrap();

    let plain = dir.path().join("a.fasta");
    std::fs::write(&plain, ">sp|P1|X\nMKT\n").unwrap();

    let gz = dir.path().join("a.fasta.gz");
    let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
    encoder.write_all(b">sp|P1|X\nMKT\n").unwrap();
    encoder.finish().unwrap();

    for path in [plain, gz] {
      let mut text = String::new();
      open(&path).unwrap().read_to_string(&mut text).unwrap();
      assert_eq!(text, ">sp|P1|X\nMKT\n");
    }
  }
}
