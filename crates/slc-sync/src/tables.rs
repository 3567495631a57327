//! Definitions of the history tables maintained by the driver.

use slc_core::schema::{ColumnDef, TableDef};

use crate::{Error, Result};

pub const PROTEINS: &str = "uniprot_proteins";
pub const DBREFS: &str = "uniprot_dbrefs";

/// One row per UniProt accession.
pub fn proteins() -> Result<TableDef> {
  Ok(TableDef::new(
    PROTEINS,
    vec![
      ColumnDef::integer("tax_id"),
      ColumnDef::text("accession"),
      ColumnDef::text("uniprot_id"),
      ColumnDef::text("name"),
      ColumnDef::text("symbol"),
      ColumnDef::text("seq_fasta"),
      ColumnDef::bool("reviewed"),
    ],
  )?)
}

/// Cross-references of an accession, one row per `(db, xref)`.
pub fn dbrefs() -> Result<TableDef> {
  Ok(TableDef::new(
    DBREFS,
    vec![
      ColumnDef::text("accession"),
      ColumnDef::text("db"),
      ColumnDef::text("xref"),
    ],
  )?)
}

pub fn all() -> Result<Vec<TableDef>> { Ok(vec![proteins()?, dbrefs()?]) }

/// Look a table up by name.
pub fn lookup(name: &str) -> Result<TableDef> {
  match name {
    PROTEINS => proteins(),
    DBREFS => dbrefs(),
    other => Err(Error::UnknownTable(other.to_owned())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn definitions_are_valid() {
    let tables = all().unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(lookup("uniprot_dbrefs").unwrap().history_table(), "uniprot_dbrefs_history");
    assert!(matches!(lookup("hmm_hits"), Err(Error::UnknownTable(_))));
  }
}
