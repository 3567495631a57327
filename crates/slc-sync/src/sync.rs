//! The UniProt sync run.
//!
//! FASTA files are indexed first; flat-file entries are then streamed and
//! every selected accession is reconciled into `uniprot_proteins` (scalar,
//! keyed by accession) and `uniprot_dbrefs` (one-to-many over `(db, xref)`).

use std::{
  collections::{HashMap, HashSet},
  path::{Path, PathBuf},
};

use slc_core::{
  entry::Provenance,
  reconcile::{Action, ReconcilePlan, Reconciler, Warning},
  schema::TableDef,
  script::render_script,
  store::HistoryStore,
  value::{Row, Value},
};
use slc_uniprot::{FastaIndex, FlatEntries, FlatEntry, InputKind};
use tracing::{info, warn};

use crate::{Error, Result, tables};

// ─── Options and report ──────────────────────────────────────────────────────

/// What to do with planned entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
  /// Append to the store.
  #[default]
  Apply,
  /// Collect a SQL script in [`SyncReport::script`]; the store is only read.
  Script,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
  /// Run as a curator, overriding manual edits.
  pub manual:     bool,
  pub user:       String,
  pub mode:       Mode,
  /// Sync exactly these accessions, primary or secondary. `None` syncs the
  /// primary accession of every entry.
  pub accessions: Option<HashSet<String>>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
  /// Flat-file entries read.
  pub entries:    usize,
  /// Entries that failed to parse and were skipped.
  pub invalid:    usize,
  /// Accessions reconciled.
  pub synced:     usize,
  /// Accessions skipped for want of a FASTA sequence.
  pub skipped:    usize,
  pub operations: HashMap<Action, usize>,
  pub warnings:   Vec<Warning>,
  /// SQL script, in [`Mode::Script`].
  pub script:     String,
}

impl SyncReport {
  fn absorb(&mut self, plan: ReconcilePlan) {
    for op in &plan.operations {
      *self.operations.entry(op.action).or_default() += 1;
    }
    self.warnings.extend(plan.warnings);
  }

  pub fn count(&self, action: Action) -> usize {
    self.operations.get(&action).copied().unwrap_or(0)
  }

  /// One-line summary for the end of a run.
  pub fn summary(&self) -> String {
    let mut out = format!(
      "{} entries read, {} accessions synced, {} skipped without sequence",
      self.entries, self.synced, self.skipped
    );
    if self.invalid > 0 {
      out.push_str(&format!(", {} invalid entries", self.invalid));
    }
    let actions = [
      Action::Insert,
      Action::Update,
      Action::Undelete,
      Action::Revert,
      Action::Reuse,
      Action::Delete,
    ];
    let ops: Vec<String> = actions
      .iter()
      .filter(|a| self.count(**a) > 0)
      .map(|a| format!("{} {a}", self.count(*a)))
      .collect();
    if ops.is_empty() {
      out.push_str("; no changes");
    } else {
      out.push_str(&format!("; {}", ops.join(", ")));
    }
    out.push_str(&format!("; {} warnings", self.warnings.len()));
    out
  }
}

/// Read an accession list: whitespace-separated, `#` starts a comment.
pub fn read_accessions(path: &Path) -> Result<HashSet<String>> {
  let text = std::fs::read_to_string(path)?;
  Ok(
    text
      .lines()
      .map(|line| line.split('#').next().unwrap_or_default())
      .flat_map(str::split_whitespace)
      .map(str::to_owned)
      .collect(),
  )
}

// ─── Sync ────────────────────────────────────────────────────────────────────

pub struct UniprotSync<'a, S> {
  store:    &'a S,
  proteins: TableDef,
  dbrefs:   TableDef,
  options:  SyncOptions,
}

fn input_error(path: &Path) -> impl FnOnce(slc_uniprot::Error) -> Error + '_ {
  move |source| Error::Input { path: path.to_path_buf(), source }
}

impl<'a, S: HistoryStore> UniprotSync<'a, S> {
  pub fn new(store: &'a S, options: SyncOptions) -> Result<Self> {
    Ok(Self {
      store,
      proteins: tables::proteins()?,
      dbrefs: tables::dbrefs()?,
      options,
    })
  }

  fn provenance(&self, files: &[PathBuf]) -> Provenance {
    let base = if self.options.manual {
      Provenance::manual()
    } else {
      Provenance::automatic()
    };
    let mut comments = vec![match &self.options.accessions {
      Some(list) => format!("Updated from UniProt for {} listed accessions.", list.len()),
      None => "Updated from UniProt.".to_owned(),
    }];
    comments.push("Files used:".to_owned());
    comments.extend(files.iter().map(|f| f.display().to_string()));
    base.with_user(self.options.user.as_str()).with_comments(comments)
  }

  fn wants(&self, accession: &str) -> bool {
    self
      .options
      .accessions
      .as_ref()
      .is_none_or(|list| list.contains(accession))
  }

  fn selected<'e>(&self, entry: &'e FlatEntry) -> Vec<&'e str> {
    match &self.options.accessions {
      Some(list) => entry
        .accessions
        .iter()
        .filter(|a| list.contains(a.as_str()))
        .map(String::as_str)
        .collect(),
      None => entry.accessions.first().map(String::as_str).into_iter().collect(),
    }
  }

  /// Sync `files`. FASTA files are read before flat files regardless of
  /// their order.
  pub async fn run(&self, files: &[PathBuf]) -> Result<SyncReport> {
    let mut fasta = Vec::new();
    let mut flat = Vec::new();
    for path in files {
      match InputKind::of(path).map_err(input_error(path))? {
        InputKind::Fasta => fasta.push(path),
        InputKind::FlatFile => flat.push(path),
      }
    }
    let provenance = self.provenance(files);

    let mut index = FastaIndex::new();
    for path in fasta {
      let reader = slc_uniprot::open(path).map_err(input_error(path))?;
      let added = index
        .read(reader, |acc| self.wants(acc))
        .map_err(input_error(path))?;
      info!(path = %path.display(), added, "indexed sequences");
    }

    let mut report = SyncReport::default();
    for path in flat {
      let reader = slc_uniprot::open(path).map_err(input_error(path))?;
      for entry in FlatEntries::new(reader) {
        let entry = match entry {
          Ok(entry) => entry,
          Err(e @ slc_uniprot::Error::Io(_)) => return Err(input_error(path)(e)),
          Err(e) => {
            warn!(path = %path.display(), "skipping entry: {e}");
            report.invalid += 1;
            continue;
          }
        };
        report.entries += 1;

        for accession in self.selected(&entry) {
          let Some(sequence) = index.get(accession) else {
            warn!("accession {accession} has no associated FASTA sequence, skipping");
            report.skipped += 1;
            continue;
          };
          self
            .sync_accession(&entry, accession, sequence, &provenance, &mut report)
            .await?;
          report.synced += 1;
        }
      }
    }

    info!("{}", report.summary());
    Ok(report)
  }

  async fn sync_accession(
    &self,
    entry: &FlatEntry,
    accession: &str,
    sequence: &str,
    provenance: &Provenance,
    report: &mut SyncReport,
  ) -> Result<()> {
    let key = Row::new().with("accession", accession);

    let desired = Row::new()
      .with("tax_id", entry.tax_id)
      .with("uniprot_id", entry.uniprot_id.clone())
      .with("name", entry.name.clone())
      .with("symbol", entry.symbol.clone())
      .with("seq_fasta", sequence)
      .with("reviewed", entry.reviewed);
    let proteins = Reconciler::new(self.store, &self.proteins, provenance.clone());
    let plan = proteins.plan_sync_row(&key, &desired).await?;
    self.commit(&proteins, plan, report).await?;

    let fields = ["db".to_owned(), "xref".to_owned()];
    let xrefs: Vec<Vec<Value>> = entry
      .dbrefs
      .iter()
      .map(|(db, xref)| vec![Value::from(db.as_str()), Value::from(xref.as_str())])
      .collect();
    let dbrefs = Reconciler::new(self.store, &self.dbrefs, provenance.clone());
    let plan = dbrefs.plan_one_to_many(&fields, &key, xrefs).await?;
    self.commit(&dbrefs, plan, report).await
  }

  async fn commit(
    &self,
    reconciler: &Reconciler<'_, S>,
    plan: ReconcilePlan,
    report: &mut SyncReport,
  ) -> Result<()> {
    match self.options.mode {
      Mode::Apply => {
        reconciler.apply(&plan).await?;
      }
      Mode::Script => {
        let sql = render_script(self.store, reconciler.table(), &plan).await?;
        report.script.push_str(&sql);
      }
    }
    report.absorb(plan);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use slc_core::reconcile::WarningKind;
  use slc_store_sqlite::SqliteStore;

  use super::*;

  const FASTA: &str = "\
>sp|P43003|EAA1_HUMAN Excitatory amino acid transporter 1
MTKSNGEEPKMGGRMERFQQ
";

  fn flat(symbol: &str, xrefs: &[(&str, &str)]) -> String {
    let mut out = String::from(
      "ID   EAA1_HUMAN              Reviewed;         542 AA.\n\
       AC   P43003; Q15849;\n\
       DE   RecName: Full=Excitatory amino acid transporter 1;\n",
    );
    out.push_str(&format!("GN   Name={symbol};\n"));
    out.push_str("OX   NCBI_TaxID=9606;\n");
    for (db, xref) in xrefs {
      out.push_str(&format!("DR   {db}; {xref}; -.\n"));
    }
    out.push_str("//\n");
    out
  }

  struct Fixture {
    _dir:  tempfile::TempDir,
    files: Vec<PathBuf>,
  }

  fn files(flat_text: &str, with_fasta: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut files = Vec::new();
    // Flat file first: FASTA must still be indexed before it is read.
    let dat = dir.path().join("uniprot_sprot.dat");
    std::fs::write(&dat, flat_text).unwrap();
    files.push(dat);
    if with_fasta {
      let fasta = dir.path().join("uniprot_sprot.fasta");
      std::fs::write(&fasta, FASTA).unwrap();
      files.push(fasta);
    }
    Fixture { _dir: dir, files }
  }

  fn options(mode: Mode) -> SyncOptions {
    SyncOptions {
      manual: false,
      user: "sync-test".to_owned(),
      mode,
      accessions: None,
    }
  }

  async fn store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for def in tables::all().unwrap() {
      store.create_table(&def).await.unwrap();
    }
    store
  }

  fn key() -> Row { Row::new().with("accession", "P43003") }

  #[tokio::test]
  async fn first_run_inserts_and_second_is_a_no_op() {
    let store = store().await;
    let fx = files(&flat("SLC1A3", &[("HGNC", "HGNC:10941"), ("GeneID", "6507")]), true);
    let sync = UniprotSync::new(&store, options(Mode::Apply)).unwrap();

    let report = sync.run(&fx.files).await.unwrap();
    assert_eq!(report.entries, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(report.count(Action::Insert), 3);

    let proteins = tables::proteins().unwrap();
    let rows = store.current_rows(&proteins, &key()).await.unwrap();
    assert_eq!(rows.len(), 1);
    let fields = &rows[0].fields;
    assert_eq!(fields.get("symbol"), Some(&Value::from("SLC1A3")));
    assert_eq!(fields.get("tax_id"), Some(&Value::Integer(9606)));
    assert_eq!(fields.get("reviewed"), Some(&Value::Bool(true)));
    assert_eq!(fields.get("seq_fasta"), Some(&Value::from(FASTA)));
    assert!(rows[0].comments.as_deref().unwrap().contains("uniprot_sprot.fasta"));

    let again = sync.run(&fx.files).await.unwrap();
    assert!(again.operations.is_empty());
    assert!(again.summary().contains("no changes"));
  }

  #[tokio::test]
  async fn accession_without_sequence_is_skipped() {
    let store = store().await;
    let fx = files(&flat("SLC1A3", &[]), false);
    let sync = UniprotSync::new(&store, options(Mode::Apply)).unwrap();

    let report = sync.run(&fx.files).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.synced, 0);
    let proteins = tables::proteins().unwrap();
    assert!(store.history(&proteins, &Row::new()).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn accession_list_selects_secondary_accessions() {
    let store = store().await;
    let fx = files(&flat("SLC1A3", &[]), true);
    let mut opts = options(Mode::Apply);
    opts.accessions = Some(["Q15849".to_owned()].into());
    let sync = UniprotSync::new(&store, opts).unwrap();

    // Q15849 is listed but the FASTA file only knows P43003.
    let report = sync.run(&fx.files).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.synced, 0);
  }

  #[tokio::test]
  async fn automated_run_respects_curator_edit() {
    let store = store().await;
    let fx = files(&flat("SLC1A3", &[("HGNC", "HGNC:10941")]), true);
    UniprotSync::new(&store, options(Mode::Apply))
      .unwrap()
      .run(&fx.files)
      .await
      .unwrap();

    let proteins = tables::proteins().unwrap();
    let current = store.current_rows(&proteins, &key()).await.unwrap().remove(0);
    let curator = Reconciler::new(&store, &proteins, Provenance::manual().with_user("curator"));
    let plan = curator
      .plan_update(&current, &Row::new().with("symbol", "EAAT1"), None)
      .await
      .unwrap();
    curator.apply(&plan).await.unwrap();

    let fx = files(&flat("SLC1A3-NEW", &[("HGNC", "HGNC:10941")]), true);
    let report = UniprotSync::new(&store, options(Mode::Apply))
      .unwrap()
      .run(&fx.files)
      .await
      .unwrap();
    assert!(report.operations.is_empty());
    assert!(
      report
        .warnings
        .iter()
        .any(|w| matches!(w.kind, WarningKind::ManualOverride { .. }))
    );
    let current = store.current_rows(&proteins, &key()).await.unwrap().remove(0);
    assert_eq!(current.fields.get("symbol"), Some(&Value::from("EAAT1")));
  }

  #[tokio::test]
  async fn script_mode_leaves_store_untouched() {
    let store = store().await;
    let fx = files(&flat("SLC1A3", &[("HGNC", "HGNC:10941")]), true);
    let sync = UniprotSync::new(&store, options(Mode::Script)).unwrap();

    let report = sync.run(&fx.files).await.unwrap();
    assert!(report.script.contains("INSERT INTO `uniprot_proteins_history`"));
    assert!(report.script.contains("INSERT INTO `uniprot_dbrefs_history`"));
    assert!(report.script.contains("'HGNC:10941'"));
    let dbrefs = tables::dbrefs().unwrap();
    assert!(store.history(&dbrefs, &Row::new()).await.unwrap().is_empty());
  }

  #[test]
  fn accession_list_ignores_comments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accessions.txt");
    std::fs::write(&path, "# SLC1 family\nP43003 P43004\n\nQ15849 # secondary\n").unwrap();
    let list = read_accessions(&path).unwrap();
    assert_eq!(list.len(), 3);
    assert!(list.contains("Q15849"));
  }
}
