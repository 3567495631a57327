//! `slc-history`: maintain the history-tracked UniProt tables.
//!
//! # Usage
//!
//! ```text
//! slc-history init
//! slc-history sync-uniprot uniprot_sprot.fasta.gz uniprot_sprot.dat.gz
//! slc-history sync-uniprot --script --accessions slc.txt *.fasta *.dat > sync.sql
//! slc-history history uniprot_dbrefs --key accession=P43003 --fields db,xref
//! ```
//!
//! Reads `slc-history.toml` (or the path given with `--config`) layered with
//! `SLC_*` environment variables. Logs go to stderr; scripts and change logs
//! to stdout.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use slc_core::store::HistoryStore;
use slc_store_sqlite::SqliteStore;
use slc_sync::{
  Mode, SyncConfig, SyncOptions, UniprotSync,
  config::DEFAULT_CONFIG_FILE,
  history, sync::read_accessions, tables,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "History-tracked UniProt tables")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
  config: PathBuf,

  /// SQLite database; overrides `store_path` from the configuration.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the history tables and their current-state views.
  Init,

  /// Reconcile the tables with UniProt FASTA and flat files (optionally
  /// gzipped).
  SyncUniprot {
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Only sync the accessions listed in this file.
    #[arg(long, value_name = "FILE")]
    accessions: Option<PathBuf>,

    /// Record the run as a curator action, overriding manual edits.
    #[arg(long)]
    manual: bool,

    /// Print a SQL script instead of writing to the store.
    #[arg(long)]
    script: bool,

    /// Overrides `user` from the configuration.
    #[arg(long)]
    user: Option<String>,
  },

  /// Print the change log of some fields.
  History {
    table: String,

    /// Restrict to rows matching FIELD=VALUE; may be repeated.
    #[arg(long = "key", value_name = "FIELD=VALUE")]
    keys: Vec<String>,

    /// Tracked fields; all columns when omitted.
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Emit JSON instead of text.
    #[arg(long)]
    json: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = SyncConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  if let Some(store) = cli.store {
    cfg.store_path = store;
  }

  let store = SqliteStore::open(&cfg.store_path, cfg.store_options())
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  match cli.command {
    Command::Init => {
      for def in tables::all()? {
        store
          .create_table(&def)
          .await
          .with_context(|| format!("failed to create {}", def.history_table()))?;
        tracing::info!("table {} ready", def.name());
      }
    }

    Command::SyncUniprot { files, accessions, manual, script, user } => {
      let accessions = accessions
        .map(|path| {
          read_accessions(&path)
            .with_context(|| format!("failed to read accession list {path:?}"))
        })
        .transpose()?;
      let options = SyncOptions {
        manual,
        user: user.unwrap_or(cfg.user),
        mode: if script { Mode::Script } else { Mode::Apply },
        accessions,
      };

      let report = UniprotSync::new(&store, options)?
        .run(&files)
        .await
        .context("sync failed")?;

      if script {
        print!("{}", report.script);
      }
      if !report.warnings.is_empty() {
        eprintln!("warnings:");
        for warning in &report.warnings {
          eprintln!("  {warning}");
        }
      }
      eprintln!("{}", report.summary());
    }

    Command::History { table, keys, fields, json } => {
      let def = tables::lookup(&table)?;
      let key = history::parse_key(&def, &keys)?;
      let fields = if fields.is_empty() {
        def.columns().iter().map(|c| c.name.clone()).collect()
      } else {
        fields
      };

      let changes = store
        .field_changes(&def, &key, &fields)
        .await
        .with_context(|| format!("failed to read history of {table}"))?;

      if json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
      } else {
        print!("{}", history::render_changes(&changes));
      }
    }
  }

  Ok(())
}
