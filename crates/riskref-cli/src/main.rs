mod display;

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use riskref_core::MemorySink;
use riskref_engine::{
    FsDocumentStore, PublishReport, SourceNames, build_catalog, load_sources, new_snapshot,
    publish, resolve_version,
};
use riskref_store::DuckStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "riskref", version, about = "Publish versioned occupational hazard catalogs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the source documents, derive every table, and publish one version.
    Publish(PublishArgs),
    /// List stored snapshots and their per-table row counts.
    Inspect(InspectArgs),
    /// Write the derived tables of one snapshot as Parquet files.
    Export(ExportArgs),
}

#[derive(Args)]
struct PublishArgs {
    /// Directory holding the source documents
    #[arg(long, value_name = "DIR", env = "RISKREF_SOURCE_DIR")]
    source_dir: PathBuf,
    /// Base document file name inside the source directory
    #[arg(long, value_name = "FILE", default_value = "sectors.json")]
    base_file: String,
    /// Generic document file name inside the source directory
    #[arg(long, value_name = "FILE", default_value = "generic.json")]
    generic_file: String,
    /// DuckDB database path (or set RISKREF_DB)
    #[arg(long, value_name = "PATH", env = "RISKREF_DB", required_unless_present = "dry_run")]
    db: Option<PathBuf>,
    /// Version to publish (default: the version declared in the base document)
    #[arg(long, value_name = "VERSION")]
    catalog_version: Option<String>,
    /// Snapshot description (default: the declared description)
    #[arg(long)]
    description: Option<String>,
    /// Store the snapshot with its active flag cleared
    #[arg(long)]
    inactive: bool,
    /// Build and publish into memory only; the database is not touched
    #[arg(long)]
    dry_run: bool,
    /// Output JSON instead of aligned text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// DuckDB database path (or set RISKREF_DB)
    #[arg(long, value_name = "PATH", env = "RISKREF_DB")]
    db: PathBuf,
    /// Show a single version only
    #[arg(long, value_name = "VERSION")]
    catalog_version: Option<String>,
}

#[derive(Args)]
struct ExportArgs {
    /// DuckDB database path (or set RISKREF_DB)
    #[arg(long, value_name = "PATH", env = "RISKREF_DB")]
    db: PathBuf,
    /// Version to export
    #[arg(long, value_name = "VERSION")]
    catalog_version: String,
    /// Output directory for the Parquet files
    #[arg(long, value_name = "DIR")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    info!("riskref v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Publish(args) => run_publish(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Export(args) => run_export(args),
    }
}

fn run_publish(args: PublishArgs) -> anyhow::Result<()> {
    let store = FsDocumentStore::new(&args.source_dir);
    let names = SourceNames {
        base: args.base_file,
        generic: args.generic_file,
    };
    let source = load_sources(&store, &names)
        .with_context(|| format!("loading sources from {}", args.source_dir.display()))?;

    let version = resolve_version(&source, args.catalog_version.as_deref())?;
    let catalog = build_catalog(&source, &version)?;
    let snapshot = new_snapshot(
        &source,
        &version,
        args.description.as_deref(),
        !args.inactive,
        Utc::now(),
    )?;

    let report: PublishReport = match (&args.db, args.dry_run) {
        (_, true) => {
            let mut sink = MemorySink::new();
            publish(&mut sink, &snapshot, &catalog)?
        }
        (Some(db), false) => {
            let mut sink = DuckStore::open_persistent(db)
                .with_context(|| format!("opening database {}", db.display()))?;
            publish(&mut sink, &snapshot, &catalog)
                .with_context(|| format!("publishing version {version} to {}", db.display()))?
        }
        (None, false) => anyhow::bail!("--db is required unless --dry-run is set"),
    };

    let summary = catalog.summary();
    if args.json {
        let value = display::publish_json(&summary, &report, args.dry_run);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", display::render_publish(&summary, &report, args.dry_run));
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let store = DuckStore::open_persistent(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;
    let snapshots = store.snapshots()?;
    let selected: Vec<_> = match &args.catalog_version {
        Some(version) => {
            let id = store.snapshot_id(version)?;
            snapshots.into_iter().filter(|s| s.id == id).collect()
        }
        None => snapshots,
    };

    if selected.is_empty() {
        println!("No snapshots in {}", args.db.display());
        return Ok(());
    }
    for info in &selected {
        let counts = store.row_counts(info.id)?;
        print!("{}", display::render_snapshot(info, &counts));
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> anyhow::Result<()> {
    let store = DuckStore::open_persistent(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;
    let id = store.snapshot_id(&args.catalog_version)?;
    let files = store
        .export_parquet(id, &args.out)
        .with_context(|| format!("exporting to {}", args.out.display()))?;
    for file in files {
        println!("  {}", file.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use riskref_engine::EngineError;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dry_run_needs_no_database() {
        let cli = Cli::try_parse_from([
            "riskref",
            "publish",
            "--source-dir",
            "data",
            "--dry-run",
        ])
        .unwrap();
        let Command::Publish(args) = cli.command else {
            panic!("expected publish");
        };
        assert!(args.dry_run);
        assert_eq!(args.base_file, "sectors.json");
        assert_eq!(args.generic_file, "generic.json");
    }

    #[test]
    fn publish_without_base_document_names_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["riskref", "publish", "--source-dir", dir, "--dry-run"])
            .unwrap();
        let Command::Publish(args) = cli.command else {
            panic!("expected publish");
        };

        let err = run_publish(args).unwrap_err();
        let not_found = err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<EngineError>(),
                Some(EngineError::SourceNotFound(path)) if path == &tmp.path().join("sectors.json")
            )
        });
        assert!(not_found, "unexpected error: {err:#}");
        assert!(format!("{err:#}").contains("sectors.json"));
    }

    #[test]
    fn export_requires_version() {
        let result = Cli::try_parse_from(["riskref", "export", "--db", "x.duckdb", "--out", "out"]);
        assert!(result.is_err());
    }
}
