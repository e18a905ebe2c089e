use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rifle_results::config::{self, AppConfig};
use rifle_results::db::{self, CommitOutcome};
use rifle_results::entities::region::parse_competition_label;
use rifle_results::entities::shooter::load_registry_csv;
use rifle_results::identity::IdentityIndex;
use rifle_results::import::ImportContext;
use rifle_results::reports;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the national shooter registry export
    ImportShooters {
        /// Registry CSV (SID, Last Name, First Name, Pref Name, Club)
        csv: PathBuf,
    },
    /// Import one or more competition result exports
    ImportResults {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Row counts per table
    Stats,
    /// Grand aggregate honours per discipline
    TopShooters {
        /// Raw label or canonical code; all disciplines when omitted
        #[arg(long)]
        discipline: Option<String>,
    },
    /// Cross-discipline MCSI leaderboard
    McsiLeaderboard {
        #[arg(long)]
        min_sample: Option<usize>,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// MCSI ranking inside one competition
    Event {
        /// Competition label, e.g. "QRA 2025"
        #[arg(long)]
        competition: String,
    },
}

#[derive(Parser, Debug)]
#[command(name = "rifle-results")]
#[command(about = "Rifle competition results import and reporting", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database (defaults to $RIFLE_RESULTS_DB or results.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON config with lookup tables (defaults to $RIFLE_RESULTS_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rifle_results=info,info")),
        )
        .init();

    let cli = Cli::parse();

    let app_config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    let db_path = cli.db.clone().unwrap_or_else(config::database_path);
    let mut conn = db::open_database(&db_path)?;
    db::seed_regions(&conn, &app_config.region_registry())?;

    match cli.command {
        Commands::ImportShooters { csv } => {
            let entries = load_registry_csv(&csv)?;
            let stored = db::insert_registry(&mut conn, &entries)?;
            print_json(&serde_json::json!({ "shooters": stored }))
        }
        Commands::ImportResults { files } => import_results(&mut conn, &app_config, &files),
        Commands::Stats => print_json(&db::database_stats(&conn)?),
        Commands::TopShooters { discipline } => {
            let results = db::load_stored_results(&conn)?;
            let normalizer = app_config.normalizer()?;
            print_json(&reports::top_shooters(
                &results,
                &normalizer,
                discipline.as_deref(),
                &app_config.reports,
            ))
        }
        Commands::McsiLeaderboard { min_sample, top_k } => {
            let results = db::load_stored_results(&conn)?;
            let engine = app_config.mcsi_engine()?;
            print_json(&reports::mcsi_report(
                &results,
                &engine,
                min_sample.unwrap_or(app_config.reports.min_sample),
                top_k.unwrap_or(app_config.reports.top_k),
            ))
        }
        Commands::Event { competition } => {
            let key = parse_competition_label(&competition)?;
            let results = db::load_stored_results(&conn)?;
            let engine = app_config.mcsi_engine()?;
            print_json(&reports::event_report(&results, &engine, &key))
        }
    }
}

/// Each file is its own batch; the first failing file stops the run
fn import_results(conn: &mut Connection, app_config: &AppConfig, files: &[PathBuf]) -> Result<()> {
    let registry = db::load_registry(conn)?;
    if registry.is_empty() {
        anyhow::bail!("shooter registry is empty; run import-shooters first");
    }

    let index = IdentityIndex::build(&registry);
    let regions = db::load_regions(conn)?;
    let normalizer = app_config.normalizer()?;
    let ctx = ImportContext {
        index: &index,
        regions: &regions,
        normalizer: &normalizer,
    };

    let mut summaries = Vec::new();
    for path in files {
        let batch = ctx
            .build_from_path(path)
            .with_context(|| format!("Failed to import {:?}", path))?;
        let outcome = db::commit_batch(conn, &batch)?;
        if let CommitOutcome::Committed { batch_id } = &outcome {
            info!("{} → batch {}", path.display(), batch_id);
        }
        summaries.push(serde_json::json!({
            "file": batch.source_file,
            "outcome": outcome,
            "aggregates": batch.aggregates.len(),
            "strings": batch.strings.len(),
            "unmatched": batch.unmatched.len(),
            "quality_issues": batch.issues,
        }));
    }

    print_json(&summaries)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
