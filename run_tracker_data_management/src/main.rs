use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use clap::{Parser, Subcommand};
use run_tracker_data_management::{gpx_util::write_gpx, ArchiveError, FileStore, KeyValueStore, RunArchive};
use run_tracker_lib::geo::{format_duration, pace_per_km};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "RunCLI")]
#[command(about = "A CLI to inspect and move saved runs", long_about = None)]
struct Cli {
    /// Directory holding the run archive. Defaults to data/ under the project root
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the most recent runs
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print every position of a run
    Show { run_id: i64 },
    /// Write a run as a gpx file
    ExportGpx { run_id: i64, out: PathBuf },
    /// Save the timed points of a gpx file as a new run
    ImportGpx { gpx_file: PathBuf },
}

// CLI for manual data operations
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let store = match cli.data_dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::in_project_data_dir()?,
    };
    let store: Arc<dyn KeyValueStore> = Arc::new(store);

    let mut archive = RunArchive::load_all(store.as_ref()).await;

    match &cli.command {
        Commands::List { limit } => {
            for run in archive.list_recent(*limit) {
                println!(
                    "{}\t{}\t{:.2} km\t{}\t{} /km",
                    run.id,
                    run.saved_at.format("%d/%m/%Y %H:%M"),
                    run.distance_km,
                    format_duration(run.duration_seconds),
                    pace_per_km(run.distance_km, run.duration_seconds)
                );
            }
        },
        Commands::Show { run_id } => {
            let run = archive.get(*run_id).ok_or(ArchiveError::NotFound(*run_id))?;
            for position in &run.positions {
                println!("{}\t{:.6}\t{:.6}", position.timestamp, position.latitude, position.longitude);
            }
        },
        Commands::ExportGpx { run_id, out } => {
            let run = archive.get(*run_id).ok_or(ArchiveError::NotFound(*run_id))?;
            let file = std::fs::File::create(out)?;
            write_gpx(run, std::io::BufWriter::new(file))?;
            tracing::info!("Exported run {} to {:?}", run_id, out);
        },
        Commands::ImportGpx { gpx_file } => {
            let file = std::fs::File::open(gpx_file)?;
            let run_id = archive.import_gpx(std::io::BufReader::new(file), Utc::now())?.id;
            archive.persist_all(store.as_ref()).await?;
            println!("Imported run {}", run_id);
        },
    }

    Ok(())
}
