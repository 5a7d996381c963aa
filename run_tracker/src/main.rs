use std::{fs::OpenOptions, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use run_tracker::{LogSink, ReplaySource, Tracker, TrackerConfig};
use run_tracker_data_management::{gpx_util::read_gpx, FileStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "run_tracker")]
#[command(about = "Track runs from a position source", long_about = None)]
struct Cli {
    /// key = value config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a recorded gpx track through the tracker as if it was live
    Replay {
        gpx_file: PathBuf,
        /// Play back this many times faster than recorded
        #[arg(long, default_value_t = 10.0)]
        speedup: f64,
        /// Save the run when the replay ends
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };

    let store = match &config.data_dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::in_project_data_dir()?,
    };

    let log_dir = store.dir().join("log");
    std::fs::create_dir_all(&log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("run_tracker.log"))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=trace,run_tracker_data_management=debug", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    match cli.command {
        Commands::Replay { gpx_file, speedup, save } => {
            let positions = read_gpx(std::io::BufReader::new(std::fs::File::open(&gpx_file)?))?;
            tracing::info!("Replaying {} positions from {:?}", positions.len(), gpx_file);

            let source = ReplaySource::new(positions, speedup, config.sample_timeout);
            let done = source.done();
            // Time the run on the recorded timeline, not the playback speed
            let clock = source.clock();

            let mut tracker = Tracker::open(
                config,
                Arc::new(store),
                Box::new(source),
                Box::new(LogSink),
                Arc::new(clock),
            ).await;

            tracker.start();

            tokio::select! {
                _ = tracker.run() => {},
                _ = done.notified() => tracing::info!("Replay finished"),
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
            }

            tracker.drain_pending();
            tracker.stop();

            if save {
                match tracker.save() {
                    Ok(run_id) => tracing::info!("Saved run {}", run_id),
                    Err(err) => tracing::warn!("Run was not saved: {err}"),
                }
            }

            tracker.shutdown().await;
        }
    }

    Ok(())
}
