use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use routegrader::store::{FsImageStore, HistoryQuery, HistoryStore, SqliteHistoryStore, UploadCoordinator};
use routegrader::{ContourDetector, GraderConfig, Orchestrator};

#[derive(Parser)]
#[command(name = "routegrader")]
#[command(about = "Grade climbing-wall routes from photographs")]
struct Cli {
    /// Path to a TOML config file; built-in defaults apply when omitted
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Request an upload slot and write an image through it
    Upload {
        /// Path to the image file to upload
        image_path: PathBuf,
    },
    /// Run the grading pipeline on a previously uploaded image
    Process {
        /// Object key returned by `upload`
        object_key: String,
    },
    /// Detect hold candidates in a local image (diagnostic, no persistence)
    Detect {
        /// Path to the image file to analyze
        image_path: PathBuf,
    },
    /// List past gradings, most recent first
    History {
        /// Maximum number of records to show
        #[arg(long)]
        limit: Option<u32>,
        /// Only records older than this unix-ms timestamp
        #[arg(long)]
        before: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let config = match &args.config {
        Some(path) => GraderConfig::load(path)?,
        None => GraderConfig::default(),
    };
    config.validate()?;

    match args.command {
        Command::Upload { image_path } => {
            let store = FsImageStore::new(&config.image_dir)?;
            let coordinator = UploadCoordinator::new(
                store,
                Duration::from_secs(config.upload_slot_ttl_secs),
            );
            let filename = image_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("invalid image path {:?}", image_path))?;
            let slot = coordinator.issue_slot(filename);
            let bytes = tokio::fs::read(&image_path).await?;
            coordinator.redeem(&slot, &bytes).await?;
            println!("uploaded as {}", slot.object_key);
        }
        Command::Process { object_key } => {
            let images = FsImageStore::new(&config.image_dir)?;
            let history = SqliteHistoryStore::open(&config.history_db).await?;
            let orchestrator = Orchestrator::new(&config, images, history);
            let outcome = orchestrator.process(&object_key).await?;

            println!("correlation id: {}", outcome.correlation_id);
            println!(
                "{} hold(s) graded, {} dropped",
                outcome.holds.len(),
                outcome.dropped
            );
            for grade in &outcome.grades {
                println!(
                    "  {} route: {} (difficulty {:.3}, confidence {:.2})",
                    grade.color, grade.bucket, grade.difficulty, grade.confidence
                );
            }
        }
        Command::Detect { image_path } => {
            let bytes = tokio::fs::read(&image_path).await?;
            let detector = ContourDetector::new(config.detection.clone());
            let contours = detector.detect(&bytes)?;

            println!("{} contour(s) detected", contours.len());
            for (i, contour) in contours.iter().enumerate() {
                let (cx, cy) = contour.center();
                println!(
                    "  {}: center ({}, {}), {}x{} px, area {} px, mean color #{:02x}{:02x}{:02x}",
                    i + 1,
                    cx,
                    cy,
                    contour.bbox.width(),
                    contour.bbox.height(),
                    contour.area_px,
                    contour.mean_color[0],
                    contour.mean_color[1],
                    contour.mean_color[2],
                );
            }
        }
        Command::History { limit, before } => {
            let history = SqliteHistoryStore::open(&config.history_db).await?;
            let records = history
                .query(HistoryQuery {
                    limit,
                    before_ms: before,
                })
                .await?;

            if records.is_empty() {
                println!("no history");
            }
            for record in records {
                let grades: Vec<String> = record
                    .grades
                    .iter()
                    .map(|g| format!("{}={}", g.color, g.bucket))
                    .collect();
                println!(
                    "{}  ts={}  key={}  {}",
                    record.id,
                    record.timestamp_ms,
                    record.object_key,
                    grades.join(" ")
                );
            }
        }
    }

    Ok(())
}
