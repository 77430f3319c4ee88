//! TICKSCAN CLI - scan tick snapshots from the command line

mod source;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tickscan_core::{ScanDirection, Tick, ToolConfig};
use tickscan_scanner::{ScanRequest, ScanResult, TickScanner};
use tickscan_state::{PersistentTickStore, TickSnapshot};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::source::{ScanSource, SourceArgs};

#[derive(Parser)]
#[command(name = "tickscan")]
#[command(about = "TICKSCAN - bounded scans over sparse tick bitmaps")]
#[command(version)]
struct Cli {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overrides the configuration file
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan from a start tick in one direction
    Scan {
        #[command(flatten)]
        source: SourceArgs,

        /// Tick to start from
        #[arg(long, allow_hyphen_values = true)]
        start: i32,

        /// inclusive (walks down, start included) or exclusive (walks up)
        #[arg(short, long, default_value = "exclusive")]
        direction: ScanDirection,

        /// Number of result slots
        #[arg(short, long, default_value = "10")]
        max_steps: u16,

        /// Tick spacing (defaults to the snapshot's)
        #[arg(long)]
        spacing: Option<i32>,

        /// Output encoding
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Scan both sides of a current tick
    Window {
        #[command(flatten)]
        source: SourceArgs,

        /// Current tick
        #[arg(long, allow_hyphen_values = true)]
        current: i32,

        /// Result slots on each side
        #[arg(long, default_value = "10")]
        per_side: u16,

        /// Tick spacing (defaults to the snapshot's)
        #[arg(long)]
        spacing: Option<i32>,
    },

    /// Store a JSON snapshot file
    Import {
        /// Snapshot file path
        snapshot: PathBuf,

        /// Data directory of the snapshot store
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Write a stored snapshot back out as JSON
    Export {
        /// Stored snapshot handle
        snapshot_ref: u64,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Data directory of the snapshot store
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// List stored snapshots
    List {
        /// Data directory of the snapshot store
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Pretty JSON
    Json,
    /// Hex of the bincode encoding
    Hex,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ToolConfig::load(path)?,
        None => ToolConfig::default(),
    };

    // Logs go to stderr so stdout stays machine readable
    let filter = cli.log_level.as_deref().unwrap_or(&config.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan {
            source,
            start,
            direction,
            max_steps,
            spacing,
            format,
        } => {
            let source = ScanSource::open(&source, &config.data_dir)?;
            let request = ScanRequest::new(
                source.snapshot,
                direction,
                Tick::new(start),
                max_steps,
                source.spacing(spacing),
            );

            let scanner = TickScanner::new(source.provider, config.scanner.clone())?;
            let result = scanner.scan(&request).await?;
            print_result(&result, format)?;
        }

        Commands::Window {
            source,
            current,
            per_side,
            spacing,
        } => {
            let source = ScanSource::open(&source, &config.data_dir)?;
            let spacing = source.spacing(spacing);
            let snapshot = source.snapshot;

            let scanner = TickScanner::new(source.provider, config.scanner.clone())?;
            let window = scanner
                .scan_window(snapshot, Tick::new(current), spacing, per_side)
                .await?;
            println!("{}", window.to_json()?);
        }

        Commands::Import { snapshot, data_dir } => {
            let data_dir = data_dir.unwrap_or(config.data_dir);
            let tick_snapshot = TickSnapshot::load(&snapshot)?;

            let store = PersistentTickStore::open(&data_dir)?;
            let snapshot_ref = store.import(&tick_snapshot)?;

            info!("Stored {} in {}", snapshot.display(), data_dir.display());
            println!("{}", snapshot_ref.0);
        }

        Commands::Export {
            snapshot_ref,
            output,
            data_dir,
        } => {
            let data_dir = data_dir.unwrap_or(config.data_dir);
            let store = PersistentTickStore::open(&data_dir)?;
            let json = store
                .export(tickscan_core::SnapshotRef::new(snapshot_ref))?
                .to_json()?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &json)?;
                    println!("Snapshot saved to: {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::List { data_dir } => {
            let data_dir = data_dir.unwrap_or(config.data_dir);
            let store = PersistentTickStore::open(&data_dir)?;
            let snapshots = store.list()?;

            if snapshots.is_empty() {
                println!("No snapshots stored.");
            } else {
                println!(
                    "{:<8} {:<14} {:<8} {:<8} {}",
                    "Ref", "Version", "Spacing", "Ticks", "Root"
                );
                println!("{:-<8} {:-<14} {:-<8} {:-<8} {:-<18}", "", "", "", "", "");
                for (snapshot_ref, header) in snapshots {
                    println!(
                        "{:<8} {:<14} {:<8} {:<8} {}",
                        snapshot_ref.0,
                        header.version.to_string(),
                        header.tick_spacing.to_string(),
                        header.tick_count,
                        header.root
                    );
                }
                println!("Store size: {} bytes", store.size_estimate()?);
            }
        }
    }

    Ok(())
}

fn print_result(result: &ScanResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", result.to_json()?),
        OutputFormat::Hex => println!("{}", hex::encode(result.to_bytes()?)),
    }
    Ok(())
}
