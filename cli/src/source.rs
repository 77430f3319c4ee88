//! Resolving where a scan reads its ticks from

use anyhow::{bail, Context};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tickscan_core::{SnapshotRef, TickSpacing, TickStateProvider};
use tickscan_state::{MemoryTickStore, PersistentTickStore, TickSnapshot};
use tracing::debug;

/// Snapshot selection shared by the scanning commands
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// JSON snapshot file to scan in memory
    #[arg(short, long, conflicts_with = "snapshot_ref")]
    pub snapshot: Option<PathBuf>,

    /// Stored snapshot handle (reads from the data directory)
    #[arg(long)]
    pub snapshot_ref: Option<u64>,

    /// Data directory of the snapshot store
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

/// An opened provider plus the snapshot to scan in it
pub struct ScanSource {
    pub provider: Arc<dyn TickStateProvider>,
    pub snapshot: SnapshotRef,
    pub tick_spacing: TickSpacing,
}

impl ScanSource {
    pub fn open(args: &SourceArgs, default_data_dir: &Path) -> anyhow::Result<Self> {
        if let Some(path) = &args.snapshot {
            let snapshot = TickSnapshot::load(path)
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            let tick_spacing = snapshot.tick_spacing;
            let (store, snapshot_ref) = MemoryTickStore::with_snapshot(&snapshot)?;
            debug!("Scanning {} from {}", snapshot_ref, path.display());
            return Ok(Self {
                provider: Arc::new(store),
                snapshot: snapshot_ref,
                tick_spacing,
            });
        }

        let Some(raw_ref) = args.snapshot_ref else {
            bail!("provide either --snapshot <file> or --snapshot-ref <n>");
        };

        let data_dir = args.data_dir.as_deref().unwrap_or(default_data_dir);
        let store = PersistentTickStore::open(data_dir)
            .with_context(|| format!("opening store at {}", data_dir.display()))?;
        debug!("Scanning snap#{} from {}", raw_ref, data_dir.display());
        Self::from_store(store, SnapshotRef::new(raw_ref))
    }

    /// Scan a snapshot held in an already opened store
    pub fn from_store(store: PersistentTickStore, snapshot_ref: SnapshotRef) -> anyhow::Result<Self> {
        let header = store.header(snapshot_ref)?;
        Ok(Self {
            provider: Arc::new(store),
            snapshot: snapshot_ref,
            tick_spacing: header.tick_spacing,
        })
    }

    /// Requested spacing, falling back to the snapshot's own
    pub fn spacing(&self, requested: Option<i32>) -> TickSpacing {
        requested.map(TickSpacing::new).unwrap_or(self.tick_spacing)
    }
}
