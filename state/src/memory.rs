//! In-memory tick snapshot store for tests and light deployments

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tickscan_core::{
    Hash, ScanDirection, SnapshotRef, StateVersion, Tick, TickLiquidity, TickSpacing,
    TickStateProvider, TickscanError, TickscanResult,
};
use tracing::{debug, info};

use crate::bitmap::TickBitmap;
use crate::snapshot::TickSnapshot;

/// A snapshot unpacked into its bitmap and tick map
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub version: StateVersion,
    pub tick_spacing: TickSpacing,
    pub root: Hash,
    bitmap: TickBitmap,
    ticks: BTreeMap<Tick, TickLiquidity>,
}

impl LoadedSnapshot {
    pub fn from_snapshot(snapshot: &TickSnapshot) -> TickscanResult<Self> {
        snapshot.check()?;
        Ok(Self {
            version: snapshot.version,
            tick_spacing: snapshot.tick_spacing,
            root: snapshot.root,
            bitmap: snapshot.bitmap()?,
            ticks: snapshot.ticks.iter().map(|e| (e.tick, e.liquidity)).collect(),
        })
    }

    /// Liquidity at `tick`, zero when it is not initialized
    pub fn liquidity(&self, tick: Tick) -> TickLiquidity {
        self.ticks.get(&tick).copied().unwrap_or_default()
    }

    fn check_spacing(&self, spacing: TickSpacing) -> TickscanResult<()> {
        if !spacing.is_valid() {
            return Err(TickscanError::InvalidSpacing(spacing.0));
        }
        if spacing != self.tick_spacing {
            return Err(TickscanError::SpacingMismatch {
                expected: self.tick_spacing.0,
                got: spacing.0,
            });
        }
        Ok(())
    }
}

/// In-memory tick store holding immutable snapshots
pub struct MemoryTickStore {
    snapshots: DashMap<SnapshotRef, Arc<LoadedSnapshot>>,
    order: Mutex<VecDeque<SnapshotRef>>,
    next_ref: Mutex<u64>,
    retention: Option<usize>,
}

impl MemoryTickStore {
    pub fn new() -> Self {
        Self {
            snapshots: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            next_ref: Mutex::new(0),
            retention: None,
        }
    }

    /// Keep at most `max_snapshots`, dropping the oldest first
    pub fn with_retention(max_snapshots: usize) -> Self {
        Self {
            retention: Some(max_snapshots.max(1)),
            ..Self::new()
        }
    }

    /// Store from a single snapshot, returning its handle
    pub fn with_snapshot(snapshot: &TickSnapshot) -> TickscanResult<(Self, SnapshotRef)> {
        let store = Self::new();
        let snapshot_ref = store.insert_snapshot(snapshot)?;
        Ok((store, snapshot_ref))
    }

    /// Load a snapshot and make it readable under a fresh handle
    pub fn insert_snapshot(&self, snapshot: &TickSnapshot) -> TickscanResult<SnapshotRef> {
        let loaded = Arc::new(LoadedSnapshot::from_snapshot(snapshot)?);

        let snapshot_ref = {
            let mut next = self.next_ref.lock();
            let r = SnapshotRef::new(*next);
            *next += 1;
            r
        };

        self.snapshots.insert(snapshot_ref, loaded);

        let mut order = self.order.lock();
        order.push_back(snapshot_ref);
        if let Some(max) = self.retention {
            while order.len() > max {
                if let Some(oldest) = order.pop_front() {
                    self.snapshots.remove(&oldest);
                    debug!("Pruned snapshot {}", oldest);
                }
            }
        }

        info!(
            "Loaded snapshot {} at {} ({} ticks)",
            snapshot_ref,
            snapshot.version,
            snapshot.len()
        );
        Ok(snapshot_ref)
    }

    pub fn get(&self, snapshot: SnapshotRef) -> TickscanResult<Arc<LoadedSnapshot>> {
        self.snapshots
            .get(&snapshot)
            .map(|entry| entry.value().clone())
            .ok_or(TickscanError::SnapshotNotFound(snapshot))
    }

    /// Most recently inserted snapshot still held
    pub fn latest(&self) -> Option<SnapshotRef> {
        self.order.lock().back().copied()
    }

    /// Newest snapshot taken at `version`
    pub fn at_version(&self, version: StateVersion) -> Option<SnapshotRef> {
        self.order
            .lock()
            .iter()
            .rev()
            .find(|r| {
                self.snapshots
                    .get(*r)
                    .map(|s| s.version == version)
                    .unwrap_or(false)
            })
            .copied()
    }

    pub fn remove(&self, snapshot: SnapshotRef) -> bool {
        self.order.lock().retain(|r| *r != snapshot);
        self.snapshots.remove(&snapshot).is_some()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Default for MemoryTickStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TickStateProvider for MemoryTickStore {
    async fn next_initialized_tick(
        &self,
        snapshot: SnapshotRef,
        from: Tick,
        direction: ScanDirection,
        spacing: TickSpacing,
    ) -> TickscanResult<(bool, Tick)> {
        let loaded = self.get(snapshot)?;
        loaded.check_spacing(spacing)?;
        loaded
            .bitmap
            .next_initialized_tick_within_one_word(from, spacing, direction.is_lte())
    }

    async fn tick_liquidity(&self, snapshot: SnapshotRef, tick: Tick) -> TickscanResult<TickLiquidity> {
        Ok(self.get(snapshot)?.liquidity(tick))
    }

    async fn state_version(&self, snapshot: SnapshotRef) -> TickscanResult<StateVersion> {
        Ok(self.get(snapshot)?.version)
    }
}

/// Thread-safe memory store wrapper
pub type SharedMemoryTickStore = Arc<MemoryTickStore>;

/// Create a shared memory tick store
pub fn create_memory_store() -> SharedMemoryTickStore {
    Arc::new(MemoryTickStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::TickEntry;

    fn snapshot(version: u64) -> TickSnapshot {
        TickSnapshot::new(
            StateVersion::new(version),
            TickSpacing::new(10),
            vec![
                TickEntry::new(-50, 100, 100),
                TickEntry::new(0, 40, -20),
                TickEntry::new(60, 100, -100),
            ],
        )
    }

    #[tokio::test]
    async fn test_memory_store_reads() {
        let (store, snap) = MemoryTickStore::with_snapshot(&snapshot(42)).unwrap();

        assert_eq!(store.state_version(snap).await.unwrap(), StateVersion::new(42));

        let next = store
            .next_initialized_tick(snap, Tick::new(0), ScanDirection::ForwardExclusive, TickSpacing::new(10))
            .await
            .unwrap();
        assert_eq!(next, (true, Tick::new(60)));

        let liq = store.tick_liquidity(snap, Tick::new(0)).await.unwrap();
        assert_eq!(liq, TickLiquidity::new(40, -20));

        let empty = store.tick_liquidity(snap, Tick::new(10)).await.unwrap();
        assert!(empty.is_zero());
    }

    #[tokio::test]
    async fn test_memory_store_unknown_snapshot() {
        let store = MemoryTickStore::new();
        let missing = SnapshotRef::new(9);
        assert!(matches!(
            store.state_version(missing).await,
            Err(TickscanError::SnapshotNotFound(r)) if r == missing
        ));
    }

    #[tokio::test]
    async fn test_memory_store_spacing_mismatch() {
        let (store, snap) = MemoryTickStore::with_snapshot(&snapshot(1)).unwrap();
        let err = store
            .next_initialized_tick(snap, Tick::new(0), ScanDirection::ForwardInclusive, TickSpacing::new(5))
            .await
            .unwrap_err();
        assert!(matches!(err, TickscanError::SpacingMismatch { expected: 10, got: 5 }));
    }

    #[test]
    fn test_memory_store_rejects_tampered_snapshot() {
        let mut snap = snapshot(1);
        snap.ticks[1].liquidity.liquidity_gross = 1;
        let store = MemoryTickStore::new();
        assert!(store.insert_snapshot(&snap).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_retention() {
        let store = MemoryTickStore::with_retention(2);
        let first = store.insert_snapshot(&snapshot(1)).unwrap();
        let second = store.insert_snapshot(&snapshot(2)).unwrap();
        let third = store.insert_snapshot(&snapshot(3)).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get(first).is_err());
        assert!(store.get(second).is_ok());
        assert_eq!(store.latest(), Some(third));
        assert_eq!(store.at_version(StateVersion::new(2)), Some(second));
        assert_eq!(store.at_version(StateVersion::new(1)), None);
    }

    #[test]
    fn test_memory_store_remove() {
        let store = MemoryTickStore::new();
        let snap = store.insert_snapshot(&snapshot(5)).unwrap();
        assert!(store.remove(snap));
        assert!(!store.remove(snap));
        assert_eq!(store.latest(), None);
    }
}
