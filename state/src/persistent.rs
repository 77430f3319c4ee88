//! Persistent tick snapshot store using sled database

use alloy_primitives::U256;
use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tickscan_core::{
    ScanDirection, SnapshotRef, StateVersion, Tick, TickLiquidity, TickSpacing,
    TickStateProvider, TickscanError, TickscanResult,
};
use tracing::{debug, info, warn};

use crate::bitmap::next_initialized_tick_within_one_word;
use crate::snapshot::{SnapshotHeader, TickEntry, TickSnapshot};

const SNAPSHOT_TREE: &str = "snapshots";
const BITMAP_TREE: &str = "bitmap";
const TICK_TREE: &str = "ticks";

fn storage_err(e: sled::Error) -> TickscanError {
    TickscanError::StorageError(e.to_string())
}

/// Order-preserving encoding of a signed index
fn encode_i32(value: i32) -> [u8; 4] {
    ((value as u32) ^ 0x8000_0000).to_be_bytes()
}

fn decode_i32(bytes: [u8; 4]) -> i32 {
    (u32::from_be_bytes(bytes) ^ 0x8000_0000) as i32
}

/// `snapshot ‖ index` key used by the bitmap and tick trees
fn scoped_key(snapshot: SnapshotRef, index: i32) -> [u8; 12] {
    let mut key = [0u8; 12];
    key[..8].copy_from_slice(&snapshot.to_be_bytes());
    key[8..].copy_from_slice(&encode_i32(index));
    key
}

fn scoped_index(key: &[u8]) -> TickscanResult<i32> {
    let raw: [u8; 4] = key
        .get(8..12)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| TickscanError::StateCorruption("malformed scoped key".to_string()))?;
    Ok(decode_i32(raw))
}

/// Persistent tick store backed by sled database.
///
/// Every imported snapshot is written once and never modified, so reads
/// against one [`SnapshotRef`] always observe the same state.
pub struct PersistentTickStore {
    db: Db,
    snapshots: Tree,
    bitmap: Tree,
    ticks: Tree,
}

impl PersistentTickStore {
    pub fn open<P: AsRef<Path>>(path: P) -> TickscanResult<Self> {
        let db = sled::open(path).map_err(storage_err)?;
        let snapshots = db.open_tree(SNAPSHOT_TREE).map_err(storage_err)?;
        let bitmap = db.open_tree(BITMAP_TREE).map_err(storage_err)?;
        let ticks = db.open_tree(TICK_TREE).map_err(storage_err)?;

        Ok(Self {
            db,
            snapshots,
            bitmap,
            ticks,
        })
    }

    /// Store a snapshot and return its handle.
    ///
    /// Words, ticks and header land in one transaction across the three
    /// trees, so a failed import leaves nothing behind under the new handle.
    pub fn import(&self, snapshot: &TickSnapshot) -> TickscanResult<SnapshotRef> {
        if let Err(e) = snapshot.check() {
            warn!("Rejected snapshot at {}: {}", snapshot.version, e);
            return Err(e);
        }

        let snapshot_ref = SnapshotRef::new(self.db.generate_id().map_err(storage_err)?);

        let word_rows: Vec<([u8; 12], [u8; 32])> = snapshot
            .bitmap()?
            .words()
            .map(|(word_pos, word)| (scoped_key(snapshot_ref, word_pos), word.to_be_bytes::<32>()))
            .collect();
        let tick_rows = snapshot
            .ticks
            .iter()
            .map(|entry| {
                Ok((
                    scoped_key(snapshot_ref, entry.tick.0),
                    bincode::serialize(&entry.liquidity)?,
                ))
            })
            .collect::<TickscanResult<Vec<_>>>()?;
        let header = bincode::serialize(&snapshot.header())?;

        (&self.bitmap, &self.ticks, &self.snapshots)
            .transaction(|(bitmap, ticks, snapshots)| {
                for (key, word) in &word_rows {
                    bitmap.insert(&key[..], &word[..])?;
                }
                for (key, value) in &tick_rows {
                    ticks.insert(&key[..], value.as_slice())?;
                }
                snapshots.insert(&snapshot_ref.to_be_bytes()[..], header.as_slice())?;
                Ok::<(), ConflictableTransactionError>(())
            })
            .map_err(|e: TransactionError| TickscanError::StorageError(e.to_string()))?;

        self.db.flush().map_err(storage_err)?;

        info!(
            "Imported snapshot {} at {} ({} ticks)",
            snapshot_ref,
            snapshot.version,
            snapshot.len()
        );
        Ok(snapshot_ref)
    }

    pub fn header(&self, snapshot: SnapshotRef) -> TickscanResult<SnapshotHeader> {
        let bytes = self
            .snapshots
            .get(snapshot.to_be_bytes())
            .map_err(storage_err)?
            .ok_or(TickscanError::SnapshotNotFound(snapshot))?;
        bincode::deserialize(&bytes).map_err(|e| TickscanError::DeserializationError(e.to_string()))
    }

    /// Rebuild a stored snapshot and verify it against its root
    pub fn export(&self, snapshot: SnapshotRef) -> TickscanResult<TickSnapshot> {
        let header = self.header(snapshot)?;

        let mut ticks = Vec::with_capacity(header.tick_count as usize);
        for item in self.ticks.scan_prefix(snapshot.to_be_bytes()) {
            let (key, value) = item.map_err(storage_err)?;
            let liquidity: TickLiquidity = bincode::deserialize(&value)
                .map_err(|e| TickscanError::DeserializationError(e.to_string()))?;
            ticks.push(TickEntry {
                tick: Tick::new(scoped_index(&key)?),
                liquidity,
            });
        }

        let restored = TickSnapshot {
            version: header.version,
            tick_spacing: header.tick_spacing,
            ticks,
            root: header.root,
            created_at: header.created_at,
        };
        restored.check()?;
        Ok(restored)
    }

    /// All stored snapshots in handle order
    pub fn list(&self) -> TickscanResult<Vec<(SnapshotRef, SnapshotHeader)>> {
        self.snapshots
            .iter()
            .map(|item| {
                let (key, value) = item.map_err(storage_err)?;
                let raw: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    TickscanError::StateCorruption("malformed snapshot key".to_string())
                })?;
                let header = bincode::deserialize(&value)
                    .map_err(|e| TickscanError::DeserializationError(e.to_string()))?;
                Ok((SnapshotRef::from_be_bytes(raw), header))
            })
            .collect()
    }

    /// Delete a snapshot, header first
    pub fn remove(&self, snapshot: SnapshotRef) -> TickscanResult<bool> {
        let existed = self
            .snapshots
            .remove(snapshot.to_be_bytes())
            .map_err(storage_err)?
            .is_some();

        for tree in [&self.bitmap, &self.ticks] {
            let mut batch = sled::Batch::default();
            for key in tree.scan_prefix(snapshot.to_be_bytes()).keys() {
                batch.remove(key.map_err(storage_err)?);
            }
            tree.apply_batch(batch).map_err(storage_err)?;
        }

        self.db.flush().map_err(storage_err)?;
        debug!("Removed snapshot {} (existed: {})", snapshot, existed);
        Ok(existed)
    }

    fn read_word(&self, snapshot: SnapshotRef, word_pos: i32) -> TickscanResult<U256> {
        match self
            .bitmap
            .get(scoped_key(snapshot, word_pos))
            .map_err(storage_err)?
        {
            Some(bytes) => U256::try_from_be_slice(&bytes).ok_or_else(|| {
                TickscanError::StateCorruption(format!("bitmap word {} is malformed", word_pos))
            }),
            None => Ok(U256::ZERO),
        }
    }

    /// Get database size estimate
    pub fn size_estimate(&self) -> TickscanResult<u64> {
        self.db.size_on_disk().map_err(storage_err)
    }
}

#[async_trait]
impl TickStateProvider for PersistentTickStore {
    async fn next_initialized_tick(
        &self,
        snapshot: SnapshotRef,
        from: Tick,
        direction: ScanDirection,
        spacing: TickSpacing,
    ) -> TickscanResult<(bool, Tick)> {
        let header = self.header(snapshot)?;
        if !spacing.is_valid() {
            return Err(TickscanError::InvalidSpacing(spacing.0));
        }
        if spacing != header.tick_spacing {
            return Err(TickscanError::SpacingMismatch {
                expected: header.tick_spacing.0,
                got: spacing.0,
            });
        }

        next_initialized_tick_within_one_word(
            |word_pos| self.read_word(snapshot, word_pos),
            from,
            spacing,
            direction.is_lte(),
        )
    }

    async fn tick_liquidity(&self, snapshot: SnapshotRef, tick: Tick) -> TickscanResult<TickLiquidity> {
        // unknown snapshots must fail rather than read as empty
        self.header(snapshot)?;
        match self
            .ticks
            .get(scoped_key(snapshot, tick.0))
            .map_err(storage_err)?
        {
            Some(bytes) => bincode::deserialize(&bytes)
                .map_err(|e| TickscanError::DeserializationError(e.to_string())),
            None => Ok(TickLiquidity::default()),
        }
    }

    async fn state_version(&self, snapshot: SnapshotRef) -> TickscanResult<StateVersion> {
        Ok(self.header(snapshot)?.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn snapshot() -> TickSnapshot {
        TickSnapshot::new(
            StateVersion::new(19_000_000),
            TickSpacing::new(60),
            vec![
                TickEntry::new(-887220, 10, 10),
                TickEntry::new(-600, 5_000, 5_000),
                TickEntry::new(1200, 5_000, -5_000),
                TickEntry::new(887220, 10, -10),
            ],
        )
    }

    #[test]
    fn test_index_encoding_orders() {
        let values = [i32::MIN, -887272, -1, 0, 1, 887272, i32::MAX];
        for pair in values.windows(2) {
            assert!(encode_i32(pair[0]) < encode_i32(pair[1]));
        }
        for v in values {
            assert_eq!(decode_i32(encode_i32(v)), v);
        }
    }

    #[test]
    fn test_persistent_import_export() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentTickStore::open(tmp.path()).unwrap();

        let original = snapshot();
        let snap = store.import(&original).unwrap();
        let restored = store.export(snap).unwrap();

        assert_eq!(restored.ticks, original.ticks);
        assert_eq!(restored.root, original.root);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persistent_provider_reads() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentTickStore::open(tmp.path()).unwrap();
        let snap = store.import(&snapshot()).unwrap();
        let spacing = TickSpacing::new(60);

        let next = store
            .next_initialized_tick(snap, Tick::new(0), ScanDirection::ForwardInclusive, spacing)
            .await
            .unwrap();
        // tick 0 opens word 0 and is not initialized
        assert_eq!(next, (false, Tick::new(0)));

        let next = store
            .next_initialized_tick(snap, Tick::new(-1), ScanDirection::ForwardInclusive, spacing)
            .await
            .unwrap();
        assert_eq!(next, (true, Tick::new(-600)));

        let next = store
            .next_initialized_tick(snap, Tick::new(0), ScanDirection::ForwardExclusive, spacing)
            .await
            .unwrap();
        assert_eq!(next, (true, Tick::new(1200)));

        let liq = store.tick_liquidity(snap, Tick::new(1200)).await.unwrap();
        assert_eq!(liq, TickLiquidity::new(5_000, -5_000));
        assert!(store.tick_liquidity(snap, Tick::new(60)).await.unwrap().is_zero());

        assert_eq!(
            store.state_version(snap).await.unwrap(),
            StateVersion::new(19_000_000)
        );
    }

    #[tokio::test]
    async fn test_persistent_unknown_snapshot() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentTickStore::open(tmp.path()).unwrap();
        let missing = SnapshotRef::new(77);

        assert!(matches!(
            store.tick_liquidity(missing, Tick::new(0)).await,
            Err(TickscanError::SnapshotNotFound(_))
        ));
    }

    #[test]
    fn test_import_writes_every_tree() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentTickStore::open(tmp.path()).unwrap();

        let original = snapshot();
        let words = original.bitmap().unwrap().words().count();
        let snap = store.import(&original).unwrap();

        assert_eq!(store.bitmap.scan_prefix(snap.to_be_bytes()).count(), words);
        assert_eq!(store.ticks.scan_prefix(snap.to_be_bytes()).count(), 4);
        assert!(store.header(snap).is_ok());

        let mut tampered = snapshot();
        tampered.ticks[0].liquidity.liquidity_gross += 1;
        assert!(store.import(&tampered).is_err());
        assert_eq!(store.bitmap.len(), words);
        assert_eq!(store.ticks.len(), 4);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_persistent_remove() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentTickStore::open(tmp.path()).unwrap();
        let snap = store.import(&snapshot()).unwrap();
        assert_eq!(store.header(snap).unwrap().tick_count, 4);

        assert!(store.remove(snap).unwrap());
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(store.export(snap), Err(TickscanError::SnapshotNotFound(_))));
        assert!(!store.remove(snap).unwrap());
    }
}
