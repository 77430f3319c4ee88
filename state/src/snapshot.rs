//! Immutable tick snapshots

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tickscan_core::{
    Hash, StateVersion, Tick, TickLiquidity, TickSpacing, TickscanError, TickscanResult, Timestamp,
};

use crate::bitmap::TickBitmap;

/// An initialized tick and its liquidity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEntry {
    pub tick: Tick,
    pub liquidity: TickLiquidity,
}

impl TickEntry {
    pub fn new(tick: i32, liquidity_gross: u128, liquidity_net: i128) -> Self {
        Self {
            tick: Tick::new(tick),
            liquidity: TickLiquidity::new(liquidity_gross, liquidity_net),
        }
    }

    fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&self.tick.0.to_be_bytes());
        hasher.update(&self.liquidity.liquidity_gross.to_be_bytes());
        hasher.update(&self.liquidity.liquidity_net.to_be_bytes());
    }
}

/// Compute the content root of a set of ticks.
///
/// Entries are hashed in ascending tick order regardless of input order.
pub fn compute_tick_root(spacing: TickSpacing, entries: &[TickEntry]) -> Hash {
    let mut sorted: Vec<_> = entries.iter().collect();
    sorted.sort_by_key(|e| e.tick);

    let mut hasher = blake3::Hasher::new();
    hasher.update(&spacing.0.to_be_bytes());
    for entry in sorted {
        entry.hash_into(&mut hasher);
    }
    Hash(*hasher.finalize().as_bytes())
}

/// A complete tick snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSnapshot {
    /// State version the ticks were read at
    pub version: StateVersion,
    /// Spacing the bitmap is built with
    pub tick_spacing: TickSpacing,
    /// Initialized ticks, ascending
    pub ticks: Vec<TickEntry>,
    /// Content root
    pub root: Hash,
    /// Creation time
    pub created_at: Timestamp,
}

impl TickSnapshot {
    pub fn new(version: StateVersion, tick_spacing: TickSpacing, mut ticks: Vec<TickEntry>) -> Self {
        ticks.sort_by_key(|e| e.tick);
        let root = compute_tick_root(tick_spacing, &ticks);
        Self {
            version,
            tick_spacing,
            ticks,
            root,
            created_at: Timestamp::now(),
        }
    }

    /// Check spacing, alignment, uniqueness and liquidity of every entry
    pub fn validate(&self) -> TickscanResult<()> {
        if !self.tick_spacing.is_valid() {
            return Err(TickscanError::InvalidSpacing(self.tick_spacing.0));
        }

        let mut seen = BTreeSet::new();
        for entry in &self.ticks {
            if !entry.tick.is_aligned(self.tick_spacing) {
                return Err(TickscanError::TickNotAligned {
                    tick: entry.tick.0,
                    spacing: self.tick_spacing.0,
                });
            }
            if !seen.insert(entry.tick) {
                return Err(TickscanError::StateCorruption(format!(
                    "duplicate tick {}",
                    entry.tick
                )));
            }
            if entry.liquidity.liquidity_gross == 0 {
                return Err(TickscanError::StateCorruption(format!(
                    "tick {} is initialized with zero gross liquidity",
                    entry.tick
                )));
            }
        }
        Ok(())
    }

    /// Verify snapshot integrity
    pub fn verify(&self) -> bool {
        compute_tick_root(self.tick_spacing, &self.ticks) == self.root
    }

    /// Validate and verify in one step
    pub fn check(&self) -> TickscanResult<()> {
        self.validate()?;
        if !self.verify() {
            return Err(TickscanError::StateCorruption(format!(
                "snapshot root mismatch at {}",
                self.version
            )));
        }
        Ok(())
    }

    /// Build the tick bitmap for this snapshot
    pub fn bitmap(&self) -> TickscanResult<TickBitmap> {
        let mut bitmap = TickBitmap::new();
        for entry in &self.ticks {
            bitmap.flip_tick(entry.tick, self.tick_spacing)?;
        }
        Ok(bitmap)
    }

    pub fn header(&self) -> SnapshotHeader {
        SnapshotHeader {
            version: self.version,
            tick_spacing: self.tick_spacing,
            root: self.root,
            created_at: self.created_at,
            tick_count: self.ticks.len() as u64,
        }
    }

    pub fn to_bytes(&self) -> TickscanResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| TickscanError::SerializationError(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> TickscanResult<Self> {
        bincode::deserialize(bytes).map_err(|e| TickscanError::DeserializationError(e.to_string()))
    }

    pub fn to_json(&self) -> TickscanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> TickscanResult<Self> {
        serde_json::from_str(json).map_err(|e| TickscanError::DeserializationError(e.to_string()))
    }

    /// Read a JSON snapshot file
    pub fn load<P: AsRef<Path>>(path: P) -> TickscanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

/// Everything about a snapshot except its ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub version: StateVersion,
    pub tick_spacing: TickSpacing,
    pub root: Hash,
    pub created_at: Timestamp,
    pub tick_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<TickEntry> {
        vec![
            TickEntry::new(20, 500, -500),
            TickEntry::new(-50, 1000, 1000),
            TickEntry::new(0, 250, 250),
        ]
    }

    #[test]
    fn test_snapshot_sorted_and_verified() {
        let snapshot = TickSnapshot::new(StateVersion::new(7), TickSpacing::new(10), entries());
        let ticks: Vec<i32> = snapshot.ticks.iter().map(|e| e.tick.0).collect();
        assert_eq!(ticks, vec![-50, 0, 20]);
        assert!(snapshot.verify());
        snapshot.check().unwrap();
    }

    #[test]
    fn test_root_independent_of_order() {
        let mut reversed = entries();
        reversed.reverse();
        let spacing = TickSpacing::new(10);
        assert_eq!(
            compute_tick_root(spacing, &entries()),
            compute_tick_root(spacing, &reversed)
        );
        assert_ne!(
            compute_tick_root(spacing, &entries()),
            compute_tick_root(TickSpacing::new(5), &entries())
        );
    }

    #[test]
    fn test_tampered_snapshot_fails_check() {
        let mut snapshot = TickSnapshot::new(StateVersion::new(1), TickSpacing::new(10), entries());
        snapshot.ticks[0].liquidity.liquidity_net = 1;
        assert!(!snapshot.verify());
        assert!(matches!(snapshot.check(), Err(TickscanError::StateCorruption(_))));
    }

    #[test]
    fn test_validate_rejects_bad_entries() {
        let dup = TickSnapshot::new(
            StateVersion::new(1),
            TickSpacing::new(10),
            vec![TickEntry::new(10, 1, 1), TickEntry::new(10, 2, 2)],
        );
        assert!(matches!(dup.validate(), Err(TickscanError::StateCorruption(_))));

        let misaligned = TickSnapshot::new(
            StateVersion::new(1),
            TickSpacing::new(10),
            vec![TickEntry::new(15, 1, 1)],
        );
        assert!(matches!(
            misaligned.validate(),
            Err(TickscanError::TickNotAligned { tick: 15, spacing: 10 })
        ));

        let empty_liquidity = TickSnapshot::new(
            StateVersion::new(1),
            TickSpacing::new(10),
            vec![TickEntry::new(10, 0, 0)],
        );
        assert!(empty_liquidity.validate().is_err());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = TickSnapshot::new(StateVersion::new(3), TickSpacing::new(10), entries());

        let bytes = snapshot.to_bytes().unwrap();
        let restored = TickSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(restored.root, snapshot.root);
        assert!(restored.verify());

        let json = snapshot.to_json().unwrap();
        let restored = TickSnapshot::from_json(&json).unwrap();
        assert_eq!(restored.ticks, snapshot.ticks);
        assert_eq!(restored.header(), snapshot.header());
    }

    #[test]
    fn test_bitmap_from_snapshot() {
        let snapshot = TickSnapshot::new(StateVersion::new(3), TickSpacing::new(10), entries());
        let bitmap = snapshot.bitmap().unwrap();
        assert!(bitmap.is_initialized(Tick::new(-50), TickSpacing::new(10)));
        assert!(bitmap.is_initialized(Tick::new(20), TickSpacing::new(10)));
        assert!(!bitmap.is_initialized(Tick::new(10), TickSpacing::new(10)));
    }
}
