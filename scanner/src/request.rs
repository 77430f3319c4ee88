//! Scan requests and results

use serde::{Deserialize, Serialize};
use tickscan_core::{
    ScanDirection, ScannerConfig, SnapshotRef, StateVersion, Tick, TickRecord, TickSpacing,
    TickscanError, TickscanResult,
};

/// One scan over one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub snapshot: SnapshotRef,
    pub direction: ScanDirection,
    pub start_tick: Tick,
    pub max_steps: u16,
    pub spacing: TickSpacing,
}

impl ScanRequest {
    pub fn new(
        snapshot: SnapshotRef,
        direction: ScanDirection,
        start_tick: Tick,
        max_steps: u16,
        spacing: TickSpacing,
    ) -> Self {
        Self {
            snapshot,
            direction,
            start_tick,
            max_steps,
            spacing,
        }
    }

    /// Reject request shapes the scan loop cannot handle
    pub fn validate(&self, config: &ScannerConfig) -> TickscanResult<()> {
        if !self.spacing.is_valid() {
            return Err(TickscanError::InvalidSpacing(self.spacing.0));
        }
        if self.max_steps > config.max_steps_limit {
            return Err(TickscanError::TooManySteps {
                requested: self.max_steps,
                limit: config.max_steps_limit,
            });
        }
        if !config.domain.contains_closed(self.start_tick) {
            return Err(TickscanError::TickOutOfDomain {
                tick: self.start_tick.0,
                min: config.domain.min_tick,
                max: config.domain.max_tick,
            });
        }
        Ok(())
    }
}

/// Fixed-capacity scan output.
///
/// `ticks` always holds `max_steps` slots. Only the first `valid_to` are
/// meaningful; the rest keep the default placeholder record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub ticks: Vec<TickRecord>,
    pub valid_to: usize,
    pub snapshot_version: StateVersion,
}

impl ScanResult {
    pub fn capacity(&self) -> usize {
        self.ticks.len()
    }

    /// The populated prefix
    pub fn valid_ticks(&self) -> &[TickRecord] {
        &self.ticks[..self.valid_to.min(self.ticks.len())]
    }

    /// Populated records whose tick is initialized
    pub fn initialized_ticks(&self) -> impl Iterator<Item = &TickRecord> {
        self.valid_ticks().iter().filter(|r| r.initialized)
    }

    /// Every slot was filled
    pub fn is_full(&self) -> bool {
        self.valid_to == self.ticks.len()
    }

    /// The scan stopped at a domain bound before filling every slot
    pub fn is_exhausted(&self) -> bool {
        !self.is_full()
    }

    pub fn to_bytes(&self) -> TickscanResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| TickscanError::SerializationError(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> TickscanResult<Self> {
        let result: Self = bincode::deserialize(bytes)
            .map_err(|e| TickscanError::DeserializationError(e.to_string()))?;
        if result.valid_to > result.ticks.len() {
            return Err(TickscanError::DeserializationError(format!(
                "valid_to {} exceeds capacity {}",
                result.valid_to,
                result.ticks.len()
            )));
        }
        Ok(result)
    }

    pub fn to_json(&self) -> TickscanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Ticks on both sides of a current tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickWindow {
    pub current_tick: Tick,
    /// `ForwardInclusive` scan from the current tick
    pub below: ScanResult,
    /// `ForwardExclusive` scan from the current tick
    pub above: ScanResult,
}

impl TickWindow {
    pub fn snapshot_version(&self) -> StateVersion {
        self.below.snapshot_version
    }

    /// Valid records of both sides in ascending tick order
    pub fn ascending(&self) -> Vec<TickRecord> {
        self.below
            .valid_ticks()
            .iter()
            .rev()
            .chain(self.above.valid_ticks())
            .copied()
            .collect()
    }

    pub fn to_json(&self) -> TickscanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickscan_core::{KeyDomain, TickLiquidity};

    fn request(start: i32, max_steps: u16, spacing: i32) -> ScanRequest {
        ScanRequest::new(
            SnapshotRef::new(0),
            ScanDirection::ForwardExclusive,
            Tick::new(start),
            max_steps,
            TickSpacing::new(spacing),
        )
    }

    fn config() -> ScannerConfig {
        ScannerConfig {
            domain: KeyDomain::new(-100, 100).unwrap(),
            max_steps_limit: 64,
        }
    }

    #[test]
    fn test_validate_accepts_domain_edges() {
        request(-100, 1, 10).validate(&config()).unwrap();
        request(100, 1, 10).validate(&config()).unwrap();
        request(0, 0, 1).validate(&config()).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(matches!(
            request(0, 1, 0).validate(&config()),
            Err(TickscanError::InvalidSpacing(0))
        ));
        assert!(matches!(
            request(0, 1, -10).validate(&config()),
            Err(TickscanError::InvalidSpacing(-10))
        ));
        assert!(matches!(
            request(0, 65, 10).validate(&config()),
            Err(TickscanError::TooManySteps { requested: 65, limit: 64 })
        ));
        assert!(matches!(
            request(101, 1, 10).validate(&config()),
            Err(TickscanError::TickOutOfDomain { tick: 101, .. })
        ));
    }

    #[test]
    fn test_result_views() {
        let record = TickRecord::new(true, Tick::new(20), TickLiquidity::new(5, -5));
        let gap = TickRecord::new(false, Tick::new(30), TickLiquidity::default());
        let result = ScanResult {
            ticks: vec![record, gap, TickRecord::default()],
            valid_to: 2,
            snapshot_version: StateVersion::new(4),
        };

        assert_eq!(result.capacity(), 3);
        assert_eq!(result.valid_ticks(), &[record, gap]);
        assert_eq!(result.initialized_ticks().count(), 1);
        assert!(result.is_exhausted());
        assert!(!result.is_full());
    }

    #[test]
    fn test_result_bytes_reject_bad_count() {
        let result = ScanResult {
            ticks: vec![TickRecord::default()],
            valid_to: 1,
            snapshot_version: StateVersion::new(1),
        };
        let restored = ScanResult::from_bytes(&result.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, result);

        let broken = ScanResult {
            valid_to: 2,
            ..result
        };
        assert!(ScanResult::from_bytes(&broken.to_bytes().unwrap()).is_err());
    }

    #[test]
    fn test_window_ascending() {
        let rec = |t: i32| TickRecord::new(true, Tick::new(t), TickLiquidity::new(1, 1));
        let window = TickWindow {
            current_tick: Tick::new(5),
            below: ScanResult {
                ticks: vec![rec(0), rec(-10), TickRecord::default()],
                valid_to: 2,
                snapshot_version: StateVersion::new(9),
            },
            above: ScanResult {
                ticks: vec![rec(20)],
                valid_to: 1,
                snapshot_version: StateVersion::new(9),
            },
        };
        let ticks: Vec<i32> = window.ascending().iter().map(|r| r.tick.0).collect();
        assert_eq!(ticks, vec![-10, 0, 20]);
        assert_eq!(window.snapshot_version(), StateVersion::new(9));
    }
}
