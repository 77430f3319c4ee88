//! Core types for TICKSCAN
//!
//! Defines fundamental data structures used across the system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A position in the tick key space
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Tick(pub i32);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    pub fn new(value: i32) -> Self {
        Tick(value)
    }

    pub fn saturating_sub(self, delta: i32) -> Tick {
        Tick(self.0.saturating_sub(delta))
    }

    /// Whether this tick sits on a multiple of `spacing`
    pub fn is_aligned(&self, spacing: TickSpacing) -> bool {
        spacing.is_valid() && self.0 % spacing.0 == 0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}

/// Minimum distance between usable ticks
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickSpacing(pub i32);

impl TickSpacing {
    pub fn new(value: i32) -> Self {
        TickSpacing(value)
    }

    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for TickSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TickSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TickSpacing({})", self.0)
    }
}

/// 32-byte hash type
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Hash(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", &self.to_hex()[..16])
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{})", self.to_hex())
    }
}

/// Timestamp in milliseconds since Unix epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(chrono::Utc::now().timestamp_millis() as u64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Version (block height) of the state a snapshot was taken at
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct StateVersion(pub u64);

impl StateVersion {
    pub fn new(value: u64) -> Self {
        StateVersion(value)
    }
}

impl fmt::Display for StateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Debug for StateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateVersion({})", self.0)
    }
}

/// Opaque handle naming one immutable snapshot inside a provider
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotRef(pub u64);

impl SnapshotRef {
    pub fn new(value: u64) -> Self {
        SnapshotRef(value)
    }

    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        SnapshotRef(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snap#{}", self.0)
    }
}

impl fmt::Debug for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotRef({})", self.0)
    }
}

/// Liquidity attached to a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TickLiquidity {
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
}

impl TickLiquidity {
    pub fn new(liquidity_gross: u128, liquidity_net: i128) -> Self {
        Self {
            liquidity_gross,
            liquidity_net,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.liquidity_gross == 0 && self.liquidity_net == 0
    }
}

/// One slot of a scan result.
///
/// The default value is the placeholder written into unpopulated slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TickRecord {
    pub initialized: bool,
    pub tick: Tick,
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
}

impl TickRecord {
    pub fn new(initialized: bool, tick: Tick, liquidity: TickLiquidity) -> Self {
        Self {
            initialized,
            tick,
            liquidity_gross: liquidity.liquidity_gross,
            liquidity_net: liquidity.liquidity_net,
        }
    }

    pub fn liquidity(&self) -> TickLiquidity {
        TickLiquidity::new(self.liquidity_gross, self.liquidity_net)
    }
}

/// Direction of a tick scan.
///
/// The two variants use different inclusivity conventions for the cursor,
/// so each one carries its own cursor adjustment (see [`ScanDirection::advance`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    /// Walks toward lower ticks; the cursor tick itself is a candidate (`<=`).
    ForwardInclusive,
    /// Walks toward higher ticks; only ticks strictly after the cursor (`>`).
    ForwardExclusive,
}

impl ScanDirection {
    /// Direction a `zero_for_one` swap moves the price
    pub fn from_zero_for_one(zero_for_one: bool) -> Self {
        if zero_for_one {
            ScanDirection::ForwardInclusive
        } else {
            ScanDirection::ForwardExclusive
        }
    }

    /// Whether the bitmap search is `<=` the cursor
    pub fn is_lte(&self) -> bool {
        matches!(self, ScanDirection::ForwardInclusive)
    }

    /// Cursor for the next search after `found` was recorded.
    ///
    /// `ForwardInclusive` would find `found` again, so it steps one tick lower.
    /// `ForwardExclusive` already excludes the cursor and keeps `found`.
    pub fn advance(&self, found: Tick) -> Tick {
        match self {
            ScanDirection::ForwardInclusive => found.saturating_sub(1),
            ScanDirection::ForwardExclusive => found,
        }
    }

    /// Whether `next` comes strictly after `prev` in this direction
    pub fn is_progress(&self, prev: Tick, next: Tick) -> bool {
        match self {
            ScanDirection::ForwardInclusive => next < prev,
            ScanDirection::ForwardExclusive => next > prev,
        }
    }
}

impl fmt::Display for ScanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanDirection::ForwardInclusive => write!(f, "inclusive"),
            ScanDirection::ForwardExclusive => write!(f, "exclusive"),
        }
    }
}

impl FromStr for ScanDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inclusive" | "forward_inclusive" | "lte" | "down" => {
                Ok(ScanDirection::ForwardInclusive)
            }
            "exclusive" | "forward_exclusive" | "gt" | "up" => Ok(ScanDirection::ForwardExclusive),
            other => Err(format!("unknown scan direction: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_hex() {
        let hash = Hash([7u8; 32]);
        let parsed = Hash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
        assert!(Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_tick_alignment() {
        let spacing = TickSpacing::new(10);
        assert!(Tick::new(-50).is_aligned(spacing));
        assert!(Tick::new(0).is_aligned(spacing));
        assert!(!Tick::new(15).is_aligned(spacing));
        assert!(!Tick::new(10).is_aligned(TickSpacing::new(0)));
    }

    #[test]
    fn test_direction_advance() {
        let found = Tick::new(20);
        assert_eq!(ScanDirection::ForwardInclusive.advance(found), Tick::new(19));
        assert_eq!(ScanDirection::ForwardExclusive.advance(found), Tick::new(20));
        assert_eq!(
            ScanDirection::ForwardInclusive.advance(Tick::new(i32::MIN)),
            Tick::new(i32::MIN)
        );
    }

    #[test]
    fn test_direction_progress() {
        assert!(ScanDirection::ForwardInclusive.is_progress(Tick::new(0), Tick::new(-10)));
        assert!(!ScanDirection::ForwardInclusive.is_progress(Tick::new(0), Tick::new(0)));
        assert!(ScanDirection::ForwardExclusive.is_progress(Tick::new(0), Tick::new(10)));
        assert!(!ScanDirection::ForwardExclusive.is_progress(Tick::new(10), Tick::new(0)));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(
            "inclusive".parse::<ScanDirection>().unwrap(),
            ScanDirection::ForwardInclusive
        );
        assert_eq!("GT".parse::<ScanDirection>().unwrap(), ScanDirection::ForwardExclusive);
        assert!("sideways".parse::<ScanDirection>().is_err());
        assert_eq!(
            ScanDirection::from_zero_for_one(true),
            ScanDirection::ForwardInclusive
        );
    }

    #[test]
    fn test_record_default_is_placeholder() {
        let record = TickRecord::default();
        assert!(!record.initialized);
        assert_eq!(record.tick, Tick::ZERO);
        assert!(record.liquidity().is_zero());
    }
}
