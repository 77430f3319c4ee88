//! Core traits defining TICKSCAN interfaces
//!
//! The scanner only ever talks to state through [`TickStateProvider`].

use crate::types::*;
use async_trait::async_trait;
use std::sync::Arc;

/// Result type for TICKSCAN operations
pub type TickscanResult<T> = Result<T, crate::error::TickscanError>;

/// Point-in-time reads against one immutable tick snapshot.
///
/// Implementations must be deterministic for a fixed `snapshot`.
#[async_trait]
pub trait TickStateProvider: Send + Sync {
    /// Nearest candidate tick from `from` in `direction`.
    ///
    /// The returned tick is not necessarily initialized; the flag says
    /// whether it is.
    async fn next_initialized_tick(
        &self,
        snapshot: SnapshotRef,
        from: Tick,
        direction: ScanDirection,
        spacing: TickSpacing,
    ) -> TickscanResult<(bool, Tick)>;

    /// Liquidity stored at exactly `tick`
    async fn tick_liquidity(&self, snapshot: SnapshotRef, tick: Tick) -> TickscanResult<TickLiquidity>;

    /// Version of the state `snapshot` was taken at
    async fn state_version(&self, snapshot: SnapshotRef) -> TickscanResult<StateVersion>;
}

#[async_trait]
impl<P: TickStateProvider + ?Sized> TickStateProvider for Arc<P> {
    async fn next_initialized_tick(
        &self,
        snapshot: SnapshotRef,
        from: Tick,
        direction: ScanDirection,
        spacing: TickSpacing,
    ) -> TickscanResult<(bool, Tick)> {
        (**self)
            .next_initialized_tick(snapshot, from, direction, spacing)
            .await
    }

    async fn tick_liquidity(&self, snapshot: SnapshotRef, tick: Tick) -> TickscanResult<TickLiquidity> {
        (**self).tick_liquidity(snapshot, tick).await
    }

    async fn state_version(&self, snapshot: SnapshotRef) -> TickscanResult<StateVersion> {
        (**self).state_version(snapshot).await
    }
}
