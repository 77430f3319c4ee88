//! The tick scan loop

use tickscan_core::{
    ScanDirection, ScannerConfig, SnapshotRef, Tick, TickRecord, TickSpacing, TickStateProvider,
    TickscanError, TickscanResult,
};
use tracing::{debug, info};

use crate::request::{ScanRequest, ScanResult, TickWindow};

/// Bounded tick scanner over a [`TickStateProvider`]
pub struct TickScanner<P: TickStateProvider> {
    provider: P,
    config: ScannerConfig,
}

impl<P: TickStateProvider> TickScanner<P> {
    pub fn new(provider: P, config: ScannerConfig) -> TickscanResult<Self> {
        config.domain.validate()?;
        Ok(Self { provider, config })
    }

    /// Run one scan.
    ///
    /// Stops when `max_steps` records are collected or when the provider's
    /// next candidate is on or beyond a domain bound. Any provider error
    /// aborts the scan and drops the records gathered so far.
    pub async fn scan(&self, request: &ScanRequest) -> TickscanResult<ScanResult> {
        request.validate(&self.config)?;

        let domain = self.config.domain;
        let capacity = request.max_steps as usize;
        let mut ticks = vec![TickRecord::default(); capacity];
        let mut valid_to = 0;
        let mut cursor = request.start_tick;

        while valid_to < capacity {
            let (initialized, next) = self
                .provider
                .next_initialized_tick(request.snapshot, cursor, request.direction, request.spacing)
                .await?;

            if !domain.contains_open(next) {
                debug!(
                    "Scan of {} hit domain bound at tick {} after {} records",
                    request.snapshot, next, valid_to
                );
                break;
            }

            // stored even when `initialized` is false
            let liquidity = self.provider.tick_liquidity(request.snapshot, next).await?;
            ticks[valid_to] = TickRecord::new(initialized, next, liquidity);
            valid_to += 1;

            cursor = request.direction.advance(next);
        }

        let snapshot_version = self.provider.state_version(request.snapshot).await?;

        info!(
            "Scanned {} {} from tick {}: {}/{} records at {}",
            request.snapshot,
            request.direction,
            request.start_tick,
            valid_to,
            capacity,
            snapshot_version
        );

        Ok(ScanResult {
            ticks,
            valid_to,
            snapshot_version,
        })
    }

    /// Scan `ticks_per_side` records on each side of `current_tick`.
    ///
    /// The lower side includes `current_tick` itself; the upper side starts
    /// strictly above it.
    pub async fn scan_window(
        &self,
        snapshot: SnapshotRef,
        current_tick: Tick,
        spacing: TickSpacing,
        ticks_per_side: u16,
    ) -> TickscanResult<TickWindow> {
        let below = self
            .scan(&ScanRequest::new(
                snapshot,
                ScanDirection::ForwardInclusive,
                current_tick,
                ticks_per_side,
                spacing,
            ))
            .await?;
        let above = self
            .scan(&ScanRequest::new(
                snapshot,
                ScanDirection::ForwardExclusive,
                current_tick,
                ticks_per_side,
                spacing,
            ))
            .await?;

        if below.snapshot_version != above.snapshot_version {
            return Err(TickscanError::StateVersionMismatch {
                expected: below.snapshot_version,
                got: above.snapshot_version,
            });
        }

        Ok(TickWindow {
            current_tick,
            below,
            above,
        })
    }
}
