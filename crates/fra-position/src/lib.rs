//! Position lifecycle management, spec §4.5: idempotent closing,
//! single-leg detection, and asymmetric-fill resolution.

pub mod asymmetric;
pub mod closing;
pub mod grouping;
pub mod locks;

pub use asymmetric::{resolve as resolve_asymmetric_fill, FeeRates, ResolutionOutcome};
pub use closing::{close_positions, CloseBatchResult};
pub use grouping::single_leg_positions;
pub use locks::PositionLocks;

/// Bundles the idempotency state with the pieces of §4.5 that need it,
/// so callers needn't thread `PositionLocks` through every call site.
pub struct PositionManager {
    locks: PositionLocks,
}

impl Default for PositionManager {
    fn default() -> Self {
        Self { locks: PositionLocks::default() }
    }
}

impl PositionManager {
    pub fn new(locks: PositionLocks) -> Self {
        Self { locks }
    }

    pub fn locks(&self) -> &PositionLocks {
        &self.locks
    }

    /// Runs §4.5.4 detection then closes every single-leg position found.
    pub async fn close_single_legs(
        &self,
        adapter_for: &dyn Fn(&str) -> Option<&dyn fra_adapters::venue::VenueAdapter>,
        positions: &[fra_schemas::position::Position],
        config: &fra_config::StrategyConfig,
    ) -> CloseBatchResult {
        let orphans = single_leg_positions(positions);
        close_positions(adapter_for, &orphans, &self.locks, config).await
    }

    pub async fn close(
        &self,
        adapter_for: &dyn Fn(&str) -> Option<&dyn fra_adapters::venue::VenueAdapter>,
        positions: &[fra_schemas::position::Position],
        config: &fra_config::StrategyConfig,
    ) -> CloseBatchResult {
        close_positions(adapter_for, positions, &self.locks, config).await
    }

    pub async fn resolve_asymmetric_fill(
        &self,
        af: &fra_schemas::fill::AsymmetricFill,
        unfilled_adapter: &dyn fra_adapters::venue::VenueAdapter,
        filled_adapter: &dyn fra_adapters::venue::VenueAdapter,
        long_mark: f64,
        short_mark: f64,
        fees: &FeeRates,
        config: &fra_config::StrategyConfig,
    ) -> fra_adapters::error::CoreResult<ResolutionOutcome> {
        asymmetric::resolve(af, unfilled_adapter, filled_adapter, long_mark, short_mark, fees, config, &self.locks).await
    }
}
