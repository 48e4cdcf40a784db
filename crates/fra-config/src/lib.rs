//! fra-config: the shape of the options the core consumes (spec §6.3).
//!
//! This crate owns the *type*, not the *loading mechanism* — reading these
//! values from YAML/env/a DI container is explicitly out of scope (spec
//! §1): "the dependency injection framework, configuration loading, ...
//! and the persistence layer" are external collaborators. An embedding
//! application constructs a [`StrategyConfig`] however it likes and hands
//! it to `fra-orchestrator`.

use std::collections::BTreeMap;

/// Spec §6.3 recognized options, with their documented defaults.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Multiplier applied to collateral when sizing notional.
    pub leverage: f64,
    /// Floor on gross spread to even consider an opportunity.
    pub min_spread: f64,
    /// Lower bound on notional; below, opportunity is skipped.
    pub min_position_usd: f64,
    /// Fraction of min-balance used per cycle.
    pub balance_usage_pct: f64,
    /// Per-venue liquidity gate.
    pub min_open_interest_usd: f64,
    /// Target for per-opportunity max-notional search.
    pub target_net_apy: f64,
    /// Target for portfolio allocation.
    pub target_aggregate_apy: f64,
    /// Sanity cap on aggregate allocation.
    pub max_portfolio_usd: f64,
    /// Age threshold (ms) to act on a half-filled pair.
    pub asymmetric_fill_timeout_ms: u64,
    /// `waitForFill` retry cap.
    pub max_order_wait_retries: u32,
    /// Starting poll interval (ms).
    pub order_wait_base_interval_ms: u64,
    /// Cap (days) on accepting the "worst-case" selection fallback.
    pub max_worst_case_break_even_days: f64,
    /// Per-venue maker fee rate (fraction of notional).
    pub fee_rates: BTreeMap<String, f64>,
    /// Per-venue taker fee rate (fraction of notional).
    pub taker_fee_rates: BTreeMap<String, f64>,
}

impl StrategyConfig {
    pub fn maker_fee_rate(&self, venue: &str) -> f64 {
        self.fee_rates.get(venue).copied().unwrap_or(0.0)
    }

    pub fn taker_fee_rate(&self, venue: &str) -> f64 {
        self.taker_fee_rates.get(venue).copied().unwrap_or(0.0)
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            leverage: 2.0,
            min_spread: 1e-4,
            min_position_usd: 10.0,
            balance_usage_pct: 0.9,
            min_open_interest_usd: 10_000.0,
            target_net_apy: 0.35,
            target_aggregate_apy: 0.35,
            max_portfolio_usd: 50_000_000.0,
            asymmetric_fill_timeout_ms: 60_000,
            max_order_wait_retries: 10,
            order_wait_base_interval_ms: 1_000,
            max_worst_case_break_even_days: 7.0,
            fee_rates: BTreeMap::new(),
            taker_fee_rates: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let c = StrategyConfig::default();
        assert_eq!(c.leverage, 2.0);
        assert_eq!(c.min_position_usd, 10.0);
        assert_eq!(c.max_portfolio_usd, 50_000_000.0);
        assert_eq!(c.asymmetric_fill_timeout_ms, 60_000);
    }

    #[test]
    fn missing_fee_rate_defaults_to_zero() {
        let c = StrategyConfig::default();
        assert_eq!(c.maker_fee_rate("unknown"), 0.0);
    }
}
