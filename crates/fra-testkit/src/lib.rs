//! Shared scenario fixtures for integration tests across the workspace.
//!
//! Builds the S1-S8 concrete scenarios from spec §8 as ready-to-use
//! `(Opportunity, config, adapters, history)` tuples, so a single
//! fixture function backs both this crate's own `tests/scenarios.rs`
//! and any downstream crate that wants the same inputs.

use chrono::Utc;
use fra_adapters::mock::{MockHistoricalRateFeed, MockVenueAdapter};
use fra_config::StrategyConfig;
use fra_historical::HistoricalRateView;
use fra_schemas::opportunity::Opportunity;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const SYMBOL: &str = "X";
pub const VENUE_A: &str = "A";
pub const VENUE_B: &str = "B";

pub fn config() -> StrategyConfig {
    let mut fee_rates = BTreeMap::new();
    fee_rates.insert(VENUE_A.to_string(), 1.5e-4);
    fee_rates.insert(VENUE_B.to_string(), 5e-5);
    let mut taker_fee_rates = BTreeMap::new();
    taker_fee_rates.insert(VENUE_A.to_string(), 3e-4);
    taker_fee_rates.insert(VENUE_B.to_string(), 1e-4);
    StrategyConfig { fee_rates, taker_fee_rates, ..StrategyConfig::default() }
}

/// S1's opportunity: longRate(A) = -1e-4, shortRate(B) = +5e-4, spread = 6e-4.
pub fn opportunity() -> Opportunity {
    Opportunity {
        symbol: SYMBOL.into(),
        long_venue: VENUE_A.into(),
        short_venue: VENUE_B.into(),
        long_funding_rate: -1e-4,
        short_funding_rate: 5e-4,
        long_mark_price: 100.0,
        short_mark_price: 100.0,
        long_open_interest_usd: Some(1_000_000.0),
        short_open_interest_usd: Some(1_000_000.0),
        timestamp: Utc::now(),
    }
}

/// Adapters with S1's balances, marks, and top-of-book. Callers mutate
/// open interest / book via the builder methods for S2/S3 variants.
pub fn adapters() -> (MockVenueAdapter, MockVenueAdapter) {
    let long = MockVenueAdapter::new(VENUE_A).with_balance(1000.0).with_mark_price(SYMBOL, 100.0).with_best_bid_ask(SYMBOL, 99.99, 100.01);
    let short = MockVenueAdapter::new(VENUE_B).with_balance(1000.0).with_mark_price(SYMBOL, 100.0).with_best_bid_ask(SYMBOL, 99.99, 100.01);
    (long, short)
}

/// A history view whose average spread matches the opportunity's current
/// spread closely enough to avoid the "fell back to current" sentinel
/// (spec §4.2.3), i.e. genuinely matched history.
pub fn history() -> (Arc<MockHistoricalRateFeed>, HistoricalRateView<MockHistoricalRateFeed>) {
    let feed = Arc::new(MockHistoricalRateFeed::new());
    feed.set_average_spread(6.0e-4 + 1e-5);
    let view = HistoricalRateView::new(feed.clone());
    (feed, view)
}
