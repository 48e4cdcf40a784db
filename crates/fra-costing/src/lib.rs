//! fra-costing: `CostCalculator`, spec §4.1.
//!
//! Pure functions — no I/O, no config lookup. Callers resolve the
//! appropriate maker/taker fee rate from [`fra_config::StrategyConfig`]
//! before calling [`fees`]; this crate only does the arithmetic.

use fra_schemas::order::OrderType;

/// `fees(notionalUsd, venue, isMaker, isEntry) -> usd` (spec §4.1).
///
/// The formula is simply `notional * fee_rate` — `venue`/`isMaker`/
/// `isEntry` in the source signature only select *which* rate the caller
/// passes in; they carry no independent arithmetic weight, so this pure
/// function takes the resolved `fee_rate` directly.
pub fn fees(notional_usd: f64, fee_rate: f64) -> f64 {
    notional_usd.max(0.0) * fee_rate
}

/// `slippage(notionalUsd, bestBid, bestAsk, openInterestUsd, orderType) -> usd`
/// (spec §4.1).
pub fn slippage(
    notional_usd: f64,
    best_bid: f64,
    best_ask: f64,
    open_interest_usd: Option<f64>,
    order_type: OrderType,
) -> f64 {
    let mid = (best_bid + best_ask) / 2.0;
    let spread_pct = if mid > 0.0 {
        (best_ask - best_bid) / mid
    } else {
        0.001
    };

    let base = match order_type {
        OrderType::Market => spread_pct / 2.0,
        OrderType::Limit => 1e-4,
    };

    let impact = match open_interest_usd {
        Some(oi) if oi > 0.0 => {
            let ratio = (notional_usd / oi).min(1.0).max(0.0);
            (ratio.sqrt() * spread_pct * 2.0).min(0.02)
        }
        _ => match order_type {
            OrderType::Market => 5e-4,
            OrderType::Limit => 1e-4,
        },
    };

    notional_usd.max(0.0) * (base + impact)
}

/// `fundingRateImpact(notionalUsd, openInterestUsd, currentRate) -> rateShift`
/// (spec §4.1). OI-weighted premium-index shift, capped to bound
/// over-correction.
pub fn funding_rate_impact(notional_usd: f64, open_interest_usd: f64, current_rate: f64) -> f64 {
    if open_interest_usd <= 0.0 || !current_rate.is_finite() {
        return 0.0;
    }
    let ratio = (notional_usd / open_interest_usd).max(0.0);
    let impact = (ratio.sqrt() * 0.1).min(0.1);
    current_rate * impact
}
