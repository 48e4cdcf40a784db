//! Asymmetric-fill resolution, spec §4.5.3.

use crate::closing::close_positions;
use crate::locks::PositionLocks;
use fra_adapters::error::CoreResult;
use fra_adapters::venue::VenueAdapter;
use fra_config::StrategyConfig;
use fra_schemas::fill::AsymmetricFill;
use fra_schemas::order::{OrderRequest, OrderSide, TimeInForce};
use fra_schemas::position::{Position, PositionSide};
use fra_schemas::PERIODS_PER_YEAR_HOURLY;

/// Conservative slippage applied to the market/taker leg in the
/// profitability recheck (spec §4.5.3 step 2) — distinct from, and not
/// derived from, `fra_costing::slippage`'s book-aware estimate.
const MARKET_LEG_SLIPPAGE_PCT: f64 = 5e-4;

/// Progressive price-improvement offsets for completing the unfilled
/// leg (spec §4.5.3 step 3).
const COMPLETION_OFFSETS: [f64; 3] = [0.001, 0.002, 0.005];

pub struct FeeRates {
    pub long_maker: f64,
    pub long_taker: f64,
    pub short_maker: f64,
    pub short_taker: f64,
}

pub enum ResolutionOutcome {
    /// The unfilled leg was completed; the pair is now whole.
    Completed { unfilled_order_id: Option<String> },
    /// No longer profitable, or completion failed: the filled leg was
    /// unwound instead.
    Unwound { closed: bool, detail: Option<String> },
}

/// Spec §4.5.3 step 1-2: `profitabilityWithTakerFees` — the filled side
/// already paid its maker entry fee; the unfilled side would now need a
/// taker entry fee to complete. Both exits are assumed maker.
pub fn profitability_with_taker_fees(
    af: &AsymmetricFill,
    long_mark: f64,
    short_mark: f64,
    fees: &FeeRates,
) -> f64 {
    let notional = af.position_size * ((long_mark + short_mark) / 2.0);
    let (filled_entry_rate, unfilled_entry_rate) = if af.long_filled() {
        (fees.long_maker, fees.short_taker)
    } else {
        (fees.short_maker, fees.long_taker)
    };
    let entry_fees = fra_costing::fees(notional, filled_entry_rate) + fra_costing::fees(notional, unfilled_entry_rate);
    let exit_fees = fra_costing::fees(notional, fees.long_maker) + fra_costing::fees(notional, fees.short_maker);
    let slippage = 2.0 * notional * MARKET_LEG_SLIPPAGE_PCT;
    let total_costs = entry_fees + exit_fees + slippage;

    let hourly_return = (af.opportunity.expected_apy() / PERIODS_PER_YEAR_HOURLY) * notional;
    if hourly_return <= 0.0 {
        return hourly_return - total_costs;
    }
    let break_even_hours = total_costs / hourly_return;
    let amortization_window = 24.0f64.min(break_even_hours.ceil().max(1.0));
    let amortized = total_costs / amortization_window;
    hourly_return - amortized
}

/// Whether `af` is due for resolution: `immediate` bypasses the
/// configured timeout entirely (spec §4.5.3 "or immediately if
/// requested").
pub fn is_due(af: &AsymmetricFill, now: chrono::DateTime<chrono::Utc>, timeout_ms: u64, immediate: bool) -> bool {
    immediate || af.age(now).num_milliseconds() as u64 >= timeout_ms
}

fn unfilled_side(af: &AsymmetricFill) -> OrderSide {
    if af.long_filled() {
        OrderSide::Sell
    } else {
        OrderSide::Buy
    }
}

/// Resolve one asymmetric fill: complete the pair if still profitable,
/// otherwise unwind the filled leg.
pub async fn resolve(
    af: &AsymmetricFill,
    unfilled_adapter: &dyn VenueAdapter,
    filled_adapter: &dyn VenueAdapter,
    long_mark: f64,
    short_mark: f64,
    fees: &FeeRates,
    config: &StrategyConfig,
    locks: &PositionLocks,
) -> CoreResult<ResolutionOutcome> {
    let net_per_period = profitability_with_taker_fees(af, long_mark, short_mark, fees);
    let (_, unfilled_order_id) = af.unfilled_leg();
    let side = unfilled_side(af);
    let mark = if af.long_filled() { short_mark } else { long_mark };

    if net_per_period > 0.0 {
        if let Some(order_id) = complete_unfilled_leg(unfilled_adapter, af, unfilled_order_id, side, mark, config).await? {
            return Ok(ResolutionOutcome::Completed { unfilled_order_id: Some(order_id) });
        }
    }

    if let Some(order_id) = unfilled_order_id {
        let _ = unfilled_adapter.cancel_order(order_id, Some(&af.symbol)).await;
    }

    let (filled_venue, _) = af.filled_leg();
    let filled_side = if af.long_filled() { PositionSide::Long } else { PositionSide::Short };
    let filled_mark = if af.long_filled() { long_mark } else { short_mark };
    let synthetic_position = Position {
        venue: filled_venue.to_string(),
        symbol: af.symbol.clone(),
        side: filled_side,
        size: af.position_size,
        entry_price: filled_mark,
        mark_price: filled_mark,
        leverage: config.leverage,
        margin_used: 0.0,
    };

    let batch = close_positions(&|v| if v == filled_venue { Some(filled_adapter) } else { None }, &[synthetic_position], locks, config).await;
    if !batch.closed.is_empty() {
        Ok(ResolutionOutcome::Unwound { closed: true, detail: None })
    } else {
        let detail = batch.still_open.into_iter().next().map(|(_, detail)| detail);
        Ok(ResolutionOutcome::Unwound { closed: false, detail })
    }
}

/// Attempts the progressive-improvement IOC ladder, then a maker
/// fallback. Returns `Some(order_id)` on a fill.
async fn complete_unfilled_leg(
    adapter: &dyn VenueAdapter,
    af: &AsymmetricFill,
    prior_order_id: Option<&str>,
    side: OrderSide,
    mark: f64,
    config: &StrategyConfig,
) -> CoreResult<Option<String>> {
    let mut prior_order_id = prior_order_id.map(|s| s.to_string());

    for offset in COMPLETION_OFFSETS {
        if let Some(id) = &prior_order_id {
            let _ = adapter.cancel_order(id, Some(&af.symbol)).await;
        }
        let price = match side {
            // Worsens the price from the taker's own perspective, favoring
            // an immediate fill over a good price.
            OrderSide::Buy => mark * (1.0 + offset),
            OrderSide::Sell => mark * (1.0 - offset),
        };
        let order = OrderRequest::limit(&af.symbol, side, af.position_size, price, TimeInForce::Ioc, false)
            .map_err(|detail| fra_adapters::error::CoreError::VenueError { venue: af.symbol.as_str().into(), detail })?;
        let resp = adapter.place_order(order).await?;
        if resp.status == fra_schemas::order::OrderStatus::Filled {
            return Ok(resp.order_id);
        }
        prior_order_id = resp.order_id;
    }

    if let Some(id) = &prior_order_id {
        let _ = adapter.cancel_order(id, Some(&af.symbol)).await;
    }
    let maker_order = OrderRequest::limit(&af.symbol, side, af.position_size, mark, TimeInForce::Gtc, false)
        .map_err(|detail| fra_adapters::error::CoreError::VenueError { venue: af.symbol.as_str().into(), detail })?;
    let resp = adapter.place_order(maker_order).await?;
    if resp.status == fra_schemas::order::OrderStatus::Filled {
        return Ok(resp.order_id);
    }
    let final_resp = fra_executor::wait_for_fill(
        adapter,
        resp.order_id.as_deref(),
        &af.symbol,
        af.position_size,
        config.max_order_wait_retries,
        config.order_wait_base_interval_ms,
        false,
    )
    .await;
    if final_resp.status == fra_schemas::order::OrderStatus::Filled {
        Ok(final_resp.order_id)
    } else {
        Ok(None)
    }
}
