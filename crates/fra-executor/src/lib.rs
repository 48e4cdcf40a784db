//! fra-executor: `OrderExecutor`, paired placement and fill-waiting, spec
//! §4.4.

use chrono::Utc;
use fra_adapters::error::CoreResult;
use fra_adapters::venue::VenueAdapter;
use fra_schemas::fill::AsymmetricFill;
use fra_schemas::order::{OrderResponse, OrderSide, OrderStatus};
use fra_schemas::plan::ExecutionPlan;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of placing both legs of a plan.
pub enum PlacementOutcome {
    BothFilled { long: OrderResponse, short: OrderResponse },
    /// Exactly one side filled within the configured window; the other
    /// is still resting. Hand this to `fra-position`'s asymmetric-fill
    /// resolution (spec §4.5.3).
    Asymmetric(Box<AsymmetricFill>),
    /// Neither side filled within the window; both orders are still
    /// resting and the caller should keep tracking them.
    NeitherFilled { long: OrderResponse, short: OrderResponse },
}

/// Place both legs of `plan` concurrently, then watch both for up to
/// `asymmetric_fill_timeout_ms` before classifying the outcome (spec
/// §4.4 `placePair`).
pub async fn place_pair(
    plan: &ExecutionPlan,
    long_adapter: &dyn VenueAdapter,
    short_adapter: &dyn VenueAdapter,
    asymmetric_fill_timeout_ms: u64,
    poll_interval_ms: u64,
) -> CoreResult<PlacementOutcome> {
    let (long_initial, short_initial) = tokio::try_join!(
        long_adapter.place_order(plan.long_order.clone()),
        short_adapter.place_order(plan.short_order.clone()),
    )?;

    let window = Duration::from_millis(asymmetric_fill_timeout_ms);
    let poll_interval = Duration::from_millis(poll_interval_ms.max(1));

    let (long_final, short_final) = tokio::join!(
        poll_within_window(long_adapter, long_initial.clone(), &plan.long_order.symbol, window, poll_interval),
        poll_within_window(short_adapter, short_initial.clone(), &plan.short_order.symbol, window, poll_interval),
    );

    let long_filled = long_final.status == OrderStatus::Filled;
    let short_filled = short_final.status == OrderStatus::Filled;

    match (long_filled, short_filled) {
        (true, true) => Ok(PlacementOutcome::BothFilled { long: long_final, short: short_final }),
        (false, false) => Ok(PlacementOutcome::NeitherFilled { long: long_final, short: short_final }),
        (long_filled, short_filled) => {
            let af = AsymmetricFill::new(
                plan.long_order.symbol.clone(),
                long_final.order_id.clone(),
                short_final.order_id.clone(),
                long_filled,
                short_filled,
                plan.opportunity.long_venue.clone(),
                plan.opportunity.short_venue.clone(),
                plan.base_asset_size,
                plan.opportunity.clone(),
                Utc::now(),
            )
            .expect("exactly one side filled by construction");
            Ok(PlacementOutcome::Asymmetric(Box::new(af)))
        }
    }
}

/// Poll an order's status until terminal or `window` elapses, returning
/// whatever was last observed (the initial placement response if the
/// order never terminates and no status call ever succeeds).
async fn poll_within_window(
    adapter: &dyn VenueAdapter,
    initial: OrderResponse,
    symbol: &str,
    window: Duration,
    poll_interval: Duration,
) -> OrderResponse {
    if initial.status.is_terminal() {
        return initial;
    }
    let Some(order_id) = initial.order_id.clone() else {
        return initial;
    };
    let deadline = Instant::now() + window;
    let mut last = initial;
    loop {
        if let Ok(resp) = adapter.get_order_status(&order_id, Some(symbol)).await {
            last = resp;
            if last.status.is_terminal() {
                return last;
            }
        }
        let now = Instant::now();
        if now >= deadline {
            return last;
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

/// Spec §4.4 `waitForFill`: exponential backoff poll, capped at 30s per
/// interval for normal orders; closing orders (`is_closing`) use the
/// extended backoff that skips that cap, since a close attempt would
/// rather wait longer than give up and place another order on top of a
/// still-resting one. Never errors on exhaustion — the caller inspects
/// the returned [`OrderResponse`].
pub async fn wait_for_fill(
    adapter: &dyn VenueAdapter,
    order_id: Option<&str>,
    symbol: &str,
    expected_size: f64,
    max_retries: u32,
    base_interval_ms: u64,
    is_closing: bool,
) -> OrderResponse {
    let Some(order_id) = order_id else {
        return OrderResponse {
            order_id: None,
            status: OrderStatus::Rejected,
            requested_size: expected_size,
            filled_size: 0.0,
            average_fill_price: None,
            error: Some("no order id to poll".into()),
        };
    };

    let mut last: Option<OrderResponse> = None;
    for retry in 0..=max_retries {
        if let Ok(resp) = adapter.get_order_status(order_id, Some(symbol)).await {
            let terminal = resp.status.is_terminal();
            last = Some(resp);
            if terminal {
                return last.unwrap();
            }
        }
        if retry == max_retries {
            break;
        }
        let exponent = retry.min(6);
        let raw_interval_ms = base_interval_ms.saturating_mul(1u64 << exponent);
        let interval_ms = if is_closing { raw_interval_ms } else { raw_interval_ms.min(30_000) };
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }

    last.unwrap_or(OrderResponse {
        order_id: Some(order_id.to_string()),
        status: OrderStatus::Submitted,
        requested_size: expected_size,
        filled_size: 0.0,
        average_fill_price: None,
        error: Some("retries exhausted without a terminal status".into()),
    })
}
