//! Per-position closing algorithm, spec §4.5.2, and the fresh-size guard
//! of §4.5.5.

use crate::locks::PositionLocks;
use fra_adapters::error::CoreResult;
use fra_adapters::venue::VenueAdapter;
use fra_config::StrategyConfig;
use fra_schemas::order::{OrderRequest, TimeInForce};
use fra_schemas::position::Position;
use std::time::Duration;

/// Progressive price worsening applied to successive close attempts
/// (spec §4.5.2 step 4), as a fraction of mark price.
const PRICE_WORSENING: [f64; 6] = [0.0, 0.001, 0.005, 0.01, 0.02, 0.05];
/// The step-5 fallback worsens past the last scripted attempt.
const FALLBACK_WORSENING: f64 = 0.08;

#[derive(Debug, Default)]
pub struct CloseBatchResult {
    pub closed: Vec<Position>,
    pub still_open: Vec<(Position, String)>,
}

/// Close every position in `positions`, honoring the idempotency locks
/// and sleeping 200ms between positions to respect venue rate limits.
/// `adapter_for` resolves a venue name to its adapter; a position whose
/// venue has none is reported as still-open.
pub async fn close_positions(
    adapter_for: &dyn Fn(&str) -> Option<&dyn VenueAdapter>,
    positions: &[Position],
    locks: &PositionLocks,
    config: &StrategyConfig,
) -> CloseBatchResult {
    let mut result = CloseBatchResult::default();

    for position in positions {
        let key = position.key();
        if locks.is_closing_in_flight(&key) || locks.is_recently_closed(&key) {
            continue;
        }
        if !locks.try_acquire_close_lock(&key) {
            continue;
        }

        let Some(adapter) = adapter_for(&position.venue) else {
            locks.release_lock(&key);
            result.still_open.push((position.clone(), format!("no adapter registered for venue {}", position.venue)));
            continue;
        };

        match close_one(adapter, position, config).await {
            Ok(true) => {
                locks.mark_closed(&key);
                result.closed.push(position.clone());
            }
            Ok(false) => {
                locks.release_lock(&key);
                result.still_open.push((position.clone(), "all close attempts failed".to_string()));
            }
            Err(e) => {
                locks.release_lock(&key);
                result.still_open.push((position.clone(), e.to_string()));
            }
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    result
}

/// Spec §4.5.5: before every close order, re-fetch positions and use the
/// current size, not the stale one passed in. Returns `None` if the
/// position is gone or flat.
async fn fresh_size(adapter: &dyn VenueAdapter, symbol: &str) -> CoreResult<Option<f64>> {
    match adapter.get_position(symbol).await? {
        Some(p) if p.size.abs() >= fra_schemas::SIZE_EPSILON => Ok(Some(p.size)),
        _ => Ok(None),
    }
}

/// Returns `Ok(true)` on success, `Ok(false)` if every attempt including
/// the fallback failed to clear the position.
async fn close_one(adapter: &dyn VenueAdapter, position: &Position, config: &StrategyConfig) -> CoreResult<bool> {
    let side = position.side.closing_order_side();

    for worsening in PRICE_WORSENING {
        let Some(current_size) = fresh_size(adapter, &position.symbol).await? else {
            return Ok(true);
        };

        let mark = adapter.get_mark_price(&position.symbol).await.unwrap_or(position.entry_price);
        let price = worsen_price(mark, side, worsening);
        let tif = if worsening == 0.0 { TimeInForce::Gtc } else { TimeInForce::Ioc };
        let order = OrderRequest::limit(&position.symbol, side, current_size.abs(), price, tif, true)
            .map_err(|detail| fra_adapters::error::CoreError::VenueError { venue: position.venue.as_str().into(), detail })?;

        let resp = adapter.place_order(order).await?;
        if resp.status != fra_schemas::order::OrderStatus::Filled {
            let _ = fra_executor::wait_for_fill(
                adapter,
                resp.order_id.as_deref(),
                &position.symbol,
                current_size.abs(),
                config.max_order_wait_retries,
                config.order_wait_base_interval_ms,
                true,
            )
            .await;
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        if fresh_size(adapter, &position.symbol).await?.is_none() {
            return Ok(true);
        }
    }

    // Step 5 fallback: one more, more aggressive attempt.
    if let Some(current_size) = fresh_size(adapter, &position.symbol).await? {
        let mark = adapter.get_mark_price(&position.symbol).await.unwrap_or(position.entry_price);
        let price = worsen_price(mark, side, FALLBACK_WORSENING);
        let order = OrderRequest::limit(&position.symbol, side, current_size.abs(), price, TimeInForce::Ioc, true)
            .map_err(|detail| fra_adapters::error::CoreError::VenueError { venue: position.venue.as_str().into(), detail })?;
        let resp = adapter.place_order(order).await?;
        if resp.status != fra_schemas::order::OrderStatus::Filled {
            let _ = fra_executor::wait_for_fill(
                adapter,
                resp.order_id.as_deref(),
                &position.symbol,
                current_size.abs(),
                config.max_order_wait_retries,
                config.order_wait_base_interval_ms,
                true,
            )
            .await;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    Ok(fresh_size(adapter, &position.symbol).await?.is_none())
}

/// Worsen `mark` in the direction that makes a resting order of `side`
/// more aggressive/likely to fill: sells worsen downward, buys upward.
fn worsen_price(mark: f64, side: fra_schemas::order::OrderSide, worsening: f64) -> f64 {
    match side {
        fra_schemas::order::OrderSide::Sell => mark * (1.0 - worsening),
        fra_schemas::order::OrderSide::Buy => mark * (1.0 + worsening),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fra_adapters::mock::MockVenueAdapter;
    use fra_schemas::position::PositionSide;

    fn position() -> Position {
        Position {
            venue: "A".into(),
            symbol: "BTC".into(),
            side: PositionSide::Long,
            size: 1.0,
            entry_price: 50_000.0,
            mark_price: 50_000.0,
            leverage: 2.0,
            margin_used: 25_000.0,
        }
    }

    #[tokio::test]
    async fn already_flat_position_closes_immediately() {
        let adapter = MockVenueAdapter::new("A").with_mark_price("BTC", 50_000.0);
        // No position registered -> get_position returns None -> flat.
        let locks = PositionLocks::default();
        let config = StrategyConfig::default();
        let positions = vec![position()];
        let result = close_positions(&|_| Some(&adapter as &dyn VenueAdapter), &positions, &locks, &config).await;
        assert_eq!(result.closed.len(), 1);
        assert!(result.still_open.is_empty());
    }

    #[tokio::test]
    async fn locked_key_is_skipped() {
        let adapter = MockVenueAdapter::new("A").with_mark_price("BTC", 50_000.0);
        let locks = PositionLocks::default();
        let config = StrategyConfig::default();
        let p = position();
        locks.try_acquire_close_lock(&p.key());
        let positions = vec![p];
        let result = close_positions(&|_| Some(&adapter as &dyn VenueAdapter), &positions, &locks, &config).await;
        assert!(result.closed.is_empty());
        assert!(result.still_open.is_empty());
    }

    #[tokio::test]
    async fn missing_adapter_reports_still_open() {
        let locks = PositionLocks::default();
        let config = StrategyConfig::default();
        let positions = vec![position()];
        let result = close_positions(&|_| None, &positions, &locks, &config).await;
        assert_eq!(result.still_open.len(), 1);
    }

    #[tokio::test]
    async fn fresh_size_treats_unregistered_position_as_closed() {
        let adapter = MockVenueAdapter::new("A").with_mark_price("BTC", 50_000.0);
        let result = fresh_size(&adapter, "BTC").await.unwrap();
        assert!(result.is_none());
    }
}
