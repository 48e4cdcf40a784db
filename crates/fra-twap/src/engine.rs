//! Stateful per-slice execution, spec §4.7 steps 6-7.

use crate::schedule::TwapSchedule;
use fra_adapters::error::CoreResult;
use fra_adapters::venue::VenueAdapter;
use fra_schemas::order::{OrderRequest, OrderSide, OrderStatus, TimeInForce};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Executing,
    Completed,
    Failed,
    Paused,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct SliceResult {
    pub fill_ratio: f64,
    pub long_filled: f64,
    pub short_filled: f64,
}

/// One active TWAP run: id, status, slices executed, and the running
/// weighted-average fill-price/slippage state spec §4.7 step 6 calls for.
#[derive(Debug, Clone)]
pub struct TwapExecution {
    pub id: Uuid,
    pub symbol: String,
    pub long_venue: String,
    pub short_venue: String,
    pub schedule: TwapSchedule,
    pub status: ExecutionStatus,
    pub slices_executed: u32,
    pub error_count: u32,
    long_filled_qty: f64,
    long_weighted_price_sum: f64,
    short_filled_qty: f64,
    short_weighted_price_sum: f64,
    slippage_bps_sum: f64,
}

impl TwapExecution {
    fn new(symbol: String, long_venue: String, short_venue: String, schedule: TwapSchedule) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            long_venue,
            short_venue,
            schedule,
            status: ExecutionStatus::Executing,
            slices_executed: 0,
            error_count: 0,
            long_filled_qty: 0.0,
            long_weighted_price_sum: 0.0,
            short_filled_qty: 0.0,
            short_weighted_price_sum: 0.0,
            slippage_bps_sum: 0.0,
        }
    }

    pub fn long_avg_fill_price(&self) -> Option<f64> {
        if self.long_filled_qty <= 0.0 {
            None
        } else {
            Some(self.long_weighted_price_sum / self.long_filled_qty)
        }
    }

    pub fn short_avg_fill_price(&self) -> Option<f64> {
        if self.short_filled_qty <= 0.0 {
            None
        } else {
            Some(self.short_weighted_price_sum / self.short_filled_qty)
        }
    }

    pub fn running_slippage_bps(&self) -> f64 {
        if self.slices_executed == 0 {
            0.0
        } else {
            self.slippage_bps_sum / self.slices_executed as f64
        }
    }

    fn is_complete(&self) -> bool {
        self.slices_executed >= self.schedule.slice_count
    }
}

/// Table of active TWAP executions, keyed by id (spec §4.7 step 7:
/// "indexed by an id and may be paused, aborted, or inspected
/// externally").
#[derive(Default)]
pub struct TwapEngine {
    executions: Mutex<HashMap<Uuid, TwapExecution>>,
}

impl TwapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, symbol: impl Into<String>, long_venue: impl Into<String>, short_venue: impl Into<String>, schedule: TwapSchedule) -> Uuid {
        let execution = TwapExecution::new(symbol.into(), long_venue.into(), short_venue.into(), schedule);
        let id = execution.id;
        self.executions.lock().unwrap().insert(id, execution);
        id
    }

    pub fn inspect(&self, id: Uuid) -> Option<TwapExecution> {
        self.executions.lock().unwrap().get(&id).cloned()
    }

    /// External command: EXECUTING -> PAUSED. No-op if not executing.
    pub fn pause(&self, id: Uuid) -> bool {
        self.transition(id, ExecutionStatus::Executing, ExecutionStatus::Paused)
    }

    /// External command: PAUSED -> EXECUTING.
    pub fn resume(&self, id: Uuid) -> bool {
        self.transition(id, ExecutionStatus::Paused, ExecutionStatus::Executing)
    }

    /// External command: ABORTED stops all further slices, from any
    /// non-terminal state.
    pub fn abort(&self, id: Uuid) -> bool {
        let mut executions = self.executions.lock().unwrap();
        match executions.get_mut(&id) {
            Some(e) if !matches!(e.status, ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Aborted) => {
                e.status = ExecutionStatus::Aborted;
                true
            }
            _ => false,
        }
    }

    fn transition(&self, id: Uuid, from: ExecutionStatus, to: ExecutionStatus) -> bool {
        let mut executions = self.executions.lock().unwrap();
        match executions.get_mut(&id) {
            Some(e) if e.status == from => {
                e.status = to;
                true
            }
            _ => false,
        }
    }

    /// Runs one scheduled slice: both legs as LIMIT GTC at the given
    /// marks, issued concurrently. Updates running averages and the
    /// status transitions of spec §4.7 step 6. Returns `Ok(None)` if the
    /// execution isn't in `EXECUTING` state (paused/aborted/unknown).
    pub async fn run_slice(
        &self,
        id: Uuid,
        long_adapter: &dyn VenueAdapter,
        short_adapter: &dyn VenueAdapter,
        long_mark: f64,
        short_mark: f64,
    ) -> CoreResult<Option<SliceResult>> {
        let (symbol, slice_size_usd) = {
            let executions = self.executions.lock().unwrap();
            match executions.get(&id) {
                Some(e) if e.status == ExecutionStatus::Executing => (e.symbol.clone(), e.schedule.slice_size_usd),
                _ => return Ok(None),
            }
        };

        let long_size = slice_size_usd / long_mark;
        let short_size = slice_size_usd / short_mark;

        let long_order = OrderRequest::limit(&symbol, OrderSide::Buy, long_size, long_mark, TimeInForce::Gtc, false)
            .map_err(|detail| fra_adapters::error::CoreError::VenueError { venue: symbol.as_str().into(), detail })?;
        let short_order = OrderRequest::limit(&symbol, OrderSide::Sell, short_size, short_mark, TimeInForce::Gtc, false)
            .map_err(|detail| fra_adapters::error::CoreError::VenueError { venue: symbol.as_str().into(), detail })?;

        let placement = tokio::try_join!(long_adapter.place_order(long_order), short_adapter.place_order(short_order));

        let mut executions = self.executions.lock().unwrap();
        let Some(execution) = executions.get_mut(&id) else {
            return Ok(None);
        };

        let (long_resp, short_resp) = match placement {
            Ok(pair) => pair,
            Err(e) => {
                execution.error_count += 1;
                if execution.error_count > execution.schedule.slice_count / 2 {
                    execution.status = ExecutionStatus::Failed;
                }
                return Err(e);
            }
        };

        let long_filled = long_resp.filled_size;
        let short_filled = short_resp.filled_size;
        let fill_ratio = if long_filled.max(short_filled) <= 0.0 {
            0.0
        } else {
            long_filled.min(short_filled) / long_filled.max(short_filled)
        };
        if fill_ratio < 0.9 {
            tracing::warn!(slice = execution.slices_executed + 1, fill_ratio, "TWAP slice fill ratio below 0.9");
        }

        if let Some(price) = long_resp.average_fill_price {
            execution.long_weighted_price_sum += price * long_filled;
            execution.long_filled_qty += long_filled;
        }
        if let Some(price) = short_resp.average_fill_price {
            execution.short_weighted_price_sum += price * short_filled;
            execution.short_filled_qty += short_filled;
        }

        if long_resp.status == OrderStatus::Rejected || short_resp.status == OrderStatus::Rejected {
            execution.error_count += 1;
        }

        let realized_spread_bps = if long_resp.average_fill_price.is_some() && short_resp.average_fill_price.is_some() {
            let mid = (long_mark + short_mark) / 2.0;
            ((long_resp.average_fill_price.unwrap() - short_resp.average_fill_price.unwrap()).abs() / mid) * 10_000.0
        } else {
            0.0
        };
        execution.slippage_bps_sum += realized_spread_bps;
        execution.slices_executed += 1;

        if execution.error_count > execution.schedule.slice_count / 2 {
            execution.status = ExecutionStatus::Failed;
        } else if execution.is_complete() {
            execution.status = ExecutionStatus::Completed;
        }

        Ok(Some(SliceResult { fill_ratio, long_filled, short_filled }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{build_schedule, SlippageConfidence};
    use fra_adapters::mock::MockVenueAdapter;
    use fra_schemas::order::OrderResponse;

    fn schedule() -> TwapSchedule {
        TwapSchedule {
            slice_count: 3,
            slice_size_usd: 10_000.0,
            interval_minutes: 10,
            total_duration_minutes: 20,
            per_slice_slippage_bps: 5.0,
            total_slippage_bps: 10.0,
            confidence: SlippageConfidence::High,
        }
    }

    fn filled(size: f64, price: f64) -> OrderResponse {
        OrderResponse { order_id: Some("o".into()), status: OrderStatus::Filled, requested_size: size, filled_size: size, average_fill_price: Some(price), error: None }
    }

    #[test]
    fn start_registers_an_executing_run() {
        let engine = TwapEngine::new();
        let id = engine.start("BTC", "A", "B", schedule());
        let execution = engine.inspect(id).unwrap();
        assert_eq!(execution.status, ExecutionStatus::Executing);
        assert_eq!(execution.slices_executed, 0);
    }

    #[test]
    fn pause_then_resume_round_trips() {
        let engine = TwapEngine::new();
        let id = engine.start("BTC", "A", "B", schedule());
        assert!(engine.pause(id));
        assert_eq!(engine.inspect(id).unwrap().status, ExecutionStatus::Paused);
        assert!(engine.resume(id));
        assert_eq!(engine.inspect(id).unwrap().status, ExecutionStatus::Executing);
    }

    #[test]
    fn abort_is_terminal() {
        let engine = TwapEngine::new();
        let id = engine.start("BTC", "A", "B", schedule());
        assert!(engine.abort(id));
        assert_eq!(engine.inspect(id).unwrap().status, ExecutionStatus::Aborted);
        assert!(!engine.pause(id));
    }

    #[tokio::test]
    async fn paused_execution_skips_the_slice() {
        let engine = TwapEngine::new();
        let id = engine.start("BTC", "A", "B", schedule());
        engine.pause(id);
        let long = MockVenueAdapter::new("A");
        let short = MockVenueAdapter::new("B");
        let result = engine.run_slice(id, &long, &short, 50_000.0, 50_000.0).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn completing_all_slices_transitions_to_completed() {
        let engine = TwapEngine::new();
        let mut small_schedule = schedule();
        small_schedule.slice_count = 1;
        let id = engine.start("BTC", "A", "B", small_schedule);
        let long = MockVenueAdapter::new("A");
        long.push_order_response(filled(1.0, 50_000.0));
        let short = MockVenueAdapter::new("B");
        short.push_order_response(filled(1.0, 50_000.0));

        let result = engine.run_slice(id, &long, &short, 50_000.0, 50_000.0).await.unwrap();
        assert!(result.is_some());
        let execution = engine.inspect(id).unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.slices_executed, 1);
        assert_eq!(execution.long_avg_fill_price(), Some(50_000.0));
    }

    #[tokio::test]
    async fn low_fill_ratio_logs_a_warning_but_still_records_the_slice() {
        let engine = TwapEngine::new();
        let id = engine.start("BTC", "A", "B", schedule());
        let long = MockVenueAdapter::new("A");
        long.push_order_response(filled(1.0, 50_000.0));
        let short = MockVenueAdapter::new("B");
        short.push_order_response(OrderResponse { order_id: Some("o".into()), status: OrderStatus::PartiallyFilled, requested_size: 1.0, filled_size: 0.5, average_fill_price: Some(50_000.0), error: None });

        let result = engine.run_slice(id, &long, &short, 50_000.0, 50_000.0).await.unwrap().unwrap();
        assert!((result.fill_ratio - 0.5).abs() < 1e-9);
    }
}
