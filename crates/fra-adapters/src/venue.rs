use crate::error::CoreResult;
use async_trait::async_trait;
use fra_schemas::order::{OrderRequest, OrderResponse};
use fra_schemas::position::Position;

/// Best bid/ask, as returned by an adapter that exposes a book (spec §6.1
/// `getBestBidAsk`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestBidAsk {
    pub best_bid: f64,
    pub best_ask: f64,
}

impl BestBidAsk {
    pub fn mid(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }

    /// Synthesize a book from a mark price when the adapter doesn't expose
    /// one, per spec §4.3 step 6: mark ± 0.05% spread.
    pub fn synthesize_from_mark(mark: f64) -> Self {
        Self {
            best_bid: mark * (1.0 - 0.0005),
            best_ask: mark * (1.0 + 0.0005),
        }
    }
}

/// Per-venue wire adapter contract (spec §6.1). Out of scope to implement
/// for a real venue — this crate defines the boundary the core depends on.
///
/// All methods are suspension points (spec §5): every call may yield to the
/// network. Implementations must be `Send + Sync` so a single adapter
/// instance can be shared across concurrently-dispatched legs.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    fn venue_name(&self) -> &str;

    /// Available collateral, synchronous semantics from the caller's view
    /// (spec §6.1) — i.e. reflects the venue's most recent account snapshot.
    async fn get_balance(&self) -> CoreResult<f64>;

    async fn get_positions(&self) -> CoreResult<Vec<Position>>;

    async fn get_position(&self, symbol: &str) -> CoreResult<Option<Position>>;

    async fn place_order(&self, req: OrderRequest) -> CoreResult<OrderResponse>;

    async fn cancel_order(&self, order_id: &str, symbol: Option<&str>) -> CoreResult<bool>;

    async fn cancel_all_orders(&self, symbol: &str) -> CoreResult<u32>;

    async fn get_order_status(
        &self,
        order_id: &str,
        symbol: Option<&str>,
    ) -> CoreResult<OrderResponse>;

    async fn get_mark_price(&self, symbol: &str) -> CoreResult<f64>;

    /// Optional — adapters that don't expose a book return `Ok(None)` and
    /// the caller synthesizes one via [`BestBidAsk::synthesize_from_mark`].
    async fn get_best_bid_ask(&self, _symbol: &str) -> CoreResult<Option<BestBidAsk>> {
        Ok(None)
    }

    async fn get_tick_size(&self, symbol: &str) -> CoreResult<f64>;

    async fn supports_symbol(&self, symbol: &str) -> CoreResult<bool>;

    async fn transfer_internal(&self, amount: f64, to_perp: bool) -> CoreResult<String>;

    async fn deposit_external(
        &self,
        _amount: f64,
        _asset: &str,
        _destination: Option<&str>,
    ) -> CoreResult<String> {
        Err(crate::error::CoreError::AdapterUnavailable {
            venue: self.venue_name().into(),
        })
    }

    async fn withdraw_external(
        &self,
        _amount: f64,
        _asset: &str,
        _destination: Option<&str>,
    ) -> CoreResult<String> {
        Err(crate::error::CoreError::AdapterUnavailable {
            venue: self.venue_name().into(),
        })
    }
}
