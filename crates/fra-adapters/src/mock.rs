//! In-memory test doubles for [`crate::VenueAdapter`] and
//! [`crate::HistoricalRateFeed`], gated behind the `testkit` feature.
//!
//! Mirrors the teacher's `mqk-testkit::paper_broker` pattern: a lock-guarded
//! in-memory book that other crates' scenario tests configure directly
//! rather than hitting a real venue.

use crate::error::{CoreError, CoreResult};
use crate::historical::{HistoricalPoint, HistoricalRateFeed, VenueFundingRate, VolatilityMetrics};
use crate::venue::{BestBidAsk, VenueAdapter};
use async_trait::async_trait;
use fra_schemas::opportunity::Opportunity;
use fra_schemas::order::{OrderRequest, OrderResponse, OrderStatus};
use fra_schemas::position::Position;
use std::sync::Mutex;

/// A scripted venue adapter: every call returns whatever the test fixture
/// pre-loaded, in FIFO order for orders, by-symbol lookup otherwise.
pub struct MockVenueAdapter {
    name: String,
    balance: Mutex<f64>,
    positions: Mutex<Vec<Position>>,
    mark_prices: Mutex<std::collections::HashMap<String, f64>>,
    best_bid_ask: Mutex<std::collections::HashMap<String, BestBidAsk>>,
    /// Responses returned by `place_order`, consumed front-to-back.
    order_responses: Mutex<std::collections::VecDeque<OrderResponse>>,
    /// Responses returned by `get_order_status`, keyed by order id.
    status_responses: Mutex<std::collections::HashMap<String, OrderResponse>>,
    tick_size: f64,
}

impl MockVenueAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            balance: Mutex::new(0.0),
            positions: Mutex::new(Vec::new()),
            mark_prices: Mutex::new(Default::default()),
            best_bid_ask: Mutex::new(Default::default()),
            order_responses: Mutex::new(Default::default()),
            status_responses: Mutex::new(Default::default()),
            tick_size: 0.01,
        }
    }

    pub fn with_balance(self, usd: f64) -> Self {
        *self.balance.lock().unwrap() = usd;
        self
    }

    pub fn with_mark_price(self, symbol: &str, price: f64) -> Self {
        self.mark_prices.lock().unwrap().insert(symbol.to_string(), price);
        self
    }

    pub fn with_best_bid_ask(self, symbol: &str, bid: f64, ask: f64) -> Self {
        self.best_bid_ask
            .lock()
            .unwrap()
            .insert(symbol.to_string(), BestBidAsk { best_bid: bid, best_ask: ask });
        self
    }

    pub fn with_position(self, p: Position) -> Self {
        self.positions.lock().unwrap().push(p);
        self
    }

    pub fn push_order_response(&self, resp: OrderResponse) {
        self.order_responses.lock().unwrap().push_back(resp);
    }

    pub fn set_status_response(&self, order_id: &str, resp: OrderResponse) {
        self.status_responses
            .lock()
            .unwrap()
            .insert(order_id.to_string(), resp);
    }

    pub fn clear_position(&self, symbol: &str) {
        self.positions
            .lock()
            .unwrap()
            .retain(|p| Position::normalize_symbol(&p.symbol) != Position::normalize_symbol(symbol));
    }

    pub fn set_position_size(&self, symbol: &str, size: f64) {
        let mut positions = self.positions.lock().unwrap();
        for p in positions.iter_mut() {
            if Position::normalize_symbol(&p.symbol) == Position::normalize_symbol(symbol) {
                p.size = size;
            }
        }
    }
}

#[async_trait]
impl VenueAdapter for MockVenueAdapter {
    fn venue_name(&self) -> &str {
        &self.name
    }

    async fn get_balance(&self) -> CoreResult<f64> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn get_positions(&self) -> CoreResult<Vec<Position>> {
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn get_position(&self, symbol: &str) -> CoreResult<Option<Position>> {
        let norm = Position::normalize_symbol(symbol);
        Ok(self
            .positions
            .lock()
            .unwrap()
            .iter()
            .find(|p| Position::normalize_symbol(&p.symbol) == norm)
            .cloned())
    }

    async fn place_order(&self, req: OrderRequest) -> CoreResult<OrderResponse> {
        let mut queue = self.order_responses.lock().unwrap();
        if let Some(resp) = queue.pop_front() {
            Ok(resp)
        } else {
            Ok(OrderResponse {
                order_id: Some(format!("mock-{}", uuid_like())),
                status: OrderStatus::Submitted,
                requested_size: req.size,
                filled_size: 0.0,
                average_fill_price: None,
                error: None,
            })
        }
    }

    async fn cancel_order(&self, _order_id: &str, _symbol: Option<&str>) -> CoreResult<bool> {
        Ok(true)
    }

    async fn cancel_all_orders(&self, _symbol: &str) -> CoreResult<u32> {
        Ok(0)
    }

    async fn get_order_status(
        &self,
        order_id: &str,
        _symbol: Option<&str>,
    ) -> CoreResult<OrderResponse> {
        self.status_responses
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| CoreError::VenueError {
                venue: self.name.as_str().into(),
                detail: format!("no scripted status for order {order_id}"),
            })
    }

    async fn get_mark_price(&self, symbol: &str) -> CoreResult<f64> {
        self.mark_prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| CoreError::VenueError {
                venue: self.name.as_str().into(),
                detail: format!("no mark price for {symbol}"),
            })
    }

    async fn get_best_bid_ask(&self, symbol: &str) -> CoreResult<Option<BestBidAsk>> {
        Ok(self.best_bid_ask.lock().unwrap().get(symbol).copied())
    }

    async fn get_tick_size(&self, _symbol: &str) -> CoreResult<f64> {
        Ok(self.tick_size)
    }

    async fn supports_symbol(&self, _symbol: &str) -> CoreResult<bool> {
        Ok(true)
    }

    async fn transfer_internal(&self, _amount: f64, _to_perp: bool) -> CoreResult<String> {
        Ok("mock-transfer".to_string())
    }
}

fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

/// A scripted historical/funding feed.
pub struct MockHistoricalRateFeed {
    pub weighted_average_rate: std::sync::Mutex<std::collections::HashMap<(String, String), f64>>,
    pub average_spread: std::sync::Mutex<Option<f64>>,
    pub volatility: std::sync::Mutex<Option<VolatilityMetrics>>,
    pub historical_points: std::sync::Mutex<std::collections::HashMap<(String, String), Vec<HistoricalPoint>>>,
}

impl Default for MockHistoricalRateFeed {
    fn default() -> Self {
        Self {
            weighted_average_rate: Mutex::new(Default::default()),
            average_spread: Mutex::new(None),
            volatility: Mutex::new(None),
            historical_points: Mutex::new(Default::default()),
        }
    }
}

impl MockHistoricalRateFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_weighted_average_rate(&self, symbol: &str, venue: &str, rate: f64) {
        self.weighted_average_rate
            .lock()
            .unwrap()
            .insert((symbol.to_string(), venue.to_string()), rate);
    }

    pub fn set_average_spread(&self, spread: f64) {
        *self.average_spread.lock().unwrap() = Some(spread);
    }

    pub fn set_volatility(&self, v: VolatilityMetrics) {
        *self.volatility.lock().unwrap() = Some(v);
    }

    pub fn set_historical_points(&self, symbol: &str, venue: &str, points: Vec<HistoricalPoint>) {
        self.historical_points
            .lock()
            .unwrap()
            .insert((symbol.to_string(), venue.to_string()), points);
    }
}

#[async_trait]
impl HistoricalRateFeed for MockHistoricalRateFeed {
    async fn find_arbitrage_opportunities(
        &self,
        _symbols: &[String],
        _min_spread: f64,
    ) -> CoreResult<Vec<Opportunity>> {
        Ok(Vec::new())
    }

    async fn get_funding_rates(&self, symbol: &str) -> CoreResult<Vec<VenueFundingRate>> {
        let map = self.weighted_average_rate.lock().unwrap();
        Ok(map
            .iter()
            .filter(|((s, _), _)| s == symbol)
            .map(|((_, venue), rate)| VenueFundingRate {
                venue: venue.clone(),
                current_rate: *rate,
            })
            .collect())
    }

    async fn get_exchange_symbol(&self, symbol: &str, _venue: &str) -> CoreResult<String> {
        Ok(symbol.to_string())
    }

    async fn get_weighted_average_rate(
        &self,
        symbol: &str,
        venue: &str,
        current_rate: f64,
    ) -> CoreResult<f64> {
        Ok(self
            .weighted_average_rate
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), venue.to_string()))
            .copied()
            .unwrap_or(current_rate))
    }

    async fn get_average_spread(
        &self,
        _symbol: &str,
        _long_venue: &str,
        _short_venue: &str,
        current_long: f64,
        current_short: f64,
    ) -> CoreResult<f64> {
        Ok(self
            .average_spread
            .lock()
            .unwrap()
            .unwrap_or((current_long - current_short).abs()))
    }

    async fn get_spread_volatility_metrics(
        &self,
        _symbol: &str,
        _long_venue: &str,
        _short_venue: &str,
        _days: u32,
    ) -> CoreResult<Option<VolatilityMetrics>> {
        Ok(*self.volatility.lock().unwrap())
    }

    async fn get_historical_data(
        &self,
        symbol: &str,
        venue: &str,
    ) -> CoreResult<Vec<HistoricalPoint>> {
        Ok(self
            .historical_points
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), venue.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
