//! Order request/response types and the closed sum types spec §9's design
//! notes call for (`OrderStatus`, `OrderSide`, `OrderType`, and a venue tag
//! standing in for the source's `ExchangeType`).
//!
//! The source tolerates an "unknown status" fallthrough (`|| 'unknown'`).
//! These enums make that drift a compile error instead: every `match` on
//! `OrderStatus` must be exhaustive.

/// Which side of the book an order rests on / a position holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side that closes a position on this side of the book.
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

/// Time-in-force values named in spec §3 (`tif ∈ {IOC, GTC, ...}`). Only the
/// two values the spec actually exercises are modeled; a closed enum means a
/// venue adapter returning anything else is a compile-time impossibility,
/// not a string that silently falls through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TimeInForce {
    Ioc,
    Gtc,
}

/// Venue-reported order lifecycle state (spec §3 OrderResponse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    Submitted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected)
    }
}

/// Stands in for the source's `ExchangeType` (design note, §9). The core is
/// venue-agnostic by contract (§6.1) — venues are adapter-supplied strings,
/// not a fixed enum the core could enumerate — so this is a thin newtype
/// used purely to tag which venue an error or fill came from, not a closed
/// set of known exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ExchangeTag(pub String);

impl std::fmt::Display for ExchangeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExchangeTag {
    fn from(s: &str) -> Self {
        ExchangeTag(s.to_string())
    }
}

impl From<String> for ExchangeTag {
    fn from(s: String) -> Self {
        ExchangeTag(s)
    }
}

/// Spec §3 OrderRequest.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub size: f64,
    /// `None` only valid when `order_type == Market`. A `Limit` request
    /// with a zero or absent price is a construction error — the design
    /// notes call out the source's habit of passing `0` to mean "market"
    /// under a `LIMIT` tag; this type makes that representable state
    /// illegal instead of silently reinterpreting it.
    pub price: Option<f64>,
    pub tif: TimeInForce,
    pub reduce_only: bool,
}

impl OrderRequest {
    /// Construct a `LIMIT` order, rejecting a non-positive price outright
    /// rather than reinterpreting it as a market order (spec §9 design note).
    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        size: f64,
        price: f64,
        tif: TimeInForce,
        reduce_only: bool,
    ) -> Result<Self, String> {
        if !(price > 0.0) {
            return Err(format!(
                "LIMIT order requires a positive price, got {price}"
            ));
        }
        Ok(Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            size,
            price: Some(price),
            tif,
            reduce_only,
        })
    }

    pub fn market(
        symbol: impl Into<String>,
        side: OrderSide,
        size: f64,
        reduce_only: bool,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            size,
            price: None,
            tif: TimeInForce::Ioc,
            reduce_only,
        }
    }
}

/// Spec §3 OrderResponse.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderResponse {
    pub order_id: Option<String>,
    pub status: OrderStatus,
    pub requested_size: f64,
    pub filled_size: f64,
    pub average_fill_price: Option<f64>,
    pub error: Option<String>,
}

impl OrderResponse {
    /// Invariant: `filledSize <= requestedSize`; when `FILLED`,
    /// `filledSize == requestedSize` within [`crate::SIZE_EPSILON`].
    pub fn is_internally_consistent(&self) -> bool {
        if self.filled_size > self.requested_size + crate::SIZE_EPSILON {
            return false;
        }
        if self.status == OrderStatus::Filled
            && (self.filled_size - self.requested_size).abs() > crate::SIZE_EPSILON
        {
            return false;
        }
        true
    }

    pub fn fill_ratio(&self) -> f64 {
        if self.requested_size <= 0.0 {
            0.0
        } else {
            (self.filled_size / self.requested_size).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_price_limit_order_is_rejected() {
        let err = OrderRequest::limit("BTC", OrderSide::Buy, 1.0, 0.0, TimeInForce::Gtc, false)
            .unwrap_err();
        assert!(err.contains("positive price"));
    }

    #[test]
    fn filled_with_partial_size_is_inconsistent() {
        let resp = OrderResponse {
            order_id: Some("1".into()),
            status: OrderStatus::Filled,
            requested_size: 10.0,
            filled_size: 5.0,
            average_fill_price: Some(100.0),
            error: None,
        };
        assert!(!resp.is_internally_consistent());
    }

    #[test]
    fn fill_ratio_clamped() {
        let resp = OrderResponse {
            order_id: None,
            status: OrderStatus::PartiallyFilled,
            requested_size: 10.0,
            filled_size: 3.0,
            average_fill_price: None,
            error: None,
        };
        assert!((resp.fill_ratio() - 0.3).abs() < 1e-9);
    }
}
