/// Spec §3 Position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn opposite(self) -> Self {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }

    /// The order side that closes a position of this side.
    pub fn closing_order_side(self) -> crate::order::OrderSide {
        match self {
            PositionSide::Long => crate::order::OrderSide::Sell,
            PositionSide::Short => crate::order::OrderSide::Buy,
        }
    }
}

/// Spec §3 Position: `(venue, symbol, side, size, entryPrice, markPrice,
/// leverage, marginUsed)`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub venue: String,
    pub symbol: String,
    pub side: PositionSide,
    pub size: f64,
    pub entry_price: f64,
    pub mark_price: f64,
    pub leverage: f64,
    pub margin_used: f64,
}

impl Position {
    /// Normalization rule from spec §4.5.1: strip `USDC`/`USDT`/`-PERP`/`PERP`
    /// suffixes and uppercase. Shared by the idempotency key and the
    /// single-leg grouping logic.
    pub fn normalize_symbol(symbol: &str) -> String {
        let upper = symbol.to_ascii_uppercase();
        let mut s = upper.as_str();
        for suffix in ["-PERP", "PERP", "USDC", "USDT"] {
            if let Some(stripped) = s.strip_suffix(suffix) {
                s = stripped;
            }
        }
        s.to_string()
    }

    /// `venue:normalizedSymbol` key used by the idempotency locks (§4.5.1)
    /// and by the single-leg grouping (§4.5.4).
    pub fn key(&self) -> String {
        format!("{}:{}", self.venue, Self::normalize_symbol(&self.symbol))
    }

    pub fn is_flat(&self) -> bool {
        self.size.abs() < crate::SIZE_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_perp_and_stable_suffixes() {
        assert_eq!(Position::normalize_symbol("btc-perp"), "BTC");
        assert_eq!(Position::normalize_symbol("ETHPERP"), "ETH");
        assert_eq!(Position::normalize_symbol("btcusdt"), "BTC");
        assert_eq!(Position::normalize_symbol("SOLUSDC"), "SOL");
    }

    #[test]
    fn key_combines_venue_and_normalized_symbol() {
        let p = Position {
            venue: "binance".into(),
            symbol: "BTC-PERP".into(),
            side: PositionSide::Long,
            size: 1.0,
            entry_price: 100.0,
            mark_price: 100.0,
            leverage: 2.0,
            margin_used: 50.0,
        };
        assert_eq!(p.key(), "binance:BTC");
    }
}
