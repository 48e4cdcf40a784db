use crate::opportunity::Opportunity;
use chrono::{DateTime, Utc};

/// Spec §3 AsymmetricFill.
///
/// Invariant: exactly one of `long_filled`/`short_filled` is `true`; enforce
/// via [`AsymmetricFill::new`] rather than letting callers hand-construct an
/// impossible state.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AsymmetricFill {
    pub symbol: String,
    pub long_order_id: Option<String>,
    pub short_order_id: Option<String>,
    long_filled: bool,
    short_filled: bool,
    pub long_venue: String,
    pub short_venue: String,
    pub position_size: f64,
    pub opportunity: Opportunity,
    pub timestamp: DateTime<Utc>,
}

impl AsymmetricFill {
    pub fn new(
        symbol: impl Into<String>,
        long_order_id: Option<String>,
        short_order_id: Option<String>,
        long_filled: bool,
        short_filled: bool,
        long_venue: impl Into<String>,
        short_venue: impl Into<String>,
        position_size: f64,
        opportunity: Opportunity,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, String> {
        if long_filled == short_filled {
            return Err(format!(
                "AsymmetricFill requires exactly one side filled, got long={long_filled} short={short_filled}"
            ));
        }
        Ok(Self {
            symbol: symbol.into(),
            long_order_id,
            short_order_id,
            long_filled,
            short_filled,
            long_venue: long_venue.into(),
            short_venue: short_venue.into(),
            position_size,
            opportunity,
            timestamp,
        })
    }

    pub fn long_filled(&self) -> bool {
        self.long_filled
    }

    pub fn short_filled(&self) -> bool {
        self.short_filled
    }

    /// The venue/order-id of the leg still resting, unfilled.
    pub fn unfilled_leg(&self) -> (&str, Option<&str>) {
        if self.long_filled {
            (&self.short_venue, self.short_order_id.as_deref())
        } else {
            (&self.long_venue, self.long_order_id.as_deref())
        }
    }

    /// The venue/order-id of the leg that already filled.
    pub fn filled_leg(&self) -> (&str, Option<&str>) {
        if self.long_filled {
            (&self.long_venue, self.long_order_id.as_deref())
        } else {
            (&self.short_venue, self.short_order_id.as_deref())
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opportunity::Opportunity;

    fn opp() -> Opportunity {
        Opportunity {
            symbol: "BTC".into(),
            long_venue: "A".into(),
            short_venue: "B".into(),
            long_funding_rate: -1e-4,
            short_funding_rate: 5e-4,
            long_mark_price: 100.0,
            short_mark_price: 100.0,
            long_open_interest_usd: Some(1e6),
            short_open_interest_usd: Some(1e6),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn both_filled_is_rejected() {
        let err = AsymmetricFill::new(
            "BTC", Some("1".into()), Some("2".into()), true, true, "A", "B", 1.0, opp(), Utc::now(),
        )
        .unwrap_err();
        assert!(err.contains("exactly one"));
    }

    #[test]
    fn neither_filled_is_rejected() {
        let err = AsymmetricFill::new(
            "BTC", None, None, false, false, "A", "B", 1.0, opp(), Utc::now(),
        )
        .unwrap_err();
        assert!(err.contains("exactly one"));
    }

    #[test]
    fn unfilled_leg_is_short_when_long_filled() {
        let af = AsymmetricFill::new(
            "BTC", Some("1".into()), Some("2".into()), true, false, "A", "B", 1.0, opp(), Utc::now(),
        )
        .unwrap();
        assert_eq!(af.unfilled_leg().0, "B");
        assert_eq!(af.filled_leg().0, "A");
    }
}
