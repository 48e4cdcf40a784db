//! Single-leg detection, spec §4.5.4.

use fra_schemas::position::{Position, PositionSide};
use std::collections::BTreeMap;

/// Positions without a matched opposite-side counterpart on a different
/// venue of the same normalized symbol — including same-venue
/// long+short pairs, which never count as a match. Returned for
/// immediate closure.
pub fn single_leg_positions(positions: &[Position]) -> Vec<Position> {
    let mut groups: BTreeMap<String, Vec<&Position>> = BTreeMap::new();
    for p in positions {
        groups.entry(Position::normalize_symbol(&p.symbol)).or_default().push(p);
    }

    let mut single_leg = Vec::new();
    for group in groups.values() {
        let longs: Vec<&Position> = group.iter().filter(|p| p.side == PositionSide::Long).copied().collect();
        let shorts: Vec<&Position> = group.iter().filter(|p| p.side == PositionSide::Short).copied().collect();
        let mut long_matched = vec![false; longs.len()];
        let mut short_matched = vec![false; shorts.len()];

        for (i, l) in longs.iter().enumerate() {
            for (j, s) in shorts.iter().enumerate() {
                if !short_matched[j] && l.venue != s.venue {
                    long_matched[i] = true;
                    short_matched[j] = true;
                    break;
                }
            }
        }

        for (i, l) in longs.iter().enumerate() {
            if !long_matched[i] {
                single_leg.push((*l).clone());
            }
        }
        for (j, s) in shorts.iter().enumerate() {
            if !short_matched[j] {
                single_leg.push((*s).clone());
            }
        }
    }
    single_leg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(venue: &str, symbol: &str, side: PositionSide) -> Position {
        Position {
            venue: venue.into(),
            symbol: symbol.into(),
            side,
            size: 1.0,
            entry_price: 100.0,
            mark_price: 100.0,
            leverage: 2.0,
            margin_used: 50.0,
        }
    }

    #[test]
    fn matched_pair_on_different_venues_is_not_single_leg() {
        let positions = vec![pos("A", "BTC-PERP", PositionSide::Long), pos("B", "BTCUSDT", PositionSide::Short)];
        assert!(single_leg_positions(&positions).is_empty());
    }

    #[test]
    fn unmatched_long_is_single_leg() {
        let positions = vec![pos("A", "BTC", PositionSide::Long)];
        let single = single_leg_positions(&positions);
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn long_and_short_on_same_venue_are_both_single_leg() {
        let positions = vec![pos("A", "BTC", PositionSide::Long), pos("A", "BTC", PositionSide::Short)];
        let single = single_leg_positions(&positions);
        assert_eq!(single.len(), 2);
    }

    #[test]
    fn extra_long_beyond_a_matched_pair_is_single_leg() {
        let positions = vec![
            pos("A", "BTC", PositionSide::Long),
            pos("B", "BTC", PositionSide::Short),
            pos("C", "BTC", PositionSide::Long),
        ];
        let single = single_leg_positions(&positions);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].venue, "C");
    }
}
