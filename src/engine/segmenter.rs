//! Position delta tracking and trade segmentation for one market.
//!
//! Walks a market's fills in `(time, id)` order keeping the running signed
//! position. When a single fill flips the position from long to short (or the
//! reverse) it is replaced by a closing half that brings the position to
//! exactly zero and an opening half carrying the remainder. Trade numbers are
//! then assigned in the same pass: a new trade starts on the row after the
//! position returned to zero.

use crate::domain::ordering::is_sorted_deterministic;
use crate::domain::{Decimal, Fill};
use tracing::debug;

/// Role of a segmented row relative to the original fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPart {
    Unsplit,
    /// Reduced copy of a crossing fill that closes the prior position.
    ClosingHalf,
    /// Remainder of a crossing fill that opens the opposite position.
    OpeningHalf,
}

/// Where the running position starts for the first fill of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstFillPolicy {
    /// Start flat. The first fill can never cross zero and is never split.
    #[default]
    StartFlat,
    /// Start from a position carried in from before the first fill. The first
    /// fill is split if it crosses that position, and the leading trade is
    /// treated as partially observed.
    CarryOver(Decimal),
}

impl FirstFillPolicy {
    pub fn opening_delta(&self) -> Decimal {
        match self {
            FirstFillPolicy::StartFlat => Decimal::zero(),
            FirstFillPolicy::CarryOver(position) => *position,
        }
    }
}

/// A fill (or half of a split fill) with its position bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedFill {
    pub fill: Fill,
    pub signed_size: Decimal,
    /// Running position after this row.
    pub delta: Decimal,
    pub split: SplitPart,
    pub trade_nr: u64,
}

/// Output of one segmentation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub opening_delta: Decimal,
    pub rows: Vec<SegmentedFill>,
}

impl Segmentation {
    /// Position after the last row.
    pub fn final_delta(&self) -> Decimal {
        self.rows
            .last()
            .map(|row| row.delta)
            .unwrap_or(self.opening_delta)
    }

    pub fn split_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.split == SplitPart::ClosingHalf)
            .count()
    }

    /// Number of times the position returned to exactly zero.
    pub fn flat_count(&self) -> usize {
        self.rows.iter().filter(|row| row.delta.is_zero()).count()
    }
}

/// Scan state carried from one row to the next.
#[derive(Debug)]
struct ScanState {
    delta: Decimal,
    trade_nr: u64,
    previous_row_delta: Option<Decimal>,
    rows: Vec<SegmentedFill>,
}

impl ScanState {
    fn new(opening_delta: Decimal, capacity: usize) -> Self {
        Self {
            delta: opening_delta,
            trade_nr: 0,
            previous_row_delta: None,
            rows: Vec::with_capacity(capacity),
        }
    }

    fn emit(&mut self, fill: Fill, signed_size: Decimal, delta: Decimal, split: SplitPart) {
        if self.previous_row_delta.is_some_and(|d| d.is_zero()) {
            self.trade_nr += 1;
        }
        self.previous_row_delta = Some(delta);
        self.delta = delta;
        self.rows.push(SegmentedFill {
            fill,
            signed_size,
            delta,
            split,
            trade_nr: self.trade_nr,
        });
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TradeSegmenter {
    policy: FirstFillPolicy,
}

impl TradeSegmenter {
    pub fn new(policy: FirstFillPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FirstFillPolicy {
        self.policy
    }

    /// Segment one market's fills, which must already be in `(time, id)` order.
    pub fn segment(&self, fills: &[Fill]) -> Segmentation {
        debug_assert!(is_sorted_deterministic(fills), "fills must be in (time, id) order");
        let opening_delta = self.policy.opening_delta();
        let mut state = ScanState::new(opening_delta, fills.len() + 1);

        for fill in fills {
            let signed_size = fill.signed_size();
            let previous = state.delta;
            let delta = previous + signed_size;

            if is_crossing(previous, delta) {
                let (closing, opening) = split_crossing_fill(fill, previous, delta);
                state.emit(closing, -previous, Decimal::zero(), SplitPart::ClosingHalf);
                state.emit(opening, delta, delta, SplitPart::OpeningHalf);
            } else {
                state.emit(fill.clone(), signed_size, delta, SplitPart::Unsplit);
            }
        }

        let segmentation = Segmentation {
            opening_delta,
            rows: state.rows,
        };
        debug!(
            fills = fills.len(),
            rows = segmentation.rows.len(),
            splits = segmentation.split_count(),
            final_delta = %segmentation.final_delta(),
            "segmented fills"
        );
        segmentation
    }
}

/// Both positions non-zero and of opposite sign.
fn is_crossing(previous: Decimal, delta: Decimal) -> bool {
    previous.signum() * delta.signum() < 0
}

/// Replace a crossing fill by its closing and opening halves.
///
/// The closing half takes `|previous|` of the size and a pro-rata share of the
/// fee; the opening half takes the remainders, so size, volume and fee sum
/// back to the original exactly.
fn split_crossing_fill(fill: &Fill, previous: Decimal, delta: Decimal) -> (Fill, Fill) {
    let close_size = previous.abs();
    let open_size = delta.abs();

    let close_volume = close_size * fill.price;
    let close_fee = if fill.size.is_zero() {
        Decimal::zero()
    } else {
        // May round at 28 digits; the opening half takes the exact remainder.
        fill.fee * close_size / fill.size
    };

    let closing = Fill {
        size: close_size,
        volume: close_volume,
        fee: close_fee,
        ..fill.clone()
    };

    let opening = Fill {
        id: fill.id.split_suffixed(),
        order_id: suffixed(&fill.order_id),
        trade_id: suffixed(&fill.trade_id),
        size: open_size,
        volume: fill.volume - close_volume,
        fee: fill.fee - close_fee,
        ..fill.clone()
    };

    (closing, opening)
}

fn suffixed(id: &str) -> String {
    if id.is_empty() {
        String::new()
    } else {
        format!("{}{}", id, crate::domain::FillId::SPLIT_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FillId, Liquidity, Market, Side};
    use chrono::{TimeZone, Utc};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn fill(id: &str, side: Side, size: &str, price: &str, fee: &str, secs: i64) -> Fill {
        Fill {
            id: FillId::new(id),
            order_id: format!("{}0", id),
            trade_id: format!("{}1", id),
            market: Market::new("BTC-PERP"),
            future: Some(Market::new("BTC-PERP")),
            side,
            size: d(size),
            price: d(price),
            fee: d(fee),
            fee_rate: d("0.0007"),
            fee_currency: "USD".to_string(),
            liquidity: Liquidity::Taker,
            time: Utc.timestamp_opt(secs, 0).unwrap(),
            kind: "order".to_string(),
            volume: d(size) * d(price),
        }
    }

    #[test]
    fn test_is_crossing() {
        assert!(is_crossing(d("1"), d("-2")));
        assert!(is_crossing(d("-0.5"), d("0.5")));
        assert!(!is_crossing(d("0"), d("-2")));
        assert!(!is_crossing(d("1"), d("0")));
        assert!(!is_crossing(d("1"), d("3")));
    }

    #[test]
    fn test_split_halves_conserve_totals() {
        let original = fill("7", Side::Sell, "3", "110", "0.33", 10);
        let (closing, opening) = split_crossing_fill(&original, d("1"), d("-2"));

        assert_eq!(closing.size, d("1"));
        assert_eq!(opening.size, d("2"));
        assert_eq!(closing.size + opening.size, original.size);
        assert_eq!(closing.volume + opening.volume, original.volume);
        assert_eq!(closing.fee + opening.fee, original.fee);
        assert_eq!(closing.fee, d("0.11"));
        assert_eq!(opening.volume, d("220"));
    }

    #[test]
    fn test_split_ids_stay_unique() {
        let original = fill("7", Side::Sell, "3", "110", "0", 10);
        let (closing, opening) = split_crossing_fill(&original, d("1"), d("-2"));

        assert_eq!(closing.id, original.id);
        assert_eq!(closing.order_id, "70");
        assert_eq!(opening.id.as_str(), "7b");
        assert_eq!(opening.order_id, "70b");
        assert_eq!(opening.trade_id, "71b");
    }

    #[test]
    fn test_fee_that_does_not_divide_evenly_is_conserved() {
        let original = fill("8", Side::Buy, "0.003", "40000", "0.084001", 10);
        let (closing, opening) = split_crossing_fill(&original, d("-0.001"), d("0.002"));
        assert_eq!(closing.fee + opening.fee, original.fee);
    }

    #[test]
    fn test_repeating_fee_share_is_conserved() {
        let original = fill("9", Side::Sell, "3", "100", "0.1", 10);
        let (closing, opening) = split_crossing_fill(&original, d("1"), d("-2"));

        // 0.1 / 3 has no exact decimal form.
        assert_ne!(closing.fee * d("3"), original.fee);
        assert_eq!(closing.fee + opening.fee, original.fee);
        assert_eq!(closing.volume + opening.volume, original.volume);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "(time, id) order")]
    fn test_segment_rejects_unsorted_fills() {
        let fills = vec![
            fill("2", Side::Sell, "1", "110", "0", 2),
            fill("1", Side::Buy, "1", "100", "0", 1),
        ];
        TradeSegmenter::default().segment(&fills);
    }

    #[test]
    fn test_segment_assigns_trade_numbers_after_flat() {
        let fills = vec![
            fill("1", Side::Buy, "1", "100", "0", 1),
            fill("2", Side::Sell, "1", "110", "0", 2),
            fill("3", Side::Sell, "2", "120", "0", 3),
            fill("4", Side::Buy, "2", "100", "0", 4),
        ];

        let seg = TradeSegmenter::default().segment(&fills);
        let trade_nrs: Vec<u64> = seg.rows.iter().map(|r| r.trade_nr).collect();
        let deltas: Vec<Decimal> = seg.rows.iter().map(|r| r.delta).collect();

        assert_eq!(trade_nrs, vec![0, 0, 1, 1]);
        assert_eq!(deltas, vec![d("1"), d("0"), d("-2"), d("0")]);
        assert_eq!(seg.split_count(), 0);
        assert_eq!(seg.flat_count(), 2);
    }

    #[test]
    fn test_segment_splits_crossing_fill() {
        let fills = vec![
            fill("1", Side::Buy, "1", "100", "0", 1),
            fill("2", Side::Sell, "3", "110", "0", 2),
        ];

        let seg = TradeSegmenter::default().segment(&fills);
        assert_eq!(seg.rows.len(), 3);

        let closing = &seg.rows[1];
        assert_eq!(closing.split, SplitPart::ClosingHalf);
        assert_eq!(closing.signed_size, d("-1"));
        assert_eq!(closing.delta, Decimal::zero());
        assert_eq!(closing.trade_nr, 0);

        let opening = &seg.rows[2];
        assert_eq!(opening.split, SplitPart::OpeningHalf);
        assert_eq!(opening.signed_size, d("-2"));
        assert_eq!(opening.delta, d("-2"));
        assert_eq!(opening.trade_nr, 1);
        assert_eq!(seg.final_delta(), d("-2"));
    }

    #[test]
    fn test_start_flat_never_splits_first_fill() {
        let fills = vec![fill("1", Side::Sell, "2", "100", "0", 1)];
        let seg = TradeSegmenter::new(FirstFillPolicy::StartFlat).segment(&fills);
        assert_eq!(seg.rows.len(), 1);
        assert_eq!(seg.rows[0].split, SplitPart::Unsplit);
        assert_eq!(seg.rows[0].delta, d("-2"));
    }

    #[test]
    fn test_carry_over_splits_first_fill() {
        let fills = vec![fill("1", Side::Sell, "2", "100", "0", 1)];
        let seg = TradeSegmenter::new(FirstFillPolicy::CarryOver(d("0.5"))).segment(&fills);

        assert_eq!(seg.opening_delta, d("0.5"));
        assert_eq!(seg.rows.len(), 2);
        assert_eq!(seg.rows[0].fill.size, d("0.5"));
        assert_eq!(seg.rows[0].trade_nr, 0);
        assert_eq!(seg.rows[1].fill.size, d("1.5"));
        assert_eq!(seg.rows[1].delta, d("-1.5"));
        assert_eq!(seg.rows[1].trade_nr, 1);
    }

    #[test]
    fn test_empty_input() {
        let seg = TradeSegmenter::default().segment(&[]);
        assert!(seg.rows.is_empty());
        assert!(seg.final_delta().is_zero());
    }
}
