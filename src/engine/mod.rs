//! Pure computation engine for fill-to-trade reconciliation.
//!
//! raw fills -> preprocess (type, sort, partition, normalize) -> segment per
//! market -> aggregate closed trades with attributed funding.

use crate::domain::{Fill, Market};
use std::collections::BTreeMap;
use tracing::debug;

pub mod aggregator;
pub mod funding;
pub mod normalizer;
pub mod preprocess;
pub mod segmenter;
pub mod summary;

pub use aggregator::{Trade, TradeAggregator};
pub use funding::FundingIndex;
pub use normalizer::FillNormalizer;
pub use preprocess::{
    preprocess_fills, preprocess_funding, preprocess_positions, PreprocessError, PreprocessedFills,
};
pub use segmenter::{FirstFillPolicy, SegmentedFill, Segmentation, SplitPart, TradeSegmenter};
pub use summary::{futures_summary, spot_summary, FuturesSummaryRow, SpotSummaryRow, TOTAL_ROW};

/// Closed trades for every market.
///
/// Markets are independent of each other; each gets its own segmentation
/// pass. Every market present in the input appears in the output, with an
/// empty table when it has no closed trade.
pub fn trades_by_market(
    fills_by_market: &BTreeMap<Market, Vec<Fill>>,
    funding: &FundingIndex,
    segmenter: TradeSegmenter,
) -> BTreeMap<Market, Vec<Trade>> {
    let aggregator = TradeAggregator::new(funding);
    fills_by_market
        .iter()
        .map(|(market, fills)| {
            let segmentation = segmenter.segment(fills);
            let trades = aggregator.aggregate(market, &segmentation);
            debug!(market = %market, trades = trades.len(), "aggregated trades");
            (market.clone(), trades)
        })
        .collect()
}
