//! Per-trade aggregation and funding attribution.

use super::funding::FundingIndex;
use super::segmenter::Segmentation;
use crate::domain::{Decimal, Market, Side};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;

/// A closed trade: a run of fills from flat back to flat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub market: Market,
    pub trade_nr: u64,
    /// Sell-side volume minus buy-side volume.
    pub raw_pnl: Decimal,
    pub fee: Decimal,
    /// Funding paid while the trade was open (inclusive window).
    pub funding: Decimal,
    /// `raw_pnl - fee - funding`.
    pub rpnl: Decimal,
    pub executions: usize,
    pub volume: Decimal,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: TimeDelta,
}

#[derive(Debug)]
struct TradeAccumulator {
    buy_volume: Decimal,
    sell_volume: Decimal,
    fee: Decimal,
    volume: Decimal,
    executions: usize,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    last_delta: Decimal,
}

impl TradeAccumulator {
    fn new(time: DateTime<Utc>) -> Self {
        Self {
            buy_volume: Decimal::zero(),
            sell_volume: Decimal::zero(),
            fee: Decimal::zero(),
            volume: Decimal::zero(),
            executions: 0,
            start: time,
            end: time,
            last_delta: Decimal::zero(),
        }
    }
}

/// Builds closed-trade records from a market's segmentation.
#[derive(Debug, Clone, Copy)]
pub struct TradeAggregator<'a> {
    funding: &'a FundingIndex,
}

impl<'a> TradeAggregator<'a> {
    pub fn new(funding: &'a FundingIndex) -> Self {
        Self { funding }
    }

    /// One `Trade` per closed trade, ordered by `trade_nr`.
    ///
    /// A trade whose last row leaves a non-zero position is still open and is
    /// left out. When segmentation started from a carried-in position the
    /// leading trade was only partially observed and is left out as well.
    pub fn aggregate(&self, market: &Market, segmentation: &Segmentation) -> Vec<Trade> {
        let mut groups: BTreeMap<u64, TradeAccumulator> = BTreeMap::new();

        for row in &segmentation.rows {
            let acc = groups
                .entry(row.trade_nr)
                .or_insert_with(|| TradeAccumulator::new(row.fill.time));
            match row.fill.side {
                Side::Buy => acc.buy_volume += row.fill.volume,
                Side::Sell => acc.sell_volume += row.fill.volume,
            }
            acc.fee += row.fill.fee;
            acc.volume += row.fill.volume;
            acc.executions += 1;
            acc.start = acc.start.min(row.fill.time);
            acc.end = acc.end.max(row.fill.time);
            acc.last_delta = row.delta;
        }

        let leading_partial = !segmentation.opening_delta.is_zero();

        groups
            .into_iter()
            .filter(|(trade_nr, acc)| {
                acc.last_delta.is_zero() && !(leading_partial && *trade_nr == 0)
            })
            .map(|(trade_nr, acc)| {
                let raw_pnl = acc.sell_volume - acc.buy_volume;
                let funding = self.funding.sum_between(market, acc.start, acc.end);
                Trade {
                    market: market.clone(),
                    trade_nr,
                    raw_pnl,
                    fee: acc.fee,
                    funding,
                    rpnl: raw_pnl - acc.fee - funding,
                    executions: acc.executions,
                    volume: acc.volume,
                    start: acc.start,
                    end: acc.end,
                    duration: acc.end - acc.start,
                }
            })
            .collect()
    }
}
