//! Account-level totals per market, computed from normalized fills.

use super::funding::FundingIndex;
use crate::domain::{Decimal, Fill, Liquidity, Market, OpenPosition, Side};
use serde::Serialize;
use std::collections::BTreeMap;

pub const TOTAL_ROW: &str = "TOTAL";

const VOLUME_DP: u32 = 2;
const FEE_DP: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuturesSummaryRow {
    pub market: String,
    pub volume: Decimal,
    pub taker_volume: Decimal,
    pub maker_volume: Decimal,
    /// Sold volume, less the cost of any open short.
    pub sell_volume: Decimal,
    /// Bought volume, less the cost of any open long.
    pub buy_volume: Decimal,
    pub fees: Decimal,
    pub funding: Decimal,
    pub raw_pnl: Decimal,
    pub rpnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotSummaryRow {
    pub market: String,
    pub volume: Decimal,
    pub taker_volume: Decimal,
    pub maker_volume: Decimal,
    pub sell_volume: Decimal,
    pub buy_volume: Decimal,
    /// Fees in the quote currency.
    pub fees: Decimal,
    pub fee_currency: String,
}

#[derive(Debug, Default)]
struct VolumeTotals {
    volume: Decimal,
    taker: Decimal,
    maker: Decimal,
    sell: Decimal,
    buy: Decimal,
}

impl VolumeTotals {
    fn of(fills: &[Fill]) -> Self {
        let mut totals = Self::default();
        for fill in fills {
            totals.volume += fill.volume;
            match fill.liquidity {
                Liquidity::Taker => totals.taker += fill.volume,
                Liquidity::Maker => totals.maker += fill.volume,
            }
            match fill.side {
                Side::Sell => totals.sell += fill.volume,
                Side::Buy => totals.buy += fill.volume,
            }
        }
        totals
    }

    fn rounded(self) -> Self {
        Self {
            volume: self.volume.round_dp(VOLUME_DP),
            taker: self.taker.round_dp(VOLUME_DP),
            maker: self.maker.round_dp(VOLUME_DP),
            sell: self.sell.round_dp(VOLUME_DP),
            buy: self.buy.round_dp(VOLUME_DP),
        }
    }
}

/// One row per futures market followed by a `TOTAL` row.
///
/// The cost of positions that are still open is backed out of the sell or
/// buy volume so that `raw_pnl` only reflects realized flows.
pub fn futures_summary(
    futures_by_market: &BTreeMap<Market, Vec<Fill>>,
    funding: &FundingIndex,
    positions: &[OpenPosition],
) -> Vec<FuturesSummaryRow> {
    let mut rows: Vec<FuturesSummaryRow> = futures_by_market
        .iter()
        .map(|(market, fills)| {
            let open_cost: Decimal = positions
                .iter()
                .filter(|p| &p.future == market)
                .map(|p| p.cost)
                .sum();
            let open_short = open_cost.min(Decimal::zero());
            let open_long = open_cost.max(Decimal::zero());

            let totals = VolumeTotals::of(fills).rounded();
            let fees: Decimal = fills.iter().map(|f| f.fee).sum();

            futures_row(
                market.to_string(),
                totals.volume,
                totals.taker,
                totals.maker,
                totals.sell + open_short,
                totals.buy - open_long,
                fees.round_dp(FEE_DP),
                funding.total(market).round_dp(FEE_DP),
            )
        })
        .collect();

    let total = futures_row(
        TOTAL_ROW.to_string(),
        rows.iter().map(|r| r.volume).sum(),
        rows.iter().map(|r| r.taker_volume).sum(),
        rows.iter().map(|r| r.maker_volume).sum(),
        rows.iter().map(|r| r.sell_volume).sum(),
        rows.iter().map(|r| r.buy_volume).sum(),
        rows.iter().map(|r| r.fees).sum(),
        rows.iter().map(|r| r.funding).sum(),
    );
    rows.push(total);
    rows
}

#[allow(clippy::too_many_arguments)]
fn futures_row(
    market: String,
    volume: Decimal,
    taker_volume: Decimal,
    maker_volume: Decimal,
    sell_volume: Decimal,
    buy_volume: Decimal,
    fees: Decimal,
    funding: Decimal,
) -> FuturesSummaryRow {
    let raw_pnl = sell_volume - buy_volume;
    FuturesSummaryRow {
        market,
        volume,
        taker_volume,
        maker_volume,
        sell_volume,
        buy_volume,
        fees,
        funding,
        raw_pnl,
        rpnl: raw_pnl - fees - funding,
    }
}

/// One row per spot market, fees expressed in the market's quote currency.
pub fn spot_summary(spot_by_market: &BTreeMap<Market, Vec<Fill>>) -> Vec<SpotSummaryRow> {
    spot_by_market
        .iter()
        .map(|(market, fills)| {
            let quote = market.quote().unwrap_or_default();
            let totals = VolumeTotals::of(fills).rounded();
            let fees: Decimal = fills
                .iter()
                .map(|f| {
                    if f.fee_currency == quote {
                        f.fee
                    } else {
                        f.fee * f.price
                    }
                })
                .sum();

            SpotSummaryRow {
                market: market.to_string(),
                volume: totals.volume,
                taker_volume: totals.taker,
                maker_volume: totals.maker,
                sell_volume: totals.sell,
                buy_volume: totals.buy,
                fees: fees.round_dp(FEE_DP),
                fee_currency: quote.to_string(),
            }
        })
        .collect()
}
