use crate::datasource::{DataSource, DataSourceError};
use crate::domain::{Market, RawFieldError};
use crate::engine::{
    futures_summary, preprocess_fills, preprocess_funding, preprocess_positions, spot_summary,
    trades_by_market, FirstFillPolicy, FundingIndex, FuturesSummaryRow, PreprocessError,
    SpotSummaryRow, Trade, TradeSegmenter,
};
use crate::precision::{PrecisionLookupError, PrecisionTable};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Precision(#[from] PrecisionLookupError),
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error("malformed fill {id} in {market}: {source}")]
    MalformedFill {
        id: String,
        market: String,
        #[source]
        source: RawFieldError,
    },
}

impl From<PreprocessError> for ReconcileError {
    fn from(err: PreprocessError) -> Self {
        match err {
            PreprocessError::MalformedFill { id, market, source } => {
                ReconcileError::MalformedFill { id, market, source }
            }
            PreprocessError::Precision(e) => ReconcileError::Precision(e),
        }
    }
}

/// Market filter and time window in Unix seconds, both ends inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileWindow {
    pub market: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

impl ReconcileWindow {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_market(market: impl Into<String>) -> Self {
        Self {
            market: Some(market.into()),
            ..Self::default()
        }
    }

    pub fn between(mut self, start_time: Option<i64>, end_time: Option<i64>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountReport {
    /// Closed trades per futures market; markets without any closed trade
    /// map to an empty table.
    pub futures_trades: BTreeMap<Market, Vec<Trade>>,
    pub futures_summary: Vec<FuturesSummaryRow>,
    pub spot_summary: Vec<SpotSummaryRow>,
}

impl AccountReport {
    pub fn trade_count(&self) -> usize {
        self.futures_trades.values().map(Vec::len).sum()
    }
}

/// Fetches an account's history and turns it into trade tables and
/// summaries.
#[derive(Clone)]
pub struct Reconciler {
    datasource: Arc<dyn DataSource>,
    precision: Arc<PrecisionTable>,
    policy: FirstFillPolicy,
}

impl Reconciler {
    pub fn new(datasource: Arc<dyn DataSource>, precision: Arc<PrecisionTable>) -> Self {
        Self {
            datasource,
            precision,
            policy: FirstFillPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FirstFillPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FirstFillPolicy {
        self.policy
    }

    pub async fn reconcile(&self, window: &ReconcileWindow) -> Result<AccountReport, ReconcileError> {
        let market = window.market.as_deref();
        let (raw_fills, raw_funding, raw_positions) = tokio::try_join!(
            self.datasource
                .fetch_fills(market, window.start_time, window.end_time),
            self.datasource
                .fetch_funding_payments(market, window.start_time, window.end_time),
            self.datasource.fetch_positions(),
        )?;

        let fills = preprocess_fills(&raw_fills, &self.precision)?;
        let funding = FundingIndex::new(preprocess_funding(&raw_funding));
        let mut positions = preprocess_positions(&raw_positions);
        if let Some(market) = market {
            positions.retain(|p| p.future.as_str() == market);
        }

        let futures_trades = trades_by_market(
            &fills.futures_by_market,
            &funding,
            TradeSegmenter::new(self.policy),
        );
        let report = AccountReport {
            futures_trades,
            futures_summary: futures_summary(&fills.futures_by_market, &funding, &positions),
            spot_summary: spot_summary(&fills.spot_by_market),
        };

        info!(
            fills = raw_fills.len(),
            funding_payments = raw_funding.len(),
            markets = report.futures_trades.len(),
            trades = report.trade_count(),
            "Reconciled account"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockDataSource;
    use crate::domain::{RawFill, RawFundingPayment, RawPosition};
    use crate::precision::MarketPrecision;

    fn raw_fill(id: u64, market: &str, side: &str, size: f64, price: f64, time: &str) -> RawFill {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "market": market,
            "future": if market.contains('/') { None } else { Some(market) },
            "side": side,
            "size": size,
            "price": price,
            "fee": 0.0,
            "feeRate": 0.0,
            "feeCurrency": "USD",
            "liquidity": "taker",
            "time": time,
            "type": "order"
        }))
        .unwrap()
    }

    fn table() -> Arc<PrecisionTable> {
        Arc::new(PrecisionTable::new().with_market("BTC", MarketPrecision::new(4, 0)))
    }

    #[tokio::test]
    async fn test_reconcile_closed_trade() {
        let mock = MockDataSource::new()
            .with_fills(vec![
                raw_fill(1, "BTC-PERP", "buy", 1.0, 100.0, "2021-01-01T00:00:00+00:00"),
                raw_fill(2, "BTC-PERP", "sell", 1.0, 110.0, "2021-01-01T01:00:00+00:00"),
            ])
            .with_funding(vec![serde_json::from_value::<RawFundingPayment>(serde_json::json!({
                "id": 1,
                "future": "BTC-PERP",
                "payment": 0.5,
                "time": "2021-01-01T00:30:00+00:00"
            }))
            .unwrap()]);

        let reconciler = Reconciler::new(Arc::new(mock), table());
        let report = reconciler.reconcile(&ReconcileWindow::all()).await.unwrap();

        let trades = &report.futures_trades[&Market::new("BTC-PERP")];
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].raw_pnl.to_canonical_string(), "10");
        assert_eq!(trades[0].funding.to_canonical_string(), "0.5");
        assert_eq!(trades[0].rpnl.to_canonical_string(), "9.5");
        assert_eq!(report.futures_summary.len(), 2);
        assert!(report.spot_summary.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_missing_precision_is_error() {
        let mock = MockDataSource::new().with_fills(vec![raw_fill(
            1,
            "DOGE-PERP",
            "buy",
            1.0,
            0.1,
            "2021-01-01T00:00:00+00:00",
        )]);
        let reconciler = Reconciler::new(Arc::new(mock), table());
        let err = reconciler.reconcile(&ReconcileWindow::all()).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Precision(_)));
    }

    #[tokio::test]
    async fn test_reconcile_malformed_futures_fill_is_error() {
        let mut bad = raw_fill(2, "BTC-PERP", "sell", 1.0, 110.0, "2021-01-01T00:01:00+00:00");
        bad.price = "n/a".into();
        let mock = MockDataSource::new().with_fills(vec![
            raw_fill(1, "BTC-PERP", "buy", 1.0, 100.0, "2021-01-01T00:00:00+00:00"),
            bad,
        ]);
        let reconciler = Reconciler::new(Arc::new(mock), table());
        let err = reconciler.reconcile(&ReconcileWindow::all()).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::MalformedFill { ref id, source: RawFieldError::Number { field: "price", .. }, .. }
                if id == "2"
        ));
    }

    #[tokio::test]
    async fn test_reconcile_upstream_error() {
        let mock = MockDataSource::new()
            .with_failure(DataSourceError::Auth("Not logged in".to_string()));
        let reconciler = Reconciler::new(Arc::new(mock), table());
        let err = reconciler.reconcile(&ReconcileWindow::all()).await.unwrap_err();
        assert!(matches!(err, ReconcileError::DataSource(DataSourceError::Auth(_))));
    }

    #[tokio::test]
    async fn test_reconcile_filters_positions_by_market() {
        let mock = MockDataSource::new()
            .with_fills(vec![raw_fill(
                1,
                "BTC-PERP",
                "buy",
                1.0,
                100.0,
                "2021-01-01T00:00:00+00:00",
            )])
            .with_positions(vec![
                serde_json::from_value::<RawPosition>(serde_json::json!({
                    "future": "BTC-PERP", "cost": 100.0, "netSize": 1.0
                }))
                .unwrap(),
                serde_json::from_value::<RawPosition>(serde_json::json!({
                    "future": "ETH-PERP", "cost": 50.0, "netSize": 1.0
                }))
                .unwrap(),
            ]);
        let reconciler = Reconciler::new(Arc::new(mock), table());
        let report = reconciler
            .reconcile(&ReconcileWindow::for_market("BTC-PERP"))
            .await
            .unwrap();

        // The open long is backed out; nothing is realized.
        assert!(report.futures_trades[&Market::new("BTC-PERP")].is_empty());
        assert!(report.futures_summary[0].buy_volume.is_zero());
        assert!(report.futures_summary[0].raw_pnl.is_zero());
    }
}
