//! Typing, ordering and partitioning of raw exchange records.

use super::normalizer::FillNormalizer;
use crate::domain::ordering::sort_fills_deterministic;
use crate::domain::{
    Fill, FundingPayment, Market, OpenPosition, RawFieldError, RawFill, RawFundingPayment,
    RawPosition,
};
use crate::precision::{PrecisionLookupError, PrecisionTable};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    /// A futures fill that cannot be typed.
    #[error("malformed fill {id} in {market}: {source}")]
    MalformedFill {
        id: String,
        market: String,
        #[source]
        source: RawFieldError,
    },
    #[error(transparent)]
    Precision(#[from] PrecisionLookupError),
}

/// Fills split into spot and futures, each also grouped per market.
///
/// All vectors are in `(time, id)` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessedFills {
    pub spot: Vec<Fill>,
    pub futures: Vec<Fill>,
    pub spot_by_market: BTreeMap<Market, Vec<Fill>>,
    pub futures_by_market: BTreeMap<Market, Vec<Fill>>,
}

impl PreprocessedFills {
    pub fn is_empty(&self) -> bool {
        self.spot.is_empty() && self.futures.is_empty()
    }
}

/// Type, sort and partition raw fills; futures fills are normalized.
///
/// The caller's records are not modified. An empty input yields empty tables.
/// Spot rows that cannot be typed are skipped with a warning.
///
/// # Errors
/// Returns `PreprocessError::MalformedFill` for a futures row that cannot be
/// typed, and `PreprocessError::Precision` if a traded futures market has no
/// precision entry.
pub fn preprocess_fills(
    raw_fills: &[RawFill],
    precision: &PrecisionTable,
) -> Result<PreprocessedFills, PreprocessError> {
    let mut spot = Vec::new();
    let mut futures = Vec::new();

    for raw in raw_fills {
        let fill = match raw.to_fill() {
            Ok(fill) => fill,
            Err(source) if raw.future.is_some() => {
                return Err(PreprocessError::MalformedFill {
                    id: raw.id.to_canonical(),
                    market: raw.market.clone(),
                    source,
                });
            }
            Err(e) => {
                warn!("Skipping spot fill {}: {}", raw.id.to_canonical(), e);
                continue;
            }
        };
        if fill.is_futures() {
            futures.push(fill);
        } else if !raw.is_otc() {
            spot.push(fill);
        }
    }

    sort_fills_deterministic(&mut spot);
    sort_fills_deterministic(&mut futures);

    let futures = FillNormalizer::new(precision).normalize(futures)?;

    debug!(
        spot = spot.len(),
        futures = futures.len(),
        "preprocessed fills"
    );

    Ok(PreprocessedFills {
        spot_by_market: group_by_market(&spot),
        futures_by_market: group_by_market(&futures),
        spot,
        futures,
    })
}

fn group_by_market(fills: &[Fill]) -> BTreeMap<Market, Vec<Fill>> {
    let mut grouped: BTreeMap<Market, Vec<Fill>> = BTreeMap::new();
    for fill in fills {
        grouped
            .entry(fill.market.clone())
            .or_default()
            .push(fill.clone());
    }
    grouped
}

/// Type funding payments and order them by time.
pub fn preprocess_funding(raw_payments: &[RawFundingPayment]) -> Vec<FundingPayment> {
    let mut payments: Vec<FundingPayment> = raw_payments
        .iter()
        .filter_map(|raw| match raw.to_payment() {
            Ok(payment) => Some(payment),
            Err(e) => {
                warn!("Skipping funding payment {}: {}", raw.id.to_canonical(), e);
                None
            }
        })
        .collect();
    payments.sort_by(|a, b| a.time.cmp(&b.time));
    payments
}

pub fn preprocess_positions(raw_positions: &[RawPosition]) -> Vec<OpenPosition> {
    raw_positions
        .iter()
        .filter_map(|raw| match raw.to_position() {
            Ok(position) => Some(position),
            Err(e) => {
                warn!("Skipping position {}: {}", raw.future, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;
    use crate::precision::MarketPrecision;

    fn raw(id: u64, market: &str, future: Option<&str>, kind: &str, time: &str) -> RawFill {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "orderId": id + 1000,
            "tradeId": id + 2000,
            "market": market,
            "future": future,
            "side": "buy",
            "size": 0.12345,
            "price": 100.0,
            "fee": 0.01,
            "feeRate": 0.0007,
            "feeCurrency": "USD",
            "liquidity": "maker",
            "time": time,
            "type": kind
        }))
        .unwrap()
    }

    fn table() -> PrecisionTable {
        PrecisionTable::new().with_market("BTC", MarketPrecision::new(3, 1))
    }

    #[test]
    fn test_empty_input_yields_empty_tables() {
        let result = preprocess_fills(&[], &PrecisionTable::new()).unwrap();
        assert!(result.is_empty());
        assert!(result.spot_by_market.is_empty());
        assert!(result.futures_by_market.is_empty());
    }

    #[test]
    fn test_partitions_spot_futures_and_drops_otc() {
        let fills = vec![
            raw(1, "BTC-PERP", Some("BTC-PERP"), "order", "2021-01-01T00:00:02+00:00"),
            raw(2, "ETH/USD", None, "order", "2021-01-01T00:00:01+00:00"),
            raw(3, "ETH/USD", None, "otc", "2021-01-01T00:00:03+00:00"),
        ];

        let result = preprocess_fills(&fills, &table()).unwrap();
        assert_eq!(result.futures.len(), 1);
        assert_eq!(result.spot.len(), 1);
        assert_eq!(result.spot[0].id.as_str(), "2");
        assert_eq!(result.futures_by_market[&Market::new("BTC-PERP")].len(), 1);
    }

    #[test]
    fn test_sorts_by_time_then_id() {
        let fills = vec![
            raw(20, "BTC-PERP", Some("BTC-PERP"), "order", "2021-01-01T00:00:01+00:00"),
            raw(3, "BTC-PERP", Some("BTC-PERP"), "order", "2021-01-01T00:00:01+00:00"),
            raw(1, "BTC-PERP", Some("BTC-PERP"), "order", "2021-01-01T00:00:02+00:00"),
        ];

        let result = preprocess_fills(&fills, &table()).unwrap();
        let ids: Vec<&str> = result.futures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "20", "1"]);
        assert_eq!(result.futures[0].order_id, "1003");
    }

    #[test]
    fn test_only_futures_are_rounded() {
        let fills = vec![
            raw(1, "BTC-PERP", Some("BTC-PERP"), "order", "2021-01-01T00:00:01+00:00"),
            raw(2, "BTC/USD", None, "order", "2021-01-01T00:00:01+00:00"),
        ];

        let result = preprocess_fills(&fills, &table()).unwrap();
        assert_eq!(result.futures[0].size, Decimal::from_str_canonical("0.123").unwrap());
        assert_eq!(result.spot[0].size, Decimal::from_str_canonical("0.12345").unwrap());
    }

    #[test]
    fn test_missing_precision_is_an_error() {
        let fills = vec![raw(1, "XYZ-PERP", Some("XYZ-PERP"), "order", "2021-01-01T00:00:01+00:00")];
        let err = preprocess_fills(&fills, &table()).unwrap_err();
        assert!(matches!(err, PreprocessError::Precision(_)));
    }

    #[test]
    fn test_malformed_futures_fill_is_an_error() {
        let good = raw(8, "BTC-PERP", Some("BTC-PERP"), "order", "2021-01-01T00:00:01+00:00");
        let mut bad = raw(9, "BTC-PERP", Some("BTC-PERP"), "order", "2021-01-01T00:00:01+00:00");
        bad.time = "garbage".to_string();

        let err = preprocess_fills(&[good, bad], &table()).unwrap_err();
        assert_eq!(
            err,
            PreprocessError::MalformedFill {
                id: "9".to_string(),
                market: "BTC-PERP".to_string(),
                source: RawFieldError::Time {
                    field: "time",
                    value: "garbage".to_string(),
                },
            }
        );
        assert!(err.to_string().contains("malformed fill 9 in BTC-PERP"));
    }

    #[test]
    fn test_malformed_spot_fill_is_skipped() {
        let mut bad = raw(9, "ETH/USD", None, "order", "2021-01-01T00:00:01+00:00");
        bad.size = "n/a".into();
        let good = raw(10, "ETH/USD", None, "order", "2021-01-01T00:00:01+00:00");

        let result = preprocess_fills(&[bad, good], &table()).unwrap();
        assert_eq!(result.spot.len(), 1);
        assert_eq!(result.spot[0].id.as_str(), "10");
    }

    #[test]
    fn test_preprocess_funding_sorts_by_time() {
        let raw: Vec<RawFundingPayment> = serde_json::from_value(serde_json::json!([
            {"id": 2, "future": "BTC-PERP", "payment": 0.5, "time": "2021-01-01T02:00:00+00:00"},
            {"id": 1, "future": "BTC-PERP", "payment": 0.25, "time": "2021-01-01T01:00:00+00:00"}
        ]))
        .unwrap();

        let payments = preprocess_funding(&raw);
        assert_eq!(payments.len(), 2);
        assert!(payments[0].time < payments[1].time);
    }
}
