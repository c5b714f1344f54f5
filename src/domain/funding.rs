//! Funding payment records.

use crate::domain::raw::{parse_time, RawFieldError, RawId, RawNumber};
use crate::domain::{Decimal, Market};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A funding payment exactly as returned by `GET /funding_payments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFundingPayment {
    pub id: RawId,
    pub future: String,
    pub payment: RawNumber,
    pub time: String,
    #[serde(default)]
    pub rate: Option<RawNumber>,
}

impl RawFundingPayment {
    pub fn to_payment(&self) -> Result<FundingPayment, RawFieldError> {
        Ok(FundingPayment {
            future: Market::new(self.future.clone()),
            time: parse_time("time", &self.time)?,
            payment: self.payment.to_decimal("payment")?,
        })
    }
}

/// Periodic cash flow on a futures position. Positive values are paid by the
/// account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingPayment {
    pub future: Market,
    pub time: DateTime<Utc>,
    pub payment: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_funding_payment_parses() {
        let raw: RawFundingPayment = serde_json::from_value(serde_json::json!({
            "id": 55,
            "future": "ETH-PERP",
            "payment": -0.0123,
            "time": "2021-03-01T13:00:00+00:00",
            "rate": 0.00001
        }))
        .unwrap();

        let payment = raw.to_payment().unwrap();
        assert_eq!(payment.future, Market::new("ETH-PERP"));
        assert_eq!(payment.payment, Decimal::from_str_canonical("-0.0123").unwrap());
    }
}
