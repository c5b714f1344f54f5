//! Currently open futures positions, used to back out unrealized cost from
//! account summaries.

use crate::domain::raw::{RawFieldError, RawNumber};
use crate::domain::{Decimal, Market};
use serde::{Deserialize, Serialize};

/// A position as returned by `GET /positions`. Only the fields the summaries
/// consume are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    pub future: String,
    #[serde(default)]
    pub cost: Option<RawNumber>,
    #[serde(default)]
    pub net_size: Option<RawNumber>,
}

impl RawPosition {
    pub fn to_position(&self) -> Result<OpenPosition, RawFieldError> {
        let cost = self
            .cost
            .as_ref()
            .ok_or(RawFieldError::Missing("cost"))?
            .to_decimal("cost")?;
        let net_size = match &self.net_size {
            Some(n) => n.to_decimal("netSize")?,
            None => Decimal::zero(),
        };
        Ok(OpenPosition {
            future: Market::new(self.future.clone()),
            cost,
            net_size,
        })
    }
}

/// Signed entry cost of an open position: positive for longs, negative for
/// shorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub future: Market,
    pub cost: Decimal,
    pub net_size: Decimal,
}
