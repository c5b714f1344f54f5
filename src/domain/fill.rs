//! Fill types: the raw exchange record and the typed execution leg.

use crate::domain::raw::{parse_time, RawFieldError, RawId, RawNumber};
use crate::domain::{Decimal, FillId, Liquidity, Market, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fill exactly as returned by `GET /fills`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFill {
    pub id: RawId,
    #[serde(default)]
    pub order_id: Option<RawId>,
    #[serde(default)]
    pub trade_id: Option<RawId>,
    pub market: String,
    #[serde(default)]
    pub future: Option<String>,
    #[serde(default)]
    pub base_currency: Option<String>,
    #[serde(default)]
    pub quote_currency: Option<String>,
    pub side: Side,
    pub size: RawNumber,
    pub price: RawNumber,
    pub fee: RawNumber,
    pub fee_rate: RawNumber,
    #[serde(default)]
    pub fee_currency: Option<String>,
    pub liquidity: Liquidity,
    pub time: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl RawFill {
    pub fn is_otc(&self) -> bool {
        self.kind.as_deref() == Some("otc")
    }

    /// Type the record: canonical string ids, decimal numbers, parsed time.
    ///
    /// Values are taken as-is; market precision is applied later by the
    /// normalizer.
    pub fn to_fill(&self) -> Result<Fill, RawFieldError> {
        let size = self.size.to_decimal("size")?;
        let price = self.price.to_decimal("price")?;
        Ok(Fill {
            id: FillId::new(self.id.to_canonical()),
            order_id: self
                .order_id
                .as_ref()
                .map(RawId::to_canonical)
                .unwrap_or_default(),
            trade_id: self
                .trade_id
                .as_ref()
                .map(RawId::to_canonical)
                .unwrap_or_default(),
            market: Market::new(self.market.clone()),
            future: self.future.clone().map(Market::new),
            side: self.side,
            size,
            price,
            fee: self.fee.to_decimal("fee")?,
            fee_rate: self.fee_rate.to_decimal("feeRate")?,
            fee_currency: self.fee_currency.clone().unwrap_or_default(),
            liquidity: self.liquidity,
            time: parse_time("time", &self.time)?,
            kind: self.kind.clone().unwrap_or_default(),
            volume: size * price,
        })
    }
}

/// A single execution leg with decimal fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub id: FillId,
    pub order_id: String,
    pub trade_id: String,
    pub market: Market,
    /// Present iff this is a futures execution.
    pub future: Option<Market>,
    pub side: Side,
    /// Unsigned magnitude.
    pub size: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub fee_rate: Decimal,
    pub fee_currency: String,
    pub liquidity: Liquidity,
    pub time: DateTime<Utc>,
    pub kind: String,
    /// `size * price`.
    pub volume: Decimal,
}

impl Fill {
    /// `+size` for buys, `-size` for sells.
    pub fn signed_size(&self) -> Decimal {
        match self.side {
            Side::Buy => self.size,
            Side::Sell => -self.size,
        }
    }

    pub fn is_futures(&self) -> bool {
        self.future.is_some()
    }

    /// Recompute `volume` after `size` or `price` changed.
    pub fn with_recomputed_volume(mut self) -> Self {
        self.volume = self.size * self.price;
        self
    }
}
