//! Rounds futures fills to their market's configured precision.

use crate::domain::Fill;
use crate::precision::{MarketPrecision, PrecisionLookupError, PrecisionTable};
use std::collections::HashMap;
use tracing::debug;

/// Applies a `PrecisionTable` to futures fills.
#[derive(Debug, Clone, Copy)]
pub struct FillNormalizer<'a> {
    table: &'a PrecisionTable,
}

impl<'a> FillNormalizer<'a> {
    pub fn new(table: &'a PrecisionTable) -> Self {
        Self { table }
    }

    /// Round `size`, `price`, `fee` and `fee_rate` of every fill and recompute
    /// `volume`.
    ///
    /// Every market is resolved before any fill is touched, so a missing
    /// precision entry fails the whole batch.
    pub fn normalize(&self, fills: Vec<Fill>) -> Result<Vec<Fill>, PrecisionLookupError> {
        let mut resolved: HashMap<String, MarketPrecision> = HashMap::new();
        for fill in &fills {
            if !resolved.contains_key(fill.market.as_str()) {
                let precision = self.table.lookup(&fill.market)?;
                resolved.insert(fill.market.to_string(), precision);
            }
        }
        debug!(
            markets = resolved.len(),
            fills = fills.len(),
            "normalizing futures fills"
        );

        Ok(fills
            .into_iter()
            .map(|fill| {
                let precision = resolved[fill.market.as_str()];
                round_fill(fill, precision)
            })
            .collect())
    }
}

fn round_fill(mut fill: Fill, precision: MarketPrecision) -> Fill {
    fill.size = fill.size.round_dp(precision.size);
    fill.price = fill.price.round_dp(precision.price);
    fill.fee = fill.fee.round_dp(precision.fee);
    fill.fee_rate = fill.fee_rate.round_dp(precision.fee_rate);
    fill.with_recomputed_volume()
}
