//! Per-market decimal precision used to normalize futures fills.
//!
//! A `PrecisionTable` is plain configuration: it is built once (from the
//! built-in mainnet entries or a JSON file) and passed to the normalizer, so
//! several precision regimes can be used side by side.

use crate::domain::Market;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_FEE_DP: u32 = 6;
pub const DEFAULT_FEE_RATE_DP: u32 = 6;

/// Decimal places for each normalized fill field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPrecision {
    pub size: u32,
    pub price: u32,
    pub fee: u32,
    pub fee_rate: u32,
}

impl MarketPrecision {
    pub fn new(size: u32, price: u32) -> Self {
        Self {
            size,
            price,
            fee: DEFAULT_FEE_DP,
            fee_rate: DEFAULT_FEE_RATE_DP,
        }
    }
}

/// A traded market has no registered precision. Unrounded sizes would make
/// exact zero-crossing detection unreliable, so this is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no precision entry for market {market} (base symbol {base})")]
pub struct PrecisionLookupError {
    pub market: String,
    pub base: String,
}

#[derive(Debug, Error)]
pub enum PrecisionFileError {
    #[error("failed to read precision file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid precision table: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct PrecisionFile {
    #[serde(default = "default_fee_dp")]
    default_fee: u32,
    #[serde(default = "default_fee_rate_dp")]
    default_fee_rate: u32,
    #[serde(default)]
    markets: HashMap<String, PrecisionFileEntry>,
}

#[derive(Debug, Deserialize)]
struct PrecisionFileEntry {
    size: u32,
    price: u32,
    fee: Option<u32>,
    fee_rate: Option<u32>,
}

fn default_fee_dp() -> u32 {
    DEFAULT_FEE_DP
}

fn default_fee_rate_dp() -> u32 {
    DEFAULT_FEE_RATE_DP
}

/// Mapping from base symbol ("BTC" for "BTC-PERP" and "BTC-0625") to precision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecisionTable {
    markets: HashMap<String, MarketPrecision>,
}

impl PrecisionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_market(mut self, base: impl Into<String>, precision: MarketPrecision) -> Self {
        self.markets.insert(base.into(), precision);
        self
    }

    /// Built-in entries for the most traded mainnet futures.
    pub fn mainnet() -> Self {
        [
            ("BTC", 4, 0),
            ("ETH", 3, 1),
            ("SOL", 2, 3),
            ("BNB", 2, 3),
            ("LINK", 1, 4),
            ("DOT", 1, 4),
            ("ADA", 0, 6),
            ("XRP", 0, 6),
            ("DOGE", 0, 7),
            ("AVAX", 1, 3),
            ("MATIC", 0, 6),
            ("LTC", 2, 2),
            ("FTT", 1, 3),
        ]
        .into_iter()
        .fold(Self::new(), |table, (base, size, price)| {
            table.with_market(base, MarketPrecision::new(size, price))
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, PrecisionFileError> {
        let file: PrecisionFile = serde_json::from_str(json)?;
        let markets = file
            .markets
            .into_iter()
            .map(|(base, entry)| {
                let precision = MarketPrecision {
                    size: entry.size,
                    price: entry.price,
                    fee: entry.fee.unwrap_or(file.default_fee),
                    fee_rate: entry.fee_rate.unwrap_or(file.default_fee_rate),
                };
                (base, precision)
            })
            .collect();
        Ok(Self { markets })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PrecisionFileError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PrecisionFileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Precision for a market, looked up by its base symbol.
    pub fn lookup(&self, market: &Market) -> Result<MarketPrecision, PrecisionLookupError> {
        self.markets
            .get(market.base())
            .copied()
            .ok_or_else(|| PrecisionLookupError {
                market: market.to_string(),
                base: market.base().to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}
