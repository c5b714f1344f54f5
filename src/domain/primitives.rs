//! Domain primitives: Market, FillId, Side, Liquidity.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Exchange market symbol, e.g. "BTC-PERP", "ETH-0625" or "SOL/USD".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Market(pub String);

impl Market {
    pub fn new(market: impl Into<String>) -> Self {
        Market(market.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Underlying symbol of a futures market ("BTC-PERP" -> "BTC").
    pub fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// Quote currency of a spot market ("ETH/BTC" -> "BTC").
    pub fn quote(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, quote)| quote)
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical string form of an exchange identifier.
///
/// Exchange ids are digit-only, so appending a non-digit suffix to mark the
/// opening half of a split fill can never collide with an original id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FillId(pub String);

impl FillId {
    pub const SPLIT_SUFFIX: char = 'b';

    pub fn new(id: impl Into<String>) -> Self {
        FillId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the synthetic opening half produced from this id.
    pub fn split_suffixed(&self) -> Self {
        FillId(format!("{}{}", self.0, Self::SPLIT_SUFFIX))
    }
}

impl std::fmt::Display for FillId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Ord for FillId {
    /// Numeric order for digit ids: a shorter digit run is a smaller number.
    fn cmp(&self, other: &Self) -> Ordering {
        let digits = |s: &str| s.chars().take_while(char::is_ascii_digit).count();
        digits(&self.0)
            .cmp(&digits(&other.0))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for FillId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Trade side: Buy or Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Whether the account provided or removed liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liquidity {
    Maker,
    Taker,
}

impl std::fmt::Display for Liquidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Liquidity::Maker => write!(f, "maker"),
            Liquidity::Taker => write!(f, "taker"),
        }
    }
}
