//! Domain types and determinism layer for the fill ledger.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: Market, FillId, Side, Liquidity
//! - Raw exchange records and their typed counterparts (fills, funding, positions)
//! - Stable fill ordering key helper for deterministic processing

pub mod decimal;
pub mod fill;
pub mod funding;
pub mod ordering;
pub mod position;
pub mod primitives;
pub mod raw;

pub use decimal::Decimal;
pub use fill::{Fill, RawFill};
pub use funding::{FundingPayment, RawFundingPayment};
pub use ordering::FillOrderingKey;
pub use position::{OpenPosition, RawPosition};
pub use primitives::{FillId, Liquidity, Market, Side};
pub use raw::{RawFieldError, RawId, RawNumber};
