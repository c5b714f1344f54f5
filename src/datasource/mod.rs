//! Data source abstraction for fetching fills, funding payments and open
//! positions from the exchange.

use crate::domain::{RawFill, RawFundingPayment, RawPosition};
use async_trait::async_trait;
use std::fmt;

pub mod auth;
pub mod ftx;
pub mod mock;
pub mod paginate;

pub use auth::FtxAuth;
pub use ftx::FtxDataSource;
pub use mock::MockDataSource;
pub use paginate::{paginate, Page, PagedRecord};

/// Data source trait for one account's history.
///
/// Implementations must handle pagination, deduplication by record id,
/// retry/backoff and rate limiting. Times are Unix seconds.
#[async_trait]
pub trait DataSource: Send + Sync + fmt::Debug {
    /// Fetch every fill, optionally restricted to one market and time window.
    async fn fetch_fills(
        &self,
        market: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<RawFill>, DataSourceError>;

    /// Fetch every funding payment, optionally restricted to one future.
    async fn fetch_funding_payments(
        &self,
        future: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<RawFundingPayment>, DataSourceError>;

    /// Fetch currently open futures positions.
    async fn fetch_positions(&self) -> Result<Vec<RawPosition>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error without an exchange error payload
    HttpError { status: u16, message: String },
    /// Invalid JSON or malformed response envelope
    ParseError(String),
    /// Rate limit exceeded after retries
    RateLimited,
    /// Credentials rejected by the exchange
    Auth(String),
    /// Error reported by the exchange in the response body
    Api(String),
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Auth(msg) => write!(f, "Auth error: {}", msg),
            DataSourceError::Api(msg) => write!(f, "API error: {}", msg),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
