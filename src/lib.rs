pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod precision;

pub use config::Config;
pub use datasource::{DataSource, DataSourceError, FtxAuth, FtxDataSource, MockDataSource};
pub use domain::{Decimal, Fill, FillId, Liquidity, Market, RawFill, Side};
pub use engine::{FirstFillPolicy, Trade, TradeSegmenter};
pub use error::AppError;
pub use orchestration::{AccountReport, ReconcileError, ReconcileWindow, Reconciler};
pub use precision::{MarketPrecision, PrecisionLookupError, PrecisionTable};
