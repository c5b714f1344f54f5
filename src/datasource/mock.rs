//! Mock data source for testing without network calls.

use super::paginate::PagedRecord;
use super::{DataSource, DataSourceError};
use crate::domain::{RawFill, RawFundingPayment, RawPosition};
use async_trait::async_trait;

/// Mock data source that returns predefined raw records.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    fills: Vec<RawFill>,
    funding: Vec<RawFundingPayment>,
    positions: Vec<RawPosition>,
    failure: Option<DataSourceError>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fill(mut self, fill: RawFill) -> Self {
        self.fills.push(fill);
        self
    }

    pub fn with_fills(mut self, fills: Vec<RawFill>) -> Self {
        self.fills.extend(fills);
        self
    }

    pub fn with_funding(mut self, funding: Vec<RawFundingPayment>) -> Self {
        self.funding.extend(funding);
        self
    }

    pub fn with_positions(mut self, positions: Vec<RawPosition>) -> Self {
        self.positions.extend(positions);
        self
    }

    /// Make every fetch fail with `error`.
    pub fn with_failure(mut self, error: DataSourceError) -> Self {
        self.failure = Some(error);
        self
    }

    fn check_failure(&self) -> Result<(), DataSourceError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn in_window<T: PagedRecord>(record: &T, start_time: Option<i64>, end_time: Option<i64>) -> bool {
    let Some(time) = record.record_time() else {
        return true;
    };
    let secs = time.timestamp();
    start_time.map_or(true, |s| secs >= s) && end_time.map_or(true, |e| secs <= e)
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch_fills(
        &self,
        market: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<RawFill>, DataSourceError> {
        self.check_failure()?;
        Ok(self
            .fills
            .iter()
            .filter(|f| market.map_or(true, |m| f.market == m))
            .filter(|f| in_window(*f, start_time, end_time))
            .cloned()
            .collect())
    }

    async fn fetch_funding_payments(
        &self,
        future: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<RawFundingPayment>, DataSourceError> {
        self.check_failure()?;
        Ok(self
            .funding
            .iter()
            .filter(|p| future.map_or(true, |f| p.future == f))
            .filter(|p| in_window(*p, start_time, end_time))
            .cloned()
            .collect())
    }

    async fn fetch_positions(&self) -> Result<Vec<RawPosition>, DataSourceError> {
        self.check_failure()?;
        Ok(self.positions.clone())
    }
}
