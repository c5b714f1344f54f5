//! Time-indexed funding payments for interval attribution.

use crate::domain::{Decimal, FundingPayment, Market};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Funding payments grouped per future and sorted by time.
#[derive(Debug, Clone, Default)]
pub struct FundingIndex {
    by_future: HashMap<Market, Vec<FundingPayment>>,
}

impl FundingIndex {
    pub fn new(payments: impl IntoIterator<Item = FundingPayment>) -> Self {
        let mut by_future: HashMap<Market, Vec<FundingPayment>> = HashMap::new();
        for payment in payments {
            by_future
                .entry(payment.future.clone())
                .or_default()
                .push(payment);
        }
        for series in by_future.values_mut() {
            series.sort_by(|a, b| a.time.cmp(&b.time));
        }
        Self { by_future }
    }

    pub fn series(&self, future: &Market) -> &[FundingPayment] {
        self.by_future
            .get(future)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sum of payments with `start <= time <= end`.
    pub fn sum_between(&self, future: &Market, start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
        let series = self.series(future);
        let lo = series.partition_point(|p| p.time < start);
        let hi = series.partition_point(|p| p.time <= end);
        if lo >= hi {
            return Decimal::zero();
        }
        series[lo..hi].iter().map(|p| p.payment).sum()
    }

    /// Sum of every payment for the future.
    pub fn total(&self, future: &Market) -> Decimal {
        self.series(future).iter().map(|p| p.payment).sum()
    }
}
