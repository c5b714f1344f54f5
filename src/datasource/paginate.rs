//! End-time cursor pagination with id deduplication.

use super::DataSourceError;
use crate::domain::raw::parse_time;
use crate::domain::{RawFill, RawFundingPayment};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// A record returned by a time-paginated endpoint.
pub trait PagedRecord {
    fn record_id(&self) -> String;
    fn record_time(&self) -> Option<DateTime<Utc>>;
}

impl PagedRecord for RawFill {
    fn record_id(&self) -> String {
        self.id.to_canonical()
    }

    fn record_time(&self) -> Option<DateTime<Utc>> {
        parse_time("time", &self.time).ok()
    }
}

impl PagedRecord for RawFundingPayment {
    fn record_id(&self) -> String {
        self.id.to_canonical()
    }

    fn record_time(&self) -> Option<DateTime<Utc>> {
        parse_time("time", &self.time).ok()
    }
}

/// One response page.
///
/// `received` counts the records the server sent, including any that were
/// dropped while parsing; only it decides whether the page was full.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub received: usize,
    pub records: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            received: records.len(),
            records,
        }
    }
}

/// Fetch pages newest-first until the history is exhausted.
///
/// After each page the `end_time` cursor moves to one second past the oldest
/// record in the page, so records sharing that second are requested again and
/// dropped by id. Stops on a page shorter than `limit`, an empty page, or a
/// page that adds nothing new.
pub async fn paginate<T, F, Fut>(
    limit: usize,
    end_time: Option<i64>,
    delay: Duration,
    mut fetch_page: F,
) -> Result<Vec<T>, DataSourceError>
where
    T: PagedRecord,
    F: FnMut(Option<i64>) -> Fut,
    Fut: Future<Output = Result<Page<T>, DataSourceError>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut results = Vec::new();
    let mut cursor = end_time;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(cursor).await?;
        pages += 1;

        let received = page.received;
        let oldest = page.records.iter().filter_map(PagedRecord::record_time).min();
        let mut added = 0usize;
        for record in page.records {
            if seen.insert(record.record_id()) {
                results.push(record);
                added += 1;
            }
        }
        debug!(page = pages, received, added, "fetched page");

        if received == 0 || received < limit {
            break;
        }
        if added == 0 {
            // A full page of one second's records, repeated: older history
            // may exist but the cursor cannot move past it.
            warn!(
                page = pages,
                received,
                ?cursor,
                "Full page added no new records; history before the cursor may be truncated"
            );
            break;
        }
        match oldest {
            Some(time) => cursor = Some(time.timestamp() + 1),
            None => {
                warn!(page = pages, "Page has no readable record time; stopping pagination");
                break;
            }
        }
        tokio::time::sleep(delay).await;
    }

    debug!(pages, records = results.len(), "pagination complete");
    Ok(results)
}
