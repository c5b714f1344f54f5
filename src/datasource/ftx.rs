//! Authenticated FTX REST client.

use super::auth::FtxAuth;
use super::paginate::{paginate, Page};
use super::{DataSource, DataSourceError};
use crate::domain::{RawFill, RawFundingPayment, RawPosition};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://ftx.com/api";
pub const DEFAULT_PAGE_LIMIT: usize = 100;
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(35);

/// Funding payments come back in fixed pages of this size; the endpoint takes
/// no `limit` parameter.
const FUNDING_PAGE_SIZE: usize = 100;

const NOT_LOGGED_IN: &str = "Not logged in";

/// What to do with a result element that does not deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnMalformed {
    Reject,
    Skip,
}

#[derive(Debug, Clone)]
pub struct FtxDataSource {
    client: Client,
    base_url: String,
    auth: FtxAuth,
    page_limit: usize,
    rate_limit: Duration,
}

impl FtxDataSource {
    pub fn new(base_url: impl Into<String>, auth: FtxAuth) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            page_limit: DEFAULT_PAGE_LIMIT,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Delay between consecutive page requests.
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    fn endpoint_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url, DataSourceError> {
        let raw = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params.iter().map(|(k, v)| (*k, v.as_str())))
        };
        url.map_err(|e| DataSourceError::Other(format!("Invalid URL {}: {}", raw, e)))
    }

    /// Signed GET returning the envelope's `result`.
    ///
    /// Each attempt is signed with a fresh timestamp. 429 and 5xx responses
    /// are retried with exponential backoff.
    async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, DataSourceError> {
        let url = self.endpoint_url(endpoint, params)?;
        let signed_path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let timestamp_ms = chrono::Utc::now().timestamp_millis();
            let headers = self
                .auth
                .headers(timestamp_ms, "GET", &signed_path, b"")
                .map_err(backoff::Error::permanent)?;

            let mut request = self.client.get(url.clone());
            for (name, value) in headers {
                request = request.header(name, value);
            }

            let response = request.send().await.map_err(|e| {
                backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }

            let body = response.text().await.map_err(|e| {
                backoff::Error::permanent(DataSourceError::NetworkError(e.to_string()))
            })?;
            parse_envelope(status.as_u16(), &body).map_err(backoff::Error::permanent)
        })
        .await
    }

    pub async fn get_fills(
        &self,
        market: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Page<RawFill>, DataSourceError> {
        let mut params = Vec::new();
        push_param(&mut params, "market", market);
        push_param(&mut params, "start_time", start_time);
        push_param(&mut params, "end_time", end_time);
        push_param(&mut params, "limit", limit);

        let result = self.get("fills", &params).await?;
        parse_records(result, "fill", OnMalformed::Reject)
    }

    pub async fn get_funding_payments(
        &self,
        future: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Page<RawFundingPayment>, DataSourceError> {
        let mut params = Vec::new();
        push_param(&mut params, "future", future);
        push_param(&mut params, "start_time", start_time);
        push_param(&mut params, "end_time", end_time);

        let result = self.get("funding_payments", &params).await?;
        parse_records(result, "funding payment", OnMalformed::Skip)
    }

    pub async fn get_positions(&self, show_avg_price: bool) -> Result<Vec<RawPosition>, DataSourceError> {
        let params = [("showAvgPrice", show_avg_price.to_string())];
        let result = self.get("positions", &params).await?;
        Ok(parse_records(result, "position", OnMalformed::Skip)?.records)
    }
}

#[async_trait]
impl DataSource for FtxDataSource {
    async fn fetch_fills(
        &self,
        market: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<RawFill>, DataSourceError> {
        debug!(?market, ?start_time, ?end_time, "Fetching fills");
        let limit = self.page_limit;
        paginate(limit, end_time, self.rate_limit, |cursor| {
            self.get_fills(market, start_time, cursor, Some(limit))
        })
        .await
    }

    async fn fetch_funding_payments(
        &self,
        future: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<RawFundingPayment>, DataSourceError> {
        debug!(?future, ?start_time, ?end_time, "Fetching funding payments");
        paginate(FUNDING_PAGE_SIZE, end_time, self.rate_limit, |cursor| {
            self.get_funding_payments(future, start_time, cursor)
        })
        .await
    }

    async fn fetch_positions(&self) -> Result<Vec<RawPosition>, DataSourceError> {
        debug!("Fetching positions");
        self.get_positions(false).await
    }
}

fn push_param<T: ToString>(params: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<T>) {
    if let Some(value) = value {
        params.push((name, value.to_string()));
    }
}

/// Unwrap the `{"success", "result", "error"}` response envelope.
pub(crate) fn parse_envelope(status: u16, body: &str) -> Result<serde_json::Value, DataSourceError> {
    let json: serde_json::Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) if (200..300).contains(&status) => {
            return Err(DataSourceError::ParseError(e.to_string()));
        }
        Err(_) => {
            return Err(DataSourceError::HttpError {
                status,
                message: body.chars().take(200).collect(),
            });
        }
    };

    let success = json.get("success").and_then(|v| v.as_bool()).unwrap_or(true);
    if !success || !(200..300).contains(&status) {
        let message = json
            .get("error")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        return Err(match message {
            Some(m) if m == NOT_LOGGED_IN => DataSourceError::Auth(m),
            Some(m) => DataSourceError::Api(m),
            None => DataSourceError::HttpError {
                status,
                message: "Request failed".to_string(),
            },
        });
    }

    json.get("result")
        .cloned()
        .ok_or_else(|| DataSourceError::ParseError("Missing result field".to_string()))
}

/// Deserialize each element of a result array.
///
/// The page keeps the element count of the response even when malformed
/// elements are skipped.
fn parse_records<T: DeserializeOwned>(
    result: serde_json::Value,
    what: &str,
    on_malformed: OnMalformed,
) -> Result<Page<T>, DataSourceError> {
    let items = match result {
        serde_json::Value::Array(items) => items,
        _ => {
            return Err(DataSourceError::ParseError(
                "Expected array response".to_string(),
            ))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match T::deserialize(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                let label = item
                    .get("id")
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| format!("at index {}", index));
                match on_malformed {
                    OnMalformed::Reject => {
                        return Err(DataSourceError::ParseError(format!(
                            "Malformed {} {}: {}",
                            what, label, e
                        )));
                    }
                    OnMalformed::Skip => warn!("Skipping malformed {} {}: {}", what, label, e),
                }
            }
        }
    }
    Ok(Page {
        received: items.len(),
        records,
    })
}
