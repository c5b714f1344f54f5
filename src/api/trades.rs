use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{parse_window, AppState};
use crate::domain::Decimal;
use crate::engine::Trade;
use crate::error::AppError;

pub const CSV_HEADER: [&str; 11] = [
    "market",
    "trade_nr",
    "raw_pnl",
    "fee",
    "funding",
    "rpnl",
    "executions",
    "volume",
    "start",
    "end",
    "duration",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesQuery {
    pub market: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Serialize)]
pub struct TradesResponse {
    pub trades: BTreeMap<String, Vec<TradeRow>>,
}

/// One closed trade, decimals as canonical strings.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRow {
    pub market: String,
    pub trade_nr: u64,
    pub raw_pnl: String,
    pub fee: String,
    pub funding: String,
    pub rpnl: String,
    pub executions: usize,
    pub volume: String,
    pub start: String,
    pub end: String,
    /// Seconds.
    pub duration: String,
}

impl From<&Trade> for TradeRow {
    fn from(t: &Trade) -> Self {
        let duration_ms = t.duration.num_milliseconds();
        let duration = Decimal::new(rust_decimal::Decimal::new(duration_ms, 3));
        TradeRow {
            market: t.market.to_string(),
            trade_nr: t.trade_nr,
            raw_pnl: t.raw_pnl.to_canonical_string(),
            fee: t.fee.to_canonical_string(),
            funding: t.funding.to_canonical_string(),
            rpnl: t.rpnl.to_canonical_string(),
            executions: t.executions,
            volume: t.volume.to_canonical_string(),
            start: t.start.to_rfc3339(),
            end: t.end.to_rfc3339(),
            duration: duration.to_canonical_string(),
        }
    }
}

pub async fn get_trades(
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let format = match params.format.as_deref() {
        None | Some("") | Some("json") => OutputFormat::Json,
        Some("csv") => OutputFormat::Csv,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "format must be json or csv, got {}",
                other
            )))
        }
    };
    let window = parse_window(params.market, params.start_time, params.end_time)?;

    let report = state.reconciler.reconcile(&window).await?;
    let trades: BTreeMap<String, Vec<TradeRow>> = report
        .futures_trades
        .iter()
        .map(|(market, trades)| (market.to_string(), trades.iter().map(TradeRow::from).collect()))
        .collect();

    match format {
        OutputFormat::Json => Ok(Json(TradesResponse { trades }).into_response()),
        OutputFormat::Csv => {
            let body = to_csv(trades.values().flatten())?;
            Ok(([(header::CONTENT_TYPE, "text/csv")], body).into_response())
        }
    }
}

/// Render rows as CSV. The header is written even when there are no rows.
pub fn to_csv<'a>(rows: impl IntoIterator<Item = &'a TradeRow>) -> Result<String, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
}
