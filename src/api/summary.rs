use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_window, AppState};
use crate::engine::{FuturesSummaryRow, SpotSummaryRow};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub market: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse<T> {
    pub rows: Vec<T>,
}

pub async fn get_futures_summary(
    Query(params): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse<FuturesSummaryRow>>, AppError> {
    let window = parse_window(params.market, params.start_time, params.end_time)?;
    let report = state.reconciler.reconcile(&window).await?;
    Ok(Json(SummaryResponse {
        rows: report.futures_summary,
    }))
}

pub async fn get_spot_summary(
    Query(params): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse<SpotSummaryRow>>, AppError> {
    let window = parse_window(params.market, params.start_time, params.end_time)?;
    let report = state.reconciler.reconcile(&window).await?;
    Ok(Json(SummaryResponse {
        rows: report.spot_summary,
    }))
}
