pub mod health;
pub mod summary;
pub mod trades;

use crate::error::AppError;
use crate::orchestration::{ReconcileWindow, Reconciler};
use crate::precision::PrecisionTable;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub precision: Arc<PrecisionTable>,
}

impl AppState {
    pub fn new(reconciler: Arc<Reconciler>, precision: Arc<PrecisionTable>) -> Self {
        Self {
            reconciler,
            precision,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/trades", get(trades::get_trades))
        .route("/v1/summary/futures", get(summary::get_futures_summary))
        .route("/v1/summary/spot", get(summary::get_spot_summary))
        .layer(cors)
        .with_state(state)
}

/// Validate query parameters into a reconciliation window.
pub(crate) fn parse_window(
    market: Option<String>,
    start_time: Option<i64>,
    end_time: Option<i64>,
) -> Result<ReconcileWindow, AppError> {
    if let (Some(start), Some(end)) = (start_time, end_time) {
        if start > end {
            return Err(AppError::BadRequest(
                "startTime must not be after endTime".into(),
            ));
        }
    }
    let market = market
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    Ok(ReconcileWindow {
        market,
        start_time,
        end_time,
    })
}
