use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{RunId, ValuationRequest};
use super::report::{ValuationFailureView, ValuationSummary};
use super::repository::ValuationRecordStore;
use super::service::{ValuationService, ValuationServiceError};

/// Router builder exposing HTTP endpoints for valuation runs.
pub fn valuation_router<S>(service: Arc<ValuationService<S>>) -> Router
where
    S: ValuationRecordStore + 'static,
{
    Router::new()
        .route("/api/v1/valuations", post(appraise_handler::<S>))
        .route("/api/v1/valuations/:run_id", get(record_handler::<S>))
        .with_state(service)
}

pub(crate) async fn appraise_handler<S>(
    State(service): State<Arc<ValuationService<S>>>,
    axum::Json(request): axum::Json<ValuationRequest>,
) -> Response
where
    S: ValuationRecordStore + 'static,
{
    match service.appraise(request).await {
        Ok(record) => {
            let summary = ValuationSummary::from_record(&record);
            (StatusCode::CREATED, axum::Json(summary)).into_response()
        }
        Err(ValuationServiceError::Run(failure)) => {
            let view = ValuationFailureView::from_failure(&failure);
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(view)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn record_handler<S>(
    State(service): State<Arc<ValuationService<S>>>,
    Path(run_id): Path<String>,
) -> Response
where
    S: ValuationRecordStore + 'static,
{
    let id = RunId(run_id);
    match service.get(&id) {
        Ok(Some(record)) => {
            let summary = ValuationSummary::from_record(&record);
            (StatusCode::OK, axum::Json(summary)).into_response()
        }
        Ok(None) => {
            let payload = json!({
                "run_id": id.0,
                "error": "no record for run",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
