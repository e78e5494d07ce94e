use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tracing::error;

use facit_extract::{ExtractRequest, InvoiceOracle, InvoicePipeline, Outcome, PipelineError};
use facit_ledger::{FileLedger, LedgerStore};

/// Shared state. The pipeline is absent when the extraction credential was
/// missing at startup; requests then fail with a configuration error.
pub struct AppState<O: InvoiceOracle> {
    pub pipeline: Option<Arc<InvoicePipeline<O>>>,
    pub ledger: Arc<FileLedger>,
}

impl<O: InvoiceOracle> Clone for AppState<O> {
    fn clone(&self) -> Self {
        Self { pipeline: self.pipeline.clone(), ledger: self.ledger.clone() }
    }
}

pub fn router<O: InvoiceOracle + 'static>(state: AppState<O>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/process_invoice", post(process_invoice::<O>))
        .with_state(state)
}

/// Liveness probe.
async fn health() -> &'static str {
    "OK"
}

/// One pipeline pass per request. Validation rejections come back as 200
/// with `status: "error"`; callers distinguish them by inspecting the body,
/// not the transport code. Only input, configuration, and oracle failures
/// surface as non-200.
async fn process_invoice<O: InvoiceOracle>(
    State(state): State<AppState<O>>,
    Json(request): Json<ExtractRequest>,
) -> Response {
    let Some(pipeline) = &state.pipeline else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Server configuration error: missing extraction API key" })),
        )
            .into_response();
    };

    match pipeline.process(&request).await {
        Ok(processed) => {
            // Append failures are logged, never fatal to the request.
            if let Err(e) = state.ledger.append(&processed.csv_row).await {
                error!("ledger append failed: {e}");
            }
            let status = match processed.outcome {
                Outcome::Accepted => "success",
                Outcome::Rejected { .. } => "error",
            };
            (
                StatusCode::OK,
                Json(json!({
                    "status": status,
                    "data": processed.record,
                    "csv_row": processed.csv_row,
                })),
            )
                .into_response()
        }
        Err(e @ PipelineError::NoInput) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(PipelineError::Oracle(e)) => {
            error!("extraction failed: {e}");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}
