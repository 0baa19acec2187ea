//! Conversion handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use diagramsnet_core::{OutputFormat, RenderTask};
use diagramsnet_worker::{ConvertError, ErrorKind};
use tracing::{error, warn};

use crate::http::responses::{ConvertParams, ErrorResponse};
use crate::state::AppState;

/// Convert the request body to SVG.
pub async fn convert_svg(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConvertParams>,
    source: String,
) -> Response {
    convert(state, OutputFormat::Svg, params, source).await
}

/// Convert the request body to PNG.
pub async fn convert_png(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConvertParams>,
    source: String,
) -> Response {
    convert(state, OutputFormat::Png, params, source).await
}

/// Fallback for every other path.
pub async fn unknown_endpoint() -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "Unknown endpoint",
        "Available endpoints are /svg and /png".to_string(),
    )
}

async fn convert(
    state: Arc<AppState>,
    format: OutputFormat,
    params: ConvertParams,
    source: String,
) -> Response {
    let task = match RenderTask::new(source, format) {
        Ok(task) => task.with_unsafe(params.allow_remote_images),
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid request", e.to_string())
        }
    };

    // Run on its own task so a client hanging up cannot skip page teardown.
    let worker = state.worker.clone();
    let conversion = tokio::spawn(async move {
        let result = worker.convert(&task).await;
        (task, result)
    });

    match conversion.await {
        Ok((_, Ok(output))) => {
            ([(header::CONTENT_TYPE, output.content_type())], output.into_bytes()).into_response()
        }
        Ok((task, Err(e))) => convert_error_response(&task, e),
        Err(e) => {
            error!(error = %e, "Conversion task failed to complete");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to convert the diagram",
                e.to_string(),
            )
        }
    }
}

fn convert_error_response(task: &RenderTask, err: ConvertError) -> Response {
    let status = match err.kind() {
        ErrorKind::Syntax => StatusCode::BAD_REQUEST,
        ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::Infrastructure => {
            warn!(task_id = %task.id(), error = %err, "Infrastructure failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.title(), err.to_string())
}

fn error_response(status: StatusCode, title: &str, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: title.to_string(),
            message,
        }),
    )
        .into_response()
}
