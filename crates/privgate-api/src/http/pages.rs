//! Upload form and synthetic result preview.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::ACCEPT};
use axum::response::Response;
use privgate_pipeline::RenderFormat;
use tracing::{error, info};

use crate::http::errors::{ApiError, document_response};
use crate::state::ApiState;

pub(crate) fn requested_format(headers: &HeaderMap) -> RenderFormat {
    RenderFormat::from_accept(headers.get(ACCEPT).and_then(|value| value.to_str().ok()))
}

pub(crate) async fn index(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.renderer().render_index().await {
        Ok(document) => Ok(document_response(StatusCode::OK, document)),
        Err(err) => {
            error!(error = %err, "failed to render upload form");
            Err(ApiError::page_failure())
        }
    }
}

pub(crate) async fn preview(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    info!("rendering synthetic result");
    match state.renderer().render_synthetic(requested_format(&headers)).await {
        Ok(document) => Ok(document_response(StatusCode::OK, document)),
        Err(err) => {
            error!(error = %err, "failed to render synthetic result");
            Err(ApiError::render_failure())
        }
    }
}
