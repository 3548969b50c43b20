//! Multipart intake for `POST /upload`.
//!
//! # Design
//! - The dataset field is buffered in memory; the route's body limit bounds it.
//! - The first `dataset` part with a file name and the first `epsilon` part win;
//!   other parts are skipped. An empty file name means no file was picked.
//! - Pipeline failures are answered with `200` and the failure document. Bodies over
//!   the ceiling get `413` with the same kind of document.

use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use privgate_pipeline::model::{DATASET_FIELD, EPSILON_FIELD};
use privgate_pipeline::{
    DatasetUpload, PipelineError, RenderFormat, RenderOutcome, UploadRequest,
};
use tracing::{error, info, warn};

use crate::http::constants::MALFORMED_FORM_MESSAGE;
use crate::http::errors::{ApiError, document_response};
use crate::http::pages::requested_format;
use crate::state::ApiState;

pub(crate) async fn upload(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let format = requested_format(&headers);
    let request = match multipart {
        Ok(multipart) => match read_upload(multipart).await {
            Ok(request) => request,
            Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                warn!(limit = state.max_upload_bytes(), "upload exceeds body limit");
                state.metrics.inc_pipeline_failure("upload_too_large");
                let message = format!(
                    "the dataset exceeds the upload limit of {} bytes",
                    state.max_upload_bytes()
                );
                return reject(&state, StatusCode::PAYLOAD_TOO_LARGE, &message, format).await;
            }
            Err(err) => {
                warn!(error = %err, "failed to read multipart body");
                state.metrics.inc_pipeline_failure("malformed_form");
                return reject(&state, StatusCode::OK, MALFORMED_FORM_MESSAGE, format).await;
            }
        },
        Err(rejection) => {
            warn!(error = %rejection, "request is not a multipart form");
            state.metrics.inc_pipeline_failure("malformed_form");
            return reject(&state, StatusCode::OK, MALFORMED_FORM_MESSAGE, format).await;
        }
    };

    match state.orchestrator.run_and_render(request, format).await {
        Ok(rendered) => {
            let run = &rendered.run;
            info!(
                stage = run.stage().as_str(),
                success = run.outcome().is_success(),
                failure = run.failure().map_or("", PipelineError::kind),
                stored = %run
                    .stored_dataset()
                    .map(|stored| stored.path().display().to_string())
                    .unwrap_or_default(),
                "upload handled"
            );
            Ok(document_response(StatusCode::OK, rendered.document))
        }
        Err(err) => {
            error!(error = %err, "failed to render upload outcome");
            Err(ApiError::render_failure())
        }
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, MultipartError> {
    let mut request = UploadRequest::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(DATASET_FIELD) if request.dataset.is_none() => {
                let declared_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                let payload = field.bytes().await?;
                request.dataset = declared_name.map(|declared_name| DatasetUpload {
                    declared_name,
                    payload,
                });
            }
            Some(EPSILON_FIELD) if request.epsilon.is_none() => {
                request.epsilon = Some(field.text().await?);
            }
            _ => {}
        }
    }
    Ok(request)
}

async fn reject(
    state: &ApiState,
    status: StatusCode,
    message: &str,
    format: RenderFormat,
) -> Result<Response, ApiError> {
    match state
        .renderer()
        .render(&RenderOutcome::failure(message), format)
        .await
    {
        Ok(document) => Ok(document_response(status, document)),
        Err(err) => {
            error!(error = %err, "failed to render upload rejection");
            Err(ApiError::render_failure())
        }
    }
}
