//! Plain-text error responses and document responses.

use axum::http::{StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use privgate_pipeline::RenderedDocument;

use crate::http::constants::{PAGE_FAILURE_BODY, PLAIN_TEXT, RENDER_FAILURE_BODY};

/// Error surfaced when no document could be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    pub(crate) const fn render_failure() -> Self {
        Self::internal(RENDER_FAILURE_BODY)
    }

    pub(crate) const fn page_failure() -> Self {
        Self::internal(PAGE_FAILURE_BODY)
    }

    pub(crate) const fn internal(message: &'static str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, [(CONTENT_TYPE, PLAIN_TEXT)], self.message).into_response()
    }
}

pub(crate) fn document_response(status: StatusCode, document: RenderedDocument) -> Response {
    (status, [(CONTENT_TYPE, document.content_type)], document.body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_failure_is_plain_text_500() {
        let response = ApiError::render_failure().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some(PLAIN_TEXT)
        );
    }

    #[test]
    fn document_response_keeps_content_type() {
        let response = document_response(
            StatusCode::OK,
            RenderedDocument {
                content_type: "application/json; charset=utf-8",
                body: "{}".to_string(),
            },
        );
        assert_eq!(
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json; charset=utf-8")
        );
    }
}
