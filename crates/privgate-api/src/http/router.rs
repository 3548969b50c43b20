//! Router construction and server host.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{Method, Request, header::CONTENT_TYPE};
use axum::routing::{get, post};
use privgate_telemetry::{build_sha, request_id_layers};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::{
    HEADER_REQUEST_ID, ROUTE_DATA, ROUTE_HEALTH, ROUTE_INDEX, ROUTE_METRICS, ROUTE_PREVIEW,
    ROUTE_UPLOAD,
};
use crate::http::health::{health, metrics};
use crate::http::pages::{index, preview};
use crate::http::telemetry::RouteMetricsLayer;
use crate::http::upload::upload;
use crate::state::ApiState;

/// Axum router wrapper hosting the upload surface.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router around `state`.
    #[must_use]
    pub fn new(state: ApiState) -> Self {
        let metrics = state.metrics.clone();
        let state = Arc::new(state);
        let (set_request_id, propagate_request_id) = request_id_layers();
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(set_request_id)
            .layer(propagate_request_id)
            .layer(trace_layer)
            .layer(RouteMetricsLayer::new(metrics));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE]);

        let router = Self::routes(&state)
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);
        Self { router }
    }

    fn routes(state: &Arc<ApiState>) -> Router<Arc<ApiState>> {
        Router::new()
            .route(ROUTE_INDEX, get(index))
            .route(
                ROUTE_UPLOAD,
                post(upload).layer(DefaultBodyLimit::max(state.max_upload_bytes())),
            )
            .route(ROUTE_PREVIEW, get(preview))
            .route(ROUTE_HEALTH, get(health))
            .route(ROUTE_METRICS, get(metrics))
            .nest_service(ROUTE_DATA, ServeDir::new(state.storage_root()))
    }

    /// Router with all layers applied.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind `addr` and serve until the process stops.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::Bind`] if the listener cannot be bound and
    /// [`ApiServerError::Serve`] if the server stops with an IO error.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "serving http");
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}
