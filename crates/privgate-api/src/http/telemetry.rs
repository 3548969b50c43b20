//! Per-route request accounting.
//!
//! Every request is filed under one of the fixed routes below, so the
//! `http_requests_total` label set stays bounded no matter which stored file is
//! fetched from `/data`. The request id and route are scoped around the handler
//! so pipeline logs carry them.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::response::Response;
use privgate_telemetry::{Metrics, with_request_context};
use tower::{Layer, Service};
use tracing::warn;

use crate::http::constants::{
    HEADER_REQUEST_ID, ROUTE_DATA, ROUTE_HEALTH, ROUTE_INDEX, ROUTE_METRICS, ROUTE_PREVIEW,
    ROUTE_UPLOAD,
};

/// Route families the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteClass {
    Form,
    Upload,
    Preview,
    Retrieval,
    Health,
    Metrics,
    Unmatched,
}

impl RouteClass {
    /// File a request by its matched route, falling back to the raw path.
    pub(crate) fn classify(matched: Option<&str>, path: &str) -> Self {
        let route = matched.unwrap_or(path);
        match route {
            ROUTE_INDEX => Self::Form,
            ROUTE_UPLOAD => Self::Upload,
            ROUTE_PREVIEW => Self::Preview,
            ROUTE_HEALTH => Self::Health,
            ROUTE_METRICS => Self::Metrics,
            other
                if other
                    .strip_prefix(ROUTE_DATA)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')) =>
            {
                Self::Retrieval
            }
            _ => Self::Unmatched,
        }
    }

    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Form => ROUTE_INDEX,
            Self::Upload => ROUTE_UPLOAD,
            Self::Preview => ROUTE_PREVIEW,
            Self::Retrieval => ROUTE_DATA,
            Self::Health => ROUTE_HEALTH,
            Self::Metrics => ROUTE_METRICS,
            Self::Unmatched => "unmatched",
        }
    }

    /// Routes whose responses come out of the renderer.
    const fn renders_documents(self) -> bool {
        matches!(self, Self::Form | Self::Upload | Self::Preview)
    }
}

#[derive(Clone)]
pub(crate) struct RouteMetricsLayer {
    metrics: Metrics,
}

impl RouteMetricsLayer {
    pub(crate) const fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for RouteMetricsLayer {
    type Service = RouteMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RouteMetricsService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct RouteMetricsService<S> {
    inner: S,
    metrics: Metrics,
}

impl<S, B> Service<Request<B>> for RouteMetricsService<S>
where
    S: Service<Request<B>, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let class = RouteClass::classify(
            req.extensions().get::<MatchedPath>().map(MatchedPath::as_str),
            req.uri().path(),
        );
        let request_id = req
            .headers()
            .get(HEADER_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let metrics = self.metrics.clone();
        let fut = self.inner.call(req);

        Box::pin(with_request_context(request_id, class.label(), async move {
            let response = fut.await?;
            let status = response.status();
            if status.is_server_error() && class.renders_documents() {
                warn!(route = class.label(), status = status.as_u16(), "document route failed");
            }
            metrics.inc_http_request(class.label(), status.as_u16());
            Ok(response)
        }))
    }
}
