//! Shared HTTP constants (headers, routes, fixed bodies).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

pub(crate) const ROUTE_INDEX: &str = "/";
pub(crate) const ROUTE_UPLOAD: &str = "/upload";
pub(crate) const ROUTE_PREVIEW: &str = "/debug/result";
pub(crate) const ROUTE_DATA: &str = "/data";
pub(crate) const ROUTE_HEALTH: &str = "/health";
pub(crate) const ROUTE_METRICS: &str = "/metrics";

pub(crate) const PLAIN_TEXT: &str = "text/plain; charset=utf-8";
pub(crate) const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

pub(crate) const RENDER_FAILURE_BODY: &str = "failed to render result";
pub(crate) const PAGE_FAILURE_BODY: &str = "failed to render page";
pub(crate) const MALFORMED_FORM_MESSAGE: &str = "the submitted form could not be read";
