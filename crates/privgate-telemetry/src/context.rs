//! Request and process context propagation.
//!
//! # Design
//! - Request identifiers and matched routes live in task-local storage so pipeline
//!   code can tag its logs without threading the values through every call.
//! - One process-wide span carries the service role and build identifier.

use std::future::Future;
use std::sync::Arc;

use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the process-level span entered until dropped.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the `service` span tagged with `role` and the build identifier.
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        let role = role.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("service", role = %role, build_sha = %build_sha()),
        ));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Generator and propagator layers for `x-request-id`.
///
/// Apply the generator outside the propagator: the id must exist on the request
/// before the propagator copies it onto the response.
#[must_use]
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
        PropagateRequestIdLayer::x_request_id(),
    )
}

/// Request identifier of the in-flight request, if any.
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST
        .try_with(|ctx| ctx.request_id.to_string())
        .ok()
}

/// Matched route of the in-flight request, if any.
#[must_use]
pub fn current_route() -> Option<String> {
    ACTIVE_REQUEST.try_with(|ctx| ctx.route.to_string()).ok()
}

/// Run `fut` with the request identifier and route visible to [`current_request_id`]
/// and [`current_route`].
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext {
        request_id: Arc::from(request_id.into()),
        route: Arc::from(route.into()),
    };
    ACTIVE_REQUEST.scope(context, fut).await
}

#[derive(Clone)]
struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

tokio::task_local! {
    static ACTIVE_REQUEST: RequestContext;
}
