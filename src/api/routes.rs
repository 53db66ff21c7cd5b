//! API Routes
//!
//! Builds the router for the avatar endpoint, standalone or attached to a
//! host-owned router.

use axum::{routing::any, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{gravatar_handler, AppState};

/// Routes for the avatar endpoint only, without middleware.
///
/// Every method is routed to the handler so that origin and method checks
/// run in order and produce their own status codes.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/gravatar", any(gravatar_handler))
        .route("/gravatar/", any(gravatar_handler))
        .route("/gravatar/*account", any(gravatar_handler))
        .with_state(state)
}

/// Creates the standalone router with request tracing.
pub fn create_router(state: AppState) -> Router {
    routes(state).layer(TraceLayer::new_for_http())
}

/// Attaches the avatar endpoint to an externally owned router.
pub fn attach(router: Router, state: AppState) -> Router {
    router.merge(routes(state))
}
