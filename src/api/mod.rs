//! API Module
//!
//! HTTP handler and routing for the avatar redirect endpoint.
//!
//! # Endpoints
//! - `GET /gravatar/{account}` - Redirect to the account's avatar

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{attach, create_router, routes};
