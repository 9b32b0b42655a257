//! HTTP server: admin validation surfaces and payment health.

pub mod auth;
pub mod http;
pub mod rate_limit;

pub use auth::AdminGate;
pub use http::{ApiError, AppState, create_router};
pub use rate_limit::FixedWindowLimiter;
