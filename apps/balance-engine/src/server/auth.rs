//! Admin authentication and rate limiting middleware.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::backend::BackendPort;
use crate::error::EngineError;
use crate::server::http::{ApiError, AppState};
use crate::server::rate_limit::FixedWindowLimiter;

/// Gate in front of the `/api/admin/*` routes.
pub struct AdminGate {
    token: String,
    limiter: FixedWindowLimiter,
}

impl AdminGate {
    /// Create a gate requiring `token` as a bearer credential.
    #[must_use]
    pub fn new(token: String, limiter: FixedWindowLimiter) -> Self {
        Self { token, limiter }
    }

    /// Check credentials and the client's rate budget.
    ///
    /// An empty configured token fails closed: no request is admitted.
    pub fn authorize(&self, auth_header: Option<&str>, client: &str) -> Result<(), EngineError> {
        let presented = auth_header
            .and_then(|value| value.strip_prefix("Bearer "))
            .unwrap_or_default();

        if self.token.is_empty() || presented != self.token {
            warn!(client, "Rejected admin request with invalid credentials");
            return Err(EngineError::unauthorized());
        }

        if !self.limiter.check(client) {
            warn!(client, "Rejected admin request: rate limit exceeded");
            return Err(EngineError::rate_limited());
        }

        Ok(())
    }
}

/// Extract a stable client key for rate limiting.
fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map_or_else(|| "local".to_string(), |ip| ip.trim().to_string())
}

/// Middleware applied to all admin routes.
pub async fn require_admin<B: BackendPort + 'static>(
    State(state): State<AppState<B>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&request);
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    state
        .admin_gate()
        .authorize(auth_header, &client)
        .map_err(ApiError::from)?;

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cache::SystemClock;
    use crate::error::ErrorCode;
    use std::sync::Arc;
    use std::time::Duration;

    fn make_gate(token: &str, max_requests: u32) -> AdminGate {
        let limiter =
            FixedWindowLimiter::new(max_requests, Duration::from_secs(60), Arc::new(SystemClock));
        AdminGate::new(token.to_string(), limiter)
    }

    #[test]
    fn test_valid_token_passes() {
        let gate = make_gate("secret", 10);
        assert!(gate.authorize(Some("Bearer secret"), "client").is_ok());
    }

    #[test]
    fn test_missing_or_wrong_token_rejected() {
        let gate = make_gate("secret", 10);

        let err = gate.authorize(None, "client").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);

        let err = gate.authorize(Some("Bearer wrong"), "client").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);

        let err = gate.authorize(Some("secret"), "client").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[test]
    fn test_empty_configured_token_fails_closed() {
        let gate = make_gate("", 10);
        let err = gate.authorize(Some("Bearer "), "client").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[test]
    fn test_rate_limit_applies_after_auth() {
        let gate = make_gate("secret", 1);
        assert!(gate.authorize(Some("Bearer secret"), "client").is_ok());

        let err = gate
            .authorize(Some("Bearer secret"), "client")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::RateLimited);

        // Failed auth attempts do not consume the budget
        let err = gate.authorize(Some("Bearer wrong"), "other").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert!(gate.authorize(Some("Bearer secret"), "other").is_ok());
    }
}
