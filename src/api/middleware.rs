// Plutus — Request middleware
//
// Per-route throttling and bearer credential checks.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::{ApiError, AppState};
use crate::throttle::RequestThrottle;

/// One route's throttle, shared by every request to that route.
#[derive(Clone)]
pub struct ThrottleGate {
    pub throttle: Arc<RequestThrottle>,
    pub max_wait: Duration,
}

pub async fn throttle_requests(
    State(gate): State<ThrottleGate>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate.throttle.acquire_within(gate.max_wait).await?;
    Ok(next.run(req).await)
}

pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    let Some(token) = presented else {
        return Err(ApiError::unauthorized());
    };
    if !state.credentials.validate(token)? {
        tracing::warn!(path = %req.uri().path(), "Rejected request with invalid API credential");
        return Err(ApiError::unauthorized());
    }

    Ok(next.run(req).await)
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
