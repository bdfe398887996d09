// Plutus — HTTP error responses
//
// Every failure is rendered as `{"error": <message>, "field"?: <name>}` with
// a fixed message per kind. RPC and storage details go to the log only.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::types::ErrorBody;
use crate::custody::CustodyError;
use crate::rpc::RpcError;
use crate::throttle::ThrottleError;

pub const REQUEST_FAILED: &str = "The request failed, please try again";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    field: Option<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status,
            message,
            field: None,
        }
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn missing_field(field: &'static str) -> Self {
        Self::bad_request("Missing or malformed field").with_field(field)
    }

    pub fn invalid_address(field: &'static str) -> Self {
        Self::bad_request("Invalid bitcoin address detected").with_field(field)
    }

    pub fn invalid_amount(field: &'static str) -> Self {
        Self::bad_request("Invalid bitcoin value detected").with_field(field)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Missing or invalid API credential")
    }

    /// A wallet node call failed. The cause is logged, the caller gets
    /// `message`.
    pub fn upstream(message: &'static str, err: &RpcError) -> Self {
        tracing::warn!(error = %err, "Wallet node call failed");
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn field(&self) -> Option<&'static str> {
        self.field
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message.to_string(),
            field: self.field,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // The rejection text can quote the body; keep it out of the response.
        tracing::debug!(status = %rejection.status(), "Rejected request body");
        Self::bad_request("Invalid request body")
    }
}

impl From<ThrottleError> for ApiError {
    fn from(err: ThrottleError) -> Self {
        tracing::warn!(error = %err, "Request refused by throttle");
        Self::new(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded, please retry later")
    }
}

impl From<CustodyError> for ApiError {
    fn from(err: CustodyError) -> Self {
        let field = err.field();
        let (status, message) = match &err {
            CustodyError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Missing or malformed field"),
            CustodyError::PublicKeyNotFound { .. } => (StatusCode::NOT_FOUND, "Failed to find a public key"),
            CustodyError::InvalidPublicKey { .. } => (StatusCode::BAD_REQUEST, "Invalid public key"),
            CustodyError::NoOperatorKeysConfigured => {
                tracing::error!("Escrow requested but no operator keys are configured");
                (StatusCode::SERVICE_UNAVAILABLE, "Escrow signing is not configured")
            }
            CustodyError::DuplicateSignerKey => (
                StatusCode::CONFLICT,
                "Customer, vendor and operator keys must be distinct",
            ),
            CustodyError::DuplicateOperatorKey => (StatusCode::CONFLICT, "Operator key is already registered"),
            CustodyError::DuplicateLabel { .. } => {
                (StatusCode::CONFLICT, "Label is already bound to a different address")
            }
            CustodyError::ProvisioningInProgress => {
                (StatusCode::CONFLICT, "Escrow provisioning already in progress")
            }
            CustodyError::ProvisioningFailed(_) | CustodyError::Rpc(_) => {
                tracing::warn!(error = %err, "Wallet node call failed");
                (StatusCode::BAD_GATEWAY, REQUEST_FAILED)
            }
            CustodyError::CredentialStoreUnavailable(_) => {
                tracing::error!(error = %err, "Credential store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable")
            }
            // PersistenceFailed has already been reported for reconciliation.
            CustodyError::PersistenceFailed { .. } | CustodyError::Aborted(_) | CustodyError::Store(_) => {
                tracing::error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, REQUEST_FAILED)
            }
        };

        Self {
            status,
            message,
            field,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
