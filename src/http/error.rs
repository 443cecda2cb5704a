//! HTTP mapping for workflow errors.
//!
//! Body: `{"error": <message>, "kind": <kind>, "outcome"?: <ledger code>}`.

use crate::error::{ErrorKind, EscrowError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a str>,
}

impl EscrowError {
    /// HTTP status for this error.
    ///
    /// - Validation: 400
    /// - Auth: 401
    /// - Forbidden: 403
    /// - NotFound: 404
    /// - Conflict: 409
    /// - Upstream: 502, or 504 when the ledger timed out
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Upstream if matches!(self, Self::LedgerTimeout) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for EscrowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed upstream");
        }

        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
            outcome: self.outcome(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for EscrowError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            EscrowError::InvalidAmount("0".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EscrowError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            EscrowError::Forbidden { required: "TREASURY" }.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            EscrowError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EscrowError::ReleaseInFlight.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EscrowError::LedgerRejected {
                outcome: "tecNO_PERMISSION".into()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            EscrowError::LedgerTimeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[tokio::test]
    async fn test_error_body_carries_outcome() {
        let response = EscrowError::LedgerRejected {
            outcome: "tefBAD_QUORUM".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "upstream");
        assert_eq!(body["outcome"], "tefBAD_QUORUM");
        assert!(body["error"].as_str().unwrap().contains("tefBAD_QUORUM"));
    }

    #[tokio::test]
    async fn test_error_body_omits_missing_outcome() {
        let response = EscrowError::DuplicateAuthorization.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "conflict");
        assert!(body.get("outcome").is_none());
    }
}
