//! Structured API error responses with error codes
//!
//! Every failure leaves the gateway as
//! `{success: false, message, error: {code, numeric_code, kind, details?}}`
//! plus an `x-error-code` header. Messages are redacted before they are
//! serialized.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::crypto::redact_private_keys;
use crate::infra::{ErrorKind, GatewayError, UpstreamService};

// ============================================================================
// Error Codes
// ============================================================================

/// Stable, machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation (3xxx)
    /// Request body is malformed
    InvalidRequestBody,
    /// Required field is missing or empty
    MissingRequiredField,

    // Resource (4xxx)
    /// The ledger reports the record as absent
    RecordNotFound,

    // Ledger lifecycle (6xxx)
    /// Connection phase is not `Connected`
    LedgerNotReady,
    /// Every connect attempt failed
    ConnectionFailed,
    /// Identity bootstrap failed
    EnrollmentFailed,

    // Upstream (8xxx)
    /// Ledger rejected or failed a transaction
    LedgerError,
    /// Read-only ledger query failed
    QueryFailed,
    /// Projection store failed
    DatabaseError,
    /// Content store failed
    ContentStoreError,
    /// Reference data could not be fetched
    ReferenceDataError,
    /// Certificate authority failed
    CertificateAuthorityError,
    /// Ledger committed, projection missing
    PartialWrite,
    /// Operation timed out
    Timeout,
    /// Server misconfiguration
    ConfigurationError,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::MissingRequiredField => 3002,

            ErrorCode::RecordNotFound => 4001,

            ErrorCode::LedgerNotReady => 6001,
            ErrorCode::ConnectionFailed => 6002,
            ErrorCode::EnrollmentFailed => 6003,

            ErrorCode::LedgerError => 8001,
            ErrorCode::QueryFailed => 8002,
            ErrorCode::DatabaseError => 8003,
            ErrorCode::ContentStoreError => 8004,
            ErrorCode::ReferenceDataError => 8005,
            ErrorCode::CertificateAuthorityError => 8006,
            ErrorCode::PartialWrite => 8007,
            ErrorCode::Timeout => 8008,
            ErrorCode::ConfigurationError => 8998,
            ErrorCode::InternalError => 8999,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequestBody | ErrorCode::MissingRequiredField => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::RecordNotFound => StatusCode::NOT_FOUND,
            ErrorCode::LedgerNotReady | ErrorCode::ConnectionFailed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorCode::PartialWrite => StatusCode::MULTI_STATUS,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::EnrollmentFailed
            | ErrorCode::LedgerError
            | ErrorCode::QueryFailed
            | ErrorCode::DatabaseError
            | ErrorCode::ContentStoreError
            | ErrorCode::ReferenceDataError
            | ErrorCode::CertificateAuthorityError
            | ErrorCode::ConfigurationError
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCode::LedgerNotReady => "LEDGER_NOT_READY",
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::EnrollmentFailed => "ENROLLMENT_FAILED",
            ErrorCode::LedgerError => "LEDGER_ERROR",
            ErrorCode::QueryFailed => "QUERY_FAILED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ContentStoreError => "CONTENT_STORE_ERROR",
            ErrorCode::ReferenceDataError => "REFERENCE_DATA_ERROR",
            ErrorCode::CertificateAuthorityError => "CERTIFICATE_AUTHORITY_ERROR",
            ErrorCode::PartialWrite => "PARTIAL_WRITE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Error body
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Always false
    pub success: bool,
    pub message: String,
    pub error: ErrorDetails,
    /// Set on partial writes: the ledger holds the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_committed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: redact_private_keys(&message.into()),
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                kind,
                details: None,
            },
            ledger_committed: None,
        }
    }

    /// Malformed body or multipart payload rejected before reaching an operation.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequestBody, ErrorKind::Validation, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversion from the gateway taxonomy
// ============================================================================

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let kind = err.kind();
        let message = err.public_message();

        match &err {
            GatewayError::Validation { field, .. } => {
                ApiError::new(ErrorCode::MissingRequiredField, kind, message)
                    .with_details(serde_json::json!({ "field": field }))
            }
            GatewayError::NotReady { phase } => {
                ApiError::new(ErrorCode::LedgerNotReady, kind, message)
                    .with_details(serde_json::json!({ "phase": phase.name() }))
            }
            GatewayError::Connection { attempts, .. } => {
                ApiError::new(ErrorCode::ConnectionFailed, kind, message)
                    .with_details(serde_json::json!({ "attempts": attempts }))
            }
            GatewayError::Enrollment { stage, .. } => {
                ApiError::new(ErrorCode::EnrollmentFailed, kind, message)
                    .with_details(serde_json::json!({ "stage": stage }))
            }
            GatewayError::Upstream { service, .. } => {
                let code = match service {
                    UpstreamService::Ledger => ErrorCode::LedgerError,
                    UpstreamService::Database => ErrorCode::DatabaseError,
                    UpstreamService::ContentStore => ErrorCode::ContentStoreError,
                    UpstreamService::ReferenceData => ErrorCode::ReferenceDataError,
                    UpstreamService::CertificateAuthority => ErrorCode::CertificateAuthorityError,
                };
                ApiError::new(code, kind, message)
                    .with_details(serde_json::json!({ "service": service }))
            }
            GatewayError::Query { cause } if cause.is_not_found() => {
                ApiError::new(ErrorCode::RecordNotFound, kind, message)
            }
            GatewayError::Query { .. } => ApiError::new(ErrorCode::QueryFailed, kind, message),
            GatewayError::PartialWrite { record_id, .. } => {
                let mut api = ApiError::new(ErrorCode::PartialWrite, kind, message)
                    .with_details(serde_json::json!({ "recordId": record_id }));
                api.ledger_committed = Some(true);
                api
            }
            GatewayError::Timeout { operation, after } => {
                ApiError::new(ErrorCode::Timeout, kind, message).with_details(serde_json::json!({
                    "operation": operation,
                    "afterMs": after.as_millis() as u64,
                }))
            }
            GatewayError::Configuration(_) => {
                ApiError::new(ErrorCode::ConfigurationError, kind, message)
            }
            GatewayError::Internal(_) => ApiError::new(ErrorCode::InternalError, kind, message),
        }
    }
}
