//! Error types for the CropChain gateway
//!
//! [`GatewayError`] is the closed taxonomy every operation reports. The
//! narrower enums below describe failures of a single external collaborator
//! and are folded into a [`GatewayError`] at the operation boundary.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connection::ConnectionPhase;
use crate::crypto::redact_private_keys;

/// Failure reported by the ledger's submit/evaluate RPC surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger explicitly reported the key as absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Endorsement or contract execution rejected the transaction
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// Network or gateway failure before an answer was produced
    #[error("transport error: {0}")]
    Transport(String),

    /// The ledger answered with something we could not decode
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}

/// Failure reported by the certificate authority.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaError {
    #[error("certificate authority rejected the request: {0}")]
    Rejected(String),

    #[error("certificate authority transport error: {0}")]
    Transport(String),

    #[error("malformed certificate authority response: {0}")]
    Malformed(String),

    /// Local key, CSR or request-signature failure
    #[error("certificate authority credential error: {0}")]
    Credential(String),
}

/// Failure of the durable identity store.
#[derive(Error, Debug)]
pub enum IdentityStoreError {
    #[error("identity {0} already exists")]
    AlreadyExists(String),

    #[error("invalid identity label: {0:?}")]
    InvalidLabel(String),

    #[error("identity store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt identity record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Failure of an off-chain collaborator (projection store, content store,
/// reference data source).
#[derive(Error, Debug)]
pub enum OffchainError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Malformed(String),
}

/// Step of the enrollment protocol that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStage {
    LoadIdentity,
    EnrollAdmin,
    OpenAdminSession,
    Register,
    EnrollApplication,
    StoreIdentity,
}

impl std::fmt::Display for EnrollmentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EnrollmentStage::LoadIdentity => "load_identity",
            EnrollmentStage::EnrollAdmin => "enroll_admin",
            EnrollmentStage::OpenAdminSession => "open_admin_session",
            EnrollmentStage::Register => "register",
            EnrollmentStage::EnrollApplication => "enroll_application",
            EnrollmentStage::StoreIdentity => "store_identity",
        };
        f.write_str(s)
    }
}

/// External collaborator an upstream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamService {
    Ledger,
    Database,
    ContentStore,
    ReferenceData,
    CertificateAuthority,
}

impl std::fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UpstreamService::Ledger => "ledger",
            UpstreamService::Database => "database",
            UpstreamService::ContentStore => "content store",
            UpstreamService::ReferenceData => "reference data",
            UpstreamService::CertificateAuthority => "certificate authority",
        };
        f.write_str(s)
    }
}

/// Machine-readable classification of a [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotReady,
    Enrollment,
    Connection,
    Upstream,
    Query,
    PartialWrite,
    Timeout,
    Configuration,
    Internal,
}

/// Errors surfaced by gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or malformed required input; never retried
    #[error("invalid field `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    /// Ledger connection is not in the `Connected` phase
    #[error("ledger connection is not ready (phase: {phase})")]
    NotReady { phase: ConnectionPhase },

    /// A bootstrap enrollment step failed
    #[error("enrollment failed at {stage}: {cause}")]
    Enrollment { stage: EnrollmentStage, cause: String },

    /// Every connect attempt failed
    #[error("could not connect to the ledger after {attempts} attempt(s): {last_error}")]
    Connection { attempts: u32, last_error: String },

    /// Ledger, database or content store call failed after connecting
    #[error("{service} call failed: {message}")]
    Upstream {
        service: UpstreamService,
        message: String,
    },

    /// Read-only ledger query failed
    #[error("ledger query failed: {cause}")]
    Query { cause: LedgerError },

    /// Ledger commit succeeded, off-chain projection write did not
    #[error("record {record_id} was committed to the ledger but its off-chain projection was not written: {cause}")]
    PartialWrite { record_id: String, cause: String },

    /// A network call exceeded its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        GatewayError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn enrollment(stage: EnrollmentStage, cause: impl std::fmt::Display) -> Self {
        GatewayError::Enrollment {
            stage,
            cause: redact_private_keys(&cause.to_string()),
        }
    }

    pub fn upstream(service: UpstreamService, cause: impl std::fmt::Display) -> Self {
        GatewayError::Upstream {
            service,
            message: redact_private_keys(&cause.to_string()),
        }
    }

    pub fn query(cause: LedgerError) -> Self {
        GatewayError::Query { cause }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation { .. } => ErrorKind::Validation,
            GatewayError::NotReady { .. } => ErrorKind::NotReady,
            GatewayError::Enrollment { .. } => ErrorKind::Enrollment,
            GatewayError::Connection { .. } => ErrorKind::Connection,
            GatewayError::Upstream { .. } => ErrorKind::Upstream,
            GatewayError::Query { .. } => ErrorKind::Query,
            GatewayError::PartialWrite { .. } => ErrorKind::PartialWrite,
            GatewayError::Timeout { .. } => ErrorKind::Timeout,
            GatewayError::Configuration(_) => ErrorKind::Configuration,
            GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to hand to an HTTP caller.
    pub fn public_message(&self) -> String {
        redact_private_keys(&self.to_string())
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
