//! CropChain gateway library
//!
//! HTTP gateway that records agricultural product provenance on a
//! permissioned ledger and keeps a relational projection of each record.
//!
//! ## Modules
//!
//! - [`domain`] - Identities, provenance records, ledger transaction vocabulary
//! - [`identity`] - Durable identity store (wallet)
//! - [`ca`] - Certificate authority client (enroll, register)
//! - [`ledger`] - Ledger network, session and contract clients; connection profile
//! - [`enrollment`] - Admin and application identity bootstrap
//! - [`connection`] - Connection lifecycle state machine and manager
//! - [`coordinator`] - Ledger-first writes with off-chain projection
//! - [`query`] - History and record queries
//! - [`offchain`] - Projection store, content store, reference data
//! - [`crypto`] - Canonical JSON hashing, key redaction
//! - [`api`] - REST API routes
//! - [`infra`] - Error taxonomy, deadlines, graceful shutdown

pub mod api;
pub mod ca;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod crypto;
pub mod domain;
pub mod enrollment;
pub mod identity;
pub mod infra;
pub mod ledger;
pub mod metrics;
pub mod migrations;
pub mod offchain;
pub mod query;
pub mod server;

// Re-export commonly used types
pub use domain::{
    CreateRecordInput, HistoryEntry, Identity, IdentityType, ProvenanceRecord, RecordStatus,
    TransferInput,
};

pub use connection::{ConnectionManager, ConnectionPhase};
pub use coordinator::HybridCoordinator;
pub use infra::{ErrorKind, GatewayError, Result};
pub use query::QueryAdapter;
