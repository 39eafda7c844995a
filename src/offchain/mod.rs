//! Off-chain collaborators
//!
//! - [`ProjectionStore`]: relational copy of selected record fields
//! - [`ContentStore`]: content-addressed file storage
//! - [`ReferenceDataSource`]: external data hashed into each new record
//!
//! All three sit downstream of (or beside) the ledger and are reached through
//! narrow traits so the coordinator can be tested without a database or
//! network.

mod content;
mod projection;
mod reference;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::RecordProjection;
use crate::infra::OffchainError;

pub use content::IpfsContentStore;
pub use projection::PgProjectionStore;
pub use reference::{HttpReferenceData, StaticReferenceData};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Insert the projection row and, when present, its attachment row as
    /// one unit.
    async fn insert_record(&self, projection: &RecordProjection) -> Result<(), OffchainError>;
}

/// File accepted by the content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContent {
    pub content_hash: String,
    pub file_name: String,
    pub size: Option<u64>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn add(&self, file_name: &str, bytes: Vec<u8>) -> Result<StoredContent, OffchainError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReferenceDataSource: Send + Sync {
    /// Current reference document (e.g. a market price index).
    async fn fetch(&self) -> Result<serde_json::Value, OffchainError>;
}
