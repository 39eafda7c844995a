//! Identity store
//!
//! Durable mapping from identity label to enrollment credentials. The
//! enrollment coordinator only needs `get` and `put`, so the backing store
//! (file system directory, in-memory map, secret manager) is swappable.

mod file;

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::RwLock;

use crate::domain::Identity;
use crate::infra::IdentityStoreError;

pub use file::FileSystemIdentityStore;

/// Key-value capability over enrolled identities.
///
/// Labels are enrolled at most once; `put` on an existing label fails with
/// [`IdentityStoreError::AlreadyExists`] instead of overwriting.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get(&self, label: &str) -> Result<Option<Identity>, IdentityStoreError>;

    async fn put(&self, label: &str, identity: &Identity) -> Result<(), IdentityStoreError>;
}

/// Process-local identity store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: RwLock<HashMap<String, Identity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get(&self, label: &str) -> Result<Option<Identity>, IdentityStoreError> {
        Ok(self.identities.read().await.get(label).cloned())
    }

    async fn put(&self, label: &str, identity: &Identity) -> Result<(), IdentityStoreError> {
        let mut identities = self.identities.write().await;
        if identities.contains_key(label) {
            return Err(IdentityStoreError::AlreadyExists(label.to_string()));
        }
        identities.insert(label.to_string(), identity.clone());
        Ok(())
    }
}

/// Labels become file names, so keep them to a conservative character set.
pub(crate) fn validate_label(label: &str) -> Result<(), IdentityStoreError> {
    let valid = !label.is_empty()
        && !label.starts_with('.')
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(IdentityStoreError::InvalidLabel(label.to_string()))
    }
}
