//! Ledger network access
//!
//! The ledger is reached only through an opaque submit/evaluate RPC:
//!
//! - [`LedgerNetwork`] opens an authenticated [`LedgerSession`] for an identity
//! - a session resolves a channel + contract into a [`Contract`]
//! - a contract submits (state-changing) or evaluates (read-only) transactions
//!
//! Consensus, contract execution and gossip all live on the other side of
//! this boundary.

mod bootstrap;
mod profile;
mod rest;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::Identity;
use crate::infra::LedgerError;

pub use bootstrap::{NetworkBindings, NetworkBootstrap, ProfileBootstrap, StaticBootstrap};
pub use profile::{ConnectionProfile, PeerEndpoint, ResolvedProfile};
pub use rest::RestLedgerNetwork;

/// Entry point to the ledger network.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerNetwork: Send + Sync {
    /// Open a session authenticated as `identity`.
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn LedgerSession>, LedgerError>;
}

/// Live, authenticated connection to the network.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerSession: Send + Sync {
    /// Resolve a deployed contract on a channel.
    async fn contract(&self, channel: &str, contract: &str)
        -> Result<Arc<dyn Contract>, LedgerError>;

    /// Release the session. Calls through contracts obtained from it fail afterwards.
    async fn close(&self);
}

/// Deployed contract bound to a session.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Contract: Send + Sync {
    /// Submit a transaction for endorsement and wait for it to commit.
    async fn submit(&self, name: &str, args: &[String]) -> Result<Vec<u8>, LedgerError>;

    /// Evaluate a read-only transaction against world state.
    async fn evaluate(&self, name: &str, args: &[String]) -> Result<Vec<u8>, LedgerError>;
}
