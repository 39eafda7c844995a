//! Per-attempt network bootstrap.
//!
//! Each connect attempt reloads the connection profile, so a profile that
//! appears (or is fixed) between attempts is picked up by the next one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ConnectionProfile, LedgerNetwork, RestLedgerNetwork};
use crate::ca::{CertificateAuthority, HttpCertificateAuthority};
use crate::infra::{GatewayError, Result, UpstreamService};

/// Clients built from one load of the connection profile.
#[derive(Clone)]
pub struct NetworkBindings {
    /// MSP id of the client organization
    pub organization_id: String,
    pub ca: Arc<dyn CertificateAuthority>,
    pub network: Arc<dyn LedgerNetwork>,
}

#[async_trait]
pub trait NetworkBootstrap: Send + Sync {
    async fn load(&self) -> Result<NetworkBindings>;
}

/// Hands out the same pre-built bindings on every load.
pub struct StaticBootstrap {
    bindings: NetworkBindings,
}

impl StaticBootstrap {
    pub fn new(bindings: NetworkBindings) -> Self {
        Self { bindings }
    }
}

#[async_trait]
impl NetworkBootstrap for StaticBootstrap {
    async fn load(&self) -> Result<NetworkBindings> {
        Ok(self.bindings.clone())
    }
}

/// Builds the CA and ledger clients from a JSON connection profile on disk.
pub struct ProfileBootstrap {
    profile_path: PathBuf,
    ca_name: String,
    ca_verify_tls: Option<bool>,
    call_timeout: Option<Duration>,
}

impl ProfileBootstrap {
    pub fn new(
        profile_path: impl Into<PathBuf>,
        ca_name: impl Into<String>,
        ca_verify_tls: Option<bool>,
        call_timeout: Option<Duration>,
    ) -> Self {
        Self {
            profile_path: profile_path.into(),
            ca_name: ca_name.into(),
            ca_verify_tls,
            call_timeout,
        }
    }
}

#[async_trait]
impl NetworkBootstrap for ProfileBootstrap {
    async fn load(&self) -> Result<NetworkBindings> {
        let profile = ConnectionProfile::load(&self.profile_path).await?;
        let resolved = profile.resolve(&self.ca_name, self.ca_verify_tls)?;
        debug!(
            msp_id = %resolved.organization_id,
            peer = %resolved.peer.url,
            ca = %resolved.ca.url,
            "Connection profile resolved"
        );

        let ca = HttpCertificateAuthority::new(resolved.ca, self.call_timeout)
            .map_err(|e| GatewayError::upstream(UpstreamService::CertificateAuthority, e))?;
        let network = RestLedgerNetwork::new(
            resolved.peer,
            resolved.organization_id.clone(),
            self.call_timeout,
        );

        Ok(NetworkBindings {
            organization_id: resolved.organization_id,
            ca: Arc::new(ca),
            network: Arc::new(network),
        })
    }
}
