//! Connection profile parsing.
//!
//! Reads the JSON form of the common connection profile and resolves the
//! pieces the gateway needs: the client organization's MSP id, one peer
//! endpoint and one certificate authority endpoint.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::ca::CaEndpoint;
use crate::infra::{GatewayError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionProfile {
    #[serde(default)]
    pub name: String,
    pub client: ClientSection,
    pub organizations: BTreeMap<String, OrganizationSection>,
    #[serde(default)]
    pub peers: BTreeMap<String, PeerSection>,
    #[serde(default, rename = "certificateAuthorities")]
    pub certificate_authorities: BTreeMap<String, CaSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSection {
    pub organization: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationSection {
    pub mspid: String,
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default, rename = "certificateAuthorities")]
    pub certificate_authorities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerSection {
    pub url: String,
    #[serde(default, rename = "tlsCACerts")]
    pub tls_ca_certs: Option<TlsCaCerts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaSection {
    pub url: String,
    #[serde(default, rename = "caName")]
    pub ca_name: Option<String>,
    #[serde(default, rename = "tlsCACerts")]
    pub tls_ca_certs: Option<TlsCaCerts>,
    #[serde(default, rename = "httpOptions")]
    pub http_options: Option<HttpOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpOptions {
    #[serde(default)]
    pub verify: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsCaCerts {
    #[serde(default)]
    pub pem: Option<PemValue>,
}

/// `pem` is either one PEM string or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PemValue {
    One(String),
    Many(Vec<String>),
}

impl TlsCaCerts {
    fn joined(&self) -> Option<String> {
        match &self.pem {
            Some(PemValue::One(pem)) => Some(pem.clone()),
            Some(PemValue::Many(pems)) if !pems.is_empty() => Some(pems.join("\n")),
            _ => None,
        }
    }
}

/// Peer the gateway submits through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEndpoint {
    pub name: String,
    pub url: String,
    pub tls_ca_pem: Option<String>,
}

/// The subset of a profile the gateway actually uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub organization_id: String,
    pub peer: PeerEndpoint,
    pub ca: CaEndpoint,
}

impl ConnectionProfile {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| GatewayError::Configuration(format!("invalid connection profile: {e}")))
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GatewayError::Configuration(format!(
                    "connection profile not found at {}",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(GatewayError::Configuration(format!(
                    "cannot read connection profile {}: {e}",
                    path.display()
                )))
            }
        };
        Self::from_json(&raw)
    }

    /// Resolve the client organization, its first known peer, and the CA
    /// named `ca_name` (falling back to the organization's first CA).
    ///
    /// `verify_tls` overrides the CA's `httpOptions.verify`; verification is
    /// off when neither says otherwise.
    pub fn resolve(&self, ca_name: &str, verify_tls: Option<bool>) -> Result<ResolvedProfile> {
        let org_name = &self.client.organization;
        let org = self.organizations.get(org_name).ok_or_else(|| {
            GatewayError::Configuration(format!("organization {org_name} not in profile"))
        })?;

        let (peer_name, peer) = org
            .peers
            .iter()
            .find_map(|name| self.peers.get(name).map(|p| (name, p)))
            .ok_or_else(|| {
                GatewayError::Configuration(format!("no peer defined for organization {org_name}"))
            })?;

        let (ca_key, ca) = match self.certificate_authorities.get_key_value(ca_name) {
            Some(found) => found,
            None => org
                .certificate_authorities
                .iter()
                .find_map(|name| self.certificate_authorities.get_key_value(name.as_str()))
                .ok_or_else(|| {
                    GatewayError::Configuration(format!(
                        "certificate authority {ca_name} not in profile"
                    ))
                })?,
        };

        let verify = verify_tls
            .or_else(|| ca.http_options.as_ref().and_then(|o| o.verify))
            .unwrap_or(false);

        Ok(ResolvedProfile {
            organization_id: org.mspid.clone(),
            peer: PeerEndpoint {
                name: peer_name.clone(),
                url: peer.url.clone(),
                tls_ca_pem: peer.tls_ca_certs.as_ref().and_then(TlsCaCerts::joined),
            },
            ca: CaEndpoint {
                url: ca.url.clone(),
                ca_name: ca.ca_name.clone().unwrap_or_else(|| ca_key.clone()),
                tls_ca_pem: ca.tls_ca_certs.as_ref().and_then(TlsCaCerts::joined),
                verify_tls: verify,
            },
        })
    }
}
