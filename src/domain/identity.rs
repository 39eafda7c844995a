//! Enrolled ledger identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label under which the bootstrap administrator identity is stored.
pub const ADMIN_LABEL: &str = "admin";

/// Label under which the application identity is stored.
pub const APPLICATION_LABEL: &str = "application";

/// Role an identity was enrolled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    Admin,
    Application,
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityType::Admin => write!(f, "admin"),
            IdentityType::Application => write!(f, "application"),
        }
    }
}

/// PEM-encoded private key.
///
/// `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivateKeyPem(String);

impl PrivateKeyPem {
    pub fn new(pem: impl Into<String>) -> Self {
        Self(pem.into())
    }

    /// Raw PEM text, for signing or persisting only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKeyPem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKeyPem([REDACTED])")
    }
}

/// Certificate and key pair authorizing ledger transactions.
///
/// Created once per label and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub label: String,
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    /// PEM certificate
    pub certificate: String,
    pub private_key: PrivateKeyPem,
    /// Membership service provider id of the owning organization
    pub organization_id: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.identity_type == IdentityType::Admin
    }
}
