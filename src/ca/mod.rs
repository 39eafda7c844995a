//! Certificate authority client
//!
//! The enrollment coordinator talks to the CA through [`CertificateAuthority`]:
//! `enroll` exchanges an enrollment id and secret for a certificate over a
//! locally generated key, `register` (performed by an admin registrar)
//! creates a new enrollment id and returns its one-time secret.

mod http;
mod signing;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{Identity, PrivateKeyPem};
use crate::infra::CaError;

pub use http::{CaEndpoint, HttpCertificateAuthority};

/// Certificate and private key issued by an enroll call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub certificate: String,
    pub private_key: PrivateKeyPem,
}

/// Registration of a new enrollment id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub enrollment_id: String,
    pub affiliation: String,
    pub role: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Exchange an enrollment secret for a certificate and its private key.
    async fn enroll(&self, enrollment_id: &str, secret: &str) -> Result<Enrollment, CaError>;

    /// Register a new enrollment id on behalf of `registrar`; returns its secret.
    async fn register(
        &self,
        registrar: &Identity,
        request: &RegistrationRequest,
    ) -> Result<String, CaError>;
}
