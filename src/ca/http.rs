//! HTTP certificate authority client.
//!
//! Speaks the Fabric CA REST surface (`/api/v1/enroll`, `/api/v1/register`)
//! with its `{success, result, errors}` response envelope. Enroll sends a
//! locally generated CSR under basic auth and gets back a base64 `Cert`; the
//! private key stays in this process. Register is authorized by a token
//! signed with the registrar's key.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Certificate, Client};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::signing::{auth_token, certificate_request};
use super::{CertificateAuthority, Enrollment, RegistrationRequest};
use crate::domain::Identity;
use crate::infra::CaError;

/// Where and how to reach the CA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaEndpoint {
    pub url: String,
    pub ca_name: String,
    /// PEM root(s) trusted for the CA's TLS certificate
    pub tls_ca_pem: Option<String>,
    /// When false, TLS certificate verification is skipped
    pub verify_tls: bool,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<EnvelopeMessage>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct EnrollResult {
    #[serde(rename = "Cert")]
    cert: String,
}

#[derive(Debug, Deserialize)]
struct RegisterResult {
    secret: String,
}

pub struct HttpCertificateAuthority {
    client: Client,
    endpoint: CaEndpoint,
}

impl HttpCertificateAuthority {
    pub fn new(endpoint: CaEndpoint, timeout: Option<Duration>) -> Result<Self, CaError> {
        let mut builder = Client::builder();

        if let Some(pem) = &endpoint.tls_ca_pem {
            let root = Certificate::from_pem(pem.as_bytes())
                .map_err(|e| CaError::Malformed(format!("invalid CA TLS root: {e}")))?;
            builder = builder.add_root_certificate(root);
        }
        if !endpoint.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| CaError::Transport(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.url.trim_end_matches('/'), path)
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CaError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| CaError::Transport(e.to_string()))?;

        let envelope: Envelope<T> = serde_json::from_slice(&body).map_err(|e| {
            if status.is_success() {
                CaError::Malformed(e.to_string())
            } else {
                CaError::Rejected(format!("HTTP {status}"))
            }
        })?;

        if !status.is_success() || !envelope.success {
            let reason = envelope
                .errors
                .iter()
                .map(|m| format!("[{}] {}", m.code, m.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CaError::Rejected(if reason.is_empty() {
                format!("HTTP {status}")
            } else {
                reason
            }));
        }

        envelope
            .result
            .ok_or_else(|| CaError::Malformed("response has no result".to_string()))
    }
}

fn decode_pem(field: &str, value: &str) -> Result<String, CaError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|e| CaError::Malformed(format!("{field} is not base64: {e}")))?;
    String::from_utf8(bytes).map_err(|_| CaError::Malformed(format!("{field} is not UTF-8 PEM")))
}

const ENROLL_PATH: &str = "/api/v1/enroll";
const REGISTER_PATH: &str = "/api/v1/register";

#[async_trait]
impl CertificateAuthority for HttpCertificateAuthority {
    async fn enroll(&self, enrollment_id: &str, secret: &str) -> Result<Enrollment, CaError> {
        debug!(enrollment_id, ca = %self.endpoint.ca_name, "Enrolling identity");

        let request = certificate_request(enrollment_id)?;

        let response = self
            .client
            .post(self.url(ENROLL_PATH))
            .basic_auth(enrollment_id, Some(secret))
            .json(&json!({
                "certificate_request": request.csr_pem,
                "caname": self.endpoint.ca_name,
            }))
            .send()
            .await
            .map_err(|e| CaError::Transport(e.to_string()))?;

        let result: EnrollResult = Self::read_envelope(response).await?;

        Ok(Enrollment {
            certificate: decode_pem("Cert", &result.cert)?,
            private_key: request.private_key,
        })
    }

    async fn register(
        &self,
        registrar: &Identity,
        request: &RegistrationRequest,
    ) -> Result<String, CaError> {
        debug!(
            enrollment_id = %request.enrollment_id,
            registrar = %registrar.label,
            "Registering identity"
        );

        // The token signs these exact bytes, so serialize once.
        let body = register_body(request, &self.endpoint.ca_name)?;
        let token = auth_token(registrar, "POST", REGISTER_PATH, &body)?;

        let response = self
            .client
            .post(self.url(REGISTER_PATH))
            .header(reqwest::header::AUTHORIZATION, token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| CaError::Transport(e.to_string()))?;

        let result: RegisterResult = Self::read_envelope(response).await?;
        Ok(result.secret)
    }
}

fn register_body(request: &RegistrationRequest, ca_name: &str) -> Result<Vec<u8>, CaError> {
    serde_json::to_vec(&json!({
        "id": request.enrollment_id,
        "type": request.role,
        "affiliation": request.affiliation,
        "caname": ca_name,
    }))
    .map_err(|e| CaError::Credential(e.to_string()))
}
