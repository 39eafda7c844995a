//! REST peer gateway client.
//!
//! Each session is an HTTPS client that presents the enrolled identity's
//! certificate and key as its TLS client identity, so the key never leaves the
//! process. Transactions go to
//! `POST {peer}/api/v1/channels/{channel}/contracts/{contract}/{submit|evaluate}`
//! with body `{"function": name, "args": [...]}`; the response body is the raw
//! contract payload.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use super::{Contract, LedgerNetwork, LedgerSession, PeerEndpoint};
use crate::domain::Identity;
use crate::infra::LedgerError;

pub struct RestLedgerNetwork {
    peer: PeerEndpoint,
    organization_id: String,
    timeout: Option<Duration>,
}

impl RestLedgerNetwork {
    pub fn new(peer: PeerEndpoint, organization_id: String, timeout: Option<Duration>) -> Self {
        Self {
            peer,
            organization_id,
            timeout,
        }
    }

    fn client_for(&self, identity: &Identity) -> Result<Client, LedgerError> {
        let mut pem = identity.private_key.expose().as_bytes().to_vec();
        pem.push(b'\n');
        pem.extend_from_slice(identity.certificate.as_bytes());
        let tls_identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| LedgerError::Malformed(format!("unusable identity material: {e}")))?;

        let mut builder = Client::builder()
            .use_rustls_tls()
            .identity(tls_identity);
        if let Some(root) = &self.peer.tls_ca_pem {
            let root = Certificate::from_pem(root.as_bytes())
                .map_err(|e| LedgerError::Malformed(format!("invalid peer TLS root: {e}")))?;
            builder = builder.add_root_certificate(root);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))
    }
}

#[async_trait]
impl LedgerNetwork for RestLedgerNetwork {
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn LedgerSession>, LedgerError> {
        let client = self.client_for(identity)?;
        let base = self.peer.url.trim_end_matches('/').to_string();

        let response = client
            .get(format!("{base}/api/v1/health"))
            .header("x-msp-id", &self.organization_id)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        check_status(response).await?;

        info!(peer = %self.peer.name, msp_id = %self.organization_id, "Ledger session opened");

        Ok(Arc::new(RestSession {
            inner: Arc::new(SessionInner {
                client,
                base,
                organization_id: self.organization_id.clone(),
                closed: AtomicBool::new(false),
            }),
        }))
    }
}

struct SessionInner {
    client: Client,
    base: String,
    organization_id: String,
    closed: AtomicBool,
}

impl SessionInner {
    fn ensure_open(&self) -> Result<(), LedgerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LedgerError::Transport("session closed".to_string()));
        }
        Ok(())
    }
}

struct RestSession {
    inner: Arc<SessionInner>,
}

#[async_trait]
impl LedgerSession for RestSession {
    async fn contract(
        &self,
        channel: &str,
        contract: &str,
    ) -> Result<Arc<dyn Contract>, LedgerError> {
        self.inner.ensure_open()?;
        let path = format!(
            "{}/api/v1/channels/{channel}/contracts/{contract}",
            self.inner.base
        );

        let response = self
            .inner
            .client
            .get(&path)
            .header("x-msp-id", &self.inner.organization_id)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        check_status(response).await?;

        Ok(Arc::new(RestContract {
            session: Arc::clone(&self.inner),
            path,
        }))
    }

    async fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            debug!("Ledger session closed");
        }
    }
}

struct RestContract {
    session: Arc<SessionInner>,
    path: String,
}

impl RestContract {
    async fn invoke(&self, mode: &str, name: &str, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        self.session.ensure_open()?;
        debug!(function = name, mode, "Invoking contract");

        let response = self
            .session
            .client
            .post(format!("{}/{mode}", self.path))
            .header("x-msp-id", &self.session.organization_id)
            .json(&json!({ "function": name, "args": args }))
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        check_status(response).await
    }
}

#[async_trait]
impl Contract for RestContract {
    async fn submit(&self, name: &str, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        self.invoke("submit", name, args).await
    }

    async fn evaluate(&self, name: &str, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        self.invoke("evaluate", name, args).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<Vec<u8>, LedgerError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| LedgerError::Transport(e.to_string()))?;

    match classify(status, &body) {
        Some(err) => Err(err),
        None => Ok(body.to_vec()),
    }
}

/// Map a non-success peer response onto a ledger error.
fn classify(status: StatusCode, body: &[u8]) -> Option<LedgerError> {
    if status.is_success() {
        return None;
    }
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {status}"));
    Some(if status == StatusCode::NOT_FOUND {
        LedgerError::NotFound(message)
    } else if status.is_client_error() {
        LedgerError::Rejected(message)
    } else {
        LedgerError::Transport(message)
    })
}

fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return Some(message.to_string());
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    (!text.is_empty()).then_some(text)
}
