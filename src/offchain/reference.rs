//! Reference data sources.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::ReferenceDataSource;
use crate::infra::OffchainError;

/// Fetches a JSON document with a plain GET.
pub struct HttpReferenceData {
    client: Client,
    url: String,
}

impl HttpReferenceData {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, OffchainError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReferenceDataSource for HttpReferenceData {
    async fn fetch(&self) -> Result<serde_json::Value, OffchainError> {
        let value = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;
        Ok(value)
    }
}

/// Fixed document, used when fetching is disabled.
#[derive(Debug, Clone)]
pub struct StaticReferenceData {
    document: serde_json::Value,
}

impl StaticReferenceData {
    pub fn new(document: serde_json::Value) -> Self {
        Self { document }
    }

    /// The empty object, whose canonical form is `{}`.
    pub fn empty() -> Self {
        Self::new(serde_json::json!({}))
    }
}

#[async_trait]
impl ReferenceDataSource for StaticReferenceData {
    async fn fetch(&self) -> Result<serde_json::Value, OffchainError> {
        Ok(self.document.clone())
    }
}
