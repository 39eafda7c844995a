//! IPFS HTTP API content store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{ContentStore, StoredContent};
use crate::infra::OffchainError;

/// Response of `POST /api/v0/add`.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
    /// Reported as a decimal string
    #[serde(rename = "Size", default)]
    size: Option<String>,
}

pub struct IpfsContentStore {
    client: Client,
    api_url: String,
}

impl IpfsContentStore {
    pub fn new(api_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, OffchainError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ContentStore for IpfsContentStore {
    async fn add(&self, file_name: &str, bytes: Vec<u8>) -> Result<StoredContent, OffchainError> {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));

        let body = self
            .client
            .post(format!("{}/api/v0/add", self.api_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let stored = parse_add_response(&body, file_name)?;
        info!(content_hash = %stored.content_hash, file_name = %stored.file_name, "Stored content");
        Ok(stored)
    }
}

fn parse_add_response(body: &str, fallback_name: &str) -> Result<StoredContent, OffchainError> {
    // With wrapping directories the API streams one object per line; the
    // entry for the uploaded file comes first.
    let line = body
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| OffchainError::Malformed("empty add response".to_string()))?;
    let response: AddResponse =
        serde_json::from_str(line).map_err(|e| OffchainError::Malformed(e.to_string()))?;

    if response.hash.is_empty() {
        return Err(OffchainError::Malformed("add response has no hash".to_string()));
    }

    Ok(StoredContent {
        content_hash: response.hash,
        file_name: if response.name.is_empty() {
            fallback_name.to_string()
        } else {
            response.name
        },
        size: response.size.and_then(|s| s.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_response() {
        let stored = parse_add_response(
            r#"{"Name":"cert.pdf","Hash":"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG","Size":"1187"}"#,
            "ignored",
        )
        .unwrap();
        assert_eq!(stored.content_hash, "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
        assert_eq!(stored.file_name, "cert.pdf");
        assert_eq!(stored.size, Some(1187));
    }

    #[test]
    fn test_missing_name_uses_upload_name() {
        let stored = parse_add_response(r#"{"Hash":"QmHash"}"#, "upload.bin").unwrap();
        assert_eq!(stored.file_name, "upload.bin");
        assert_eq!(stored.size, None);
    }

    #[test]
    fn test_malformed_responses() {
        assert!(parse_add_response("", "x").is_err());
        assert!(parse_add_response("not json", "x").is_err());
        assert!(parse_add_response(r#"{"Hash":""}"#, "x").is_err());
    }
}
