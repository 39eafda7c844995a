//! Shared request and response types for REST API handlers.

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionPhase;
use crate::domain::{CreateRecordInput, HistoryEntry, ProvenanceRecord};

// ============================================================================
// Product types
// ============================================================================

/// Request body for `POST /api/products`.
///
/// Missing strings deserialize as empty so that validation, not the JSON
/// extractor, reports which field is absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub farmer_name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Content hash returned by `POST /api/upload`
    #[serde(default, alias = "ipfsHash")]
    pub attachment_ref: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl From<CreateProductRequest> for CreateRecordInput {
    fn from(req: CreateProductRequest) -> Self {
        Self {
            id: req.id,
            kind: req.kind,
            origin_holder_name: req.farmer_name,
            description: req.description,
            content_reference: req.attachment_ref,
            attachment_name: req.file_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductResponse {
    pub success: bool,
    pub message: String,
    pub record_id: String,
    pub integrity_hash: String,
    pub attachment_recorded: bool,
}

/// Request body for ship and receive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[serde(default)]
    pub new_owner: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub success: bool,
    pub message: String,
    pub record_id: String,
    pub new_owner: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub success: bool,
    pub product: ProvenanceRecord,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub success: bool,
    pub products: Vec<ProvenanceRecord>,
}

// ============================================================================
// Connection and upload types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub phase: ConnectionPhase,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub content_hash: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}
