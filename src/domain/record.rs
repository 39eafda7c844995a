//! Provenance records, their history, and the off-chain projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::infra::{GatewayError, Result};

/// Lifecycle status of a provenance record.
///
/// The deployed `cropchain` contract stores no status field, and its
/// `ReceiveProduct` writes exactly what `ShipProduct` writes. Against that
/// contract a status can only be inferred from ownership, so `Received` is
/// reported only by contracts that serialize `status` themselves; a received
/// record otherwise reads back as `Shipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Created,
    Shipped,
    Received,
}

/// Authoritative record, as read back from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRecord {
    pub id: String,
    pub kind: String,
    pub origin_holder_name: String,
    pub integrity_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_reference: Option<String>,
    pub current_owner: String,
    pub status: RecordStatus,
    /// Unix seconds of the last ledger update
    pub updated_at: i64,
}

/// Product document exactly as the ledger contract serializes it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerProduct {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub farmer: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(rename = "marketPriceHash", default)]
    pub market_price_hash: String,
    #[serde(rename = "certificationIPFSHash", default)]
    pub certification_hash: String,
    /// Only present when the deployed contract tracks status explicitly
    #[serde(default)]
    pub status: Option<RecordStatus>,
}

impl From<LedgerProduct> for ProvenanceRecord {
    fn from(p: LedgerProduct) -> Self {
        // Without an explicit status only ownership is known: ship and
        // receive both move it away from the farmer.
        let status = p.status.unwrap_or(if p.owner == p.farmer {
            RecordStatus::Created
        } else {
            RecordStatus::Shipped
        });

        Self {
            id: p.id,
            kind: p.kind,
            origin_holder_name: p.farmer,
            integrity_hash: p.market_price_hash,
            content_reference: Some(p.certification_hash).filter(|h| !h.is_empty()),
            current_owner: p.owner,
            status,
            updated_at: p.timestamp,
        }
    }
}

/// One committed write to a record, in ledger commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(rename = "txId")]
    pub transaction_id: String,
    #[serde(rename = "timestamp")]
    pub commit_timestamp: DateTime<Utc>,
    pub is_delete: bool,
    pub record: ProvenanceRecord,
}

/// History entry exactly as the ledger contract serializes it.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerHistoryEntry {
    pub record: LedgerProduct,
    #[serde(rename = "txId")]
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isDelete", default)]
    pub is_delete: bool,
}

impl From<LedgerHistoryEntry> for HistoryEntry {
    fn from(e: LedgerHistoryEntry) -> Self {
        Self {
            transaction_id: e.tx_id,
            commit_timestamp: e.timestamp,
            is_delete: e.is_delete,
            record: e.record.into(),
        }
    }
}

/// File attached to a record, stored off-chain only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentReference {
    pub record_id: String,
    pub content_hash: String,
    pub display_name: String,
}

/// Off-chain row derived from a ledger-committed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordProjection {
    pub id: String,
    pub kind: String,
    pub origin_holder_name: String,
    pub description: String,
    pub attachment: Option<AttachmentReference>,
}

/// Input to `createRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRecordInput {
    pub id: String,
    pub kind: String,
    pub origin_holder_name: String,
    pub description: Option<String>,
    /// Content-store hash of an uploaded document
    pub content_reference: Option<String>,
    /// Display name of the uploaded document
    pub attachment_name: Option<String>,
}

impl CreateRecordInput {
    pub fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("type", &self.kind)?;
        require("farmerName", &self.origin_holder_name)?;
        Ok(())
    }

    /// Content reference passed to the ledger; empty when none was supplied.
    pub fn ledger_content_reference(&self) -> String {
        self.content_reference
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }

    pub fn projection(&self) -> RecordProjection {
        let attachment = match (&self.content_reference, &self.attachment_name) {
            (Some(hash), Some(name)) if !hash.trim().is_empty() && !name.trim().is_empty() => {
                Some(AttachmentReference {
                    record_id: self.id.clone(),
                    content_hash: hash.trim().to_string(),
                    display_name: name.clone(),
                })
            }
            _ => None,
        };

        RecordProjection {
            id: self.id.clone(),
            kind: self.kind.clone(),
            origin_holder_name: self.origin_holder_name.clone(),
            description: self.description.clone().unwrap_or_default(),
            attachment,
        }
    }
}

/// Input to `shipRecord` / `receiveRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInput {
    pub id: String,
    pub new_owner: String,
}

impl TransferInput {
    pub fn new(id: impl Into<String>, new_owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            new_owner: new_owner.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("newOwner", &self.new_owner)?;
        Ok(())
    }
}

/// Reject empty or whitespace-only required fields.
pub fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::validation(field, format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::ErrorKind;

    fn input() -> CreateRecordInput {
        CreateRecordInput {
            id: "P1".into(),
            kind: "Coffee".into(),
            origin_holder_name: "Acme".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_input_requires_fields() {
        assert!(input().validate().is_ok());

        let mut missing = input();
        missing.origin_holder_name = "   ".into();
        let err = missing.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("farmerName"));
    }

    #[test]
    fn test_attachment_requires_hash_and_name() {
        let mut with_hash = input();
        with_hash.content_reference = Some("QmHash".into());
        assert!(with_hash.projection().attachment.is_none());
        assert_eq!(with_hash.ledger_content_reference(), "QmHash");

        with_hash.attachment_name = Some("cert.pdf".into());
        let attachment = with_hash.projection().attachment.unwrap();
        assert_eq!(attachment.record_id, "P1");
        assert_eq!(attachment.content_hash, "QmHash");
        assert_eq!(attachment.display_name, "cert.pdf");
    }

    #[test]
    fn test_transfer_requires_new_owner() {
        let err = TransferInput::new("P1", "").validate().unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Validation {
                field: "newOwner",
                ..
            }
        ));
    }

    #[test]
    fn test_ledger_product_conversion() {
        let json = r#"{"ID":"P1","type":"Coffee","farmer":"Acme","owner":"Carrier1",
            "timestamp":1700000000,"marketPriceHash":"ab","certificationIPFSHash":""}"#;
        let product: LedgerProduct = serde_json::from_str(json).unwrap();
        let record = ProvenanceRecord::from(product);
        assert_eq!(record.origin_holder_name, "Acme");
        assert_eq!(record.current_owner, "Carrier1");
        assert_eq!(record.status, RecordStatus::Shipped);
        assert_eq!(record.content_reference, None);
    }

    #[test]
    fn test_explicit_status_wins() {
        let json = r#"{"ID":"P1","farmer":"Acme","owner":"Shop","status":"Received"}"#;
        let product: LedgerProduct = serde_json::from_str(json).unwrap();
        assert_eq!(ProvenanceRecord::from(product).status, RecordStatus::Received);
    }

    #[test]
    fn test_received_without_status_reads_as_shipped() {
        // ReceiveProduct leaves the same document ShipProduct does.
        let json = r#"{"ID":"P1","farmer":"Acme","owner":"Retailer9"}"#;
        let product: LedgerProduct = serde_json::from_str(json).unwrap();
        assert_eq!(ProvenanceRecord::from(product).status, RecordStatus::Shipped);

        let json = r#"{"ID":"P1","farmer":"Acme","owner":"Acme"}"#;
        let product: LedgerProduct = serde_json::from_str(json).unwrap();
        assert_eq!(ProvenanceRecord::from(product).status, RecordStatus::Created);
    }
}
