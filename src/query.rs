//! History/query adapter
//!
//! Read-only ledger evaluations, decoded into domain types. Entries keep the
//! order the ledger returned them in.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::connection::ConnectionManager;
use crate::domain::{
    require, HistoryEntry, LedgerHistoryEntry, LedgerProduct, LedgerQuery, ProvenanceRecord,
};
use crate::infra::{with_deadline, GatewayError, LedgerError, Result};
use crate::metrics::{metric_names, MetricsRegistry};

/// `QueryAllProducts` rows come either bare or wrapped as `{Key, Record}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListedProduct {
    Keyed {
        #[serde(rename = "Record")]
        record: LedgerProduct,
    },
    Bare(LedgerProduct),
}

impl From<ListedProduct> for ProvenanceRecord {
    fn from(listed: ListedProduct) -> Self {
        match listed {
            ListedProduct::Keyed { record } | ListedProduct::Bare(record) => record.into(),
        }
    }
}

pub struct QueryAdapter {
    connection: Arc<ConnectionManager>,
    metrics: Arc<MetricsRegistry>,
    call_timeout: Option<Duration>,
}

impl QueryAdapter {
    pub fn new(
        connection: Arc<ConnectionManager>,
        metrics: Arc<MetricsRegistry>,
        call_timeout: Option<Duration>,
    ) -> Self {
        Self {
            connection,
            metrics,
            call_timeout,
        }
    }

    /// Every committed write to `id`, in commit order.
    #[instrument(skip(self))]
    pub async fn get_history(&self, id: &str) -> Result<Vec<HistoryEntry>> {
        require("id", id)?;
        let payload = self
            .evaluate(LedgerQuery::GetProductHistory { id: id.to_string() })
            .await?;

        let entries: Vec<LedgerHistoryEntry> = decode_list(&payload)?;
        Ok(entries.into_iter().map(HistoryEntry::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_record(&self, id: &str) -> Result<ProvenanceRecord> {
        require("id", id)?;
        let payload = self
            .evaluate(LedgerQuery::QueryProduct { id: id.to_string() })
            .await?;

        if is_empty_payload(&payload) {
            return Err(GatewayError::query(LedgerError::NotFound(format!(
                "record {id} does not exist"
            ))));
        }
        let product: LedgerProduct = decode(&payload)?;
        Ok(product.into())
    }

    pub async fn get_all_records(&self) -> Result<Vec<ProvenanceRecord>> {
        let payload = self.evaluate(LedgerQuery::QueryAllProducts).await?;
        let listed: Vec<ListedProduct> = decode_list(&payload)?;
        Ok(listed.into_iter().map(ProvenanceRecord::from).collect())
    }

    async fn evaluate(&self, query: LedgerQuery) -> Result<Vec<u8>> {
        let handle = self.connection.require_connected()?;
        self.metrics.inc_counter(metric_names::LEDGER_QUERIES).await;

        let args = query.args();
        let result = with_deadline(query.name(), self.call_timeout, async {
            handle
                .contract()
                .evaluate(query.name(), &args)
                .await
                .map_err(GatewayError::query)
        })
        .await;

        match &result {
            Ok(payload) => debug!(query = query.name(), bytes = payload.len(), "Query answered"),
            Err(e) => {
                self.metrics
                    .inc_counter(metric_names::LEDGER_QUERY_FAILURES)
                    .await;
                warn!(query = query.name(), error = %e.public_message(), "Ledger query failed");
            }
        }
        result
    }
}

fn is_empty_payload(payload: &[u8]) -> bool {
    let trimmed = String::from_utf8_lossy(payload);
    let trimmed = trimmed.trim();
    trimmed.is_empty() || trimmed == "null"
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload)
        .map_err(|e| GatewayError::query(LedgerError::Malformed(e.to_string())))
}

/// An empty or `null` answer is an empty list.
fn decode_list<T: DeserializeOwned>(payload: &[u8]) -> Result<Vec<T>> {
    if is_empty_payload(payload) {
        return Ok(Vec::new());
    }
    decode(payload)
}
