//! Ledger contract vocabulary.
//!
//! Function names and positional argument order are fixed by the deployed
//! contract and must match it byte for byte.

/// State-changing contract invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerTransaction {
    CreateProduct {
        id: String,
        kind: String,
        farmer_name: String,
        market_price_hash: String,
        attachment_ref: String,
    },
    ShipProduct {
        id: String,
        new_owner: String,
    },
    ReceiveProduct {
        id: String,
        new_owner: String,
    },
}

impl LedgerTransaction {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerTransaction::CreateProduct { .. } => "CreateProduct",
            LedgerTransaction::ShipProduct { .. } => "ShipProduct",
            LedgerTransaction::ReceiveProduct { .. } => "ReceiveProduct",
        }
    }

    pub fn args(&self) -> Vec<String> {
        match self {
            LedgerTransaction::CreateProduct {
                id,
                kind,
                farmer_name,
                market_price_hash,
                attachment_ref,
            } => vec![
                id.clone(),
                kind.clone(),
                farmer_name.clone(),
                market_price_hash.clone(),
                attachment_ref.clone(),
            ],
            LedgerTransaction::ShipProduct { id, new_owner }
            | LedgerTransaction::ReceiveProduct { id, new_owner } => {
                vec![id.clone(), new_owner.clone()]
            }
        }
    }

    /// Key the transaction writes.
    pub fn record_id(&self) -> &str {
        match self {
            LedgerTransaction::CreateProduct { id, .. }
            | LedgerTransaction::ShipProduct { id, .. }
            | LedgerTransaction::ReceiveProduct { id, .. } => id,
        }
    }
}

/// Read-only contract evaluations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerQuery {
    GetProductHistory { id: String },
    QueryAllProducts,
    QueryProduct { id: String },
}

impl LedgerQuery {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerQuery::GetProductHistory { .. } => "GetProductHistory",
            LedgerQuery::QueryAllProducts => "QueryAllProducts",
            LedgerQuery::QueryProduct { .. } => "QueryProduct",
        }
    }

    pub fn args(&self) -> Vec<String> {
        match self {
            LedgerQuery::GetProductHistory { id } | LedgerQuery::QueryProduct { id } => {
                vec![id.clone()]
            }
            LedgerQuery::QueryAllProducts => Vec::new(),
        }
    }
}
