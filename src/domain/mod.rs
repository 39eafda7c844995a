//! Domain models for the CropChain gateway
//!
//! Identities, provenance records as the ledger stores them, their off-chain
//! projection, and the fixed ledger transaction vocabulary.

mod identity;
mod record;
mod transaction;

pub use identity::*;
pub use record::*;
pub use transaction::*;
