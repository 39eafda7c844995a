//! REST API for the provenance gateway
//!
//! Ledger-backed routes sit behind [`require_connected`]; connection control
//! and uploads do not.

pub mod error;
mod guard;
mod rest;
pub mod types;

pub use error::{ApiError, ErrorCode};
pub use guard::require_connected;
pub use rest::*;
