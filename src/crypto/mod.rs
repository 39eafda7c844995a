//! Cryptographic utilities for the CropChain gateway
//!
//! Provides:
//! - Canonical JSON hashing for tamper-evident reference data
//! - Redaction of PEM private keys from outbound messages

mod hash;

pub use hash::*;
