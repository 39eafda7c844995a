//! Infrastructure layer for the CropChain gateway
//!
//! Contains:
//! - Error taxonomy shared by every operation
//! - Deadlines for outbound network calls
//! - Graceful shutdown (signal handling, cleanup hooks)

mod deadline;
mod error;
mod graceful_shutdown;

pub use deadline::with_deadline;
pub use error::*;
pub use graceful_shutdown::{shutdown_signal, ShutdownHooks};
