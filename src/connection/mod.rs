//! Ledger connection lifecycle
//!
//! `Idle → Connecting(n) → Connected`, or `Connecting(n) → … → Failed` once
//! the retry budget is spent. The transition function in [`state`] is pure;
//! [`ConnectionManager`] executes its effects against the network.

mod clock;
mod manager;
mod state;

use std::str::FromStr;

pub use clock::{Clock, TokioClock};
pub use manager::{ConnectionManager, ConnectionSettings, ConnectionState, SessionHandle};
pub use state::{transition, ConnectionEvent, ConnectionPhase, Effect, RetryPolicy};

/// When the process first drives `connect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectMode {
    /// Connect before serving; startup fails if the connection fails
    Eager,
    /// Serve immediately; `POST /api/connect-blockchain` drives the connection
    #[default]
    Lazy,
}

impl FromStr for ConnectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(ConnectMode::Eager),
            "lazy" => Ok(ConnectMode::Lazy),
            other => Err(format!("unknown connect mode {other:?} (expected eager or lazy)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_mode_parsing() {
        assert_eq!("eager".parse::<ConnectMode>().unwrap(), ConnectMode::Eager);
        assert_eq!(" Lazy ".parse::<ConnectMode>().unwrap(), ConnectMode::Lazy);
        assert!("sometimes".parse::<ConnectMode>().is_err());
        assert_eq!(ConnectMode::default(), ConnectMode::Lazy);
    }
}
