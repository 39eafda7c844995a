//! Connection state machine.
//!
//! `transition` is pure: it maps a phase and an event to the next phase plus
//! the effects the driver must carry out. Sleeping, enrolling and opening
//! sessions all happen in [`super::ConnectionManager`].

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Lifecycle phase of the process-wide ledger connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ConnectionPhase {
    Idle,
    /// Attempt `attempt` (1-based) is running or waiting to be retried
    Connecting { attempt: u32 },
    Connected,
    /// Every attempt failed; stays here until reset
    Failed,
}

impl ConnectionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionPhase::Connected)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConnectionPhase::Idle => "idle",
            ConnectionPhase::Connecting { .. } => "connecting",
            ConnectionPhase::Connected => "connected",
            ConnectionPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionPhase::Connecting { attempt } => write!(f, "connecting (attempt {attempt})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Bounded, fixed-delay retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(10))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    ConnectRequested,
    AttemptSucceeded,
    AttemptFailed,
    RetryDelayElapsed,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Run connect attempt number `attempt`
    StartAttempt { attempt: u32 },
    /// Sleep, then deliver `RetryDelayElapsed`
    ScheduleRetry { after: Duration },
    /// Surface the terminal failure to the caller
    ReportFailure { attempts: u32 },
    /// Drop the held session handle
    CloseSession,
}

pub fn transition(
    phase: ConnectionPhase,
    event: ConnectionEvent,
    policy: &RetryPolicy,
) -> (ConnectionPhase, Vec<Effect>) {
    use ConnectionEvent as E;
    use ConnectionPhase as P;

    match (phase, event) {
        (_, E::Reset) => (P::Idle, vec![Effect::CloseSession]),

        // A `Connecting` phase seen by a new request belongs to a connect
        // that was abandoned mid-flight; start over.
        (P::Idle | P::Connecting { .. }, E::ConnectRequested) => (
            P::Connecting { attempt: 1 },
            vec![Effect::StartAttempt { attempt: 1 }],
        ),
        (P::Failed, E::ConnectRequested) => (
            P::Failed,
            vec![Effect::ReportFailure {
                attempts: policy.max_attempts,
            }],
        ),

        (P::Connecting { .. }, E::AttemptSucceeded) => (P::Connected, vec![]),
        (P::Connecting { attempt }, E::AttemptFailed) if attempt >= policy.max_attempts => {
            (P::Failed, vec![Effect::ReportFailure { attempts: attempt }])
        }
        (P::Connecting { attempt }, E::AttemptFailed) => (
            P::Connecting { attempt },
            vec![Effect::ScheduleRetry {
                after: policy.retry_delay,
            }],
        ),
        (P::Connecting { attempt }, E::RetryDelayElapsed) => {
            let next = attempt + 1;
            (
                P::Connecting { attempt: next },
                vec![Effect::StartAttempt { attempt: next }],
            )
        }

        // Connected + ConnectRequested is the idempotent no-op; everything
        // else is an event that does not apply to the phase.
        (phase, _) => (phase, vec![]),
    }
}
