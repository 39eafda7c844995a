//! Connection lifecycle manager.
//!
//! Owns the single process-wide [`ConnectionState`]. The state is published
//! through a `watch` channel so readers take a non-blocking snapshot, while
//! `connect` and `reset` serialize on a mutex so enrollment never runs twice
//! concurrently.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use super::clock::{Clock, TokioClock};
use super::state::{transition, ConnectionEvent, ConnectionPhase, Effect, RetryPolicy};
use crate::enrollment::{EnrollmentCoordinator, EnrollmentSettings};
use crate::identity::IdentityStore;
use crate::infra::{with_deadline, GatewayError, Result, UpstreamService};
use crate::ledger::{Contract, LedgerSession, NetworkBootstrap};
use crate::metrics::{metric_names, MetricsRegistry};

/// Rolls an unfinished connect back to `Idle` when its future is dropped
/// while the connect lock is still held.
struct AbandonGuard<'a> {
    state: &'a watch::Sender<ConnectionState>,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.state.send_if_modified(|s| match s.phase {
            ConnectionPhase::Connecting { attempt } => {
                warn!(attempt, "Ledger connect abandoned before completion");
                s.phase = ConnectionPhase::Idle;
                s.handle = None;
                true
            }
            _ => false,
        });
    }
}

/// Live session plus the resolved contract, tagged with the connection
/// generation it belongs to.
#[derive(Clone)]
pub struct SessionHandle {
    generation: u64,
    session: Arc<dyn LedgerSession>,
    contract: Arc<dyn Contract>,
}

impl SessionHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contract(&self) -> &dyn Contract {
        self.contract.as_ref()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Snapshot of the connection.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    /// Redacted message of the most recent failed attempt
    pub last_error: Option<String>,
    handle: Option<SessionHandle>,
}

impl ConnectionState {
    fn idle() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            last_error: None,
            handle: None,
        }
    }

    pub fn handle(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub policy: RetryPolicy,
    pub channel: String,
    pub contract: String,
    /// Deadline for session open and contract resolution
    pub call_timeout: Option<Duration>,
    pub enrollment: EnrollmentSettings,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            channel: "cropchainchannel".to_string(),
            contract: "cropchain".to_string(),
            call_timeout: Some(Duration::from_secs(30)),
            enrollment: EnrollmentSettings::default(),
        }
    }
}

pub struct ConnectionManager {
    bootstrap: Arc<dyn NetworkBootstrap>,
    store: Arc<dyn IdentityStore>,
    settings: ConnectionSettings,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsRegistry>,
    state: watch::Sender<ConnectionState>,
    connect_lock: Mutex<()>,
    generation: AtomicU64,
}

impl ConnectionManager {
    pub fn new(
        bootstrap: Arc<dyn NetworkBootstrap>,
        store: Arc<dyn IdentityStore>,
        settings: ConnectionSettings,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::idle());
        Self {
            bootstrap,
            store,
            settings,
            clock: Arc::new(TokioClock),
            metrics,
            state,
            connect_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the timer driving retry delays.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.state.borrow().phase
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Handle to the live session, or `NotReady` if the phase is anything
    /// but `Connected`. Never waits.
    pub fn require_connected(&self) -> Result<SessionHandle> {
        let state = self.state.borrow();
        match (&state.phase, &state.handle) {
            (ConnectionPhase::Connected, Some(handle)) => Ok(handle.clone()),
            (phase, _) => Err(GatewayError::NotReady { phase: *phase }),
        }
    }

    /// Whether `handle` still belongs to the current connection.
    pub fn is_current(&self, handle: &SessionHandle) -> bool {
        let state = self.state.borrow();
        state.phase.is_connected()
            && state.handle.as_ref().map(SessionHandle::generation) == Some(handle.generation)
    }

    /// Drive the connection to `Connected`, retrying with a fixed delay.
    ///
    /// Returns immediately when already connected. Once every attempt has
    /// failed the manager stays `Failed` and this returns
    /// [`GatewayError::Connection`] until [`reset`](Self::reset) is called.
    ///
    /// Dropping the returned future before it resolves puts the phase back
    /// to `Idle`, so a later call starts from the first attempt.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.connect_lock.lock().await;
        let mut abandon = AbandonGuard {
            state: &self.state,
            armed: true,
        };
        let result = self.drive_connect().await;
        abandon.armed = false;
        result
    }

    async fn drive_connect(&self) -> Result<()> {
        let policy = self.settings.policy;

        let (phase, effects) = transition(self.phase(), ConnectionEvent::ConnectRequested, &policy);
        self.state.send_modify(|s| s.phase = phase);

        let mut pending: VecDeque<Effect> = effects.into();
        let mut ran_attempts = false;

        while let Some(effect) = pending.pop_front() {
            let mut fresh = None;
            let event = match effect {
                Effect::StartAttempt { attempt } => {
                    ran_attempts = true;
                    self.metrics
                        .inc_counter(metric_names::CONNECT_ATTEMPTS)
                        .await;
                    debug!(attempt, max_attempts = policy.max_attempts, "Connecting to ledger");

                    match self.attempt().await {
                        Ok(handle) => {
                            fresh = Some(handle);
                            ConnectionEvent::AttemptSucceeded
                        }
                        Err(e) => {
                            let message = e.public_message();
                            self.metrics
                                .inc_counter(metric_names::CONNECT_FAILURES)
                                .await;
                            if attempt < policy.max_attempts {
                                warn!(
                                    attempt,
                                    max_attempts = policy.max_attempts,
                                    retry_in = ?policy.retry_delay,
                                    error = %message,
                                    "Ledger connect attempt failed"
                                );
                            }
                            self.state.send_modify(|s| s.last_error = Some(message));
                            ConnectionEvent::AttemptFailed
                        }
                    }
                }
                Effect::ScheduleRetry { after } => {
                    self.clock.sleep(after).await;
                    ConnectionEvent::RetryDelayElapsed
                }
                Effect::ReportFailure { attempts } => {
                    let last_error = self
                        .state
                        .borrow()
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "no attempt recorded".to_string());
                    if ran_attempts {
                        error!(attempts, error = %last_error, "Ledger connection failed");
                    }
                    return Err(GatewayError::Connection {
                        attempts,
                        last_error,
                    });
                }
                Effect::CloseSession => continue,
            };

            let (next, effects) = transition(self.phase(), event, &policy);
            self.state.send_modify(|s| {
                s.phase = next;
                if let Some(handle) = fresh.take() {
                    s.handle = Some(handle);
                    s.last_error = None;
                }
            });
            pending.extend(effects);
        }

        match self.phase() {
            ConnectionPhase::Connected => Ok(()),
            phase => Err(GatewayError::Internal(format!(
                "connect finished in unexpected phase {phase}"
            ))),
        }
    }

    /// Return to `Idle`, closing any held session. Handles issued before the
    /// reset stop being current.
    pub async fn reset(&self) {
        let _guard = self.connect_lock.lock().await;
        let (next, effects) =
            transition(self.phase(), ConnectionEvent::Reset, &self.settings.policy);

        let previous = self.state.send_replace(ConnectionState {
            phase: next,
            last_error: None,
            handle: None,
        });

        if effects.contains(&Effect::CloseSession) {
            if let Some(handle) = previous.handle {
                handle.session.close().await;
            }
        }
        info!(previous = %previous.phase, "Ledger connection reset");
    }

    async fn attempt(&self) -> Result<SessionHandle> {
        let bindings = self.bootstrap.load().await?;

        let identity = EnrollmentCoordinator::new(
            Arc::clone(&self.store),
            &bindings,
            self.settings.enrollment.clone(),
        )
        .ensure_enrolled()
        .await?;

        let timeout = self.settings.call_timeout;
        let session = with_deadline("ledger session open", timeout, async {
            bindings
                .network
                .connect(&identity)
                .await
                .map_err(|e| GatewayError::upstream(UpstreamService::Ledger, e))
        })
        .await?;

        let resolved = with_deadline("contract resolution", timeout, async {
            session
                .contract(&self.settings.channel, &self.settings.contract)
                .await
                .map_err(|e| GatewayError::upstream(UpstreamService::Ledger, e))
        })
        .await;
        let contract = match resolved {
            Ok(contract) => contract,
            Err(e) => {
                session.close().await;
                return Err(e);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics
            .set_gauge(metric_names::CONNECT_GENERATION, generation)
            .await;
        info!(
            generation,
            channel = %self.settings.channel,
            contract = %self.settings.contract,
            "Connected to ledger"
        );

        Ok(SessionHandle {
            generation,
            session,
            contract,
        })
    }
}
