// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Authentication coordinator
//!
//! Bridges the bus authentication engine and the application's
//! [`AuthPasswordHandler`].
//!
//! # Handshake attempt
//!
//! ```text
//! STARTED --> (CREDENTIAL_REQUESTED)* --> COMPLETED
//! ```
//!
//! The engine drives every transition. `COMPLETED` is terminal and
//! delivers exactly one outcome to the handler. An attempt the engine
//! abandons (connection dropped mid-handshake) never completes; the
//! application must not assume `on_completed` is always reached.
//!
//! # Failure isolation
//!
//! Handler errors and panics are caught at this boundary, logged, and
//! replaced by a default:
//!
//! | Callback       | Default on failure         |
//! |----------------|----------------------------|
//! | `get_password` | no credential (`Ok(None)`) |
//! | `on_completed` | no-op                      |

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::credential::Credential;
use crate::error::AuthError;
use crate::handler::{AuthPasswordHandler, HandlerError};
use crate::outcome::AuthenticationOutcome;
use crate::peer::PeerIdentity;

/// Engine-facing entry point for credential requests and outcome reports.
///
/// `Send + Sync`; share it with engine threads behind an `Arc`. The only
/// shared state is the handler slot (lock-free) and counters.
pub struct AuthenticationCoordinator {
    handler: ArcSwapOption<BoundHandler>,
    stats: CoordinatorStats,
}

impl AuthenticationCoordinator {
    /// Create a coordinator with no handler bound.
    pub fn new() -> Self {
        Self {
            handler: ArcSwapOption::empty(),
            stats: CoordinatorStats::default(),
        }
    }

    /// Create a coordinator with `handler` already bound.
    pub fn with_handler(handler: Arc<dyn AuthPasswordHandler>) -> Self {
        let coordinator = Self::new();
        coordinator.bind_handler(handler);
        coordinator
    }

    /// Bind (or replace) the application handler.
    ///
    /// Calls already in flight keep the handler they started with.
    pub fn bind_handler(&self, handler: Arc<dyn AuthPasswordHandler>) {
        let previous = self.handler.swap(Some(Arc::new(BoundHandler(handler))));
        if previous.is_some() {
            log::debug!("[auth] Credential handler replaced");
        } else {
            log::debug!("[auth] Credential handler bound");
        }
    }

    /// Remove the handler. Returns `true` if one was bound.
    pub fn unbind_handler(&self) -> bool {
        let removed = self.handler.swap(None).is_some();
        if removed {
            log::debug!("[auth] Credential handler unbound");
        }
        removed
    }

    pub fn has_handler(&self) -> bool {
        self.handler.load().is_some()
    }

    /// Obtain the shared secret for `peer` from the application.
    ///
    /// Returns the handler's answer unmodified, including `None` and empty
    /// credentials; deciding whether those are acceptable is the engine's
    /// job. Safe to call repeatedly for the same peer within one attempt.
    ///
    /// # Errors
    ///
    /// `AuthError::Configuration` if no handler is bound. A failing handler
    /// is not an error here: it yields `Ok(None)`.
    pub fn request_credential(
        &self,
        peer: &PeerIdentity,
    ) -> Result<Option<Credential>, AuthError> {
        // Load the Arc and drop the guard before calling out; the handler may block.
        let handler = self.handler.load_full().ok_or_else(|| {
            log::error!("[auth] Credential requested for {} but no handler is bound", peer);
            AuthError::no_handler()
        })?;

        self.stats
            .credentials_requested
            .fetch_add(1, Ordering::Relaxed);

        let result = isolate(|| handler.0.get_password(peer));
        match result {
            Ok(Some(credential)) => {
                log::trace!("[auth] Credential provided for {}", peer);
                Ok(Some(credential))
            }
            Ok(None) => {
                self.stats
                    .credentials_unavailable
                    .fetch_add(1, Ordering::Relaxed);
                log::debug!("[auth] Handler has no credential for {}", peer);
                Ok(None)
            }
            Err(message) => {
                self.record_callback_failure("get_password", peer, message);
                self.stats
                    .credentials_unavailable
                    .fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Deliver the result of an attempt to the application.
    ///
    /// Call exactly once per attempt, whatever the result. Never fails:
    /// handler errors are logged and swallowed so the engine's state machine
    /// is never disturbed by the application.
    pub fn report_outcome(&self, mechanism: &str, peer: &PeerIdentity, succeeded: bool) {
        let outcome = AuthenticationOutcome::new(mechanism, peer.clone(), succeeded);
        self.deliver(&outcome);
    }

    /// Start tracking one handshake attempt with `peer`.
    pub fn begin_attempt(&self, peer: PeerIdentity) -> HandshakeAttempt<'_> {
        log::debug!("[auth] Attempt started with {}", peer);
        HandshakeAttempt {
            coordinator: self,
            peer,
            credential_requests: 0,
            completed: false,
        }
    }

    /// Snapshot of the coordinator counters.
    pub fn stats(&self) -> CoordinatorStatsSnapshot {
        self.stats.snapshot()
    }

    fn deliver(&self, outcome: &AuthenticationOutcome) {
        if outcome.succeeded() {
            self.stats.outcomes_succeeded.fetch_add(1, Ordering::Relaxed);
            log::info!(
                "[auth] Authenticated {} via {}",
                outcome.peer(),
                outcome.mechanism()
            );
        } else {
            self.stats.outcomes_failed.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "[auth] Authentication with {} via {} failed",
                outcome.peer(),
                outcome.mechanism()
            );
        }

        let Some(handler) = self.handler.load_full() else {
            log::warn!(
                "[auth] No handler bound; outcome for {} dropped",
                outcome.peer()
            );
            return;
        };

        if let Err(message) = isolate(|| handler.0.on_completed(outcome)) {
            self.record_callback_failure("on_completed", outcome.peer(), message);
        }
    }

    fn record_callback_failure(&self, operation: &'static str, peer: &PeerIdentity, message: String) {
        self.stats.callback_failures.fetch_add(1, Ordering::Relaxed);
        let err = AuthError::ApplicationCallback {
            operation,
            peer: peer.to_string(),
            message,
        };
        log::error!("[auth] {} (ignored)", err);
    }
}

impl std::fmt::Debug for AuthenticationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationCoordinator")
            .field("has_handler", &self.has_handler())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl Default for AuthenticationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sized slot payload (`ArcSwapOption` cannot hold a trait object directly).
struct BoundHandler(Arc<dyn AuthPasswordHandler>);

/// Run a handler callback, turning both `Err` and panics into a message.
fn isolate<T>(callback: impl FnOnce() -> Result<T, HandlerError>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}

/// One handshake attempt with a single peer.
///
/// `complete` consumes the attempt, so at most one outcome can be reported.
/// Dropping an attempt without completing it marks it orphaned: counted and
/// logged, but the handler is not notified.
#[must_use = "an attempt that is dropped without complete() is reported as orphaned"]
pub struct HandshakeAttempt<'a> {
    coordinator: &'a AuthenticationCoordinator,
    peer: PeerIdentity,
    credential_requests: u32,
    completed: bool,
}

impl HandshakeAttempt<'_> {
    pub fn peer(&self) -> &PeerIdentity {
        &self.peer
    }

    /// Number of credential requests made so far in this attempt.
    pub fn credential_requests(&self) -> u32 {
        self.credential_requests
    }

    /// Ask the application for the peer's credential (engine retry step).
    pub fn request_credential(&mut self) -> Result<Option<Credential>, AuthError> {
        self.credential_requests = self.credential_requests.saturating_add(1);
        self.coordinator.request_credential(&self.peer)
    }

    /// Finish the attempt and notify the handler.
    pub fn complete(mut self, mechanism: &str, succeeded: bool) -> AuthenticationOutcome {
        self.completed = true;
        let outcome = AuthenticationOutcome::new(mechanism, self.peer.clone(), succeeded);
        log::debug!(
            "[auth] Attempt with {} completed after {} credential request(s)",
            self.peer,
            self.credential_requests
        );
        self.coordinator.deliver(&outcome);
        outcome
    }
}

impl Drop for HandshakeAttempt<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.coordinator
                .stats
                .orphaned_attempts
                .fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "[auth] Attempt with {} abandoned after {} credential request(s); no outcome reported",
                self.peer,
                self.credential_requests
            );
        }
    }
}

/// Coordinator counters.
#[derive(Debug, Default)]
struct CoordinatorStats {
    credentials_requested: AtomicU64,
    credentials_unavailable: AtomicU64,
    outcomes_succeeded: AtomicU64,
    outcomes_failed: AtomicU64,
    callback_failures: AtomicU64,
    orphaned_attempts: AtomicU64,
}

impl CoordinatorStats {
    fn snapshot(&self) -> CoordinatorStatsSnapshot {
        CoordinatorStatsSnapshot {
            credentials_requested: self.credentials_requested.load(Ordering::Relaxed),
            credentials_unavailable: self.credentials_unavailable.load(Ordering::Relaxed),
            outcomes_succeeded: self.outcomes_succeeded.load(Ordering::Relaxed),
            outcomes_failed: self.outcomes_failed.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            orphaned_attempts: self.orphaned_attempts.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of coordinator statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStatsSnapshot {
    /// `request_credential` calls that reached a handler.
    pub credentials_requested: u64,
    /// Requests answered with no credential (including handler failures).
    pub credentials_unavailable: u64,
    pub outcomes_succeeded: u64,
    pub outcomes_failed: u64,
    /// Handler callbacks that returned an error or panicked.
    pub callback_failures: u64,
    /// Attempts dropped without an outcome.
    pub orphaned_attempts: u64,
}

impl CoordinatorStatsSnapshot {
    /// Outcomes delivered (successful or not).
    pub fn outcomes(&self) -> u64 {
        self.outcomes_succeeded + self.outcomes_failed
    }
}
