// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Application credential handler (SPI)
//!
//! The application implements [`AuthPasswordHandler`] and binds it to an
//! [`AuthenticationCoordinator`](crate::AuthenticationCoordinator). The
//! authentication engine never calls the handler directly.
//!
//! # Lifecycle (one handshake attempt)
//!
//! ```text
//! engine                 coordinator              handler
//!   |  request_credential   |                        |
//!   |---------------------->|---- get_password ----->|   (0..n times)
//!   |<----------------------|<-----------------------|
//!   |  report_outcome       |                        |
//!   |---------------------->|---- on_completed ----->|   (exactly once)
//! ```
//!
//! Both calls may arrive on engine-owned threads. `get_password` may block
//! (e.g. waiting on a user prompt).

use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::config::AuthConfig;
use crate::credential::Credential;
use crate::error::AuthError;
use crate::outcome::AuthenticationOutcome;
use crate::peer::PeerIdentity;

/// Error type returned by application handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Password callback capability implemented by the application.
pub trait AuthPasswordHandler: Send + Sync {
    /// Password for `peer`.
    ///
    /// `Ok(None)` means "no password"; `Ok(Some(Credential::empty()))` is an
    /// empty password. Both are forwarded to the engine unchanged.
    fn get_password(&self, peer: &PeerIdentity) -> Result<Option<Credential>, HandlerError>;

    /// Called once when the attempt finishes, successful or not.
    fn on_completed(&self, outcome: &AuthenticationOutcome) -> Result<(), HandlerError>;
}

/// Closure-backed handler.
///
/// ```
/// use busauth::{Credential, FnPasswordHandler};
///
/// let handler = FnPasswordHandler::new(
///     |_peer| Ok(Some(Credential::new("123456"))),
///     |outcome| {
///         println!("{}", outcome);
///         Ok(())
///     },
/// );
/// # let _ = handler;
/// ```
pub struct FnPasswordHandler<G, C> {
    get_password: G,
    on_completed: C,
}

impl<G, C> FnPasswordHandler<G, C>
where
    G: Fn(&PeerIdentity) -> Result<Option<Credential>, HandlerError> + Send + Sync,
    C: Fn(&AuthenticationOutcome) -> Result<(), HandlerError> + Send + Sync,
{
    pub fn new(get_password: G, on_completed: C) -> Self {
        Self {
            get_password,
            on_completed,
        }
    }
}

impl<G, C> AuthPasswordHandler for FnPasswordHandler<G, C>
where
    G: Fn(&PeerIdentity) -> Result<Option<Credential>, HandlerError> + Send + Sync,
    C: Fn(&AuthenticationOutcome) -> Result<(), HandlerError> + Send + Sync,
{
    fn get_password(&self, peer: &PeerIdentity) -> Result<Option<Credential>, HandlerError> {
        (self.get_password)(peer)
    }

    fn on_completed(&self, outcome: &AuthenticationOutcome) -> Result<(), HandlerError> {
        (self.on_completed)(outcome)
    }
}

/// Password-per-peer store with an optional fallback password.
///
/// Keeps the last outcome reported for each peer so the application can
/// show it (status line, notification, ...).
#[derive(Default)]
pub struct PasswordTable {
    passwords: RwLock<HashMap<PeerIdentity, Credential>>,
    default_password: RwLock<Option<Credential>>,
    outcomes: DashMap<PeerIdentity, AuthenticationOutcome>,
}

impl PasswordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from the `peers` and `default_password` entries of a config.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let table = Self::new();
        for (name, password) in &config.peers {
            let peer = PeerIdentity::new(name)?;
            table.set_password(peer, Credential::new(password.as_str()));
        }
        if let Some(default) = &config.default_password {
            table.set_default_password(Some(Credential::new(default.as_str())));
        }
        log::debug!(
            "[auth] Password table loaded: {} peer(s), default {}",
            table.len(),
            if config.default_password.is_some() {
                "set"
            } else {
                "unset"
            }
        );
        Ok(table)
    }

    /// Store or replace the password for `peer`.
    pub fn set_password(&self, peer: PeerIdentity, password: Credential) {
        self.passwords.write().insert(peer, password);
    }

    /// Forget the password for `peer`. Returns `true` if one was stored.
    pub fn remove_password(&self, peer: &PeerIdentity) -> bool {
        self.passwords.write().remove(peer).is_some()
    }

    pub fn set_default_password(&self, password: Option<Credential>) {
        *self.default_password.write() = password;
    }

    /// Number of peers with an explicit password.
    pub fn len(&self) -> usize {
        self.passwords.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.passwords.read().is_empty()
    }

    /// Last outcome reported for `peer`, if any.
    pub fn last_outcome(&self, peer: &PeerIdentity) -> Option<AuthenticationOutcome> {
        self.outcomes.get(peer).map(|entry| entry.value().clone())
    }
}

impl AuthPasswordHandler for PasswordTable {
    fn get_password(&self, peer: &PeerIdentity) -> Result<Option<Credential>, HandlerError> {
        if let Some(password) = self.passwords.read().get(peer) {
            return Ok(Some(password.clone()));
        }
        Ok(self.default_password.read().clone())
    }

    fn on_completed(&self, outcome: &AuthenticationOutcome) -> Result<(), HandlerError> {
        self.outcomes.insert(outcome.peer().clone(), outcome.clone());
        Ok(())
    }
}
