// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-peer authentication state.
//!
//! Tracks, per bus name, whether the peer has been authenticated, with which
//! mechanism, which secure message types it may send/receive, and whether an
//! attempt is currently running. A unique name and its well-known aliases
//! share one [`PeerState`].
//!
//! The coordinator itself keeps no per-peer state; this table is what an
//! engine (or application) uses when it needs per-peer serialization.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::AuthError;
use crate::outcome::AuthenticationOutcome;
use crate::peer::PeerIdentity;

/// Transmit authorization bit.
pub const ALLOW_SECURE_TX: u8 = 0x01;
/// Receive authorization bit.
pub const ALLOW_SECURE_RX: u8 = 0x02;

/// Bus message types subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    MethodCall = 1,
    MethodReturn = 2,
    Error = 3,
    Signal = 4,
}

impl MessageType {
    fn index(self) -> usize {
        self as usize - 1
    }
}

#[derive(Debug, Default)]
struct PeerStateInner {
    secure: bool,
    last_mechanism: Option<String>,
    auth_count: u32,
    authorizations: [u8; 4],
}

/// Authentication state of one remote peer.
#[derive(Debug, Default)]
pub struct PeerState {
    inner: Mutex<PeerStateInner>,
    attempt_active: AtomicBool,
}

impl PeerState {
    /// `true` once the peer completed a successful attempt and keys were not cleared since.
    pub fn is_secure(&self) -> bool {
        self.inner.lock().secure
    }

    /// Record a successful authentication.
    pub fn mark_authenticated(&self, mechanism: &str) {
        let mut inner = self.inner.lock();
        inner.secure = true;
        inner.last_mechanism = Some(mechanism.to_string());
        inner.auth_count = inner.auth_count.saturating_add(1);
    }

    /// Drop secure state. Authorizations are kept and apply again once the
    /// peer re-authenticates.
    pub fn clear_keys(&self) {
        self.inner.lock().secure = false;
    }

    /// Mechanism of the last successful authentication.
    pub fn last_mechanism(&self) -> Option<String> {
        self.inner.lock().last_mechanism.clone()
    }

    /// Number of successful authentications.
    pub fn auth_count(&self) -> u32 {
        self.inner.lock().auth_count
    }

    /// Add `access` bits for `msg_type`; `access == 0` clears them.
    pub fn set_authorization(&self, msg_type: MessageType, access: u8) {
        let mut inner = self.inner.lock();
        let slot = &mut inner.authorizations[msg_type.index()];
        if access != 0 {
            *slot |= access;
        } else {
            *slot = 0;
        }
    }

    /// Whether `msg_type` may be exchanged with `access`.
    ///
    /// Peers that are not secure are not subject to authorization.
    pub fn is_authorized(&self, msg_type: MessageType, access: u8) -> bool {
        let inner = self.inner.lock();
        if !inner.secure {
            return true;
        }
        inner.authorizations[msg_type.index()] & access == access
    }

    /// `true` while an [`AttemptGuard`] for this peer is alive.
    pub fn attempt_in_progress(&self) -> bool {
        self.attempt_active.load(Ordering::Acquire)
    }
}

/// Exclusive claim on a peer for the duration of one attempt.
///
/// Released on drop.
#[derive(Debug)]
pub struct AttemptGuard {
    peer: PeerIdentity,
    state: Arc<PeerState>,
}

impl AttemptGuard {
    pub fn peer(&self) -> &PeerIdentity {
        &self.peer
    }

    pub fn state(&self) -> &Arc<PeerState> {
        &self.state
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.state.attempt_active.store(false, Ordering::Release);
        log::trace!("[peer-state] Attempt slot released for {}", self.peer);
    }
}

/// Map from bus names to peer state.
#[derive(Debug, Default)]
pub struct PeerStateTable {
    peers: DashMap<PeerIdentity, Arc<PeerState>>,
}

impl PeerStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `peer`, created on first use.
    pub fn get_or_create(&self, peer: &PeerIdentity) -> Arc<PeerState> {
        self.peers
            .entry(peer.clone())
            .or_insert_with(|| {
                log::debug!("[peer-state] New peer {}", peer);
                Arc::new(PeerState::default())
            })
            .value()
            .clone()
    }

    /// State for `peer` if it is known.
    pub fn get(&self, peer: &PeerIdentity) -> Option<Arc<PeerState>> {
        self.peers.get(peer).map(|entry| entry.value().clone())
    }

    pub fn is_known_peer(&self, peer: &PeerIdentity) -> bool {
        self.peers.contains_key(peer)
    }

    /// Make `alias` resolve to the same state as `unique_name`.
    ///
    /// # Errors
    ///
    /// `AuthError::AttemptInProgress` if `alias` currently resolves to another
    /// state with a live [`AttemptGuard`].
    pub fn add_alias(
        &self,
        unique_name: &PeerIdentity,
        alias: &PeerIdentity,
    ) -> Result<Arc<PeerState>, AuthError> {
        let state = self.get_or_create(unique_name);
        match self.peers.entry(alias.clone()) {
            Entry::Occupied(mut entry) => {
                if !Arc::ptr_eq(entry.get(), &state) {
                    if entry.get().attempt_in_progress() {
                        log::debug!(
                            "[peer-state] Alias {} not moved: attempt running",
                            alias
                        );
                        return Err(AuthError::AttemptInProgress(alias.to_string()));
                    }
                    entry.insert(state.clone());
                    log::debug!("[peer-state] Alias {} moved to {}", alias, unique_name);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(state.clone());
            }
        }
        Ok(state)
    }

    /// `true` if both names are equal or known to refer to the same peer.
    pub fn is_alias(&self, a: &PeerIdentity, b: &PeerIdentity) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Some(sa), Some(sb)) => Arc::ptr_eq(&sa, &sb),
            _ => false,
        }
    }

    /// Forget the state stored under `peer`. Other aliases keep theirs.
    ///
    /// Returns `Ok(false)` if the name was unknown.
    ///
    /// # Errors
    ///
    /// `AuthError::AttemptInProgress` while a guard holds the peer's state.
    pub fn remove(&self, peer: &PeerIdentity) -> Result<bool, AuthError> {
        if self
            .peers
            .remove_if(peer, |_, state| !state.attempt_in_progress())
            .is_some()
        {
            log::debug!("[peer-state] Removed {}", peer);
            return Ok(true);
        }
        if self.peers.contains_key(peer) {
            return Err(AuthError::AttemptInProgress(peer.to_string()));
        }
        Ok(false)
    }

    /// Forget all peers except those with a live attempt.
    ///
    /// Returns the number of names kept.
    pub fn clear(&self) -> usize {
        self.peers.retain(|_, state| !state.attempt_in_progress());
        let kept = self.peers.len();
        if kept > 0 {
            log::debug!("[peer-state] Cleared table, {} name(s) kept for running attempts", kept);
        }
        kept
    }

    /// Number of names in the table (aliases counted separately).
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Claim `peer` for one attempt.
    ///
    /// # Errors
    ///
    /// `AuthError::AttemptInProgress` while another guard for the same peer
    /// (or one of its aliases) is alive.
    pub fn try_begin_attempt(&self, peer: &PeerIdentity) -> Result<AttemptGuard, AuthError> {
        // Claim under the entry lock so `remove`/`clear` cannot detach the
        // state between lookup and claim.
        let entry = self
            .peers
            .entry(peer.clone())
            .or_insert_with(|| Arc::new(PeerState::default()));
        let state = entry.value();
        if state
            .attempt_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("[peer-state] Attempt already running for {}", peer);
            return Err(AuthError::AttemptInProgress(peer.to_string()));
        }
        Ok(AttemptGuard {
            peer: peer.clone(),
            state: state.clone(),
        })
    }

    /// Apply a finished attempt to the peer's state.
    pub fn record_outcome(&self, outcome: &AuthenticationOutcome) {
        let state = self.get_or_create(outcome.peer());
        if outcome.succeeded() {
            state.mark_authenticated(outcome.mechanism());
        } else {
            state.clear_keys();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{ALLJOYN_ECDHE_PSK, ALLJOYN_SRP_KEYX};

    fn peer(name: &str) -> PeerIdentity {
        PeerIdentity::new(name).expect("valid peer")
    }

    #[test]
    fn test_get_or_create_and_known() {
        let table = PeerStateTable::new();
        assert!(!table.is_known_peer(&peer(":1.7")));
        assert!(table.get(&peer(":1.7")).is_none());

        let a = table.get_or_create(&peer(":1.7"));
        let b = table.get_or_create(&peer(":1.7"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(table.is_known_peer(&peer(":1.7")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_aliases_share_state() {
        let table = PeerStateTable::new();
        let unique = peer(":1.7");
        let alias = peer("org.example.Device");

        table.add_alias(&unique, &alias).expect("alias");
        assert!(table.is_alias(&unique, &alias));
        assert!(table.is_alias(&alias, &alias));
        assert!(!table.is_alias(&unique, &peer(":1.8")));

        table
            .get(&alias)
            .expect("alias known")
            .mark_authenticated(ALLJOYN_SRP_KEYX);
        assert!(table.get(&unique).expect("known").is_secure());
    }

    #[test]
    fn test_remove_and_clear() {
        let table = PeerStateTable::new();
        table.add_alias(&peer(":1.7"), &peer("alias")).expect("alias");
        assert!(table.remove(&peer(":1.7")).expect("no attempt"));
        assert!(!table.remove(&peer(":1.7")).expect("no attempt"));
        assert!(table.is_known_peer(&peer("alias")));
        assert_eq!(table.clear(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_authorization_rules() {
        let state = PeerState::default();

        // Not secure: everything allowed.
        assert!(state.is_authorized(MessageType::Signal, ALLOW_SECURE_RX));

        state.mark_authenticated(ALLJOYN_ECDHE_PSK);
        assert!(!state.is_authorized(MessageType::Signal, ALLOW_SECURE_RX));

        state.set_authorization(MessageType::Signal, ALLOW_SECURE_RX);
        assert!(state.is_authorized(MessageType::Signal, ALLOW_SECURE_RX));
        assert!(!state.is_authorized(MessageType::Signal, ALLOW_SECURE_RX | ALLOW_SECURE_TX));

        state.set_authorization(MessageType::Signal, ALLOW_SECURE_TX);
        assert!(state.is_authorized(MessageType::Signal, ALLOW_SECURE_RX | ALLOW_SECURE_TX));
        assert!(!state.is_authorized(MessageType::MethodCall, ALLOW_SECURE_TX));

        state.set_authorization(MessageType::Signal, 0);
        assert!(!state.is_authorized(MessageType::Signal, ALLOW_SECURE_RX));
    }

    #[test]
    fn test_clear_keys() {
        let state = PeerState::default();
        state.mark_authenticated(ALLJOYN_SRP_KEYX);
        state.set_authorization(MessageType::MethodCall, ALLOW_SECURE_TX);
        state.clear_keys();
        assert!(!state.is_secure());
        assert_eq!(state.last_mechanism().as_deref(), Some(ALLJOYN_SRP_KEYX));

        // Not secure any more, so no authorization applies.
        assert!(state.is_authorized(MessageType::Signal, ALLOW_SECURE_RX));

        state.mark_authenticated(ALLJOYN_SRP_KEYX);
        assert!(state.is_authorized(MessageType::MethodCall, ALLOW_SECURE_TX));
        assert!(!state.is_authorized(MessageType::Signal, ALLOW_SECURE_RX));
        assert_eq!(state.auth_count(), 2);
    }

    #[test]
    fn test_exclusive_attempts() {
        let table = PeerStateTable::new();
        let unique = peer(":1.9");
        let alias = peer("org.example.Lamp");
        table.add_alias(&unique, &alias).expect("alias");

        let guard = table.try_begin_attempt(&unique).expect("first claim");
        assert!(guard.state().attempt_in_progress());

        let err = table.try_begin_attempt(&alias).unwrap_err();
        assert!(matches!(err, AuthError::AttemptInProgress(_)));

        // Other peers are unaffected.
        let other = table.try_begin_attempt(&peer(":1.10")).expect("other peer");
        drop(other);

        drop(guard);
        let again = table.try_begin_attempt(&alias).expect("released");
        assert_eq!(again.peer(), &alias);
    }

    #[test]
    fn test_remove_refused_while_attempt_running() {
        let table = PeerStateTable::new();
        let p = peer(":1.11");

        let guard = table.try_begin_attempt(&p).expect("first claim");
        let err = table.remove(&p).unwrap_err();
        assert!(matches!(err, AuthError::AttemptInProgress(_)));
        assert!(matches!(
            table.try_begin_attempt(&p),
            Err(AuthError::AttemptInProgress(_))
        ));

        drop(guard);
        assert!(table.remove(&p).expect("released"));
        assert!(!table.is_known_peer(&p));
    }

    #[test]
    fn test_clear_keeps_running_attempts() {
        let table = PeerStateTable::new();
        let busy = peer(":1.12");
        table.get_or_create(&peer(":1.13"));

        let guard = table.try_begin_attempt(&busy).expect("claim");
        assert_eq!(table.clear(), 1);
        assert!(table.is_known_peer(&busy));
        assert!(!table.is_known_peer(&peer(":1.13")));
        assert!(table.try_begin_attempt(&busy).is_err());

        drop(guard);
        assert_eq!(table.clear(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_alias_not_moved_off_running_attempt() {
        let table = PeerStateTable::new();
        let old_owner = peer(":1.20");
        let new_owner = peer(":1.21");
        let alias = peer("org.example.Sensor");
        table.add_alias(&old_owner, &alias).expect("alias");

        let guard = table.try_begin_attempt(&alias).expect("claim");
        let err = table.add_alias(&new_owner, &alias).unwrap_err();
        assert!(matches!(err, AuthError::AttemptInProgress(_)));
        assert!(table.is_alias(&old_owner, &alias));
        assert!(table.try_begin_attempt(&alias).is_err());

        drop(guard);
        table.add_alias(&new_owner, &alias).expect("moved");
        assert!(table.is_alias(&new_owner, &alias));
        assert!(!table.is_alias(&old_owner, &alias));
    }

    #[test]
    fn test_record_outcome() {
        let table = PeerStateTable::new();
        let p = peer("peer.A");

        table.record_outcome(&AuthenticationOutcome::new(ALLJOYN_SRP_KEYX, p.clone(), true));
        let state = table.get(&p).expect("known");
        assert!(state.is_secure());
        assert_eq!(state.last_mechanism().as_deref(), Some(ALLJOYN_SRP_KEYX));

        table.record_outcome(&AuthenticationOutcome::new(ALLJOYN_SRP_KEYX, p.clone(), false));
        assert!(!state.is_secure());
        assert_eq!(state.auth_count(), 1);
    }
}
