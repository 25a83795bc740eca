// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Peer identity (remote bus name).

use std::fmt;
use std::sync::Arc;

use crate::error::AuthError;

/// Kind of bus name a peer was addressed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusNameKind {
    /// Unique connection name assigned by the bus (e.g. `:1.42`).
    Unique,
    /// Well-known name requested by an application (e.g. `org.example.Device`).
    WellKnown,
}

/// Opaque name of a remote bus participant.
///
/// Cheap to clone (shared `Arc<str>`) and immutable once created, so it can
/// be handed to engine threads and used as a lookup key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerIdentity(Arc<str>);

impl PeerIdentity {
    /// Create a peer identity. Only the empty string is rejected; the name
    /// is otherwise kept verbatim.
    pub fn new(name: impl AsRef<str>) -> Result<Self, AuthError> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(AuthError::InvalidPeerName(name.to_string()));
        }
        Ok(Self(Arc::from(name)))
    }

    /// The bus name as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the name without altering it.
    pub fn kind(&self) -> BusNameKind {
        if self.0.starts_with(':') {
            BusNameKind::Unique
        } else {
            BusNameKind::WellKnown
        }
    }

    /// `true` for names assigned by the bus.
    pub fn is_unique_name(&self) -> bool {
        self.kind() == BusNameKind::Unique
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerIdentity({:?})", &*self.0)
    }
}

impl AsRef<str> for PeerIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PeerIdentity {
    type Error = AuthError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl TryFrom<String> for PeerIdentity {
    type Error = AuthError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        let err = PeerIdentity::new("").unwrap_err();
        assert!(matches!(err, AuthError::InvalidPeerName(_)));
    }

    #[test]
    fn test_name_kept_verbatim() {
        let peer = PeerIdentity::new("  org.example.Device ").expect("valid");
        assert_eq!(peer.as_str(), "  org.example.Device ");
        assert_eq!(peer.to_string(), "  org.example.Device ");
    }

    #[test]
    fn test_kind() {
        let unique = PeerIdentity::new(":1.42").expect("valid");
        let known = PeerIdentity::new("org.alljoyn.Icon").expect("valid");
        assert_eq!(unique.kind(), BusNameKind::Unique);
        assert!(unique.is_unique_name());
        assert_eq!(known.kind(), BusNameKind::WellKnown);
        assert!(!known.is_unique_name());
    }

    #[test]
    fn test_clone_shares_and_compares() {
        let a = PeerIdentity::try_from("peer.A").expect("valid");
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, PeerIdentity::try_from("peer.B".to_string()).expect("valid"));
    }
}
