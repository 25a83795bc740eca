// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Authentication outcome and mechanism names.

use std::fmt;

use crate::peer::PeerIdentity;

/// SRP key exchange (password, peer-stored verifier).
pub const ALLJOYN_SRP_KEYX: &str = "ALLJOYN_SRP_KEYX";
/// SRP logon (user name + password).
pub const ALLJOYN_SRP_LOGON: &str = "ALLJOYN_SRP_LOGON";
/// ECDHE without authentication.
pub const ALLJOYN_ECDHE_NULL: &str = "ALLJOYN_ECDHE_NULL";
/// ECDHE with a pre-shared key.
pub const ALLJOYN_ECDHE_PSK: &str = "ALLJOYN_ECDHE_PSK";
/// ECDHE with password-derived key (SPEKE).
pub const ALLJOYN_ECDHE_SPEKE: &str = "ALLJOYN_ECDHE_SPEKE";
/// ECDHE with certificates.
pub const ALLJOYN_ECDHE_ECDSA: &str = "ALLJOYN_ECDHE_ECDSA";

/// Classification of a negotiated mechanism name.
///
/// Used for reporting only: the outcome always carries the name exactly as
/// the engine reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    SrpKeyx,
    SrpLogon,
    EcdheNull,
    EcdhePsk,
    EcdheSpeke,
    EcdheEcdsa,
}

impl Mechanism {
    /// Match a wire name. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            ALLJOYN_SRP_KEYX => Some(Self::SrpKeyx),
            ALLJOYN_SRP_LOGON => Some(Self::SrpLogon),
            ALLJOYN_ECDHE_NULL => Some(Self::EcdheNull),
            ALLJOYN_ECDHE_PSK => Some(Self::EcdhePsk),
            ALLJOYN_ECDHE_SPEKE => Some(Self::EcdheSpeke),
            ALLJOYN_ECDHE_ECDSA => Some(Self::EcdheEcdsa),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SrpKeyx => ALLJOYN_SRP_KEYX,
            Self::SrpLogon => ALLJOYN_SRP_LOGON,
            Self::EcdheNull => ALLJOYN_ECDHE_NULL,
            Self::EcdhePsk => ALLJOYN_ECDHE_PSK,
            Self::EcdheSpeke => ALLJOYN_ECDHE_SPEKE,
            Self::EcdheEcdsa => ALLJOYN_ECDHE_ECDSA,
        }
    }

    /// `true` when the mechanism asks the application for a password.
    pub fn uses_password(self) -> bool {
        matches!(
            self,
            Self::SrpKeyx | Self::SrpLogon | Self::EcdhePsk | Self::EcdheSpeke
        )
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one handshake attempt, produced exactly once per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationOutcome {
    mechanism: String,
    peer: PeerIdentity,
    succeeded: bool,
}

impl AuthenticationOutcome {
    pub fn new(mechanism: impl Into<String>, peer: PeerIdentity, succeeded: bool) -> Self {
        Self {
            mechanism: mechanism.into(),
            peer,
            succeeded,
        }
    }

    /// Mechanism name as negotiated by the engine.
    pub fn mechanism(&self) -> &str {
        &self.mechanism
    }

    pub fn peer(&self) -> &PeerIdentity {
        &self.peer
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Known mechanism, if the name is one of the standard ones.
    pub fn known_mechanism(&self) -> Option<Mechanism> {
        Mechanism::from_name(&self.mechanism)
    }
}

impl fmt::Display for AuthenticationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} with {} via {}",
            if self.succeeded {
                "authenticated"
            } else {
                "authentication failed"
            },
            self.peer,
            self.mechanism
        )
    }
}
