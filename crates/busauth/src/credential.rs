// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Password credential with zero-on-drop storage.

use std::fmt;

use zeroize::{Zeroize, Zeroizing};

/// Secret handed from the application to the authentication engine.
///
/// The backing buffer is wiped when the value is dropped. `Debug` never
/// prints the secret. There is intentionally no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    /// Wrap a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Empty credential (distinct from "no credential").
    pub fn empty() -> Self {
        Self::new(String::new())
    }

    /// Borrow the secret. Callers must not copy it into long-lived storage.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Secret as bytes, for feeding a verifier or proof computation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Wipe the secret now instead of waiting for drop.
    pub fn wipe(&mut self) {
        self.0.zeroize();
    }
}

impl From<&str> for Credential {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl From<String> for Credential {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}
