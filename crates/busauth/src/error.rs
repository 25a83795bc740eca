// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for peer authentication.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the authentication coordinator and its helpers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential handler is bound when the engine needs one.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The application handler failed inside a callback.
    ///
    /// Never returned to the engine: the coordinator logs it and
    /// substitutes the documented default.
    #[error("Application callback '{operation}' failed for peer '{peer}': {message}")]
    ApplicationCallback {
        operation: &'static str,
        peer: String,
        message: String,
    },

    /// A peer name was empty.
    #[error("Invalid peer name: {0:?}")]
    InvalidPeerName(String),

    /// Another attempt already holds the peer.
    #[error("Authentication already in progress for peer '{0}'")]
    AttemptInProgress(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl AuthError {
    /// Shorthand for the "no handler bound" configuration error.
    pub(crate) fn no_handler() -> Self {
        AuthError::Configuration("no credential handler bound".to_string())
    }
}
