// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Authentication configuration.
//!
//! YAML format:
//!
//! ```yaml
//! # busauth.yaml
//! mechanisms: [ALLJOYN_SRP_KEYX, ALLJOYN_ECDHE_PSK]
//! default_password: "000000"
//! peers:
//!   org.example.Device: "123456"
//!   ":1.42": "letmein"
//! log_level: info
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::outcome::{Mechanism, ALLJOYN_SRP_KEYX};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Peer authentication settings.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Mechanisms offered to the engine, in preference order.
    #[serde(default = "default_mechanisms")]
    pub mechanisms: Vec<String>,

    /// Password used for peers without an explicit entry.
    #[serde(default)]
    pub default_password: Option<String>,

    /// Per-peer passwords keyed by bus name.
    #[serde(default)]
    pub peers: BTreeMap<String, String>,

    /// Default `env_logger` filter for tools embedding the coordinator.
    /// `RUST_LOG` and explicit command-line levels take precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_mechanisms() -> Vec<String> {
    vec![ALLJOYN_SRP_KEYX.to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mechanisms: default_mechanisms(),
            default_password: None,
            peers: BTreeMap::new(),
            log_level: default_log_level(),
        }
    }
}

impl AuthConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        log::info!(
            "[config] Loaded {} ({} mechanism(s), {} peer(s))",
            path.display(),
            config.mechanisms.len(),
            config.peers.len()
        );
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mechanisms.is_empty() {
            return Err(ConfigError::Invalid("No mechanisms configured".into()));
        }

        for (i, mech) in self.mechanisms.iter().enumerate() {
            if mech.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("Mechanism {} is empty", i)));
            }
            if mech.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "Mechanism {:?} contains whitespace",
                    mech
                )));
            }
            if Mechanism::from_name(mech).is_none() {
                log::warn!("[config] Mechanism {} is not a standard mechanism", mech);
            }
        }

        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level is empty".into()));
        }

        if self.peers.keys().any(|name| name.is_empty()) {
            return Err(ConfigError::Invalid("Peer with empty bus name".into()));
        }

        Ok(())
    }

    /// Space-separated mechanism list, as passed when enabling peer security.
    pub fn mechanism_list(&self) -> String {
        self.mechanisms.join(" ")
    }

    /// `true` if at least one configured mechanism asks for a password.
    pub fn needs_password_handler(&self) -> bool {
        self.mechanisms
            .iter()
            .filter_map(|m| Mechanism::from_name(m))
            .any(Mechanism::uses_password)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mechanisms", &self.mechanisms)
            .field(
                "default_password",
                &self.default_password.as_ref().map(|_| "<redacted>"),
            )
            .field("peers", &self.peers.keys().collect::<Vec<_>>())
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::from_yaml("{}").expect("parse");
        assert_eq!(config.mechanisms, vec!["ALLJOYN_SRP_KEYX"]);
        assert!(config.default_password.is_none());
        assert!(config.peers.is_empty());
        assert_eq!(config.log_level, "info");
        assert!(config.needs_password_handler());
    }

    #[test]
    fn test_full_document() {
        let config = AuthConfig::from_yaml(
            r#"
mechanisms: [ALLJOYN_ECDHE_NULL, ALLJOYN_ECDHE_PSK]
default_password: "000000"
peers:
  org.example.Device: "123456"
  ":1.42": letmein
log_level: debug
"#,
        )
        .expect("parse");

        assert_eq!(config.mechanism_list(), "ALLJOYN_ECDHE_NULL ALLJOYN_ECDHE_PSK");
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.peers[":1.42"], "letmein");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_empty_mechanisms_rejected() {
        let err = AuthConfig::from_yaml("mechanisms: []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_blank_mechanism_rejected() {
        let err = AuthConfig::from_yaml("mechanisms: [\"  \"]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_mechanism_accepted() {
        let config = AuthConfig::from_yaml("mechanisms: [X_VENDOR]").expect("parse");
        assert!(!config.needs_password_handler());
    }

    #[test]
    fn test_empty_peer_name_rejected() {
        let err = AuthConfig::from_yaml("peers:\n  \"\": secret\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_blank_log_level_rejected() {
        let err = AuthConfig::from_yaml("log_level: \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = AuthConfig::from_yaml("passwords: {}").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let config = AuthConfig::from_yaml(
            "default_password: topsecret\npeers:\n  peer.A: alsosecret\n",
        )
        .expect("parse");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("topsecret"));
        assert!(!rendered.contains("alsosecret"));
        assert!(rendered.contains("peer.A"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "mechanisms: [ALLJOYN_SRP_LOGON]").expect("write");
        let config = AuthConfig::from_file(file.path()).expect("load");
        assert_eq!(config.mechanisms, vec!["ALLJOYN_SRP_LOGON"]);
    }

    #[test]
    fn test_missing_file() {
        let err = AuthConfig::from_file("/nonexistent/busauth.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
