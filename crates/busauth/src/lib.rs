// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Peer authentication coordinator for message-bus attachments
//!
//! Bridges a bus authentication engine and an application-supplied
//! password source. The engine asks for a credential whenever it
//! authenticates a remote peer and reports the final result once the
//! exchange ends; the coordinator routes both to the bound handler.
//!
//! # Features
//!
//! - **Credential requests**: `request_credential` forwards to the bound
//!   [`AuthPasswordHandler`] and passes its answer through unchanged
//! - **Outcome delivery**: `report_outcome` notifies the handler exactly once
//!   per attempt
//! - **Callback isolation**: handler errors and panics never reach the engine
//! - **Peer state**: per-peer security flags, aliases and attempt exclusion
//! - **Interface tables**: static descriptors with signature validation
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use busauth::{AuthenticationCoordinator, PasswordTable, PeerIdentity};
//!
//! let table = Arc::new(PasswordTable::new());
//! let peer = PeerIdentity::new("peer.A").expect("valid name");
//! table.set_password(peer.clone(), "secret1".into());
//!
//! let coordinator = AuthenticationCoordinator::with_handler(table.clone());
//! let credential = coordinator.request_credential(&peer).expect("handler bound");
//! assert_eq!(credential.as_ref().map(|c| c.expose()), Some("secret1"));
//!
//! coordinator.report_outcome("ALLJOYN_SRP_LOGON", &peer, true);
//! assert!(table.last_outcome(&peer).expect("recorded").succeeded());
//! ```
//!
//! # Configuration File
//!
//! ```yaml
//! mechanisms: [ALLJOYN_SRP_KEYX]
//! default_password: "000000"
//! peers:
//!   peer.A: secret1
//! ```

pub mod config;
pub mod coordinator;
pub mod credential;
pub mod error;
pub mod handler;
pub mod interface;
pub mod outcome;
pub mod peer;
pub mod peer_state;

pub use config::{AuthConfig, ConfigError};
pub use coordinator::{AuthenticationCoordinator, CoordinatorStatsSnapshot, HandshakeAttempt};
pub use credential::Credential;
pub use error::AuthError;
pub use handler::{AuthPasswordHandler, FnPasswordHandler, HandlerError, PasswordTable};
pub use interface::{InterfaceDescriptor, InterfaceError, InterfaceRegistry, MemberDescriptor};
pub use outcome::{AuthenticationOutcome, Mechanism};
pub use peer::{BusNameKind, PeerIdentity};
pub use peer_state::{AttemptGuard, MessageType, PeerState, PeerStateTable};
