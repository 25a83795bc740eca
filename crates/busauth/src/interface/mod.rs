// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bus interface descriptor tables.
//!
//! Interfaces are described with `&'static` data so a table can be built at
//! compile time and handed to [`InterfaceRegistry::register`], which checks
//! names, signatures and annotation placement before accepting it.
//!
//! ```
//! use busauth::interface::{annotate, InterfaceDescriptor, InterfaceRegistry, MemberDescriptor};
//!
//! static CHAT: InterfaceDescriptor = InterfaceDescriptor {
//!     name: "org.example.Chat",
//!     object_path: Some("/chat"),
//!     announced: false,
//!     members: &[
//!         MemberDescriptor::signal("Message", "s").annotate(annotate::SESSIONCAST),
//!         MemberDescriptor::method("Ping", "s", "s"),
//!     ],
//! };
//!
//! let registry = InterfaceRegistry::new();
//! registry.register(&CHAT).expect("valid interface");
//! assert!(registry.get("org.example.Chat").is_some());
//! ```

pub mod icon;
pub mod signature;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use parking_lot::RwLock;
use thiserror::Error;

pub use icon::ICON_INTERFACE;
pub use signature::SignatureError;

/// Maximum interface or member name length.
pub const MAX_NAME_LEN: usize = 255;

/// Member annotation flags.
pub mod annotate {
    /// Member is deprecated.
    pub const DEPRECATED: u8 = 2;
    /// Signal is delivered to session members only.
    pub const SESSIONCAST: u8 = 4;
    /// Signal is delivered without a session.
    pub const SESSIONLESS: u8 = 8;
    /// Signal is delivered to a single destination.
    pub const UNICAST: u8 = 16;
    /// Signal is forwarded across the whole bus.
    pub const GLOBAL_BROADCAST: u8 = 32;

    /// Flags only meaningful on signals.
    pub const SIGNAL_ONLY: u8 = SESSIONCAST | SESSIONLESS | UNICAST | GLOBAL_BROADCAST;
    /// Every defined flag.
    pub const ALL: u8 = DEPRECATED | SIGNAL_ONLY;
}

const DEPRECATED_ANNOTATION: &str = "org.freedesktop.DBus.Deprecated";

/// Interface registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    #[error("invalid interface name {0:?}")]
    InvalidInterfaceName(String),

    #[error("invalid object path {path:?} for {interface}")]
    InvalidObjectPath { interface: String, path: String },

    #[error("invalid member name {member:?} in {interface}")]
    InvalidMemberName { interface: String, member: String },

    #[error("{interface}.{member}: {source}")]
    Signature {
        interface: String,
        member: String,
        #[source]
        source: SignatureError,
    },

    #[error("{interface}.{member}: property type must be a single complete type")]
    PropertyType { interface: String, member: String },

    #[error("{interface}.{member}: annotation flags {flags:#04x} not allowed here")]
    Annotation {
        interface: String,
        member: String,
        flags: u8,
    },

    #[error("{interface}.{member} declared more than once")]
    DuplicateMember { interface: String, member: String },

    #[error("interface {0} already registered")]
    AlreadyRegistered(String),
}

/// Kind of interface member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Signal,
    Property,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Signal => "signal",
            MemberKind::Property => "property",
        }
    }
}

/// Property access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    /// Introspection `access` attribute value.
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::ReadWrite => "readwrite",
        }
    }
}

/// One method, signal or property.
///
/// For methods `signature` holds the input arguments and `reply_signature`
/// the output. Signals only use `signature`; properties use it as the value
/// type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub name: &'static str,
    pub kind: MemberKind,
    pub signature: &'static str,
    pub reply_signature: &'static str,
    pub access: Option<Access>,
    pub annotations: u8,
    pub description: Option<&'static str>,
}

impl MemberDescriptor {
    pub const fn method(
        name: &'static str,
        signature: &'static str,
        reply_signature: &'static str,
    ) -> Self {
        Self {
            name,
            kind: MemberKind::Method,
            signature,
            reply_signature,
            access: None,
            annotations: 0,
            description: None,
        }
    }

    pub const fn signal(name: &'static str, signature: &'static str) -> Self {
        Self {
            name,
            kind: MemberKind::Signal,
            signature,
            reply_signature: "",
            access: None,
            annotations: 0,
            description: None,
        }
    }

    pub const fn property(name: &'static str, signature: &'static str, access: Access) -> Self {
        Self {
            name,
            kind: MemberKind::Property,
            signature,
            reply_signature: "",
            access: Some(access),
            annotations: 0,
            description: None,
        }
    }

    /// Add annotation flags (see [`annotate`]).
    pub const fn annotate(self, flags: u8) -> Self {
        Self {
            annotations: self.annotations | flags,
            ..self
        }
    }

    pub const fn describe(self, text: &'static str) -> Self {
        Self {
            description: Some(text),
            ..self
        }
    }

    pub fn is_deprecated(&self) -> bool {
        self.annotations & annotate::DEPRECATED != 0
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.annotations & flag == flag
    }
}

/// Static description of a bus interface.
#[derive(Debug, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: &'static str,
    /// Object path the interface is published under, if fixed.
    pub object_path: Option<&'static str>,
    /// Listed in About announcements.
    pub announced: bool,
    pub members: &'static [MemberDescriptor],
}

impl InterfaceDescriptor {
    /// Look up a member by exact name.
    pub fn member(&self, name: &str) -> Option<&'static MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn members_of(
        &self,
        kind: MemberKind,
    ) -> impl Iterator<Item = &'static MemberDescriptor> + '_ {
        self.members.iter().filter(move |m| m.kind == kind)
    }

    /// Check names, signatures and flag placement.
    pub fn validate(&self) -> Result<(), InterfaceError> {
        if !is_valid_interface_name(self.name) {
            return Err(InterfaceError::InvalidInterfaceName(self.name.to_string()));
        }

        if let Some(path) = self.object_path {
            if !is_valid_object_path(path) {
                return Err(InterfaceError::InvalidObjectPath {
                    interface: self.name.to_string(),
                    path: path.to_string(),
                });
            }
        }

        for (i, member) in self.members.iter().enumerate() {
            self.validate_member(member)?;
            if self.members[..i].iter().any(|m| m.name == member.name) {
                return Err(InterfaceError::DuplicateMember {
                    interface: self.name.to_string(),
                    member: member.name.to_string(),
                });
            }
        }

        Ok(())
    }

    fn validate_member(&self, member: &MemberDescriptor) -> Result<(), InterfaceError> {
        let interface = || self.name.to_string();
        let name = || member.name.to_string();

        if !is_valid_member_name(member.name) {
            return Err(InterfaceError::InvalidMemberName {
                interface: interface(),
                member: name(),
            });
        }

        for sig in [member.signature, member.reply_signature] {
            signature::validate(sig).map_err(|source| InterfaceError::Signature {
                interface: interface(),
                member: name(),
                source,
            })?;
        }

        if member.kind == MemberKind::Property
            && !signature::is_single_complete_type(member.signature)
        {
            return Err(InterfaceError::PropertyType {
                interface: interface(),
                member: name(),
            });
        }

        let mut misplaced = member.annotations & !annotate::ALL;
        if member.kind != MemberKind::Signal {
            misplaced |= member.annotations & annotate::SIGNAL_ONLY;
        }
        if misplaced != 0 {
            return Err(InterfaceError::Annotation {
                interface: interface(),
                member: name(),
                flags: misplaced,
            });
        }

        Ok(())
    }

    /// Render D-Bus style introspection XML for this interface.
    pub fn to_introspection_xml(&self) -> String {
        let mut xml = String::new();
        let _ = writeln!(xml, "<interface name=\"{}\">", self.name);

        for member in self.members {
            match member.kind {
                MemberKind::Property => {
                    let access = member.access.unwrap_or(Access::Read).as_str();
                    if member.is_deprecated() {
                        let _ = writeln!(
                            xml,
                            "  <property name=\"{}\" type=\"{}\" access=\"{}\">",
                            member.name, member.signature, access
                        );
                        write_deprecated(&mut xml);
                        xml.push_str("  </property>\n");
                    } else {
                        let _ = writeln!(
                            xml,
                            "  <property name=\"{}\" type=\"{}\" access=\"{}\"/>",
                            member.name, member.signature, access
                        );
                    }
                }
                MemberKind::Method => {
                    let _ = writeln!(xml, "  <method name=\"{}\">", member.name);
                    write_args(&mut xml, member.signature, Some("in"));
                    write_args(&mut xml, member.reply_signature, Some("out"));
                    if member.is_deprecated() {
                        write_deprecated(&mut xml);
                    }
                    xml.push_str("  </method>\n");
                }
                MemberKind::Signal => {
                    let _ = writeln!(xml, "  <signal name=\"{}\">", member.name);
                    write_args(&mut xml, member.signature, None);
                    if member.is_deprecated() {
                        write_deprecated(&mut xml);
                    }
                    xml.push_str("  </signal>\n");
                }
            }
        }

        xml.push_str("</interface>\n");
        xml
    }
}

fn write_args(xml: &mut String, sig: &str, direction: Option<&str>) {
    // Unvalidated descriptors fall back to a single argument.
    let types = signature::split(sig).unwrap_or_else(|_| vec![sig]);
    for ty in types {
        match direction {
            Some(dir) => {
                let _ = writeln!(xml, "    <arg type=\"{}\" direction=\"{}\"/>", ty, dir);
            }
            None => {
                let _ = writeln!(xml, "    <arg type=\"{}\"/>", ty);
            }
        }
    }
}

fn write_deprecated(xml: &mut String) {
    let _ = writeln!(
        xml,
        "    <annotation name=\"{}\" value=\"true\"/>",
        DEPRECATED_ANNOTATION
    );
}

fn is_identifier(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Dot-separated identifiers, at least two elements.
pub fn is_valid_interface_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN && name.split('.').count() >= 2 && name.split('.').all(is_identifier)
}

pub fn is_valid_member_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN && is_identifier(name)
}

/// `/` or `/`-separated non-empty elements of `[A-Za-z0-9_]`.
pub fn is_valid_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    match path.strip_prefix('/') {
        Some(rest) => rest.split('/').all(|element| {
            !element.is_empty()
                && element
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }),
        None => false,
    }
}

/// Validated set of interfaces keyed by name.
#[derive(Default)]
pub struct InterfaceRegistry {
    interfaces: RwLock<BTreeMap<&'static str, &'static InterfaceDescriptor>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in interfaces.
    pub fn with_builtin() -> Result<Self, InterfaceError> {
        let registry = Self::new();
        registry.register(&ICON_INTERFACE)?;
        Ok(registry)
    }

    /// Validate and add an interface.
    pub fn register(&self, descriptor: &'static InterfaceDescriptor) -> Result<(), InterfaceError> {
        descriptor.validate()?;

        let mut interfaces = self.interfaces.write();
        if interfaces.contains_key(descriptor.name) {
            return Err(InterfaceError::AlreadyRegistered(
                descriptor.name.to_string(),
            ));
        }
        interfaces.insert(descriptor.name, descriptor);

        log::debug!(
            "[iface] Registered {} ({} member(s){})",
            descriptor.name,
            descriptor.members.len(),
            if descriptor.announced { ", announced" } else { "" }
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&'static InterfaceDescriptor> {
        self.interfaces.read().get(name).copied()
    }

    /// Registered interfaces in name order.
    pub fn iter(&self) -> impl Iterator<Item = &'static InterfaceDescriptor> {
        self.interfaces
            .read()
            .values()
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Interfaces listed in About announcements.
    pub fn announced(&self) -> Vec<&'static InterfaceDescriptor> {
        self.iter().filter(|d| d.announced).collect()
    }

    pub fn len(&self) -> usize {
        self.interfaces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static CHAT: InterfaceDescriptor = InterfaceDescriptor {
        name: "org.example.Chat",
        object_path: Some("/chat/room_1"),
        announced: false,
        members: &[
            MemberDescriptor::signal("Message", "s")
                .annotate(annotate::SESSIONLESS | annotate::GLOBAL_BROADCAST),
            MemberDescriptor::signal("Legacy", "as").annotate(annotate::DEPRECATED),
            MemberDescriptor::method("Join", "so", "b"),
            MemberDescriptor::property("Topic", "s", Access::ReadWrite),
        ],
    };

    static BAD_NAME: InterfaceDescriptor = InterfaceDescriptor {
        name: "Chat",
        object_path: None,
        announced: false,
        members: &[],
    };

    static BAD_SIGNATURE: InterfaceDescriptor = InterfaceDescriptor {
        name: "org.example.Bad",
        object_path: None,
        announced: false,
        members: &[MemberDescriptor::method("Call", "a{vs}", "")],
    };

    static SIGNAL_FLAG_ON_METHOD: InterfaceDescriptor = InterfaceDescriptor {
        name: "org.example.Flags",
        object_path: None,
        announced: false,
        members: &[MemberDescriptor::method("Call", "", "").annotate(annotate::UNICAST)],
    };

    static UNKNOWN_FLAG: InterfaceDescriptor = InterfaceDescriptor {
        name: "org.example.Unknown",
        object_path: None,
        announced: false,
        members: &[MemberDescriptor::signal("Tick", "").annotate(1)],
    };

    static DUPLICATE: InterfaceDescriptor = InterfaceDescriptor {
        name: "org.example.Dup",
        object_path: None,
        announced: false,
        members: &[
            MemberDescriptor::method("Call", "", ""),
            MemberDescriptor::signal("Call", ""),
        ],
    };

    static MULTI_TYPE_PROPERTY: InterfaceDescriptor = InterfaceDescriptor {
        name: "org.example.Prop",
        object_path: None,
        announced: false,
        members: &[MemberDescriptor::property("Pair", "ss", Access::Read)],
    };

    static BAD_PATH: InterfaceDescriptor = InterfaceDescriptor {
        name: "org.example.Path",
        object_path: Some("/trailing/"),
        announced: false,
        members: &[],
    };

    #[test]
    fn test_register_and_lookup() {
        let registry = InterfaceRegistry::new();
        registry.register(&CHAT).expect("register");
        assert_eq!(registry.len(), 1);

        let chat = registry.get("org.example.Chat").expect("registered");
        let message = chat.member("Message").expect("member");
        assert!(message.has_flag(annotate::SESSIONLESS));
        assert!(!message.has_flag(annotate::UNICAST));
        assert!(chat.member("Legacy").expect("member").is_deprecated());
    }

    #[test]
    fn test_register_twice_rejected() {
        let registry = InterfaceRegistry::new();
        registry.register(&CHAT).expect("register");
        assert_eq!(
            registry.register(&CHAT),
            Err(InterfaceError::AlreadyRegistered("org.example.Chat".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_validation_errors() {
        let registry = InterfaceRegistry::new();

        assert!(matches!(
            registry.register(&BAD_NAME),
            Err(InterfaceError::InvalidInterfaceName(_))
        ));
        assert!(matches!(
            registry.register(&BAD_SIGNATURE),
            Err(InterfaceError::Signature {
                source: SignatureError::DictKeyNotBasic(2),
                ..
            })
        ));
        assert!(matches!(
            registry.register(&SIGNAL_FLAG_ON_METHOD),
            Err(InterfaceError::Annotation { flags: 16, .. })
        ));
        assert!(matches!(
            registry.register(&UNKNOWN_FLAG),
            Err(InterfaceError::Annotation { flags: 1, .. })
        ));
        assert!(matches!(
            registry.register(&DUPLICATE),
            Err(InterfaceError::DuplicateMember { .. })
        ));
        assert!(matches!(
            registry.register(&MULTI_TYPE_PROPERTY),
            Err(InterfaceError::PropertyType { .. })
        ));
        assert!(matches!(
            registry.register(&BAD_PATH),
            Err(InterfaceError::InvalidObjectPath { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_name_rules() {
        assert!(is_valid_interface_name("org.alljoyn.Icon"));
        assert!(is_valid_interface_name("_a.b1"));
        assert!(!is_valid_interface_name("org"));
        assert!(!is_valid_interface_name("org..x"));
        assert!(!is_valid_interface_name("org.1x"));
        assert!(!is_valid_interface_name(&format!("a.{}", "b".repeat(254))));

        assert!(is_valid_member_name("GetContent"));
        assert!(!is_valid_member_name("Get.Content"));
        assert!(!is_valid_member_name(""));

        assert!(is_valid_object_path("/"));
        assert!(is_valid_object_path("/About/DeviceIcon"));
        assert!(!is_valid_object_path("About"));
        assert!(!is_valid_object_path("/a//b"));
    }

    #[test]
    fn test_introspection_xml() {
        let xml = CHAT.to_introspection_xml();
        assert!(xml.starts_with("<interface name=\"org.example.Chat\">\n"));
        assert!(xml.contains("  <method name=\"Join\">\n    <arg type=\"s\" direction=\"in\"/>\n    <arg type=\"o\" direction=\"in\"/>\n    <arg type=\"b\" direction=\"out\"/>\n  </method>\n"));
        assert!(xml.contains("  <signal name=\"Legacy\">\n    <arg type=\"as\"/>\n    <annotation name=\"org.freedesktop.DBus.Deprecated\" value=\"true\"/>\n  </signal>\n"));
        assert!(xml.contains("<property name=\"Topic\" type=\"s\" access=\"readwrite\"/>"));
        assert!(xml.ends_with("</interface>\n"));
        assert_eq!(xml.matches("Deprecated").count(), 1);
    }

    #[test]
    fn test_builtin_registry() {
        let registry = InterfaceRegistry::with_builtin().expect("builtin interfaces are valid");
        assert_eq!(registry.len(), 1);
        let announced = registry.announced();
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0].object_path, Some("/About/DeviceIcon"));

        let names: Vec<_> = registry.iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["org.alljoyn.Icon"]);
    }
}
