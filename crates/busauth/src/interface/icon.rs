// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device icon interface (`org.alljoyn.Icon`).

use super::{Access, InterfaceDescriptor, MemberDescriptor};

/// Interface name.
pub const ICON_INTERFACE_NAME: &str = "org.alljoyn.Icon";
/// Object path the icon is published under.
pub const ICON_OBJECT_PATH: &str = "/About/DeviceIcon";

const ICON_MEMBERS: &[MemberDescriptor] = &[
    MemberDescriptor::property("Version", "q", Access::Read).describe("Interface version"),
    MemberDescriptor::property("MimeType", "s", Access::Read).describe("Mime type for the icon"),
    MemberDescriptor::property("Size", "u", Access::Read).describe("Size of the icon"),
    MemberDescriptor::method("GetUrl", "", "s")
        .describe("URL of the icon if it is hosted on the cloud"),
    MemberDescriptor::method("GetContent", "", "ay").describe("Binary content of the icon"),
];

/// Descriptor for the announced device icon interface.
pub static ICON_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: ICON_INTERFACE_NAME,
    object_path: Some(ICON_OBJECT_PATH),
    announced: true,
    members: ICON_MEMBERS,
};
