// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown action \"{0}\"")]
pub struct UnknownAction(pub String);

/// Actions an identity can request on a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum Action {
    /// Read a resource. Always permitted.
    Read,

    /// Modify a resource. Requires ownership or a capability grant.
    Write,

    /// Register new resources. Permitted for every identity holding an account.
    AddNew,

    /// Administer the whole registry.
    SysAdmin,

    /// Administer a single resource, for example change its grants.
    ResourceAdmin,
}

impl Action {
    /// Return `true` if evaluating this action needs a resource id.
    pub fn requires_resource(&self) -> bool {
        matches!(self, Action::Write | Action::ResourceAdmin)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::AddNew => "add-new",
            Action::SysAdmin => "sys-admin",
            Action::ResourceAdmin => "resource-admin",
        };

        write!(f, "{}", s)
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "add-new" => Ok(Action::AddNew),
            "sys-admin" => Ok(Action::SysAdmin),
            "resource-admin" => Ok(Action::ResourceAdmin),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}
