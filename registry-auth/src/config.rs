// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::actor::GroupId;
use crate::identity::Identity;

/// Identifier of the public group unless configured otherwise.
pub const DEFAULT_PUBLIC_GROUP: &str = "public";

/// Configuration shared by an authorizer and the directory it provisions accounts in.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Group every newly provisioned account is added to.
    pub public_group: GroupId,

    /// Identity of callers which presented no credentials.
    pub anonymous_identity: Identity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_group: GroupId::new(DEFAULT_PUBLIC_GROUP),
            anonymous_identity: Identity::anonymous(),
        }
    }
}

impl Config {
    pub fn with_public_group(mut self, public_group: GroupId) -> Self {
        self.public_group = public_group;
        self
    }

    pub fn with_anonymous_identity(mut self, anonymous_identity: Identity) -> Self {
        self.anonymous_identity = anonymous_identity;
        self
    }
}
