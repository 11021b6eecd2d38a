// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;
use std::fmt::Display;

use crate::identity::Identity;

/// Identifier of a group in the directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a resource guarded by capability grants.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// An actor which can be listed in a group or a capability grant.
///
/// The `Group` variant expresses nested group relations, turning group membership into a
/// directed graph over groups with users as leaves. That graph may contain cycles.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Actor {
    User(Identity),
    Group(GroupId),
}

impl Actor {
    /// Return true if this actor is itself a group.
    pub fn is_group(&self) -> bool {
        matches!(self, Actor::Group(_))
    }

    /// Return true if this actor is an individual user.
    pub fn is_user(&self) -> bool {
        !self.is_group()
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::User(identity) => write!(f, "user:{identity}"),
            Actor::Group(id) => write!(f, "group:{id}"),
        }
    }
}

/// A group and its direct members.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    pub id: GroupId,
    pub description: String,
    pub members: BTreeSet<Actor>,
}

impl Group {
    pub fn new(id: GroupId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            members: BTreeSet::new(),
        }
    }

    /// Direct user members.
    pub fn users(&self) -> impl Iterator<Item = &Identity> {
        self.members.iter().filter_map(|actor| match actor {
            Actor::User(identity) => Some(identity),
            Actor::Group(_) => None,
        })
    }

    /// Direct sub-groups.
    pub fn sub_groups(&self) -> impl Iterator<Item = &GroupId> {
        self.members.iter().filter_map(|actor| match actor {
            Actor::User(_) => None,
            Actor::Group(id) => Some(id),
        })
    }
}

/// An identity known to the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Account {
    pub identity: Identity,
    pub admin: bool,
}

impl Account {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            admin: false,
        }
    }
}
