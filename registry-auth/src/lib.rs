// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability based authorization for registry resources.
//!
//! An [`Authorizer`] decides whether an [`Identity`] may perform an [`Action`] on a resource. It
//! consults two collaborators: a [`Directory`](traits::Directory) holding accounts and nested
//! groups, and a [`CapabilityStore`](traits::CapabilityStore) holding resource owners and the
//! actors granted each action. Groups may contain users and other groups, and the resulting graph
//! may contain cycles; membership is resolved by a [`GroupResolver`] which enters every group at
//! most once per check.
//!
//! [`MemoryRegistry`](memory::MemoryRegistry) implements both collaborators in memory.
mod action;
mod actor;
mod authorizer;
mod config;
mod identity;
pub mod memory;
mod resolver;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
#[cfg(test)]
mod tests;
pub mod traits;
mod traversal;
mod view;

pub use action::{Action, UnknownAction};
pub use actor::{Account, Actor, Group, GroupId, ResourceId};
pub use authorizer::{AuthorizationError, Authorizer, AuthorizerError, Decision, Permit};
pub use config::{Config, DEFAULT_PUBLIC_GROUP};
pub use identity::{Identity, IdentityError, normalize, same_identity};
pub use resolver::GroupResolver;
pub use traversal::TraversalContext;
pub use view::IdentityAuthorizer;
