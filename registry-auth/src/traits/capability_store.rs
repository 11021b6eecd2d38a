// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use crate::action::Action;
use crate::actor::{Actor, ResourceId};
use crate::identity::Identity;

/// Resource ownership and capability grant lookups.
pub trait CapabilityStore {
    type Error: Error;

    /// Owner of a resource, `None` if the resource is unknown.
    fn owner(
        &self,
        resource: &ResourceId,
    ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send;

    /// Actors granted an action on a resource, in grant order.
    ///
    /// An empty list means no grant exists and only the owner (or an administrator, where the
    /// action allows it) is permitted.
    fn granted_actors(
        &self,
        resource: &ResourceId,
        action: Action,
    ) -> impl Future<Output = Result<Vec<Actor>, Self::Error>> + Send;
}
