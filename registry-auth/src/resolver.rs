// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reachability of users through nested groups.
use std::collections::BTreeSet;

use tracing::{trace, warn};

use crate::actor::GroupId;
use crate::identity::{Identity, same_identity};
use crate::traits::Directory;
use crate::traversal::TraversalContext;

/// Walks the group membership graph held by a [`Directory`].
///
/// The graph may contain cycles and diamonds. Every walk records the groups it entered in the
/// given [`TraversalContext`] and never enters a group twice, so it terminates after at most one
/// lookup per distinct group. The walk keeps its own stack instead of recursing, which keeps deep
/// group chains off the call stack.
///
/// Groups the directory cannot resolve contribute no members and the walk continues with the
/// remaining ones.
#[derive(Debug)]
pub struct GroupResolver<'a, D> {
    directory: &'a D,
}

impl<'a, D> GroupResolver<'a, D>
where
    D: Directory,
{
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Return `true` if the identity is a member of the group, directly or through any chain of
    /// sub-groups.
    ///
    /// Returns `false` straight away if the group was already visited in this context. Users of
    /// a group are checked before its sub-groups are entered.
    pub async fn is_reachable(
        &self,
        identity: &Identity,
        group_id: &GroupId,
        ctx: &mut TraversalContext,
    ) -> Result<bool, D::Error> {
        let mut stack = vec![group_id.clone()];

        while let Some(current) = stack.pop() {
            if !ctx.visit(&current) {
                continue;
            }
            trace!(group = %current, %identity, "visit group");

            let Some(group) = self.directory.group(&current).await? else {
                warn!(group = %current, "group not found, skipping");
                continue;
            };

            if group.users().any(|user| same_identity(user, identity)) {
                return Ok(true);
            }

            // Reversed so that sub-groups are entered in their stored order.
            let mut sub_groups: Vec<GroupId> = group
                .sub_groups()
                .filter(|id| !ctx.is_visited(id))
                .cloned()
                .collect();
            sub_groups.reverse();
            stack.extend(sub_groups);
        }

        Ok(false)
    }

    /// All users reachable from the group.
    pub async fn transitive_members(
        &self,
        group_id: &GroupId,
        ctx: &mut TraversalContext,
    ) -> Result<BTreeSet<Identity>, D::Error> {
        let mut members = BTreeSet::new();
        let mut stack = vec![group_id.clone()];

        while let Some(current) = stack.pop() {
            if !ctx.visit(&current) {
                continue;
            }

            let Some(group) = self.directory.group(&current).await? else {
                warn!(group = %current, "group not found, skipping");
                continue;
            };

            members.extend(group.users().cloned());
            stack.extend(
                group
                    .sub_groups()
                    .filter(|id| !ctx.is_visited(id))
                    .cloned(),
            );
        }

        Ok(members)
    }
}
