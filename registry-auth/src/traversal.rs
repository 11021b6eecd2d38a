// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashSet;

use crate::actor::GroupId;

/// Groups visited during one authorization check.
///
/// Created fresh for every top-level check and dropped afterwards. Each group is visited at most
/// once per context, which bounds a walk over the membership graph by the number of distinct
/// groups, cycles included.
#[derive(Clone, Debug, Default)]
pub struct TraversalContext {
    visited: HashSet<GroupId>,
}

impl TraversalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a group as visited.
    ///
    /// Returns `false` if the group was already visited in this context.
    pub fn visit(&mut self, group_id: &GroupId) -> bool {
        if self.visited.contains(group_id) {
            return false;
        }
        self.visited.insert(group_id.clone())
    }

    /// Return `true` if the group was visited in this context.
    pub fn is_visited(&self, group_id: &GroupId) -> bool {
        self.visited.contains(group_id)
    }

    /// Number of distinct groups visited so far.
    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}
