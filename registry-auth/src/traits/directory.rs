// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use crate::actor::{Account, Group, GroupId};
use crate::identity::Identity;

/// Account and group lookups.
///
/// Implementations are shared between concurrent authorization checks, every method takes
/// `&self`. Errors signal that the underlying store is unavailable; a missing account or group is
/// never an error.
pub trait Directory {
    type Error: Error;

    /// Return `true` if an account exists for the identity.
    fn has_account(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Create an account for the identity.
    ///
    /// Must be idempotent: when the account already exists it is returned unchanged and no
    /// duplicate is created, also when two callers race on the same identity.
    fn create_account(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Account, Self::Error>> + Send;

    /// Add a user to a group.
    ///
    /// Must be idempotent: adding an existing member is a no-op.
    fn add_to_group(
        &self,
        group_id: &GroupId,
        identity: &Identity,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Return `true` if the identity holds an account flagged as administrator.
    fn is_admin(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Get a group and its direct members, `None` if no such group exists.
    fn group(
        &self,
        group_id: &GroupId,
    ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send;
}
