// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory directory and capability store.
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::action::Action;
use crate::actor::{Account, Actor, Group, GroupId, ResourceId};
use crate::config::Config;
use crate::identity::Identity;
use crate::traits::{CapabilityStore, Directory};

/// Description of the group every account joins.
const PUBLIC_GROUP_DESCRIPTION: &str = "Public Group";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("group {0} already exists")]
    GroupExists(GroupId),

    #[error("group {0} is the public group and can not be changed this way")]
    PublicGroupProtected(GroupId),

    #[error("user {0} not found")]
    UserNotFound(Identity),

    #[error("user {0} already exists")]
    UserExists(Identity),

    #[error("{0} is not a member of group {1}")]
    MemberNotFound(Actor, GroupId),

    #[error("resource {0} already registered")]
    ResourceExists(ResourceId),

    #[error("resource {0} not found")]
    ResourceNotFound(ResourceId),
}

#[derive(Debug)]
struct MemoryRegistryInner {
    public_group: GroupId,
    accounts: BTreeMap<Identity, Account>,
    groups: BTreeMap<GroupId, Group>,
    owners: HashMap<ResourceId, Identity>,
    grants: HashMap<(ResourceId, Action), Vec<Actor>>,
}

impl MemoryRegistryInner {
    fn group_mut(&mut self, group_id: &GroupId) -> Result<&mut Group, RegistryError> {
        self.groups
            .get_mut(group_id)
            .ok_or_else(|| RegistryError::GroupNotFound(group_id.clone()))
    }

    fn ensure_user(&self, identity: &Identity) -> Result<(), RegistryError> {
        if self.accounts.contains_key(identity) {
            Ok(())
        } else {
            Err(RegistryError::UserNotFound(identity.clone()))
        }
    }

    fn insert_account(&mut self, identity: &Identity, admin: bool) -> Account {
        let account = self
            .accounts
            .entry(identity.clone())
            .or_insert_with(|| Account {
                identity: identity.clone(),
                admin,
            })
            .clone();

        let public_group = self.public_group.clone();
        if let Some(group) = self.groups.get_mut(&public_group) {
            group.members.insert(Actor::User(identity.clone()));
        }

        account
    }

    fn remove_actor_everywhere(&mut self, actor: &Actor) {
        for group in self.groups.values_mut() {
            group.members.remove(actor);
        }
        for actors in self.grants.values_mut() {
            actors.retain(|granted| granted != actor);
        }
    }
}

/// Directory and capability store kept in memory.
///
/// Cloning is cheap and every clone shares the same state, so one registry can be handed to an
/// [`Authorizer`](crate::Authorizer) as both its directory and its capability store. The public
/// group and the anonymous account exist from the start; every account created afterwards is
/// added to the public group.
#[derive(Clone, Debug)]
pub struct MemoryRegistry {
    inner: Arc<RwLock<MemoryRegistryInner>>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl MemoryRegistry {
    pub fn new(config: &Config) -> Self {
        let public_group = config.public_group.clone();
        let mut inner = MemoryRegistryInner {
            public_group: public_group.clone(),
            accounts: BTreeMap::new(),
            groups: BTreeMap::new(),
            owners: HashMap::new(),
            grants: HashMap::new(),
        };
        inner.groups.insert(
            public_group.clone(),
            Group::new(public_group, PUBLIC_GROUP_DESCRIPTION),
        );
        inner.insert_account(&config.anonymous_identity, false);

        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Create an account and add it to the public group.
    pub async fn create_user(
        &self,
        identity: &Identity,
        admin: bool,
    ) -> Result<Account, RegistryError> {
        let mut inner = self.inner.write().await;
        if inner.accounts.contains_key(identity) {
            return Err(RegistryError::UserExists(identity.clone()));
        }
        let account = inner.insert_account(identity, admin);
        info!(%identity, admin, "user created");
        Ok(account)
    }

    /// Delete an account, removing it from every group and every grant.
    ///
    /// Resources owned by the identity keep their owner.
    pub async fn delete_user(&self, identity: &Identity) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if inner.accounts.remove(identity).is_none() {
            return Err(RegistryError::UserNotFound(identity.clone()));
        }
        inner.remove_actor_everywhere(&Actor::User(identity.clone()));
        info!(%identity, "user deleted");
        Ok(())
    }

    /// Set or clear the administrator flag of an account.
    pub async fn set_admin(&self, identity: &Identity, admin: bool) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let account = inner
            .accounts
            .get_mut(identity)
            .ok_or_else(|| RegistryError::UserNotFound(identity.clone()))?;
        account.admin = admin;
        Ok(())
    }

    pub async fn list_users(&self) -> Vec<Identity> {
        let inner = self.inner.read().await;
        inner.accounts.keys().cloned().collect()
    }

    pub async fn create_group(
        &self,
        group_id: &GroupId,
        description: &str,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if inner.groups.contains_key(group_id) {
            return Err(RegistryError::GroupExists(group_id.clone()));
        }
        inner
            .groups
            .insert(group_id.clone(), Group::new(group_id.clone(), description));
        debug!(group = %group_id, "group created");
        Ok(())
    }

    /// Delete a group, removing it from every parent group and every grant.
    pub async fn delete_group(&self, group_id: &GroupId) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if *group_id == inner.public_group {
            return Err(RegistryError::PublicGroupProtected(group_id.clone()));
        }
        if inner.groups.remove(group_id).is_none() {
            return Err(RegistryError::GroupNotFound(group_id.clone()));
        }
        inner.remove_actor_everywhere(&Actor::Group(group_id.clone()));
        debug!(group = %group_id, "group deleted");
        Ok(())
    }

    pub async fn list_groups(&self) -> Vec<GroupId> {
        let inner = self.inner.read().await;
        inner.groups.keys().cloned().collect()
    }

    /// Add a user to a group. Adding an existing member is a no-op.
    pub async fn add_user_to_group(
        &self,
        group_id: &GroupId,
        identity: &Identity,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        inner.ensure_user(identity)?;
        let group = inner.group_mut(group_id)?;
        group.members.insert(Actor::User(identity.clone()));
        Ok(())
    }

    /// Nest a group inside another. Cycles are allowed, adding an existing member is a no-op.
    pub async fn add_group_to_group(
        &self,
        group_id: &GroupId,
        sub_group: &GroupId,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if !inner.groups.contains_key(sub_group) {
            return Err(RegistryError::GroupNotFound(sub_group.clone()));
        }
        let group = inner.group_mut(group_id)?;
        group.members.insert(Actor::Group(sub_group.clone()));
        Ok(())
    }

    /// Remove a user from a group.
    ///
    /// Membership of the public group ends only when the account is deleted.
    pub async fn remove_user_from_group(
        &self,
        group_id: &GroupId,
        identity: &Identity,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if *group_id == inner.public_group {
            return Err(RegistryError::PublicGroupProtected(group_id.clone()));
        }
        let group = inner.group_mut(group_id)?;
        let actor = Actor::User(identity.clone());
        if !group.members.remove(&actor) {
            return Err(RegistryError::MemberNotFound(actor, group_id.clone()));
        }
        Ok(())
    }

    pub async fn remove_group_from_group(
        &self,
        group_id: &GroupId,
        sub_group: &GroupId,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let group = inner.group_mut(group_id)?;
        let actor = Actor::Group(sub_group.clone());
        if !group.members.remove(&actor) {
            return Err(RegistryError::MemberNotFound(actor, group_id.clone()));
        }
        Ok(())
    }

    /// Groups the user is a direct member of.
    pub async fn groups_of_user(&self, identity: &Identity) -> Vec<GroupId> {
        let inner = self.inner.read().await;
        let actor = Actor::User(identity.clone());
        inner
            .groups
            .values()
            .filter(|group| group.members.contains(&actor))
            .map(|group| group.id.clone())
            .collect()
    }

    /// Direct members of a group, users first.
    pub async fn sub_actors(&self, group_id: &GroupId) -> Result<Vec<Actor>, RegistryError> {
        let inner = self.inner.read().await;
        let group = inner
            .groups
            .get(group_id)
            .ok_or_else(|| RegistryError::GroupNotFound(group_id.clone()))?;
        Ok(group.members.iter().cloned().collect())
    }

    /// Register a resource with its owner. The owner is fixed from then on.
    pub async fn register_resource(
        &self,
        resource: &ResourceId,
        owner: &Identity,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if inner.owners.contains_key(resource) {
            return Err(RegistryError::ResourceExists(resource.clone()));
        }
        inner.owners.insert(resource.clone(), owner.clone());
        Ok(())
    }

    /// Grant an action on a resource to an actor.
    ///
    /// Grants keep insertion order and ignore duplicates. Group actors are not checked against
    /// the directory, a grant may name a group which does not exist (yet).
    pub async fn grant(
        &self,
        resource: &ResourceId,
        action: Action,
        actor: Actor,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        if !inner.owners.contains_key(resource) {
            return Err(RegistryError::ResourceNotFound(resource.clone()));
        }
        let actors = inner
            .grants
            .entry((resource.clone(), action))
            .or_default();
        if !actors.contains(&actor) {
            debug!(%resource, %action, %actor, "capability granted");
            actors.push(actor);
        }
        Ok(())
    }

    /// Revoke a grant. Returns `false` if the actor held no such grant.
    pub async fn revoke(&self, resource: &ResourceId, action: Action, actor: &Actor) -> bool {
        let mut inner = self.inner.write().await;
        let Some(actors) = inner.grants.get_mut(&(resource.clone(), action)) else {
            return false;
        };
        let before = actors.len();
        actors.retain(|granted| granted != actor);
        before != actors.len()
    }

    /// Drop a group without touching the groups and grants which reference it.
    #[cfg(test)]
    pub(crate) async fn forget_group(&self, group_id: &GroupId) {
        let mut inner = self.inner.write().await;
        inner.groups.remove(group_id);
    }
}

impl Directory for MemoryRegistry {
    type Error = RegistryError;

    async fn has_account(&self, identity: &Identity) -> Result<bool, Self::Error> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.contains_key(identity))
    }

    async fn create_account(&self, identity: &Identity) -> Result<Account, Self::Error> {
        let mut inner = self.inner.write().await;
        Ok(inner.insert_account(identity, false))
    }

    async fn add_to_group(&self, group_id: &GroupId, identity: &Identity) -> Result<(), Self::Error> {
        self.add_user_to_group(group_id, identity).await
    }

    async fn is_admin(&self, identity: &Identity) -> Result<bool, Self::Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .get(identity)
            .is_some_and(|account| account.admin))
    }

    async fn group(&self, group_id: &GroupId) -> Result<Option<Group>, Self::Error> {
        let inner = self.inner.read().await;
        Ok(inner.groups.get(group_id).cloned())
    }
}

impl CapabilityStore for MemoryRegistry {
    type Error = Infallible;

    async fn owner(&self, resource: &ResourceId) -> Result<Option<Identity>, Self::Error> {
        let inner = self.inner.read().await;
        Ok(inner.owners.get(resource).cloned())
    }

    async fn granted_actors(
        &self,
        resource: &ResourceId,
        action: Action,
    ) -> Result<Vec<Actor>, Self::Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .grants
            .get(&(resource.clone(), action))
            .cloned()
            .unwrap_or_default())
    }
}
