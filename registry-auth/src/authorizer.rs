// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization decisions.
use std::fmt::Display;

use thiserror::Error;
use tracing::{debug, info};

use crate::action::Action;
use crate::actor::{Actor, GroupId, ResourceId};
use crate::config::Config;
use crate::identity::{Identity, same_identity};
use crate::resolver::GroupResolver;
use crate::traits::{CapabilityStore, Directory};
use crate::traversal::TraversalContext;
use crate::view::IdentityAuthorizer;

/// Failures which prevent a decision from being made.
///
/// A denied request is not an error, see [`Decision::Denied`].
#[derive(Debug, Error)]
pub enum AuthorizationError<DE, SE> {
    #[error("resource {0} not found")]
    ResourceNotFound(ResourceId),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("action {0} requires a resource id")]
    InvalidRequest(Action),

    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(DE),

    #[error("capability store unavailable: {0}")]
    CapabilityStoreUnavailable(SE),
}

/// Authorization error for a given directory and capability store.
pub type AuthorizerError<D, S> =
    AuthorizationError<<D as Directory>::Error, <S as CapabilityStore>::Error>;

/// Why a request was permitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Permit {
    /// The action is open to everyone.
    Universal,

    /// The caller holds an account.
    Account,

    /// The caller owns the resource.
    Owner,

    /// The caller is an administrator.
    Administrator,

    /// The caller is listed in the grant.
    DirectGrant,

    /// The caller is reachable from this group listed in the grant.
    GroupGrant(GroupId),
}

/// Outcome of an authorization check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Permitted(Permit),

    /// Denied, with a human readable reason meant for audit logs.
    Denied(String),
}

impl Decision {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Decision::Permitted(_))
    }

    /// Reason of a denial.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Permitted(_) => None,
            Decision::Denied(reason) => Some(reason.as_str()),
        }
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Permitted(Permit::GroupGrant(group)) => {
                write!(f, "permitted through group {group}")
            }
            Decision::Permitted(permit) => write!(f, "permitted ({permit:?})"),
            Decision::Denied(reason) => write!(f, "denied: {reason}"),
        }
    }
}

/// Decides whether an identity may perform an action on a resource.
///
/// Every check first makes sure the caller holds an account, creating one and adding it to the
/// public group when missing. The action then decides what is consulted:
///
/// - `Read` is always permitted.
/// - `AddNew` is permitted for every account holder, which after provisioning is everyone.
/// - `SysAdmin` is permitted for administrators only and ignores the resource.
/// - `ResourceAdmin` is permitted for the owner of the resource and for administrators.
/// - `Write` is permitted for the owner, for users listed in the write grant of the resource and
///   for members (direct or transitive) of groups listed in that grant.
///
/// The owner of a resource is permitted every resource scoped action, grants or not.
///
/// Checks hold no shared mutable state apart from the provisioning writes to the directory, so
/// one authorizer can serve any number of concurrent checks.
#[derive(Clone, Debug)]
pub struct Authorizer<D, S> {
    directory: D,
    store: S,
    config: Config,
}

impl<D, S> Authorizer<D, S>
where
    D: Directory,
    S: CapabilityStore,
{
    pub fn new(directory: D, store: S, config: Config) -> Self {
        Self {
            directory,
            store,
            config,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return `true` if the identity may perform the action.
    pub async fn is_authorized(
        &self,
        identity: &Identity,
        resource: Option<&ResourceId>,
        action: Action,
    ) -> Result<bool, AuthorizerError<D, S>> {
        Ok(self.check(identity, resource, action).await?.is_permitted())
    }

    /// Decide on a request and report why.
    pub async fn check(
        &self,
        identity: &Identity,
        resource: Option<&ResourceId>,
        action: Action,
    ) -> Result<Decision, AuthorizerError<D, S>> {
        self.ensure_account(identity).await?;

        let decision = match action {
            Action::Read => Decision::Permitted(Permit::Universal),
            Action::AddNew => Decision::Permitted(Permit::Account),
            Action::SysAdmin => {
                if self.is_admin(identity).await? {
                    Decision::Permitted(Permit::Administrator)
                } else {
                    Decision::Denied(format!("{identity} is not an administrator"))
                }
            }
            Action::ResourceAdmin => {
                let resource = resource.ok_or(AuthorizerError::<D, S>::InvalidRequest(action))?;
                if self.is_owner(identity, resource).await? {
                    Decision::Permitted(Permit::Owner)
                } else if self.is_admin(identity).await? {
                    Decision::Permitted(Permit::Administrator)
                } else {
                    Decision::Denied(format!(
                        "{identity} is neither owner of resource {resource} nor an administrator"
                    ))
                }
            }
            Action::Write => {
                let resource = resource.ok_or(AuthorizerError::<D, S>::InvalidRequest(action))?;
                if self.is_owner(identity, resource).await? {
                    Decision::Permitted(Permit::Owner)
                } else {
                    self.check_grant(identity, resource, action).await?
                }
            }
        };

        match resource {
            Some(resource) => debug!(%identity, %resource, %action, %decision, "authorization"),
            None => debug!(%identity, %action, %decision, "authorization"),
        }

        Ok(decision)
    }

    /// Make sure the identity holds an account.
    ///
    /// A missing account is created and added to the public group. Returns `true` if the account
    /// was created by this call. Both directory writes are idempotent, concurrent calls for the
    /// same new identity converge on one account.
    ///
    /// The public group named in the [`Config`] must exist in the directory. Otherwise no account
    /// is created and [`AuthorizationError::GroupNotFound`] is returned.
    pub async fn ensure_account(
        &self,
        identity: &Identity,
    ) -> Result<bool, AuthorizerError<D, S>> {
        if self
            .directory
            .has_account(identity)
            .await
            .map_err(AuthorizerError::<D, S>::DirectoryUnavailable)?
        {
            return Ok(false);
        }

        let public_group = &self.config.public_group;
        if self
            .directory
            .group(public_group)
            .await
            .map_err(AuthorizerError::<D, S>::DirectoryUnavailable)?
            .is_none()
        {
            return Err(AuthorizerError::<D, S>::GroupNotFound(public_group.clone()));
        }

        self.directory
            .create_account(identity)
            .await
            .map_err(AuthorizerError::<D, S>::DirectoryUnavailable)?;
        self.directory
            .add_to_group(&self.config.public_group, identity)
            .await
            .map_err(AuthorizerError::<D, S>::DirectoryUnavailable)?;
        info!(%identity, group = %self.config.public_group, "provisioned account");

        Ok(true)
    }

    /// Return `true` if the identity is a member of the group, directly or transitively.
    ///
    /// Fails with [`AuthorizationError::GroupNotFound`] if the group itself does not exist.
    pub async fn is_member_of(
        &self,
        identity: &Identity,
        group_id: &GroupId,
    ) -> Result<bool, AuthorizerError<D, S>> {
        if self
            .directory
            .group(group_id)
            .await
            .map_err(AuthorizerError::<D, S>::DirectoryUnavailable)?
            .is_none()
        {
            return Err(AuthorizerError::<D, S>::GroupNotFound(group_id.clone()));
        }

        let mut ctx = TraversalContext::new();
        GroupResolver::new(&self.directory)
            .is_reachable(identity, group_id, &mut ctx)
            .await
            .map_err(AuthorizerError::<D, S>::DirectoryUnavailable)
    }

    /// Bind an identity to this authorizer for repeated checks.
    pub fn authorizer_for_identity(&self, identity: Identity) -> IdentityAuthorizer<'_, D, S> {
        IdentityAuthorizer::new(self, identity)
    }

    async fn is_admin(&self, identity: &Identity) -> Result<bool, AuthorizerError<D, S>> {
        self.directory
            .is_admin(identity)
            .await
            .map_err(AuthorizerError::<D, S>::DirectoryUnavailable)
    }

    async fn is_owner(
        &self,
        identity: &Identity,
        resource: &ResourceId,
    ) -> Result<bool, AuthorizerError<D, S>> {
        let owner = self
            .store
            .owner(resource)
            .await
            .map_err(AuthorizerError::<D, S>::CapabilityStoreUnavailable)?
            .ok_or_else(|| AuthorizerError::<D, S>::ResourceNotFound(resource.clone()))?;
        Ok(same_identity(&owner, identity))
    }

    async fn check_grant(
        &self,
        identity: &Identity,
        resource: &ResourceId,
        action: Action,
    ) -> Result<Decision, AuthorizerError<D, S>> {
        let actors = self
            .store
            .granted_actors(resource, action)
            .await
            .map_err(AuthorizerError::<D, S>::CapabilityStoreUnavailable)?;

        if actors.is_empty() {
            return Ok(Decision::Denied(format!(
                "no {action} grant exists for resource {resource}"
            )));
        }

        let listed = actors.iter().any(|actor| match actor {
            Actor::User(user) => same_identity(user, identity),
            Actor::Group(_) => false,
        });
        if listed {
            return Ok(Decision::Permitted(Permit::DirectGrant));
        }

        // Shared by all groups of the grant, each group is entered at most once per check. A walk
        // which missed the identity leaves a visited set closed under membership, so later groups
        // decide the same as with a fresh context.
        let resolver = GroupResolver::new(&self.directory);
        let mut ctx = TraversalContext::new();
        for actor in &actors {
            let Actor::Group(group_id) = actor else {
                continue;
            };
            if resolver
                .is_reachable(identity, group_id, &mut ctx)
                .await
                .map_err(AuthorizerError::<D, S>::DirectoryUnavailable)?
            {
                return Ok(Decision::Permitted(Permit::GroupGrant(group_id.clone())));
            }
        }

        Ok(Decision::Denied(format!(
            "{identity} holds no {action} grant on resource {resource}"
        )))
    }
}
