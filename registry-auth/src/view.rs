// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::action::Action;
use crate::actor::ResourceId;
use crate::authorizer::{Authorizer, AuthorizerError, Decision};
use crate::identity::Identity;
use crate::traits::{CapabilityStore, Directory};

/// An [`Authorizer`] bound to one identity.
///
/// Adds no policy of its own, every call is forwarded with the bound identity.
#[derive(Debug)]
pub struct IdentityAuthorizer<'a, D, S> {
    authorizer: &'a Authorizer<D, S>,
    identity: Identity,
}

impl<'a, D, S> IdentityAuthorizer<'a, D, S>
where
    D: Directory,
    S: CapabilityStore,
{
    pub fn new(authorizer: &'a Authorizer<D, S>, identity: Identity) -> Self {
        Self {
            authorizer,
            identity,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub async fn is_authorized(
        &self,
        resource: Option<&ResourceId>,
        action: Action,
    ) -> Result<bool, AuthorizerError<D, S>> {
        self.authorizer
            .is_authorized(&self.identity, resource, action)
            .await
    }

    pub async fn check(
        &self,
        resource: Option<&ResourceId>,
        action: Action,
    ) -> Result<Decision, AuthorizerError<D, S>> {
        self.authorizer.check(&self.identity, resource, action).await
    }
}
