// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities.
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::action::Action;
use crate::actor::{Account, Actor, Group, GroupId, ResourceId};
use crate::identity::Identity;
use crate::memory::MemoryRegistry;
use crate::traits::{CapabilityStore, Directory};

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Identity of a test user called `name`.
pub fn identity(name: &str) -> Identity {
    Identity::new(&format!("CN={name}, O=Gateway")).expect("valid test identity")
}

/// Registry holding an account for every given name.
pub async fn registry_with_users(names: &[&str]) -> MemoryRegistry {
    let registry = MemoryRegistry::default();
    for name in names {
        registry
            .create_user(&identity(name), false)
            .await
            .expect("new test user");
    }
    registry
}

/// Directory wrapper counting group lookups.
#[derive(Clone, Debug)]
pub struct CountingDirectory<D> {
    inner: D,
    lookups: Arc<AtomicUsize>,
}

impl<D> CountingDirectory<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl<D> Directory for CountingDirectory<D>
where
    D: Directory + Sync,
{
    type Error = D::Error;

    async fn has_account(&self, identity: &Identity) -> Result<bool, Self::Error> {
        self.inner.has_account(identity).await
    }

    async fn create_account(&self, identity: &Identity) -> Result<Account, Self::Error> {
        self.inner.create_account(identity).await
    }

    async fn add_to_group(&self, group_id: &GroupId, identity: &Identity) -> Result<(), Self::Error> {
        self.inner.add_to_group(group_id, identity).await
    }

    async fn is_admin(&self, identity: &Identity) -> Result<bool, Self::Error> {
        self.inner.is_admin(identity).await
    }

    async fn group(&self, group_id: &GroupId) -> Result<Option<Group>, Self::Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.group(group_id).await
    }
}

#[derive(Debug, Error)]
#[error("store offline")]
pub struct Offline;

/// Directory and capability store whose every call fails.
#[derive(Clone, Debug, Default)]
pub struct OfflineRegistry;

impl Directory for OfflineRegistry {
    type Error = Offline;

    async fn has_account(&self, _identity: &Identity) -> Result<bool, Self::Error> {
        Err(Offline)
    }

    async fn create_account(&self, _identity: &Identity) -> Result<Account, Self::Error> {
        Err(Offline)
    }

    async fn add_to_group(
        &self,
        _group_id: &GroupId,
        _identity: &Identity,
    ) -> Result<(), Self::Error> {
        Err(Offline)
    }

    async fn is_admin(&self, _identity: &Identity) -> Result<bool, Self::Error> {
        Err(Offline)
    }

    async fn group(&self, _group_id: &GroupId) -> Result<Option<Group>, Self::Error> {
        Err(Offline)
    }
}

impl CapabilityStore for OfflineRegistry {
    type Error = Offline;

    async fn owner(&self, _resource: &ResourceId) -> Result<Option<Identity>, Self::Error> {
        Err(Offline)
    }

    async fn granted_actors(
        &self,
        _resource: &ResourceId,
        _action: Action,
    ) -> Result<Vec<Actor>, Self::Error> {
        Err(Offline)
    }
}

/// Randomly generated membership graph, cycles and self-loops included.
#[derive(Debug)]
pub struct RandomMembership {
    pub registry: MemoryRegistry,
    pub groups: Vec<GroupId>,
    pub users: Vec<Identity>,
    members: HashMap<GroupId, Vec<Actor>>,
}

impl RandomMembership {
    /// Build a graph of `group_count` groups and `user_count` users from a seed.
    ///
    /// Every group gets each other group (itself included) as member with probability
    /// `nesting`, and each user with probability `membership`.
    pub async fn generate(
        seed: u64,
        group_count: usize,
        user_count: usize,
        nesting: f64,
        membership: f64,
    ) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let registry = MemoryRegistry::default();

        let groups: Vec<GroupId> = (0..group_count)
            .map(|i| GroupId::new(format!("group-{i}")))
            .collect();
        let users: Vec<Identity> = (0..user_count)
            .map(|i| identity(&format!("user-{i}")))
            .collect();

        for group in &groups {
            registry.create_group(group, "").await.expect("new group");
        }
        for user in &users {
            registry.create_user(user, false).await.expect("new user");
        }

        let mut members: HashMap<GroupId, Vec<Actor>> = HashMap::new();
        for group in &groups {
            for sub_group in &groups {
                if rng.random_bool(nesting) {
                    registry
                        .add_group_to_group(group, sub_group)
                        .await
                        .expect("existing groups");
                    members
                        .entry(group.clone())
                        .or_default()
                        .push(Actor::Group(sub_group.clone()));
                }
            }
            for user in &users {
                if rng.random_bool(membership) {
                    registry
                        .add_user_to_group(group, user)
                        .await
                        .expect("existing group and user");
                    members
                        .entry(group.clone())
                        .or_default()
                        .push(Actor::User(user.clone()));
                }
            }
        }

        Self {
            registry,
            groups,
            users,
            members,
        }
    }

    /// Pick a random group.
    pub fn pick_group(&self, rng: &mut ChaCha20Rng) -> GroupId {
        self.groups[rng.random_range(0..self.groups.len())].clone()
    }

    /// Reachability computed by breadth-first search over the generated edges.
    pub fn reachable(&self, identity: &Identity, group: &GroupId) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([group.clone()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for actor in self.members.get(&current).into_iter().flatten() {
                match actor {
                    Actor::User(user) if user == identity => return true,
                    Actor::User(_) => (),
                    Actor::Group(sub_group) => queue.push_back(sub_group.clone()),
                }
            }
        }
        false
    }
}
