// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use assert_matches::assert_matches;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::memory::MemoryRegistry;
use crate::test_utils::{OfflineRegistry, RandomMembership, identity, setup_logging};
use crate::{
    Action, Actor, AuthorizationError, Authorizer, Config, Decision, GroupId, Identity, Permit,
    ResourceId,
};

type TestAuthorizer = Authorizer<MemoryRegistry, MemoryRegistry>;

fn authorizer(registry: &MemoryRegistry) -> TestAuthorizer {
    setup_logging();
    Authorizer::new(registry.clone(), registry.clone(), Config::default())
}

const ACTIONS: [Action; 5] = [
    Action::Read,
    Action::Write,
    Action::AddNew,
    Action::SysAdmin,
    Action::ResourceAdmin,
];

/// Registry with groups `g1` and `g2` and a resource owned by alice.
async fn setup() -> (MemoryRegistry, ResourceId) {
    let registry = MemoryRegistry::default();
    let resource = ResourceId::new("experiment-1");
    registry
        .create_user(&identity("alice"), false)
        .await
        .unwrap();
    registry.create_user(&identity("bob"), false).await.unwrap();
    registry.create_group(&GroupId::new("g1"), "").await.unwrap();
    registry.create_group(&GroupId::new("g2"), "").await.unwrap();
    registry
        .register_resource(&resource, &identity("alice"))
        .await
        .unwrap();
    (registry, resource)
}

#[tokio::test]
async fn owner_permitted_without_grants() {
    let (registry, resource) = setup().await;
    let authorizer = authorizer(&registry);
    let alice = identity("alice");

    for action in ACTIONS {
        if action == Action::SysAdmin {
            continue;
        }
        assert!(
            authorizer
                .is_authorized(&alice, Some(&resource), action)
                .await
                .unwrap(),
            "owner denied {action}"
        );
    }
    assert_eq!(
        authorizer
            .check(&alice, Some(&resource), Action::Write)
            .await
            .unwrap(),
        Decision::Permitted(Permit::Owner)
    );
}

#[tokio::test]
async fn read_is_universal() {
    let registry = MemoryRegistry::default();
    let authorizer = authorizer(&registry);
    let stranger = identity("stranger");

    // Neither the identity nor the resource are known.
    let unknown = ResourceId::new("unknown");
    assert!(
        authorizer
            .is_authorized(&stranger, Some(&unknown), Action::Read)
            .await
            .unwrap()
    );
    assert!(
        authorizer
            .is_authorized(&stranger, None, Action::Read)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn sys_admin_follows_admin_flag_only() {
    let (registry, resource) = setup().await;
    let root = identity("root");
    registry.create_user(&root, true).await.unwrap();
    let authorizer = authorizer(&registry);
    let unknown = ResourceId::new("unknown");

    for resource in [None, Some(&resource), Some(&unknown)] {
        assert!(
            authorizer
                .is_authorized(&root, resource, Action::SysAdmin)
                .await
                .unwrap()
        );
        assert!(
            !authorizer
                .is_authorized(&identity("alice"), resource, Action::SysAdmin)
                .await
                .unwrap()
        );
    }

    let decision = authorizer
        .check(&identity("bob"), None, Action::SysAdmin)
        .await
        .unwrap();
    assert_eq!(
        decision.reason(),
        Some("cn=bob,o=gateway is not an administrator")
    );
}

#[tokio::test]
async fn add_new_provisions_unknown_identity() {
    let registry = MemoryRegistry::default();
    let authorizer = authorizer(&registry);
    let newcomer = identity("newcomer");

    assert_eq!(
        authorizer
            .check(&newcomer, None, Action::AddNew)
            .await
            .unwrap(),
        Decision::Permitted(Permit::Account)
    );
    assert!(registry.list_users().await.contains(&newcomer));
}

#[tokio::test]
async fn resource_admin_for_owner_and_admins() {
    let (registry, resource) = setup().await;
    let root = identity("root");
    registry.create_user(&root, true).await.unwrap();
    let authorizer = authorizer(&registry);

    assert_eq!(
        authorizer
            .check(&root, Some(&resource), Action::ResourceAdmin)
            .await
            .unwrap(),
        Decision::Permitted(Permit::Administrator)
    );

    // A write grant does not make bob an administrator of the resource.
    registry
        .grant(&resource, Action::Write, Actor::User(identity("bob")))
        .await
        .unwrap();
    let decision = authorizer
        .check(&identity("bob"), Some(&resource), Action::ResourceAdmin)
        .await
        .unwrap();
    assert!(!decision.is_permitted());
    assert!(decision.reason().unwrap().contains("experiment-1"));
}

#[tokio::test]
async fn resource_dependent_actions_need_resource() {
    let (registry, _) = setup().await;
    let authorizer = authorizer(&registry);

    assert_matches!(
        authorizer
            .is_authorized(&identity("alice"), None, Action::Write)
            .await,
        Err(AuthorizationError::InvalidRequest(Action::Write))
    );
    assert_matches!(
        authorizer
            .is_authorized(&identity("alice"), None, Action::ResourceAdmin)
            .await,
        Err(AuthorizationError::InvalidRequest(Action::ResourceAdmin))
    );
}

#[tokio::test]
async fn unknown_resource_is_an_error() {
    let (registry, _) = setup().await;
    let authorizer = authorizer(&registry);
    let unknown = ResourceId::new("unknown");

    assert_matches!(
        authorizer
            .is_authorized(&identity("bob"), Some(&unknown), Action::Write)
            .await,
        Err(AuthorizationError::ResourceNotFound(resource)) if resource == unknown
    );
}

#[tokio::test]
async fn write_denied_without_grant() {
    let (registry, resource) = setup().await;
    let authorizer = authorizer(&registry);

    let decision = authorizer
        .check(&identity("bob"), Some(&resource), Action::Write)
        .await
        .unwrap();
    assert_eq!(
        decision,
        Decision::Denied("no write grant exists for resource experiment-1".to_string())
    );
}

#[tokio::test]
async fn direct_grant() {
    let (registry, resource) = setup().await;
    let bob = identity("bob");
    registry
        .grant(&resource, Action::Write, Actor::User(bob.clone()))
        .await
        .unwrap();
    let authorizer = authorizer(&registry);

    // Bob is in no group apart from the public one.
    assert_eq!(registry.groups_of_user(&bob).await.len(), 1);
    assert_eq!(
        authorizer
            .check(&bob, Some(&resource), Action::Write)
            .await
            .unwrap(),
        Decision::Permitted(Permit::DirectGrant)
    );

    // Nobody else gains anything from bob's grant.
    assert!(
        !authorizer
            .is_authorized(&identity("claire"), Some(&resource), Action::Write)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn transitive_group_grant() {
    let (registry, resource) = setup().await;
    let (g1, g2) = (GroupId::new("g1"), GroupId::new("g2"));
    let bob = identity("bob");
    registry.add_group_to_group(&g1, &g2).await.unwrap();
    registry.add_user_to_group(&g2, &bob).await.unwrap();
    registry
        .grant(&resource, Action::Write, Actor::Group(g1.clone()))
        .await
        .unwrap();
    let authorizer = authorizer(&registry);

    assert_eq!(
        authorizer
            .check(&bob, Some(&resource), Action::Write)
            .await
            .unwrap(),
        Decision::Permitted(Permit::GroupGrant(g1))
    );
}

#[tokio::test]
async fn cycle_without_member_terminates() {
    let (registry, resource) = setup().await;
    let (g1, g2) = (GroupId::new("g1"), GroupId::new("g2"));
    registry.add_group_to_group(&g1, &g2).await.unwrap();
    registry.add_group_to_group(&g2, &g1).await.unwrap();
    registry
        .grant(&resource, Action::Write, Actor::Group(g1.clone()))
        .await
        .unwrap();
    registry
        .grant(&resource, Action::Write, Actor::Group(g2.clone()))
        .await
        .unwrap();
    let authorizer = authorizer(&registry);

    assert!(
        !authorizer
            .is_authorized(&identity("bob"), Some(&resource), Action::Write)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn cycle_result_independent_of_entry_group() {
    let (registry, _) = setup().await;
    let (g1, g2) = (GroupId::new("g1"), GroupId::new("g2"));
    let bob = identity("bob");
    registry.add_group_to_group(&g1, &g2).await.unwrap();
    registry.add_group_to_group(&g2, &g1).await.unwrap();
    registry.add_user_to_group(&g2, &bob).await.unwrap();

    let authorizer = authorizer(&registry);
    for (name, entry) in [("via-g1", &g1), ("via-g2", &g2)] {
        let resource = ResourceId::new(name);
        registry
            .register_resource(&resource, &identity("alice"))
            .await
            .unwrap();
        registry
            .grant(&resource, Action::Write, Actor::Group(entry.clone()))
            .await
            .unwrap();
        assert!(
            authorizer
                .is_authorized(&bob, Some(&resource), Action::Write)
                .await
                .unwrap()
        );
    }
}

#[tokio::test]
async fn auto_provisioning_is_idempotent() {
    let registry = MemoryRegistry::default();
    let authorizer = authorizer(&registry);
    let newcomer = identity("newcomer");
    let users_before = registry.list_users().await.len();

    assert!(
        authorizer
            .is_authorized(&newcomer, None, Action::Read)
            .await
            .unwrap()
    );
    assert_eq!(registry.list_users().await.len(), users_before + 1);
    assert_eq!(
        registry.groups_of_user(&newcomer).await,
        vec![GroupId::new("public")]
    );

    assert!(
        authorizer
            .is_authorized(&newcomer, None, Action::Read)
            .await
            .unwrap()
    );
    assert_eq!(registry.list_users().await.len(), users_before + 1);
    assert!(!authorizer.ensure_account(&newcomer).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_checks_converge() {
    let registry = MemoryRegistry::default();
    let authorizer = Arc::new(authorizer(&registry));
    let newcomer = identity("newcomer");

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let authorizer = authorizer.clone();
            let newcomer = newcomer.clone();
            tokio::spawn(async move {
                authorizer
                    .is_authorized(&newcomer, None, Action::AddNew)
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    let users = registry.list_users().await;
    assert_eq!(users.iter().filter(|user| **user == newcomer).count(), 1);
    assert_eq!(
        registry.groups_of_user(&newcomer).await,
        vec![GroupId::new("public")]
    );
}

#[tokio::test]
async fn unknown_group_in_grant_skipped() {
    let (registry, resource) = setup().await;
    let g1 = GroupId::new("g1");
    let bob = identity("bob");
    registry.add_user_to_group(&g1, &bob).await.unwrap();
    registry
        .grant(
            &resource,
            Action::Write,
            Actor::Group(GroupId::new("ghost")),
        )
        .await
        .unwrap();
    registry
        .grant(&resource, Action::Write, Actor::Group(g1.clone()))
        .await
        .unwrap();
    let authorizer = authorizer(&registry);

    assert_eq!(
        authorizer
            .check(&bob, Some(&resource), Action::Write)
            .await
            .unwrap(),
        Decision::Permitted(Permit::GroupGrant(g1))
    );
}

#[tokio::test]
async fn differently_formatted_identities_are_one_principal() {
    let registry = MemoryRegistry::default();
    let resource = ResourceId::new("experiment-1");
    let g1 = GroupId::new("g1");
    let owner = Identity::new("CN=Alice,O=Gateway").unwrap();
    let admin = Identity::new("/O=Gateway/CN=Root").unwrap();
    let member = Identity::new("CN=Bob, O=Gateway").unwrap();
    registry.create_user(&owner, false).await.unwrap();
    registry.create_user(&admin, true).await.unwrap();
    registry.create_user(&member, false).await.unwrap();
    registry.create_group(&g1, "").await.unwrap();
    registry.add_user_to_group(&g1, &member).await.unwrap();
    registry.register_resource(&resource, &owner).await.unwrap();
    registry
        .grant(&resource, Action::Write, Actor::Group(g1))
        .await
        .unwrap();
    let authorizer = authorizer(&registry);
    let users_before = registry.list_users().await.len();

    let owner_again = Identity::new(" o=GATEWAY ,  cn=alice").unwrap();
    let admin_again = Identity::new("cn=root, o=gateway").unwrap();
    let member_again = Identity::new("/O=Gateway/CN=BOB").unwrap();

    assert_eq!(
        authorizer
            .check(&owner_again, Some(&resource), Action::Write)
            .await
            .unwrap(),
        Decision::Permitted(Permit::Owner)
    );
    assert!(
        authorizer
            .is_authorized(&admin_again, None, Action::SysAdmin)
            .await
            .unwrap()
    );
    assert!(
        authorizer
            .is_authorized(&member_again, Some(&resource), Action::Write)
            .await
            .unwrap()
    );

    // No second account was provisioned for any of them.
    assert_eq!(registry.list_users().await.len(), users_before);
}

#[tokio::test]
async fn directory_failure_surfaces() {
    let store = MemoryRegistry::default();
    let authorizer = Authorizer::new(OfflineRegistry, store, Config::default());

    assert_matches!(
        authorizer
            .is_authorized(&identity("alice"), None, Action::Read)
            .await,
        Err(AuthorizationError::DirectoryUnavailable(_))
    );
}

#[tokio::test]
async fn capability_store_failure_surfaces() {
    let directory = MemoryRegistry::default();
    let authorizer = Authorizer::new(directory, OfflineRegistry, Config::default());
    let resource = ResourceId::new("experiment-1");

    assert!(
        authorizer
            .is_authorized(&identity("alice"), Some(&resource), Action::Read)
            .await
            .unwrap()
    );
    assert_matches!(
        authorizer
            .is_authorized(&identity("alice"), Some(&resource), Action::Write)
            .await,
        Err(AuthorizationError::CapabilityStoreUnavailable(_))
    );
}

#[tokio::test]
async fn identity_bound_view() {
    let (registry, resource) = setup().await;
    let authorizer = authorizer(&registry);
    let view = authorizer.authorizer_for_identity(identity("bob"));

    assert_eq!(view.identity(), &identity("bob"));
    assert!(view.is_authorized(Some(&resource), Action::Read).await.unwrap());
    assert!(
        !view
            .is_authorized(Some(&resource), Action::Write)
            .await
            .unwrap()
    );

    registry
        .grant(&resource, Action::Write, Actor::User(identity("bob")))
        .await
        .unwrap();
    assert_eq!(
        view.check(Some(&resource), Action::Write).await.unwrap(),
        Decision::Permitted(Permit::DirectGrant)
    );
}

#[tokio::test]
async fn membership_of_missing_group_is_an_error() {
    let (registry, _) = setup().await;
    let authorizer = authorizer(&registry);
    let ghost = GroupId::new("ghost");

    assert_matches!(
        authorizer.is_member_of(&identity("bob"), &ghost).await,
        Err(AuthorizationError::GroupNotFound(group)) if group == ghost
    );
    assert!(
        authorizer
            .is_member_of(&identity("bob"), &GroupId::new("public"))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn missing_public_group_blocks_provisioning() {
    let registry = MemoryRegistry::default();
    let config = Config::default().with_public_group(GroupId::new("everyone"));
    let authorizer = Authorizer::new(registry.clone(), registry.clone(), config);
    let newcomer = identity("newcomer");

    assert_matches!(
        authorizer.is_authorized(&newcomer, None, Action::Read).await,
        Err(AuthorizationError::GroupNotFound(group)) if group == GroupId::new("everyone")
    );
    assert!(!registry.list_users().await.contains(&newcomer));

    // Known accounts are not affected.
    assert!(
        authorizer
            .is_authorized(&Identity::anonymous(), None, Action::Read)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn random_graphs_match_breadth_first_search() {
    for seed in 0..24 {
        let graph = RandomMembership::generate(seed, 10, 6, 0.2, 0.08).await;
        let authorizer = authorizer(&graph.registry);

        for user in &graph.users {
            for group in &graph.groups {
                assert_eq!(
                    authorizer.is_member_of(user, group).await.unwrap(),
                    graph.reachable(user, group),
                    "seed {seed}: {user} in {group}"
                );
            }
        }
    }
}

#[tokio::test]
async fn random_write_grants_match_breadth_first_search() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    for seed in 0..12 {
        let graph = RandomMembership::generate(seed, 12, 8, 0.25, 0.05).await;
        let owner = identity("owner");
        graph.registry.create_user(&owner, false).await.unwrap();
        let authorizer = authorizer(&graph.registry);

        let resource = ResourceId::new(format!("resource-{seed}"));
        graph
            .registry
            .register_resource(&resource, &owner)
            .await
            .unwrap();
        let granted = [graph.pick_group(&mut rng), graph.pick_group(&mut rng)];
        for group in &granted {
            graph
                .registry
                .grant(&resource, Action::Write, Actor::Group(group.clone()))
                .await
                .unwrap();
        }

        for user in &graph.users {
            let expected = granted.iter().any(|group| graph.reachable(user, group));
            assert_eq!(
                authorizer
                    .is_authorized(user, Some(&resource), Action::Write)
                    .await
                    .unwrap(),
                expected,
                "seed {seed}: {user}"
            );
        }
    }
}
