//! End-to-end pipeline tests against a scripted platform
//!
//! Run with: cargo test --test pipeline_integration

mod helpers;

use std::sync::Arc;

use helpers::*;
use vault_breakdown::auth::MemoryStore;
use vault_breakdown::breakdown::{ItemDimension, SortMode};
use vault_breakdown::context::AppContext;
use vault_breakdown::pipeline::{InventoryFilters, TierType};
use vault_breakdown::Error;

fn context(fake: &Arc<FakeBungie>) -> (AppContext, Arc<RecordingRouter>) {
    let router = Arc::new(RecordingRouter::default());
    let context = AppContext::with_parts(config(), fake.clone(), logged_in_store(), router.clone());
    (context, router)
}

#[tokio::test]
async fn test_load_view_fetches_each_resource_once() {
    let fake = FakeBungie::populated();
    let (context, router) = context(&fake);

    let view = context.load_view().await.unwrap();
    assert!(view.is_ready());
    assert_eq!(view.index().unwrap().len(), 5);

    assert_eq!(fake.count(MEMBERSHIP_PATH), 1);
    assert_eq!(fake.count(PROFILE_PATH), 1);
    assert_eq!(fake.count(MANIFEST_PATH), 1);
    assert_eq!(fake.requests().len(), 9);
    assert_eq!(router.redirects(), 0);
}

#[tokio::test]
async fn test_calling_conventions_on_the_wire() {
    let fake = FakeBungie::populated();
    let (context, _) = context(&fake);
    context.load_view().await.unwrap();

    let requests = fake.requests();
    let membership = requests.iter().find(|r| r.path == MEMBERSHIP_PATH).unwrap();
    assert_eq!(membership.authorization.as_deref(), Some("Bearer CKWsBBKGAgAg"));
    assert_eq!(membership.api_key.as_deref(), Some("test-api-key"));

    let manifest = requests.iter().find(|r| r.path == MANIFEST_PATH).unwrap();
    assert_eq!(manifest.api_key, None);
    assert_eq!(manifest.authorization, None);

    let tables: Vec<_> = requests
        .iter()
        .filter(|r| r.path.starts_with("/common/"))
        .collect();
    assert_eq!(tables.len(), 6);
    assert!(tables
        .iter()
        .all(|r| r.url.ends_with("?cachebusting=vault-breakdown") && r.api_key.is_none()));
}

#[tokio::test]
async fn test_items_are_sorted_by_name_then_power() {
    let fake = FakeBungie::populated();
    let (context, _) = context(&fake);
    context.load_view().await.unwrap();

    let items = context
        .pipeline()
        .items(&InventoryFilters::default())
        .unwrap();
    let summary: Vec<(&str, i32)> = items.iter().map(|i| (i.name(), i.power())).collect();
    assert_eq!(
        summary,
        vec![
            ("Ace of Spades", 1810),
            ("Ace of Spades", 1780),
            ("Blast Furnace", 1805),
            ("Blast Furnace", 1790),
            ("Chroma Rush", 1800),
        ]
    );
    assert_eq!(items[0].visible_perks().count(), 1);
}

#[tokio::test]
async fn test_breakdown_tree_with_catalog_names() {
    let fake = FakeBungie::populated();
    let (context, _) = context(&fake);
    let mut view = context.load_view().await.unwrap();
    view.set_dimensions(vec![ItemDimension::Slot, ItemDimension::DamageType]);
    view.set_sort(SortMode::Key);

    let tree = view.breakdown().unwrap();
    let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Kinetic Weapons", "Energy Weapons"]);

    let energy = &tree[1];
    assert_eq!(energy.title.count_label(), "3 items");
    let children = energy.children.as_ref().unwrap();
    let child_names: Vec<&str> = children.iter().map(|n| n.name.as_str()).collect();
    // no catalog entry for arc: raw dimension name
    assert_eq!(child_names, vec!["Solar", "damageTypeHash"]);
    assert!(children.iter().all(|c| c.is_leaf()));
    assert_eq!(
        children[0].title.dim_query(),
        "id:6917529003 or id:6917529001"
    );
    assert_eq!(energy.leaf_count(), 2);

    view.set_sort(SortMode::Count);
    let by_count = view.breakdown().unwrap();
    assert_eq!(by_count[0].name, "Energy Weapons");

    view.set_sort(SortMode::Alpha);
    let by_name = view.breakdown().unwrap();
    assert_eq!(by_name[0].name, "Energy Weapons");
    assert_eq!(by_name[1].name, "Kinetic Weapons");
}

#[tokio::test]
async fn test_intrinsic_and_weapon_type_dimensions() {
    let fake = FakeBungie::populated();
    let (context, _) = context(&fake);
    let mut view = context.load_view().await.unwrap();
    view.set_dimensions(vec![ItemDimension::SubType, ItemDimension::Intrinsic]);
    view.set_sort(SortMode::Alpha);

    let tree = view.breakdown().unwrap();
    let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Hand Cannon", "Pulse Rifle"]);

    let hand_cannons = tree[0].children.as_ref().unwrap();
    let frames: Vec<&str> = hand_cannons.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(frames, vec!["Precision Frame", "Rapid-Fire Frame"]);
}

#[tokio::test]
async fn test_filter_changes_recompute_without_refetch() {
    let fake = FakeBungie::populated();
    let (context, _) = context(&fake);
    let mut view = context.load_view().await.unwrap();
    let before = fake.requests().len();

    view.set_filters(
        InventoryFilters {
            duplicates_only: true,
            ..Default::default()
        },
        context.pipeline(),
    );
    assert_eq!(view.index().unwrap().len(), 4);

    view.set_filters(
        InventoryFilters {
            exclude_tier: Some(TierType::EXOTIC),
            duplicates_only: true,
            ..Default::default()
        },
        context.pipeline(),
    );
    let names: Vec<&str> = view.index().unwrap().items().iter().map(|i| i.name()).collect();
    assert_eq!(names, vec!["Blast Furnace", "Blast Furnace"]);

    assert_eq!(fake.requests().len(), before);
}

#[tokio::test]
async fn test_view_before_populate_is_empty() {
    let fake = FakeBungie::populated();
    let (context, _) = context(&fake);

    let mut view = context.view();
    view.refresh(context.pipeline());
    assert!(!view.is_ready());
    assert!(view.breakdown().unwrap().is_empty());
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn test_logged_out_pipeline_short_circuits() {
    let fake = FakeBungie::populated();
    let router = Arc::new(RecordingRouter::default());
    let context = AppContext::with_parts(
        config(),
        fake.clone(),
        Arc::new(MemoryStore::new()),
        router.clone(),
    );

    let err = context.load_view().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(router.redirects(), 1);
    assert!(fake.requests().is_empty());
    assert!(context.pipeline().error().unwrap().is_unauthorized());
}

#[tokio::test]
async fn test_manifest_error_envelope_surfaces() {
    let fake = FakeBungie::populated();
    fake.respond(
        MANIFEST_PATH,
        200,
        serde_json::json!({
            "ErrorCode": 5,
            "ErrorStatus": "SystemDisabled",
            "Message": "This system is temporarily disabled for maintenance."
        }),
    );
    let (context, _) = context(&fake);

    let err = context.load_view().await.unwrap_err();
    match err {
        Error::Application { code, .. } => assert_eq!(code, 5),
        other => panic!("unexpected error: {other:?}"),
    }
    // membership and profile landed before the catalog failed
    assert!(context.pipeline().profile().is_some());
    assert!(context.pipeline().error().is_some());
}
