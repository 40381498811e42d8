use std::time::Duration;

use bomsync_cli::api::NewItem;
use bomsync_cli::core::BomError;
use bomsync_cli::models::SyncBomLine;
use bomsync_cli::resolver::{TreeResolver, flatten_tree};
use bomsync_cli::sync::{ParentTarget, Synchronizer};
use bomsync_cli::test_utils::MockBomApi;

use super::fixtures::{item, shared_subassembly, worked_example};

fn synchronizer(api: &MockBomApi) -> Synchronizer<'_, MockBomApi> {
    Synchronizer::new(api).with_request_delay(Duration::ZERO)
}

#[tokio::test]
async fn pull_then_push_is_lossless() {
    let api = worked_example();
    let root_before = api.bom_of("g-root");
    let a_before = api.bom_of("g-a");
    let tree_before = TreeResolver::new(&api).resolve_tree("g-root").await.unwrap();

    let lines = flatten_tree(&tree_before);
    assert_eq!(lines.len(), 3);
    let report = synchronizer(&api).push(&ParentTarget::existing("ROOT"), &lines).await.unwrap();

    assert!(report.is_complete(), "{report:?}");
    assert_eq!(report.created, 3);
    assert_eq!(report.deleted, 3);
    assert_eq!(api.bom_of("g-root"), root_before);
    assert_eq!(api.bom_of("g-a"), a_before);

    let tree_after = TreeResolver::new(&api).resolve_tree("g-root").await.unwrap();
    assert_eq!(tree_after, tree_before);
}

#[tokio::test]
async fn shared_subassembly_round_trip() {
    let api = shared_subassembly();
    let tree_before = TreeResolver::new(&api).resolve_tree("g-root").await.unwrap();
    let shared_before = api.bom_of("g-shared");

    let lines = flatten_tree(&tree_before);
    let report = synchronizer(&api).push(&ParentTarget::existing("ROOT"), &lines).await.unwrap();

    assert!(report.is_complete(), "{report:?}");
    // SHARED's two lines appear under P2 and P3 again and are written once
    assert_eq!(report.merged, 4);
    assert_eq!(api.bom_of("g-shared"), shared_before);
    for parent in ["g-p1", "g-p2", "g-p3"] {
        assert_eq!(api.bom_of(parent), vec![("SHARED".to_string(), 2.0)]);
    }

    let tree_after = TreeResolver::new(&api).resolve_tree("g-root").await.unwrap();
    assert_eq!(tree_after, tree_before);
}

#[tokio::test]
async fn repeated_push_is_stable() {
    let api = worked_example();
    let lines = flatten_tree(&TreeResolver::new(&api).resolve_tree("g-root").await.unwrap());

    synchronizer(&api).push(&ParentTarget::existing("ROOT"), &lines).await.unwrap();
    let first = (api.bom_of("g-root"), api.bom_of("g-a"));

    synchronizer(&api).push(&ParentTarget::existing("ROOT"), &lines).await.unwrap();
    assert_eq!((api.bom_of("g-root"), api.bom_of("g-a")), first);
}

#[tokio::test]
async fn truncated_pull_leaves_deeper_boms_alone() {
    let api = worked_example();
    let nodes = TreeResolver::new(&api).with_max_depth(1).resolve_tree("g-root").await.unwrap();
    let lines = flatten_tree(&nodes);

    let report = synchronizer(&api).push(&ParentTarget::existing("ROOT"), &lines).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.deleted, 2);
    assert_eq!(api.bom_of("g-a"), vec![("C".to_string(), 3.0)]);
}

#[tokio::test]
async fn one_missing_item_among_ten() {
    let api = MockBomApi::new();
    api.add_item(item("g-parent", "PARENT", "Rack"));
    let mut lines = Vec::new();
    for index in 0..10 {
        let number = format!("PART-{index}");
        if index != 6 {
            api.add_item(item(&format!("g-{index}"), &number, "Module"));
        }
        lines.push(SyncBomLine::new(0, number, 1.0 + index as f64));
    }

    let report = synchronizer(&api).push(&ParentTarget::existing("PARENT"), &lines).await.unwrap();

    assert_eq!(report.requested, 10);
    assert_eq!(report.created, 9);
    assert_eq!(report.warnings, vec!["Item not found: PART-6".to_string()]);
    assert_eq!(api.bom_of("g-parent").len(), 9);
}

#[tokio::test]
async fn unknown_parent_leaves_existing_bom_untouched() {
    let api = worked_example();
    let before = api.bom_of("g-root");

    let err = synchronizer(&api)
        .push(&ParentTarget::existing("NO-SUCH-RACK"), &[SyncBomLine::new(0, "A", 1.0)])
        .await
        .unwrap_err();

    assert!(matches!(err, BomError::ParentNotFound { ref number } if number == "NO-SUCH-RACK"));
    assert_eq!(api.delete_count(), 0);
    assert_eq!(api.bom_of("g-root"), before);
}

#[tokio::test]
async fn unreachable_remote_fails_before_deleting() {
    let api = worked_example();
    api.set_unreachable(true);

    let err = synchronizer(&api).push(&ParentTarget::existing("ROOT"), &[]).await.unwrap_err();
    assert!(matches!(err, BomError::Transport { .. }));
    assert_eq!(api.delete_count(), 0);
}

#[tokio::test]
async fn existing_parent_is_not_recreated() {
    let api = worked_example();
    let target = ParentTarget::CreateIfMissing {
        item: NewItem {
            number: "ROOT".into(),
            name: "Duplicate".into(),
            ..NewItem::default()
        },
    };

    let report = synchronizer(&api).push(&target, &[SyncBomLine::new(0, "C", 6.0)]).await.unwrap();

    assert!(!report.parent_created);
    assert_eq!(report.parent.id, "g-root");
    assert_eq!(api.bom_of("g-root"), vec![("C".to_string(), 6.0)]);
}

#[tokio::test]
async fn repeated_item_numbers_are_looked_up_once() {
    let api = worked_example();
    let lines = vec![
        SyncBomLine::new(0, "A", 1.0),
        SyncBomLine::new(1, "C", 2.0),
        SyncBomLine::new(0, "A", 3.0),
        SyncBomLine::new(1, "C", 4.0),
    ];

    let report = synchronizer(&api).push(&ParentTarget::existing("ROOT"), &lines).await.unwrap();

    assert_eq!(report.created, 4);
    assert_eq!(api.lookup_count("A"), 1);
    assert_eq!(api.lookup_count("C"), 1);
}
