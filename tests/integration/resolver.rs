use std::time::Duration;

use bomsync_cli::core::BomError;
use bomsync_cli::models::BomNode;
use bomsync_cli::resolver::{FetchStrategy, TreeResolver, flatten_tree};
use bomsync_cli::test_utils::{MockBomApi, init_test_logging};

use super::fixtures::{chain, item, shared_subassembly, worked_example};

fn depth_of(nodes: &[BomNode]) -> usize {
    nodes.iter().map(|node| node.max_level() + 1).max().unwrap_or(0)
}

#[tokio::test]
async fn shared_subassembly_is_fetched_once() {
    init_test_logging(None);
    let api = shared_subassembly();

    let resolution = TreeResolver::new(&api).resolve("g-root").await.unwrap();

    assert_eq!(resolution.strategy, FetchStrategy::Parallel);
    assert_eq!(api.fetch_count("g-shared"), 1);
    assert_eq!(resolution.fetches, 7);
    assert_eq!(api.total_fetches(), 7);

    // Every parent still carries the full shared subtree
    assert_eq!(resolution.nodes.len(), 3);
    for parent in &resolution.nodes {
        let shared = &parent.children[0];
        assert_eq!(shared.item.number, "SHARED");
        assert_eq!(shared.level, 1);
        assert_eq!(shared.quantity, 2.0);
        let leaves: Vec<_> =
            shared.children.iter().map(|n| (n.item.number.as_str(), n.level)).collect();
        assert_eq!(leaves, vec![("LEAF1", 2), ("LEAF2", 2)]);
    }
}

#[tokio::test]
async fn deep_tree_is_truncated_at_max_depth() {
    let api = chain(20);

    let nodes = TreeResolver::new(&api).with_max_depth(5).resolve_tree("g-0").await.unwrap();

    assert_eq!(depth_of(&nodes), 5);
    assert_eq!(nodes.iter().map(BomNode::subtree_len).sum::<usize>(), 5);
    assert_eq!(api.fetch_count("g-4"), 1);
    assert_eq!(api.fetch_count("g-5"), 0);

    let deepest = flatten_tree(&nodes).pop().unwrap();
    assert_eq!(deepest.item_number, "N5");
    assert_eq!(deepest.level, 4);
}

#[tokio::test]
async fn default_depth_is_ten() {
    let api = chain(30);
    let nodes = TreeResolver::new(&api).resolve_tree("g-0").await.unwrap();
    assert_eq!(depth_of(&nodes), 10);
}

#[tokio::test]
async fn cyclic_bom_terminates() {
    let api = MockBomApi::new();
    api.add_item(item("g-x", "X", "Module"));
    api.add_item(item("g-y", "Y", "Module"));
    api.add_bom_line("g-x", "g-y", 1.0);
    api.add_bom_line("g-y", "g-x", 1.0);

    let nodes = TreeResolver::new(&api).with_max_depth(6).resolve_tree("g-x").await.unwrap();

    assert_eq!(depth_of(&nodes), 6);
    assert_eq!(api.fetch_count("g-x"), 1);
    assert_eq!(api.fetch_count("g-y"), 1);
}

#[tokio::test]
async fn transport_failure_falls_back_to_sequential() {
    let reference = TreeResolver::new(&shared_subassembly()).resolve_tree("g-root").await.unwrap();

    let api = shared_subassembly();
    api.fail_transport_once("g-p2");
    let resolution = TreeResolver::new(&api).resolve("g-root").await.unwrap();

    assert_eq!(resolution.strategy, FetchStrategy::Sequential);
    assert_eq!(resolution.nodes, reference);
    // The sequential path deduplicates as well
    assert_eq!(api.fetch_count("g-shared"), 1);
}

#[tokio::test(start_paused = true)]
async fn batch_timeout_falls_back_to_sequential() {
    let reference = TreeResolver::new(&worked_example()).resolve_tree("g-root").await.unwrap();

    let api = worked_example();
    api.stall_fetch_once("g-b");
    let resolution = TreeResolver::new(&api)
        .with_batch_timeout(Duration::from_secs(5))
        .resolve("g-root")
        .await
        .unwrap();

    assert_eq!(resolution.strategy, FetchStrategy::Sequential);
    assert_eq!(resolution.nodes, reference);
}

#[tokio::test]
async fn unreachable_remote_is_a_transport_error() {
    let api = worked_example();
    api.set_unreachable(true);

    let err = TreeResolver::new(&api).resolve_tree("g-root").await.unwrap_err();
    assert!(matches!(err, BomError::Transport { .. }), "unexpected error: {err}");
}

#[tokio::test]
async fn failing_root_yields_empty_tree() {
    let api = worked_example();
    api.fail_fetch("g-root");

    let nodes = TreeResolver::new(&api).resolve_tree("g-root").await.unwrap();
    assert!(nodes.is_empty());
}

#[tokio::test]
async fn has_children_matches_children() {
    let api = worked_example();
    let nodes = TreeResolver::new(&api).resolve_tree("g-root").await.unwrap();

    fn check(nodes: &[BomNode]) {
        for node in nodes {
            assert_eq!(node.has_children, !node.children.is_empty(), "{}", node.item.number);
            check(&node.children);
        }
    }
    check(&nodes);
}
