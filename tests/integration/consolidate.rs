use bomsync_cli::aggregate::{Aggregator, LevelClassifier, RemoteCatalog};
use bomsync_cli::models::{ConsolidatedEntry, HierarchyLevel, ItemRef, PlacementSurface};

use super::fixtures::{item, worked_example};

fn hierarchy() -> LevelClassifier {
    LevelClassifier::new(vec![
        HierarchyLevel::new(0, "Rack"),
        HierarchyLevel::new(1, "Chassis"),
        HierarchyLevel::new(2, "Cable"),
    ])
}

fn grid(name: &str, cells: &[&[&str]]) -> PlacementSurface {
    PlacementSurface::new(
        name,
        cells.iter().map(|row| row.iter().map(|cell| cell.to_string()).collect()).collect(),
    )
}

fn entry<'e>(entries: &'e [ConsolidatedEntry], number: &str) -> &'e ConsolidatedEntry {
    entries.iter().find(|e| e.item_number() == number).unwrap_or_else(|| panic!("{number} missing"))
}

#[tokio::test]
async fn worked_example_two_placements() {
    let api = worked_example();
    let catalog = RemoteCatalog::new(&api, ["ROOT"]);
    let surface = grid("Hall", &[&["ROOT", ""], &["", "ROOT"]]);

    let entries = Aggregator::new(&api, hierarchy()).consolidate(&[surface], &catalog).await;

    assert_eq!(entry(&entries, "ROOT").quantity, 2.0);
    assert_eq!(entry(&entries, "A").quantity, 4.0);
    assert_eq!(entry(&entries, "B").quantity, 2.0);
    assert_eq!(entry(&entries, "C").quantity, 12.0);

    // Resolved once, not once per placement
    assert_eq!(api.lookup_count("ROOT"), 1);
    assert_eq!(api.fetch_count("g-root"), 1);
}

#[tokio::test]
async fn placements_sum_across_surfaces_and_assemblies() {
    let api = worked_example();
    api.add_item(item("g-rack2", "RACK2", "Rack"));
    api.add_bom_line("g-rack2", "g-c", 5.0);

    let catalog = RemoteCatalog::new(&api, ["ROOT", "RACK2"]);
    let surfaces = vec![
        grid("North", &[&["ROOT", "ROOT", "ROOT"]]),
        grid("South", &[&["RACK2"], &["note"], &["RACK2"]]),
    ];

    let entries = Aggregator::new(&api, hierarchy()).consolidate(&surfaces, &catalog).await;

    // 3 ROOT × 2 × 3 + 2 RACK2 × 5
    let cable = entry(&entries, "C");
    assert_eq!(cable.quantity, 28.0);
    assert_eq!(cable.source_surfaces.iter().collect::<Vec<_>>(), vec!["North", "South"]);
    assert_eq!(entry(&entries, "RACK2").quantity, 2.0);
    assert!(entries.iter().all(|e| e.item_number() != "note"));
}

#[tokio::test]
async fn fractional_quantities_are_summed() {
    let api = worked_example();
    api.add_item(item("g-fiber", "FIBER", "Cable"));
    api.add_bom_line("g-b", "g-fiber", 0.75);

    let catalog = RemoteCatalog::new(&api, ["ROOT"]);
    let surface = grid("Hall", &[&["ROOT", "ROOT", "ROOT"]]);
    let entries = Aggregator::new(&api, hierarchy()).consolidate(&[surface], &catalog).await;

    assert!((entry(&entries, "FIBER").quantity - 2.25).abs() < 1e-9);
}

#[tokio::test]
async fn output_is_ordered_for_indentation() {
    let api = worked_example();
    api.add_item(item("g-z", "Z-PART", "Chassis"));
    api.add_item(item("g-odd", "ODD", "Unlisted"));
    api.add_bom_line("g-root", "g-z", 1.0);
    api.add_bom_line("g-root", "g-odd", 1.0);

    let catalog = RemoteCatalog::new(&api, ["ROOT"]);
    let entries = Aggregator::new(&api, hierarchy())
        .with_default_level(3)
        .consolidate(&[grid("Hall", &[&["ROOT"]])], &catalog)
        .await;

    let order: Vec<(usize, &str)> = entries.iter().map(|e| (e.level, e.item_number())).collect();
    assert_eq!(
        order,
        vec![(0, "ROOT"), (1, "A"), (1, "B"), (1, "Z-PART"), (2, "C"), (3, "ODD")]
    );
}

#[tokio::test]
async fn undescribed_items_are_looked_up_once() {
    let api = worked_example();
    api.add_item(ItemRef::new("g-screw", "SCREW"));
    api.add_bom_line("g-a", "g-screw", 4.0);
    api.add_bom_line("g-b", "g-screw", 2.0);

    let catalog = RemoteCatalog::new(&api, ["ROOT"]);
    let surface = grid("Hall", &[&["ROOT", "ROOT"]]);
    let entries = Aggregator::new(&api, hierarchy()).consolidate(&[surface], &catalog).await;

    // 2 × (2 × 4 + 1 × 2)
    assert_eq!(entry(&entries, "SCREW").quantity, 20.0);
    assert_eq!(api.lookup_count("SCREW"), 1);
    assert_eq!(api.lookup_count("A"), 0);
}
