//! Shared item masters for the integration tests.

use bomsync_cli::models::ItemRef;
use bomsync_cli::test_utils::MockBomApi;

pub fn item(id: &str, number: &str, category: &str) -> ItemRef {
    ItemRef::new(id, number).with_name(format!("{number} item")).with_category(category)
}

/// `ROOT -> [A×2, B×1]`, `A -> [C×3]`.
pub fn worked_example() -> MockBomApi {
    let api = MockBomApi::new();
    api.add_item(item("g-root", "ROOT", "Rack"));
    api.add_item(item("g-a", "A", "Chassis"));
    api.add_item(item("g-b", "B", "Chassis"));
    api.add_item(item("g-c", "C", "Cable"));
    api.add_bom_line("g-root", "g-a", 2.0);
    api.add_bom_line("g-root", "g-b", 1.0);
    api.add_bom_line("g-a", "g-c", 3.0);
    api
}

/// Three parents sharing one sub-assembly, which itself has children.
///
/// ```text
/// ROOT
/// ├── P1 ── SHARED ── [LEAF1, LEAF2]
/// ├── P2 ── SHARED
/// └── P3 ── SHARED
/// ```
pub fn shared_subassembly() -> MockBomApi {
    let api = MockBomApi::new();
    for (id, number) in [
        ("g-root", "ROOT"),
        ("g-p1", "P1"),
        ("g-p2", "P2"),
        ("g-p3", "P3"),
        ("g-shared", "SHARED"),
        ("g-leaf1", "LEAF1"),
        ("g-leaf2", "LEAF2"),
    ] {
        api.add_item(item(id, number, "Module"));
    }
    for parent in ["g-p1", "g-p2", "g-p3"] {
        api.add_bom_line("g-root", parent, 1.0);
        api.add_bom_line(parent, "g-shared", 2.0);
    }
    api.add_bom_line("g-shared", "g-leaf1", 4.0);
    api.add_bom_line("g-shared", "g-leaf2", 0.5);
    api
}

/// A single chain `N0 -> N1 -> ... -> N{len}`.
pub fn chain(len: usize) -> MockBomApi {
    let api = MockBomApi::new();
    for index in 0..=len {
        api.add_item(item(&format!("g-{index}"), &format!("N{index}"), "Module"));
    }
    for index in 0..len {
        api.add_bom_line(&format!("g-{index}"), &format!("g-{}", index + 1), 1.0);
    }
    api
}
