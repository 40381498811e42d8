use bomsync_cli::core::BomError;
use bomsync_cli::export::{ExportShape, build_tree_from_export, detect_shape, find_item_id};
use bomsync_cli::resolver::TreeResolver;
use serde_json::{Value, json};

use super::fixtures::worked_example;

fn record(id: &str, number: &str, category: &str) -> Value {
    json!({"id": id, "number": number, "name": format!("{number} item"), "category": category})
}

fn item_list() -> Value {
    let mut root = record("g-root", "ROOT", "Rack");
    root["bomLines"] = json!([
        {"child": {"id": "g-a", "number": "A"}, "quantity": 2},
        {"child": {"id": "g-b", "number": "B"}, "quantity": 1}
    ]);
    let mut a = record("g-a", "A", "Chassis");
    a["bomLines"] = json!([{"child": {"id": "g-c", "number": "C"}, "quantity": 3}]);
    let mut b = record("g-b", "B", "Chassis");
    b["bomLines"] = json!([]);
    let mut c = record("g-c", "C", "Cable");
    c["bomLines"] = json!([]);
    json!([root, a, b, c])
}

fn flat_lines() -> Value {
    json!([
        {"parent": "g-root", "child": record("g-a", "A", "Chassis"), "quantity": 2},
        {"parent": "g-root", "child": record("g-b", "B", "Chassis"), "quantity": 1},
        {"parent": "g-a", "child": record("g-c", "C", "Cable"), "quantity": 3}
    ])
}

#[tokio::test]
async fn all_shapes_match_the_resolver() {
    let api = worked_example();
    let resolved = TreeResolver::new(&api).resolve_tree("g-root").await.unwrap();

    let shape_a = item_list();
    let shape_b = json!({"items": item_list()});
    let shape_c = flat_lines();
    let shape_c_object = json!({"bom": flat_lines()});

    assert_eq!(detect_shape(&shape_a).unwrap(), ExportShape::ItemList);
    assert_eq!(detect_shape(&shape_b).unwrap(), ExportShape::Envelope);
    assert_eq!(detect_shape(&shape_c).unwrap(), ExportShape::FlatLines);
    assert_eq!(detect_shape(&shape_c_object).unwrap(), ExportShape::FlatLines);

    for payload in [&shape_a, &shape_b, &shape_c, &shape_c_object] {
        let built = build_tree_from_export(payload, "g-root").unwrap();
        assert_eq!(built, resolved, "payload: {payload}");
    }
}

#[test]
fn casing_variants_build_the_same_tree() {
    let canonical = build_tree_from_export(&json!({"items": item_list()}), "g-root").unwrap();

    let shouting = json!({"Items": [
        {"Id": "g-root", "Number": "ROOT", "Name": "ROOT item", "Category": "Rack", "BomLines": [
            {"Child": {"Id": "g-a", "Number": "A"}, "Quantity": 2},
            {"Child": {"Id": "g-b", "Number": "B"}, "Quantity": "1"}
        ]},
        {"Id": "g-a", "Number": "A", "Name": "A item", "Category": "Chassis", "BomLines": [
            {"Child": {"Id": "g-c", "Number": "C"}, "Quantity": 3}
        ]},
        {"Id": "g-b", "Number": "B", "Name": "B item", "Category": "Chassis", "BomLines": []},
        {"Id": "g-c", "Number": "C", "Name": "C item", "Category": "Cable", "BomLines": []}
    ]});

    assert_eq!(build_tree_from_export(&shouting, "g-root").unwrap(), canonical);
}

#[test]
fn unknown_root_builds_nothing() {
    assert!(build_tree_from_export(&item_list(), "g-missing").unwrap().is_empty());
    assert!(build_tree_from_export(&flat_lines(), "g-missing").unwrap().is_empty());
}

#[test]
fn unrecognized_payload_is_fatal() {
    for payload in [json!({"rows": [1, 2, 3]}), json!([]), json!(null), json!([{"sku": "X"}])] {
        let err = build_tree_from_export(&payload, "g-root").unwrap_err();
        assert!(matches!(err, BomError::UnrecognizedExportFormat { .. }), "payload: {payload}");
    }
}

#[test]
fn root_numbers_resolve_to_ids() {
    assert_eq!(find_item_id(&item_list(), "ROOT").as_deref(), Some("g-root"));
    assert_eq!(find_item_id(&flat_lines(), "C").as_deref(), Some("g-c"));
}
