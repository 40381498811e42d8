//! Tree building from a bulk export of the item master.
//!
//! A bulk export delivers the whole item-and-BOM graph in one payload, so a
//! tree can be built without any per-node fetching. The item master has
//! produced three layouts over time, told apart by structure alone:
//!
//! | Shape | Layout |
//! |---|---|
//! | [`ExportShape::ItemList`] | `[{item..., "bomLines": [...]}, ...]` |
//! | [`ExportShape::Envelope`] | `{"items": [ <item list> ]}` |
//! | [`ExportShape::FlatLines`] | `[{"parent": ..., "child": ..., ...}, ...]` or `{"bom": [...]}` |
//!
//! [`detect_shape`] picks the shape and [`build_tree_from_export`] applies the
//! matching builder. Every builder produces the same [`BomNode`] layout as
//! [`crate::resolver::TreeResolver`], so consumers never care where a tree
//! came from.

mod builders;

use serde_json::Value;
use tracing::debug;

use crate::api::normalize;
use crate::constants::DEFAULT_MAX_DEPTH;
use crate::core::BomError;
use crate::models::{BomNode, ItemRef};

use builders::{FlatLineBuilder, ItemListBuilder};

/// Fields carrying an item record's nested BOM lines.
pub(crate) const BOM_LINE_FIELDS: &[&str] = &["bomLines", "bom"];
/// Fields naming the parent of a flat BOM line.
pub(crate) const PARENT_FIELDS: &[&str] = &["parent", "parentId", "parentGuid"];
const ENVELOPE_FIELDS: &[&str] = &["items"];
const FLAT_BOM_FIELDS: &[&str] = &["bom"];

/// The layout of a bulk export payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportShape {
    /// Top-level list of item records with nested BOM lines
    ItemList,
    /// Item list wrapped in an `items` envelope
    Envelope,
    /// Flat parent/child BOM lines
    FlatLines,
}

/// Determine the shape of `payload` by inspecting its structure.
///
/// Checked in order: item list, `items` envelope, flat lines. Anything else,
/// including an empty list, is an [`BomError::UnrecognizedExportFormat`].
pub fn detect_shape(payload: &Value) -> Result<ExportShape, BomError> {
    let first = payload.as_array().and_then(|records| records.first());

    if first.is_some_and(|record| normalize::array_field(record, BOM_LINE_FIELDS).is_some()) {
        return Ok(ExportShape::ItemList);
    }
    if normalize::array_field(payload, ENVELOPE_FIELDS).is_some() {
        return Ok(ExportShape::Envelope);
    }
    if first.is_some_and(|record| normalize::field(record, PARENT_FIELDS).is_some())
        || normalize::array_field(payload, FLAT_BOM_FIELDS).is_some()
    {
        return Ok(ExportShape::FlatLines);
    }

    Err(BomError::UnrecognizedExportFormat {
        reason: describe(payload),
    })
}

fn describe(payload: &Value) -> String {
    match payload {
        Value::Array(records) if records.is_empty() => "empty top-level list".to_string(),
        Value::Array(_) => {
            "top-level list whose first element has neither BOM lines nor a parent".to_string()
        }
        Value::Object(object) => {
            let keys: Vec<&str> = object.keys().map(String::as_str).take(8).collect();
            format!("object without 'items' or 'bom' lists (keys: {})", keys.join(", "))
        }
        Value::Null => "null payload".to_string(),
        Value::Bool(_) => "top-level boolean".to_string(),
        Value::Number(_) => "top-level number".to_string(),
        Value::String(_) => "top-level string".to_string(),
    }
}

/// Build the tree below `root_id` from a bulk export payload.
pub fn build_tree_from_export(payload: &Value, root_id: &str) -> Result<Vec<BomNode>, BomError> {
    build_tree_from_export_with_depth(payload, root_id, DEFAULT_MAX_DEPTH)
}

/// As [`build_tree_from_export`], truncating at `max_depth` levels.
pub fn build_tree_from_export_with_depth(
    payload: &Value,
    root_id: &str,
    max_depth: usize,
) -> Result<Vec<BomNode>, BomError> {
    let shape = detect_shape(payload)?;
    debug!("Export payload detected as {shape:?}");

    let nodes = match shape {
        ExportShape::ItemList => ItemListBuilder::new(records(payload)).build(root_id, max_depth),
        ExportShape::Envelope => {
            let records = normalize::array_field(payload, ENVELOPE_FIELDS)
                .map(Vec::as_slice)
                .unwrap_or_default();
            ItemListBuilder::new(records).build(root_id, max_depth)
        }
        ExportShape::FlatLines => {
            let lines = payload
                .as_array()
                .or_else(|| normalize::array_field(payload, FLAT_BOM_FIELDS))
                .map(Vec::as_slice)
                .unwrap_or_default();
            FlatLineBuilder::new(lines).build(root_id, max_depth)
        }
    };
    Ok(nodes)
}

fn records(payload: &Value) -> &[Value] {
    payload.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// Find the identifier of the item numbered `number` anywhere in a payload.
///
/// Used to turn a user-supplied item number into the root identifier the
/// builders expect.
pub fn find_item_id(payload: &Value, number: &str) -> Option<String> {
    find_item(payload, number).map(|item| item.id)
}

/// Find the item numbered `number` anywhere in a payload.
///
/// Only references carrying an identifier count. A fully described record
/// is preferred over a bare inline reference to the same item.
pub fn find_item(payload: &Value, number: &str) -> Option<ItemRef> {
    let mut matches = Vec::new();
    collect_items(payload, number, &mut matches);
    let described = matches.iter().position(ItemRef::is_described);
    match described {
        Some(index) => Some(matches.swap_remove(index)),
        None => matches.into_iter().next(),
    }
}

fn collect_items(payload: &Value, number: &str, out: &mut Vec<ItemRef>) {
    match payload {
        Value::Array(values) => {
            for value in values {
                collect_items(value, number, out);
            }
        }
        Value::Object(object) => {
            let is_line = normalize::field(payload, PARENT_FIELDS).is_some()
                || normalize::field(payload, normalize::CHILD_FIELDS).is_some();
            let candidate = if is_line {
                normalize::line_child(payload)
            } else {
                normalize::item_ref(payload)
            };
            // Parent references of flat lines can carry the number too
            let parent = normalize::field(payload, PARENT_FIELDS).and_then(normalize::item_ref);
            out.extend(
                candidate
                    .into_iter()
                    .chain(parent)
                    .filter(|item| item.number == number && !item.id.is_empty()),
            );
            for value in object.values() {
                collect_items(value, number, out);
            }
        }
        _ => {}
    }
}
