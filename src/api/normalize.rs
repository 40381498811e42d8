//! Casing-tolerant access to remote JSON.
//!
//! The item master is inconsistent about field casing (`number` vs `Number`,
//! `results` vs `Results`, `lifecycle_phase` vs `lifecyclePhase`). Field
//! names are compared after lowercasing and dropping `_`/`-`, and every
//! lookup accepts a list of aliases. Only this module looks at raw keys.

use serde_json::Value;

use super::RemoteBomLine;
use crate::models::ItemRef;

const ID_FIELDS: &[&str] = &["id", "guid", "itemId", "itemGuid"];
const NUMBER_FIELDS: &[&str] = &["number", "itemNumber", "partNumber"];
const NAME_FIELDS: &[&str] = &["name", "title"];
const DESCRIPTION_FIELDS: &[&str] = &["description"];
const CATEGORY_FIELDS: &[&str] = &["category", "itemCategory"];
const LIFECYCLE_FIELDS: &[&str] = &["lifecyclePhase", "lifecycle", "phase"];
const REVISION_FIELDS: &[&str] = &["revision", "rev"];
const ASSEMBLY_FIELDS: &[&str] = &["isAssembly", "assembly", "hasBom"];
const LEAF_FIELDS: &[&str] = &["isLeaf", "leaf"];
const QUANTITY_FIELDS: &[&str] = &["quantity", "qty"];
const LIST_FIELDS: &[&str] = &["results", "items", "data", "lines"];

/// Child reference fields on a BOM line, object or bare identifier.
pub const CHILD_FIELDS: &[&str] = &["child", "item", "component"];

fn canonical(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up the first matching field of an object, ignoring casing.
pub fn field<'v>(value: &'v Value, names: &[&str]) -> Option<&'v Value> {
    let object = value.as_object()?;
    names.iter().find_map(|name| {
        let wanted = canonical(name);
        object.iter().find(|(key, v)| canonical(key) == wanted && !v.is_null()).map(|(_, v)| v)
    })
}

/// String field; numbers are stringified since some exports emit numeric codes.
pub fn str_field(value: &Value, names: &[&str]) -> Option<String> {
    match field(value, names)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric field, accepting numeric strings.
pub fn f64_field(value: &Value, names: &[&str]) -> Option<f64> {
    match field(value, names)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Boolean field, accepting `"true"`/`"false"` strings.
pub fn bool_field(value: &Value, names: &[&str]) -> Option<bool> {
    match field(value, names)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().to_ascii_lowercase().parse().ok(),
        _ => None,
    }
}

/// Array field.
pub fn array_field<'v>(value: &'v Value, names: &[&str]) -> Option<&'v Vec<Value>> {
    field(value, names)?.as_array()
}

/// The record list of a response: the top-level array, or the array under a
/// `results`-style envelope key.
pub fn results_list(value: &Value) -> Option<&Vec<Value>> {
    value.as_array().or_else(|| array_field(value, LIST_FIELDS))
}

/// Normalize an item record. Requires at least an id or a number.
pub fn item_ref(value: &Value) -> Option<ItemRef> {
    let id = str_field(value, ID_FIELDS).unwrap_or_default();
    let number = str_field(value, NUMBER_FIELDS).unwrap_or_default();
    if id.is_empty() && number.is_empty() {
        return None;
    }

    let assembly = bool_field(value, ASSEMBLY_FIELDS)
        .or_else(|| bool_field(value, LEAF_FIELDS).map(|leaf| !leaf));

    Some(ItemRef {
        id,
        number,
        name: str_field(value, NAME_FIELDS).unwrap_or_default(),
        description: str_field(value, DESCRIPTION_FIELDS).unwrap_or_default(),
        category: str_field(value, CATEGORY_FIELDS).unwrap_or_default(),
        lifecycle_phase: str_field(value, LIFECYCLE_FIELDS).unwrap_or_default(),
        revision: str_field(value, REVISION_FIELDS).unwrap_or_default(),
        assembly,
    })
}

/// Line quantity, defaulting to one when absent.
pub fn quantity(value: &Value) -> f64 {
    f64_field(value, QUANTITY_FIELDS).unwrap_or(1.0)
}

/// Extract the child item a BOM line points at.
///
/// Accepts a nested child object (`{"child": {...}}`), a bare child
/// identifier (`{"child": "guid"}`), or flat `childId`/`childNumber` fields.
pub fn line_child(line: &Value) -> Option<ItemRef> {
    if let Some(child) = field(line, CHILD_FIELDS) {
        match child {
            Value::Object(_) => return item_ref(child),
            Value::String(id) if !id.trim().is_empty() => {
                let number = str_field(line, &["childNumber", "itemNumber"]).unwrap_or_default();
                return Some(ItemRef::new(id.trim(), number));
            }
            _ => {}
        }
    }

    let id = str_field(line, &["childId", "childGuid", "itemId"]).unwrap_or_default();
    let number = str_field(line, &["childNumber", "itemNumber"]).unwrap_or_default();
    if id.is_empty() && number.is_empty() {
        // Some endpoints list child item records directly, quantity inline.
        return item_ref(line);
    }
    Some(ItemRef::new(id, number))
}

/// Normalize one line of a `GET /items/{id}/bom` response.
pub fn bom_line(value: &Value) -> Option<RemoteBomLine> {
    let item = line_child(value)?;
    let line_id = str_field(value, &["lineId", "id", "guid"]).unwrap_or_default();
    let level = f64_field(value, &["level"]).filter(|l| *l >= 0.0).map(|l| l as usize);

    Some(RemoteBomLine {
        line_id,
        item,
        quantity: quantity(value),
        level,
    })
}
