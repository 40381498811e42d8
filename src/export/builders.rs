//! One tree builder per export layout.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use super::{BOM_LINE_FIELDS, PARENT_FIELDS};
use crate::api::normalize;
use crate::models::{BomNode, ItemRef};

/// Builds trees from item records carrying nested BOM lines.
pub(super) struct ItemListBuilder<'p> {
    records: HashMap<String, &'p Value>,
}

impl<'p> ItemListBuilder<'p> {
    pub(super) fn new(records: &'p [Value]) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for record in records {
            match normalize::item_ref(record) {
                Some(item) if !item.id.is_empty() => {
                    by_id.entry(item.id).or_insert(record);
                }
                _ => warn!("Skipping export record without an id: {record}"),
            }
        }
        Self { records: by_id }
    }

    pub(super) fn build(&self, root_id: &str, max_depth: usize) -> Vec<BomNode> {
        if !self.records.contains_key(root_id) {
            warn!("Root {root_id} not found in export");
            return Vec::new();
        }
        self.expand(root_id, 0, max_depth)
    }

    fn expand(&self, id: &str, level: usize, max_depth: usize) -> Vec<BomNode> {
        if level >= max_depth {
            return Vec::new();
        }
        let Some(lines) = self
            .records
            .get(id)
            .and_then(|record| normalize::array_field(record, BOM_LINE_FIELDS))
        else {
            return Vec::new();
        };

        lines
            .iter()
            .filter_map(|line| {
                let Some(inline) = normalize::line_child(line) else {
                    warn!("Skipping unreadable BOM line under {id}: {line}");
                    return None;
                };
                // The child's own record is richer than the inline reference
                let item = self
                    .records
                    .get(&inline.id)
                    .and_then(|record| normalize::item_ref(record))
                    .unwrap_or(inline);
                let children = expand_below(&item, |child_id| {
                    self.expand(child_id, level + 1, max_depth)
                });
                Some(BomNode::leaf(item, normalize::quantity(line), level).with_children(children))
            })
            .collect()
    }
}

/// Builds trees from flat parent/child lines.
pub(super) struct FlatLineBuilder<'p> {
    by_parent: HashMap<String, Vec<&'p Value>>,
}

impl<'p> FlatLineBuilder<'p> {
    pub(super) fn new(lines: &'p [Value]) -> Self {
        let mut by_parent: HashMap<String, Vec<&'p Value>> = HashMap::new();
        for line in lines {
            match parent_id(line) {
                Some(parent) => by_parent.entry(parent).or_default().push(line),
                None => warn!("Skipping export line without a parent: {line}"),
            }
        }
        Self { by_parent }
    }

    pub(super) fn build(&self, root_id: &str, max_depth: usize) -> Vec<BomNode> {
        if !self.by_parent.contains_key(root_id) {
            warn!("Root {root_id} has no BOM lines in export");
            return Vec::new();
        }
        self.expand(root_id, 0, max_depth)
    }

    fn expand(&self, id: &str, level: usize, max_depth: usize) -> Vec<BomNode> {
        if level >= max_depth {
            return Vec::new();
        }
        let Some(lines) = self.by_parent.get(id) else {
            return Vec::new();
        };

        lines
            .iter()
            .filter_map(|line| {
                let Some(item) = normalize::line_child(line) else {
                    warn!("Skipping unreadable BOM line under {id}: {line}");
                    return None;
                };
                let children = expand_below(&item, |child_id| {
                    self.expand(child_id, level + 1, max_depth)
                });
                Some(BomNode::leaf(item, normalize::quantity(line), level).with_children(children))
            })
            .collect()
    }
}

fn parent_id(line: &Value) -> Option<String> {
    let parent = normalize::field(line, PARENT_FIELDS)?;
    match parent {
        Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Value::Object(_) => {
            normalize::item_ref(parent).map(|item| item.id).filter(|id| !id.is_empty())
        }
        _ => None,
    }
}

/// Children of `item`, or none for items that cannot have a BOM.
fn expand_below<F>(item: &ItemRef, expand: F) -> Vec<BomNode>
where
    F: FnOnce(&str) -> Vec<BomNode>,
{
    if item.id.is_empty() || item.is_known_leaf() {
        Vec::new()
    } else {
        expand(&item.id)
    }
}
