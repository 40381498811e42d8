//! Shared data models for bomsync operations
//!
//! These are the canonical shapes the engine works with. Remote JSON of any
//! casing is normalized into them at the API boundary (see
//! [`crate::api::normalize`]), so nothing past that point ever inspects raw
//! payload fields.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Summary of a remote item as returned by the item master.
///
/// Immutable once fetched within one resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    /// Opaque stable identifier (GUID) in the remote system
    pub id: String,
    /// Human-readable item code, unique within the remote system
    pub number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub lifecycle_phase: String,
    #[serde(default)]
    pub revision: String,
    /// `Some(false)` when the remote system flags the item as a non-assembly
    /// leaf that cannot carry a BOM of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<bool>,
}

impl ItemRef {
    /// Create a minimal item reference from identifier and number.
    pub fn new(id: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            number: number.into(),
            ..Default::default()
        }
    }

    /// Stub for an item known only by its number.
    pub fn stub(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Mark the item as explicitly non-assembly (or assembly).
    #[must_use]
    pub fn with_assembly_flag(mut self, assembly: bool) -> Self {
        self.assembly = Some(assembly);
        self
    }

    /// True when the descriptive fields used for classification are present.
    pub fn is_described(&self) -> bool {
        !self.name.is_empty() && !self.category.is_empty()
    }

    /// True when the remote system says this item can never have children.
    pub fn is_known_leaf(&self) -> bool {
        self.assembly == Some(false)
    }
}

/// One position in a resolved BOM tree.
///
/// `level` is the depth below the resolution root: the root's direct
/// children are level 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomNode {
    pub item: ItemRef,
    /// Multiplier relative to the immediate parent
    pub quantity: f64,
    pub level: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BomNode>,
    pub has_children: bool,
}

impl BomNode {
    /// Create a node without children.
    pub fn leaf(item: ItemRef, quantity: f64, level: usize) -> Self {
        Self {
            item,
            quantity,
            level,
            children: Vec::new(),
            has_children: false,
        }
    }

    /// Attach children, keeping `has_children` consistent with the list.
    #[must_use]
    pub fn with_children(mut self, children: Vec<BomNode>) -> Self {
        self.has_children = !children.is_empty();
        self.children = children;
        self
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(BomNode::subtree_len).sum::<usize>()
    }

    /// Deepest level present in this subtree.
    pub fn max_level(&self) -> usize {
        self.children.iter().map(BomNode::max_level).max().unwrap_or(self.level).max(self.level)
    }
}

/// Flat, indentation-free BOM line fed to the synchronizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncBomLine {
    pub level: usize,
    pub item_number: String,
    pub quantity: f64,
}

impl SyncBomLine {
    pub fn new(level: usize, item_number: impl Into<String>, quantity: f64) -> Self {
        Self {
            level,
            item_number: item_number.into(),
            quantity,
        }
    }
}

/// One row of a consolidation result, keyed by item number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedEntry {
    /// Resolved item, or a stub carrying only the number
    pub item: ItemRef,
    /// Sum of all per-placement contributions
    pub quantity: f64,
    pub level: usize,
    /// Names of the surfaces that contributed to this entry
    pub source_surfaces: BTreeSet<String>,
    /// False when the remote system could not describe the item
    pub resolved: bool,
}

impl ConsolidatedEntry {
    pub fn item_number(&self) -> &str {
        &self.item.number
    }

    /// Convert to a push line directly under the push target.
    ///
    /// The quantity is already a rolled-up total, so the classification
    /// level is not carried over: nesting it would multiply it again.
    pub fn to_sync_line(&self) -> SyncBomLine {
        SyncBomLine::new(0, self.item.number.clone(), self.quantity)
    }
}

/// A `{level, category}` pair of the configured category hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyLevel {
    pub level: usize,
    pub category: String,
}

impl HierarchyLevel {
    pub fn new(level: usize, category: impl Into<String>) -> Self {
        Self {
            level,
            category: category.into(),
        }
    }
}

/// A named grid of assembly-instance references.
///
/// Cells hold an item number or are blank. Read-only input to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlacementSurface {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl PlacementSurface {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Iterate over non-blank cell values, trimmed.
    pub fn cell_values(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|cell| cell.trim()).filter(|cell| !cell.is_empty())
    }

    /// Count how many times each accepted value occurs on this surface.
    pub fn count_matching<F>(&self, mut accept: F) -> HashMap<String, usize>
    where
        F: FnMut(&str) -> bool,
    {
        let mut counts = HashMap::new();
        for value in self.cell_values() {
            if accept(value) {
                *counts.entry(value.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_children_sets_flag() {
        let node = BomNode::leaf(ItemRef::new("g1", "A"), 2.0, 0);
        assert!(!node.has_children);

        let node = node.with_children(vec![BomNode::leaf(ItemRef::new("g2", "B"), 1.0, 1)]);
        assert!(node.has_children);
        assert_eq!(node.subtree_len(), 2);
        assert_eq!(node.max_level(), 1);

        let node = node.with_children(Vec::new());
        assert!(!node.has_children);
    }

    #[test]
    fn surface_counts_skip_blanks_and_unknowns() {
        let surface = PlacementSurface::new(
            "Hall A",
            vec![
                vec!["RACK-1".into(), "".into(), " RACK-1 ".into()],
                vec!["label".into(), "RACK-2".into(), "   ".into()],
            ],
        );

        let counts = surface.count_matching(|v| v.starts_with("RACK-"));
        assert_eq!(counts.get("RACK-1"), Some(&2));
        assert_eq!(counts.get("RACK-2"), Some(&1));
        assert!(!counts.contains_key("label"));
    }

    #[test]
    fn consolidated_entries_push_flat() {
        let entry = ConsolidatedEntry {
            item: ItemRef::new("g-c", "C"),
            quantity: 12.0,
            level: 2,
            source_surfaces: BTreeSet::new(),
            resolved: true,
        };
        assert_eq!(entry.to_sync_line(), SyncBomLine::new(0, "C", 12.0));
    }

    #[test]
    fn item_description_state() {
        assert!(!ItemRef::stub("X").is_described());
        assert!(ItemRef::stub("X").with_name("Cable").with_category("Cable").is_described());
        assert!(ItemRef::stub("X").with_assembly_flag(false).is_known_leaf());
        assert!(!ItemRef::stub("X").is_known_leaf());
    }
}
