//! Category to hierarchy-level mapping.

use std::collections::BTreeSet;

use crate::models::HierarchyLevel;

/// Maps an item category to its configured hierarchy level.
///
/// Matching is exact and case-sensitive. When a category is listed more than
/// once the first entry wins.
#[derive(Debug, Clone, Default)]
pub struct LevelClassifier {
    levels: Vec<HierarchyLevel>,
}

impl LevelClassifier {
    pub fn new(levels: Vec<HierarchyLevel>) -> Self {
        Self { levels }
    }

    /// Level of `category`, or `None` when it is not configured.
    pub fn level_for(&self, category: &str) -> Option<usize> {
        self.levels.iter().find(|entry| entry.category == category).map(|entry| entry.level)
    }
}

/// Check a hierarchy for duplicate levels and gaps.
///
/// Levels must form `0..n` in any order. Returns every problem found.
pub fn validate_hierarchy(levels: &[HierarchyLevel]) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();
    let mut seen = BTreeSet::new();

    for entry in levels {
        if !seen.insert(entry.level) {
            problems.push(format!("level {} is defined more than once", entry.level));
        }
        if entry.category.trim().is_empty() {
            problems.push(format!("level {} has an empty category", entry.level));
        }
    }

    let highest = seen.iter().next_back().copied().unwrap_or_default();
    let missing: Vec<String> = (0..highest)
        .filter(|level| !seen.contains(level))
        .map(|level| level.to_string())
        .collect();
    if !missing.is_empty() {
        problems.push(format!("hierarchy has gaps: missing level(s) {}", missing.join(", ")));
    }

    if problems.is_empty() { Ok(()) } else { Err(problems) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_first_wins() {
        let classifier = LevelClassifier::new(vec![
            HierarchyLevel::new(0, "Rack"),
            HierarchyLevel::new(1, "Chassis"),
            HierarchyLevel::new(2, "Rack"),
        ]);
        assert_eq!(classifier.level_for("Rack"), Some(0));
        assert_eq!(classifier.level_for("Chassis"), Some(1));
        assert_eq!(classifier.level_for("chassis"), None);
        assert_eq!(classifier.level_for(""), None);
    }

    #[test]
    fn valid_hierarchy_in_any_order() {
        let levels = vec![HierarchyLevel::new(1, "Chassis"), HierarchyLevel::new(0, "Rack")];
        assert!(validate_hierarchy(&levels).is_ok());
        assert!(validate_hierarchy(&[]).is_ok());
    }

    #[test]
    fn duplicates_and_gaps_are_reported() {
        let levels = vec![
            HierarchyLevel::new(0, "Rack"),
            HierarchyLevel::new(0, "Frame"),
            HierarchyLevel::new(2, "Cable"),
        ];
        let problems = validate_hierarchy(&levels).unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("more than once"));
        assert!(problems[1].contains("missing level(s) 1"));
    }
}
