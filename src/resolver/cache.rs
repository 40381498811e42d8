//! Per-operation caches for resolution, consolidation and push.
//!
//! Both caches are owned by the call that creates them and dropped when it
//! returns. Nothing is shared between operations, so a later run always sees
//! fresh remote data.

use std::collections::HashMap;

use tracing::debug;

use crate::api::{ApiError, ApiResult, BomApi};
use crate::models::{BomNode, ItemRef};

#[derive(Debug, Clone)]
enum LookupEntry {
    Found(ItemRef),
    Missing,
    Failed(ApiError),
}

/// Item summaries looked up by number, at most one remote call per number.
///
/// Failed lookups are remembered too: asking again for the same number
/// returns the recorded error instead of hitting the remote system again.
#[derive(Debug, Default)]
pub struct ItemRefCache {
    by_number: HashMap<String, LookupEntry>,
    remote_lookups: usize,
}

impl ItemRefCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache with an item already known locally.
    pub fn insert(&mut self, item: ItemRef) {
        if !item.number.is_empty() {
            self.by_number.insert(item.number.clone(), LookupEntry::Found(item));
        }
    }

    /// Resolve `number`, consulting the remote system only on first use.
    pub async fn lookup<A>(&mut self, api: &A, number: &str) -> ApiResult<Option<ItemRef>>
    where
        A: BomApi + ?Sized,
    {
        if let Some(entry) = self.by_number.get(number) {
            return match entry {
                LookupEntry::Found(item) => Ok(Some(item.clone())),
                LookupEntry::Missing => Ok(None),
                LookupEntry::Failed(err) => Err(err.clone()),
            };
        }

        debug!("Looking up item {number}");
        self.remote_lookups += 1;
        let result = api.resolve_by_number(number).await;
        let entry = match &result {
            Ok(Some(item)) => LookupEntry::Found(item.clone()),
            Ok(None) => LookupEntry::Missing,
            Err(err) => LookupEntry::Failed(err.clone()),
        };
        self.by_number.insert(number.to_string(), entry);
        result
    }

    /// Number of remote calls this cache has made.
    pub fn remote_lookups(&self) -> usize {
        self.remote_lookups
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Fetched(Vec<BomNode>),
    Failed,
}

/// Item identifier to its direct children, for one resolution run.
///
/// Keys are reserved before a batch is dispatched so the same identifier is
/// never queued twice, within a level or across levels. Slots are filled only
/// after the batch has completed.
#[derive(Debug, Default)]
pub struct DedupCache {
    slots: HashMap<String, Slot>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve every identifier not yet present, returning the reserved ones
    /// in first-seen order without duplicates.
    pub fn reserve<I>(&mut self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut reserved = Vec::new();
        for id in ids {
            if id.is_empty() || self.slots.contains_key(&id) {
                continue;
            }
            self.slots.insert(id.clone(), Slot::Pending);
            reserved.push(id);
        }
        reserved
    }

    /// Store the fetched children of `id`.
    pub fn store(&mut self, id: impl Into<String>, children: Vec<BomNode>) {
        self.slots.insert(id.into(), Slot::Fetched(children));
    }

    /// Record that fetching `id` failed; it will reconstruct as a leaf.
    pub fn mark_failed(&mut self, id: impl Into<String>) {
        self.slots.insert(id.into(), Slot::Failed);
    }

    /// Children of `id`, empty when unknown, pending or failed.
    pub fn children(&self, id: &str) -> &[BomNode] {
        match self.slots.get(id) {
            Some(Slot::Fetched(children)) => children,
            _ => &[],
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockBomApi;

    #[test]
    fn reserve_skips_known_and_repeated_ids() {
        let mut cache = DedupCache::new();
        let first = cache.reserve(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(first, vec!["a", "b"]);

        let second = cache.reserve(vec!["b".to_string(), "c".to_string(), String::new()]);
        assert_eq!(second, vec!["c"]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn failed_and_pending_slots_have_no_children() {
        let mut cache = DedupCache::new();
        cache.reserve(vec!["a".to_string(), "b".to_string()]);
        cache.mark_failed("b");
        cache.store("c", vec![BomNode::leaf(ItemRef::new("d", "D"), 1.0, 0)]);

        assert!(cache.children("a").is_empty());
        assert!(cache.children("b").is_empty());
        assert_eq!(cache.children("c").len(), 1);
        assert!(cache.children("zzz").is_empty());
    }

    #[tokio::test]
    async fn lookup_hits_remote_once_per_number() {
        let api = MockBomApi::new();
        api.add_item(ItemRef::new("g-1", "CAB-1").with_name("Cable"));

        let mut cache = ItemRefCache::new();
        for _ in 0..3 {
            let found = cache.lookup(&api, "CAB-1").await.unwrap();
            assert_eq!(found.map(|item| item.id), Some("g-1".to_string()));
            assert_eq!(cache.lookup(&api, "NOPE").await.unwrap(), None);
        }

        assert_eq!(cache.remote_lookups(), 2);
        assert_eq!(api.lookup_count("CAB-1"), 1);
        assert_eq!(api.lookup_count("NOPE"), 1);
    }

    #[tokio::test]
    async fn seeded_items_skip_the_remote() {
        let api = MockBomApi::new();
        let mut cache = ItemRefCache::new();
        cache.insert(ItemRef::new("g-9", "RACK-9"));

        let found = cache.lookup(&api, "RACK-9").await.unwrap();
        assert_eq!(found.map(|item| item.id), Some("g-9".to_string()));
        assert_eq!(api.lookup_count("RACK-9"), 0);
    }
}
