//! In-memory [`BomApi`] for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::api::{ApiError, ApiResult, BomApi, NewBomLine, NewItem, RemoteBomLine};
use crate::models::ItemRef;

#[derive(Debug, Clone)]
struct MockLine {
    line_id: String,
    item_id: String,
    quantity: f64,
    level: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    items: BTreeMap<String, ItemRef>,
    boms: HashMap<String, Vec<MockLine>>,
    export: Option<Value>,
    next_id: usize,

    fetch_counts: HashMap<String, usize>,
    lookup_counts: HashMap<String, usize>,
    deletes: usize,
    line_creates: usize,

    unreachable: bool,
    failing_fetches: HashSet<String>,
    transport_once: HashSet<String>,
    stall_once: HashSet<String>,
    failing_creates: HashSet<String>,
    failing_deletes: HashSet<String>,
    fail_item_creation: bool,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn item(&self, id: &str) -> ItemRef {
        self.items.get(id).cloned().unwrap_or_else(|| ItemRef::new(id, ""))
    }
}

/// An item master held in memory.
///
/// Items are keyed by id; BOM lines are stored per parent in insertion order.
/// Every call is counted, and failures can be injected per item.
#[derive(Debug, Default)]
pub struct MockBomApi {
    state: Mutex<MockState>,
}

fn transport(reason: &str) -> ApiError {
    ApiError::Transport(reason.to_string())
}

fn status(status: u16, body: &str) -> ApiError {
    ApiError::Status {
        status,
        body: body.to_string(),
    }
}

impl MockBomApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register (or replace) an item.
    pub fn add_item(&self, item: ItemRef) {
        self.state().items.insert(item.id.clone(), item);
    }

    /// Append a BOM line `parent_id -> child_id` with `quantity`.
    pub fn add_bom_line(&self, parent_id: &str, child_id: &str, quantity: f64) {
        let mut state = self.state();
        let line_id = state.next_id("line");
        state.boms.entry(parent_id.to_string()).or_default().push(MockLine {
            line_id,
            item_id: child_id.to_string(),
            quantity,
            level: None,
        });
    }

    /// Payload returned by `bulk_export`.
    pub fn set_export(&self, payload: Value) {
        self.state().export = Some(payload);
    }

    /// Every call fails with a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Fetching the BOM of `id` answers HTTP 500.
    pub fn fail_fetch(&self, id: &str) {
        self.state().failing_fetches.insert(id.to_string());
    }

    /// The next fetch of `id` fails with a transport error.
    pub fn fail_transport_once(&self, id: &str) {
        self.state().transport_once.insert(id.to_string());
    }

    /// The next fetch of `id` never answers.
    pub fn stall_fetch_once(&self, id: &str) {
        self.state().stall_once.insert(id.to_string());
    }

    /// Creating a BOM line that references `item_id` answers HTTP 500.
    pub fn fail_create_for(&self, item_id: &str) {
        self.state().failing_creates.insert(item_id.to_string());
    }

    /// Deleting a BOM line that references `item_id` answers HTTP 500.
    pub fn fail_delete_for(&self, item_id: &str) {
        self.state().failing_deletes.insert(item_id.to_string());
    }

    /// Creating items answers HTTP 500.
    pub fn fail_item_creation(&self) {
        self.state().fail_item_creation = true;
    }

    pub fn fetch_count(&self, id: &str) -> usize {
        self.state().fetch_counts.get(id).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.state().fetch_counts.values().sum()
    }

    pub fn lookup_count(&self, number: &str) -> usize {
        self.state().lookup_counts.get(number).copied().unwrap_or(0)
    }

    pub fn total_lookups(&self) -> usize {
        self.state().lookup_counts.values().sum()
    }

    pub fn delete_count(&self) -> usize {
        self.state().deletes
    }

    /// BOM line creations attempted, including failed ones.
    pub fn create_line_count(&self) -> usize {
        self.state().line_creates
    }

    /// `(item number, quantity)` of every line under `parent_id`.
    pub fn bom_of(&self, parent_id: &str) -> Vec<(String, f64)> {
        let state = self.state();
        state
            .boms
            .get(parent_id)
            .map(|lines| {
                lines.iter().map(|line| (state.item(&line.item_id).number, line.quantity)).collect()
            })
            .unwrap_or_default()
    }
}

impl BomApi for MockBomApi {
    fn fetch_bom<'a>(&'a self, item_id: &'a str) -> BoxFuture<'a, ApiResult<Vec<RemoteBomLine>>> {
        async move {
            let stall = {
                let mut state = self.state();
                *state.fetch_counts.entry(item_id.to_string()).or_insert(0) += 1;
                if state.unreachable || state.transport_once.remove(item_id) {
                    return Err(transport("connection reset"));
                }
                state.stall_once.remove(item_id)
            };
            if stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }

            let state = self.state();
            if state.failing_fetches.contains(item_id) {
                return Err(status(500, "fetch failed"));
            }
            let lines = state
                .boms
                .get(item_id)
                .map(|lines| {
                    lines
                        .iter()
                        .map(|line| RemoteBomLine {
                            line_id: line.line_id.clone(),
                            item: state.item(&line.item_id),
                            quantity: line.quantity,
                            level: line.level,
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok(lines)
        }
        .boxed()
    }

    fn resolve_by_number<'a>(
        &'a self,
        number: &'a str,
    ) -> BoxFuture<'a, ApiResult<Option<ItemRef>>> {
        let result = {
            let mut state = self.state();
            *state.lookup_counts.entry(number.to_string()).or_insert(0) += 1;
            if state.unreachable {
                Err(transport("connection refused"))
            } else {
                Ok(state.items.values().find(|item| item.number == number).cloned())
            }
        };
        futures::future::ready(result).boxed()
    }

    fn create_item<'a>(&'a self, item: &'a NewItem) -> BoxFuture<'a, ApiResult<ItemRef>> {
        let result = {
            let mut state = self.state();
            if state.unreachable {
                Err(transport("connection refused"))
            } else if state.fail_item_creation {
                Err(status(500, "item creation failed"))
            } else {
                let id = state.next_id("item");
                let created = ItemRef {
                    name: item.name.clone(),
                    description: item.description.clone(),
                    category: item.category.clone(),
                    ..ItemRef::new(id.clone(), item.number.clone())
                };
                state.items.insert(id, created.clone());
                Ok(created)
            }
        };
        futures::future::ready(result).boxed()
    }

    fn delete_bom_line<'a>(
        &'a self,
        parent_id: &'a str,
        line_id: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let result = {
            let mut state = self.state();
            let failing = state.failing_deletes.clone();
            if state.unreachable {
                Err(transport("connection refused"))
            } else {
                let lines = state.boms.entry(parent_id.to_string()).or_default();
                match lines.iter().position(|line| line.line_id == line_id) {
                    None => Err(status(404, "line not found")),
                    Some(index) if failing.contains(&lines[index].item_id) => {
                        Err(status(500, "delete failed"))
                    }
                    Some(index) => {
                        lines.remove(index);
                        state.deletes += 1;
                        Ok(())
                    }
                }
            }
        };
        futures::future::ready(result).boxed()
    }

    fn create_bom_line<'a>(
        &'a self,
        parent_id: &'a str,
        line: &'a NewBomLine,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let result = {
            let mut state = self.state();
            state.line_creates += 1;
            if state.unreachable {
                Err(transport("connection refused"))
            } else if state.failing_creates.contains(&line.item_id) {
                Err(status(500, "create failed"))
            } else {
                let line_id = state.next_id("line");
                state.boms.entry(parent_id.to_string()).or_default().push(MockLine {
                    line_id,
                    item_id: line.item_id.clone(),
                    quantity: line.quantity,
                    level: Some(line.level),
                });
                Ok(())
            }
        };
        futures::future::ready(result).boxed()
    }

    fn bulk_export(&self) -> BoxFuture<'_, ApiResult<Value>> {
        let result = {
            let state = self.state();
            if state.unreachable {
                Err(transport("connection refused"))
            } else {
                state.export.clone().ok_or_else(|| status(404, "no export available"))
            }
        };
        futures::future::ready(result).boxed()
    }
}
