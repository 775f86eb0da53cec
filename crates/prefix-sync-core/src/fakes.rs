//! In-memory prefix list service (testing only)
//!
//! `MemoryPrefixListApi` enforces the same version fencing as the real
//! service and can be scripted to fail, so the engine's retry protocol can be
//! exercised without network access.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ApiResult, PrefixListApi};
use crate::error::ApiError;
use crate::model::{ModifyOutput, MutationIntent, MutationRequest, PrefixListSummary};

/// State reported right after an accepted modify.
pub const STATE_MODIFY_IN_PROGRESS: &str = "modify-in-progress";

/// State reported by describe.
pub const STATE_MODIFY_COMPLETE: &str = "modify-complete";

#[derive(Debug, Default)]
struct FakeList {
    version: u64,
    /// cidr -> description
    entries: BTreeMap<String, Option<String>>,
}

/// In-memory managed prefix list service.
#[derive(Debug, Default)]
pub struct MemoryPrefixListApi {
    lists: Mutex<HashMap<String, FakeList>>,
    scripted_failures: Mutex<VecDeque<ApiError>>,
    persistent_failure: Mutex<Option<ApiError>>,
    transport_retries: AtomicU32,
    describe_calls: AtomicU32,
    modify_calls: AtomicU32,
    modify_log: Mutex<Vec<MutationRequest>>,
}

impl MemoryPrefixListApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service holding one empty list at `version`.
    pub fn with_list(id: &str, version: u64) -> Self {
        let api = Self::new();
        api.insert_list(id, version);
        api
    }

    pub fn insert_list(&self, id: &str, version: u64) {
        let mut lists = self.lists.lock().unwrap();
        lists.insert(
            id.to_string(),
            FakeList {
                version,
                entries: BTreeMap::new(),
            },
        );
    }

    pub fn delete_list(&self, id: &str) {
        self.lists.lock().unwrap().remove(id);
    }

    /// Simulate another writer bumping the list.
    pub fn set_version(&self, id: &str, version: u64) {
        if let Some(list) = self.lists.lock().unwrap().get_mut(id) {
            list.version = version;
        }
    }

    pub fn version(&self, id: &str) -> Option<u64> {
        self.lists.lock().unwrap().get(id).map(|l| l.version)
    }

    pub fn contains(&self, id: &str, cidr: &str) -> bool {
        self.lists
            .lock()
            .unwrap()
            .get(id)
            .map(|l| l.entries.contains_key(cidr))
            .unwrap_or(false)
    }

    /// `(cidr, description)` pairs in cidr order.
    pub fn entries(&self, id: &str) -> Vec<(String, Option<String>)> {
        self.lists
            .lock()
            .unwrap()
            .get(id)
            .map(|l| {
                l.entries
                    .iter()
                    .map(|(c, d)| (c.clone(), d.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Queue an error for the next modify call. Queued errors are consumed in order.
    pub fn fail_next_modify(&self, err: ApiError) {
        self.scripted_failures.lock().unwrap().push_back(err);
    }

    /// Fail every modify call with `err` until cleared.
    pub fn fail_all_modifies(&self, err: ApiError) {
        *self.persistent_failure.lock().unwrap() = Some(err);
    }

    pub fn clear_failures(&self) {
        self.scripted_failures.lock().unwrap().clear();
        *self.persistent_failure.lock().unwrap() = None;
    }

    /// Report `retries` transport retries on successful modify calls.
    pub fn report_transport_retries(&self, retries: u32) {
        self.transport_retries.store(retries, Ordering::SeqCst);
    }

    pub fn describe_calls(&self) -> u32 {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn modify_calls(&self) -> u32 {
        self.modify_calls.load(Ordering::SeqCst)
    }

    /// Every modify request received, in call order.
    pub fn modify_requests(&self) -> Vec<MutationRequest> {
        self.modify_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrefixListApi for MemoryPrefixListApi {
    async fn describe(&self, prefix_list_id: &str) -> ApiResult<Vec<PrefixListSummary>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let lists = self.lists.lock().unwrap();
        Ok(lists
            .get(prefix_list_id)
            .map(|list| PrefixListSummary {
                id: prefix_list_id.to_string(),
                version: list.version,
                name: None,
                state: Some(STATE_MODIFY_COMPLETE.to_string()),
            })
            .into_iter()
            .collect())
    }

    async fn modify(&self, request: &MutationRequest) -> ApiResult<ModifyOutput> {
        self.modify_calls.fetch_add(1, Ordering::SeqCst);
        self.modify_log.lock().unwrap().push(request.clone());

        if let Some(err) = self.scripted_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if let Some(err) = self.persistent_failure.lock().unwrap().clone() {
            return Err(err);
        }

        let mut lists = self.lists.lock().unwrap();
        let list = lists.get_mut(&request.prefix_list_id).ok_or_else(|| {
            ApiError::service(
                "InvalidPrefixListID.NotFound",
                format!("The prefix list ID '{}' does not exist", request.prefix_list_id),
            )
        })?;

        if list.version != request.current_version {
            return Err(ApiError::service(
                "PrefixListVersionMismatch",
                format!(
                    "The prefix list has the incorrect version number (current {}, requested {})",
                    list.version, request.current_version
                ),
            ));
        }

        let cidr = request.intent.cidr().to_string();
        match &request.intent {
            MutationIntent::Add { description, .. } => {
                if list.entries.contains_key(&cidr) {
                    return Err(ApiError::service(
                        "InvalidPrefixListModification",
                        format!("The CIDR {cidr} already exists in the prefix list"),
                    ));
                }
                list.entries.insert(cidr, Some(description.clone()));
            }
            MutationIntent::Remove { .. } => {
                if list.entries.remove(&cidr).is_none() {
                    return Err(ApiError::service(
                        "InvalidPrefixListModification",
                        format!("The CIDR {cidr} does not exist in the prefix list"),
                    ));
                }
            }
        }
        list.version += 1;

        Ok(ModifyOutput {
            state: Some(STATE_MODIFY_IN_PROGRESS.to_string()),
            version: Some(list.version),
            retry_count: self.transport_retries.load(Ordering::SeqCst),
        })
    }
}
