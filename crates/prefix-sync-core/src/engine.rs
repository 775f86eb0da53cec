//! Optimistic-concurrency mutation engine.
//!
//! The prefix list accepts one structural change at a time and fences every
//! modify on the caller's version. A stale writer gets `IncorrectState` or
//! `PrefixListVersionMismatch`; the engine then re-describes the list, rebases
//! the same intent onto the new version, backs off and tries again.
//!
//! ```text
//! modify ──ok──────────────► report
//!   │
//!   ├─conflict─► budget? ──exceeded──► RetryBudgetExhausted
//!   │              │
//!   │              └─► resolve ─► rebase ─► sleep(wait(n)) ─► modify
//!   │
//!   └─other────► MutationFailed
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::api::PrefixListApi;
use crate::backoff;
use crate::error::SyncError;
use crate::metrics::METRICS;
use crate::model::MutationRequest;
use crate::obs;
use crate::resolver::PrefixListResolver;
use crate::Result;

/// Default ceiling on cumulative conflict backoff.
pub const DEFAULT_MAX_TOTAL_WAIT_MS: u64 = 60_000;

/// When to stop retrying on version conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Ceiling on summed backoff (milliseconds). `None` retries until success.
    pub max_total_wait_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_total_wait_ms: Some(DEFAULT_MAX_TOTAL_WAIT_MS),
        }
    }
}

impl RetryPolicy {
    pub fn bounded(max_total_wait: Duration) -> Self {
        Self {
            max_total_wait_ms: Some(max_total_wait.as_millis() as u64),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            max_total_wait_ms: None,
        }
    }

    /// Whether `waited` is past the ceiling.
    pub fn is_exceeded(&self, waited: Duration) -> bool {
        match self.max_total_wait_ms {
            Some(max) => waited > Duration::from_millis(max),
            None => false,
        }
    }
}

/// Retry bookkeeping for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Retries performed so far (0 before the first conflict)
    pub attempt: u32,
    /// Summed backoff slept so far
    pub waited: Duration,
}

impl RetryState {
    /// State after sleeping `delay` for the next retry.
    pub fn advance(self, delay: Duration) -> Self {
        Self {
            attempt: self.attempt + 1,
            waited: self.waited + delay,
        }
    }
}

/// Outcome of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    pub prefix_list_id: String,
    /// `add` or `remove`
    pub action: String,
    pub cidr: String,
    /// Modify calls made, including the successful one
    pub attempts: u32,
    /// Version the successful request was fenced on
    pub version: u64,
    /// Version the service reported after the change, when it reports one
    pub new_version: Option<u64>,
    /// List state the service reported after the change
    pub state: Option<String>,
}

/// Applies mutation requests under version fencing.
pub struct MutationEngine<A: PrefixListApi + ?Sized> {
    api: Arc<A>,
    resolver: PrefixListResolver<A>,
    policy: RetryPolicy,
}

impl<A: PrefixListApi + ?Sized> MutationEngine<A> {
    pub fn new(api: Arc<A>, resolver: PrefixListResolver<A>, policy: RetryPolicy) -> Self {
        Self {
            api,
            resolver,
            policy,
        }
    }

    /// Apply `request`, rebasing and retrying on version conflicts.
    pub async fn apply(&self, request: MutationRequest) -> Result<MutationReport> {
        let mut request = request;
        let mut state = RetryState::default();

        loop {
            match self.api.modify(&request).await {
                Ok(output) => {
                    if output.retry_count != 0 {
                        return Err(SyncError::TransportRetried {
                            prefix_list_id: request.prefix_list_id,
                            retries: output.retry_count,
                        });
                    }
                    let report = MutationReport {
                        prefix_list_id: request.prefix_list_id.clone(),
                        action: request.intent.verb().to_string(),
                        cidr: request.intent.cidr().to_string(),
                        attempts: state.attempt + 1,
                        version: request.current_version,
                        new_version: output.version,
                        state: output.state,
                    };
                    METRICS.inc_mutations_applied();
                    obs::emit_mutation_applied(&report);
                    return Ok(report);
                }
                Err(err) if err.is_version_conflict() => {
                    METRICS.inc_version_conflicts();
                    let delay = backoff::wait(state.attempt + 1);
                    let next = state.advance(delay);
                    if self.policy.is_exceeded(next.waited) {
                        return Err(SyncError::RetryBudgetExhausted {
                            prefix_list_id: request.prefix_list_id,
                            attempts: state.attempt + 1,
                            waited_ms: state.waited.as_millis() as u64,
                            last: err,
                        });
                    }

                    let list = self.resolver.resolve(&request.prefix_list_id).await?;
                    obs::emit_version_conflict(
                        &request.prefix_list_id,
                        request.current_version,
                        list.version,
                        next.attempt,
                        delay,
                        &err,
                    );
                    request = request.rebased(&list);
                    tokio::time::sleep(delay).await;
                    state = next;
                }
                Err(source) => {
                    return Err(SyncError::MutationFailed {
                        prefix_list_id: request.prefix_list_id,
                        source,
                    });
                }
            }
        }
    }
}
