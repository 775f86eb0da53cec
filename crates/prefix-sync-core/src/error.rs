//! Error types for prefix-sync-core

use thiserror::Error;

/// Error codes the remote service uses when the list moved underneath a request.
pub const VERSION_CONFLICT_CODES: [&str; 2] = ["IncorrectState", "PrefixListVersionMismatch"];

/// Errors reported by a [`PrefixListApi`](crate::api::PrefixListApi) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The service answered with an error code
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    /// The request never produced a service answer (network, auth, decoding)
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with something the backend could not interpret
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Service error code, if the service produced one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code),
            ApiError::Transport(_) | ApiError::InvalidResponse(_) => None,
        }
    }

    /// Whether the list was modified (or is mid-modification) since the
    /// request's version was read.
    pub fn is_version_conflict(&self) -> bool {
        self.code()
            .map(|code| VERSION_CONFLICT_CODES.contains(&code))
            .unwrap_or(false)
    }
}

/// Errors that end an invocation.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The event passed the status gate but lacks the data needed to act on it
    #[error("malformed event {event_id}: {reason}")]
    MalformedEvent { event_id: String, reason: String },

    /// The task status has no mapping to a list mutation
    #[error("event {event_id}: task state {status} is not recognized")]
    UnsupportedState { event_id: String, status: String },

    /// The configured prefix list does not exist
    #[error("prefix list {prefix_list_id} not found in region {region}")]
    ResourceNotFound {
        prefix_list_id: String,
        region: String,
    },

    /// Describing the prefix list failed
    #[error("failed to describe prefix list {prefix_list_id}: {source}")]
    Describe {
        prefix_list_id: String,
        #[source]
        source: ApiError,
    },

    /// Modify failed with a non-conflict error
    #[error("failed to modify prefix list {prefix_list_id}: {source}")]
    MutationFailed {
        prefix_list_id: String,
        #[source]
        source: ApiError,
    },

    /// Version conflicts kept coming past the configured retry ceiling
    #[error(
        "failed to modify prefix list {prefix_list_id}: still conflicting after {attempts} attempt(s) and {waited_ms}ms of backoff ({last})"
    )]
    RetryBudgetExhausted {
        prefix_list_id: String,
        attempts: u32,
        waited_ms: u64,
        last: ApiError,
    },

    /// The client retried the modify at transport level, so its outcome is ambiguous
    #[error("failed to modify prefix list {prefix_list_id}: client reported {retries} transport retry(ies)")]
    TransportRetried { prefix_list_id: String, retries: u32 },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// True for every way a modify call can fail terminally.
    pub fn is_mutation_failure(&self) -> bool {
        matches!(
            self,
            SyncError::MutationFailed { .. }
                | SyncError::RetryBudgetExhausted { .. }
                | SyncError::TransportRetried { .. }
        )
    }
}
