//! Remote prefix list service abstraction.
//!
//! The engine only needs two calls:
//! - `describe`: look up a list by id (zero or one result)
//! - `modify`: apply a version-fenced entry change
//!
//! Backends are injected as `Arc<dyn PrefixListApi>` or a concrete type. An
//! in-memory implementation lives in [`crate::fakes`].

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{ModifyOutput, MutationRequest, PrefixListSummary};

/// Result type for remote service calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// A managed prefix list service.
///
/// Guarantees expected from implementations:
/// - `describe(id)` returns an empty vec when the list does not exist.
/// - `modify` rejects a stale `current_version` with a version-conflict code
///   (see [`ApiError::is_version_conflict`]).
#[async_trait]
pub trait PrefixListApi: Send + Sync {
    /// Describe lists matching the id.
    async fn describe(&self, prefix_list_id: &str) -> ApiResult<Vec<PrefixListSummary>>;

    /// Apply one entry change fenced on `request.current_version`.
    async fn modify(&self, request: &MutationRequest) -> ApiResult<ModifyOutput>;
}

