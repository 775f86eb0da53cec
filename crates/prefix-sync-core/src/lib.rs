//! prefix-sync-core: task lifecycle events -> managed prefix list entries
//!
//! Every task state change arrives as one [`LifecycleEvent`]. A PENDING task
//! gets its private address added to the shared prefix list as a `/32`; a
//! STOPPED task gets it removed. The list is versioned and shared by every
//! concurrent invocation, so each change is fenced on the version read just
//! before it and retried on conflict.
//!
//! ## Key Components
//!
//! - [`event`]: event shape, relevance screening and CIDR extraction
//! - [`PrefixListResolver`]: current `{id, version}` of the target list
//! - [`request::build`]: version-fenced [`MutationRequest`]
//! - [`MutationEngine`]: conflict-retry loop with [`backoff`]
//! - [`PrefixListSync`]: per-event entry point
//! - [`PrefixListApi`]: the remote service seam; [`fakes`] has an in-memory one

pub mod api;
pub mod backoff;
pub mod config;
pub mod engine;
mod error;
pub mod event;
pub mod fakes;
pub mod handler;
pub mod metrics;
pub mod model;
pub mod obs;
pub mod request;
pub mod resolver;
pub mod telemetry;

pub use api::{ApiResult, PrefixListApi};
pub use config::SyncConfig;
pub use engine::{MutationEngine, MutationReport, RetryPolicy, RetryState};
pub use error::{ApiError, SyncError, VERSION_CONFLICT_CODES};
pub use event::{
    extract, validate, Attachment, AttachmentDetail, Cidr, IntentKind, LifecycleEvent, Rejection,
    TaskDetail, TaskStatus,
};
pub use handler::{Outcome, PrefixListSync};
pub use model::{
    ModifyOutput, MutationIntent, MutationRequest, PrefixListRef, PrefixListSummary,
};
pub use resolver::PrefixListResolver;

/// Result type for prefix-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
