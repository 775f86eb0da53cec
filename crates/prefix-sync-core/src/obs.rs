//! Structured logging hooks for the invocation lifecycle.
//!
//! Events are emitted at `info!` (skips, applied mutations), `warn!`
//! (version conflicts) and `error!` (fatal failures). Set `LOG_FORMAT=json`
//! for JSON lines.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::engine::MutationReport;
use crate::error::ApiError;
use crate::event::{LifecycleEvent, Rejection};

/// Invocation-scoped span tagged with the event id and task ARN (if any).
///
/// # Example
///
/// ```ignore
/// handle(event).instrument(invocation_span("evt-123", Some("arn:aws:ecs:...:task/abc"))).await
/// ```
pub fn invocation_span(event_id: &str, task_arn: Option<&str>) -> tracing::Span {
    tracing::info_span!(
        "prefix_sync.invocation",
        event_id = %event_id,
        task_arn = task_arn.unwrap_or("-"),
    )
}

/// Event ignored as irrelevant.
pub fn emit_event_skipped(event_id: &str, reason: &Rejection) {
    info!(event = "sync.skipped", event_id = %event_id, reason = %reason);
}

/// Modify rejected on version; about to retry.
pub fn emit_version_conflict(
    prefix_list_id: &str,
    stale_version: u64,
    current_version: u64,
    attempt: u32,
    delay: Duration,
    error: &ApiError,
) {
    warn!(
        event = "sync.version_conflict",
        prefix_list_id = %prefix_list_id,
        stale_version = stale_version,
        current_version = current_version,
        attempt = attempt,
        delay_ms = delay.as_millis() as u64,
        error = %error,
    );
}

/// Mutation accepted by the service.
pub fn emit_mutation_applied(report: &MutationReport) {
    info!(
        event = "sync.applied",
        prefix_list_id = %report.prefix_list_id,
        action = %report.action,
        cidr = %report.cidr,
        attempts = report.attempts,
        version = report.version,
        new_version = ?report.new_version,
        state = report.state.as_deref().unwrap_or("unknown"),
    );
}

/// Fatal failure, logged with the full inbound event for replay.
pub fn emit_invocation_failed(event: &LifecycleEvent, error: &dyn std::fmt::Display) {
    error!(
        event = "sync.failed",
        event_id = %event.id,
        error = %error,
        payload = %event.to_json(),
    );
}

/// Fatal failure before the input could be read as an event; logs it raw.
pub fn emit_unparseable_event(raw: &str, error: &dyn std::fmt::Display) {
    error!(
        event = "sync.failed",
        error = %error,
        payload = %raw,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_span_create() {
        let span = invocation_span("evt-1", Some("arn:task"));
        let _entered = span.enter();
    }

    #[test]
    fn test_invocation_span_without_task_arn() {
        let span = invocation_span("evt-1", None);
        let _entered = span.enter();
    }
}
