//! Per-event entry point.
//!
//! One call to [`PrefixListSync::handle`] per task state change: screen the
//! event, resolve the list, build the fenced request and hand it to the
//! engine. Irrelevant events are a successful no-op; every fatal error is
//! logged with the full event and returned so the caller can redeliver or
//! dead-letter it.

use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, Span};

use crate::api::PrefixListApi;
use crate::config::SyncConfig;
use crate::engine::{MutationEngine, MutationReport};
use crate::event::{rejection, LifecycleEvent};
use crate::metrics::METRICS;
use crate::model::MutationRequest;
use crate::obs;
use crate::request;
use crate::resolver::PrefixListResolver;
use crate::Result;

/// What an invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Event did not call for a mutation
    Skipped { reason: String },
    /// Mutation accepted by the service
    Applied(MutationReport),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

/// Keeps one prefix list in step with task lifecycle events.
pub struct PrefixListSync<A: PrefixListApi + ?Sized> {
    config: SyncConfig,
    resolver: PrefixListResolver<A>,
    engine: MutationEngine<A>,
}

impl<A: PrefixListApi + ?Sized> PrefixListSync<A> {
    pub fn new(api: Arc<A>, config: SyncConfig) -> Self {
        let resolver = PrefixListResolver::new(Arc::clone(&api), config.region.clone());
        let engine = MutationEngine::new(api, resolver.clone(), config.retry);
        Self {
            config,
            resolver,
            engine,
        }
    }

    /// Process one event.
    pub async fn handle(&self, event: &LifecycleEvent) -> Result<Outcome> {
        METRICS.inc_events_received();
        let span = obs::invocation_span(&event.id, event.task_arn());

        let result = self.process(event).instrument(span.clone()).await;
        report_failure(&span, event, &result);
        METRICS.flush();
        result
    }

    /// Resolve and build the request `handle` would send, without sending it.
    ///
    /// Returns `None` for events that would be skipped. Failures are logged
    /// the same way as in [`PrefixListSync::handle`].
    pub async fn plan(&self, event: &LifecycleEvent) -> Result<Option<MutationRequest>> {
        if rejection(event).is_some() {
            return Ok(None);
        }
        let span = obs::invocation_span(&event.id, event.task_arn());
        let result = self.build_request(event).instrument(span.clone()).await;
        report_failure(&span, event, &result);
        result.map(Some)
    }

    async fn process(&self, event: &LifecycleEvent) -> Result<Outcome> {
        if let Some(reason) = rejection(event) {
            METRICS.inc_events_skipped();
            obs::emit_event_skipped(&event.id, &reason);
            return Ok(Outcome::Skipped {
                reason: reason.to_string(),
            });
        }

        let request = self.build_request(event).await?;
        let report = self.engine.apply(request).await?;
        Ok(Outcome::Applied(report))
    }

    async fn build_request(&self, event: &LifecycleEvent) -> Result<MutationRequest> {
        let list = self.resolver.resolve(&self.config.prefix_list_id).await?;
        request::build(event, &list)
    }
}

fn report_failure<T>(span: &Span, event: &LifecycleEvent, result: &Result<T>) {
    if let Err(err) = result {
        METRICS.inc_fatal_errors();
        span.in_scope(|| obs::emit_invocation_failed(event, err));
    }
}
