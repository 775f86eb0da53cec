//! Invocation configuration.

use std::time::Duration;

use crate::engine::RetryPolicy;
use crate::error::SyncError;
use crate::Result;

/// Target prefix list and retry behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Managed prefix list to keep in step with task lifecycles
    pub prefix_list_id: String,
    /// Region the prefix list lives in
    pub region: String,
    /// Conflict retry ceiling
    pub retry: RetryPolicy,
}

impl SyncConfig {
    pub fn new(prefix_list_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            prefix_list_id: prefix_list_id.into(),
            region: region.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - PREFIX_LIST_ID (required)
    /// - REGION, then AWS_REGION (required)
    /// - PREFIX_LIST_MAX_RETRY_WAIT_MS (optional, default: 60000; "none" or "unbounded" retries forever)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// [`SyncConfig::from_env`] over an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let prefix_list_id = non_empty("PREFIX_LIST_ID")
            .ok_or_else(|| SyncError::Config("PREFIX_LIST_ID not set".into()))?;
        let region = non_empty("REGION")
            .or_else(|| non_empty("AWS_REGION"))
            .ok_or_else(|| SyncError::Config("REGION not set".into()))?;
        let retry = match non_empty("PREFIX_LIST_MAX_RETRY_WAIT_MS") {
            Some(raw) => parse_retry_policy(&raw)?,
            None => RetryPolicy::default(),
        };

        Ok(Self {
            prefix_list_id,
            region,
            retry,
        })
    }
}

fn parse_retry_policy(raw: &str) -> Result<RetryPolicy> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("unbounded") {
        return Ok(RetryPolicy::unbounded());
    }
    raw.parse::<u64>()
        .map(|ms| RetryPolicy::bounded(Duration::from_millis(ms)))
        .map_err(|_| {
            SyncError::Config(format!(
                "PREFIX_LIST_MAX_RETRY_WAIT_MS must be milliseconds or \"none\", got {raw:?}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_required_values_with_default_policy() {
        let cfg = SyncConfig::from_vars(vars(&[
            ("PREFIX_LIST_ID", "pl-0123"),
            ("REGION", "ca-central-1"),
        ]))
        .unwrap();
        assert_eq!(cfg.prefix_list_id, "pl-0123");
        assert_eq!(cfg.region, "ca-central-1");
        assert_eq!(cfg.retry, RetryPolicy::default());
    }

    #[test]
    fn region_falls_back_to_aws_region() {
        let cfg = SyncConfig::from_vars(vars(&[
            ("PREFIX_LIST_ID", "pl-0123"),
            ("AWS_REGION", "us-east-1"),
        ]))
        .unwrap();
        assert_eq!(cfg.region, "us-east-1");
    }

    #[test]
    fn missing_prefix_list_id_is_an_error() {
        let err = SyncConfig::from_vars(vars(&[("REGION", "ca-central-1")])).unwrap_err();
        assert!(err.to_string().contains("PREFIX_LIST_ID"));
    }

    #[test]
    fn missing_region_is_an_error() {
        let err = SyncConfig::from_vars(vars(&[("PREFIX_LIST_ID", "pl-1"), ("REGION", " ")]))
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn retry_ceiling_overrides() {
        let bounded = SyncConfig::from_vars(vars(&[
            ("PREFIX_LIST_ID", "pl-1"),
            ("REGION", "ca-central-1"),
            ("PREFIX_LIST_MAX_RETRY_WAIT_MS", "5000"),
        ]))
        .unwrap();
        assert_eq!(bounded.retry.max_total_wait_ms, Some(5000));

        let unbounded = SyncConfig::from_vars(vars(&[
            ("PREFIX_LIST_ID", "pl-1"),
            ("REGION", "ca-central-1"),
            ("PREFIX_LIST_MAX_RETRY_WAIT_MS", "none"),
        ]))
        .unwrap();
        assert_eq!(unbounded.retry, RetryPolicy::unbounded());

        assert!(SyncConfig::from_vars(vars(&[
            ("PREFIX_LIST_ID", "pl-1"),
            ("REGION", "ca-central-1"),
            ("PREFIX_LIST_MAX_RETRY_WAIT_MS", "soon"),
        ]))
        .is_err());
    }

    #[test]
    fn builder_setters() {
        let cfg = SyncConfig::new("pl-1", "eu-west-1")
            .with_region("ca-central-1")
            .with_retry_policy(RetryPolicy::unbounded());
        assert_eq!(cfg.region, "ca-central-1");
        assert_eq!(cfg.retry.max_total_wait_ms, None);
    }
}
