//! prefix-sync-ec2: EC2 managed prefix list backend
//!
//! Implements [`PrefixListApi`] with `DescribeManagedPrefixLists` and
//! `ModifyManagedPrefixList`. The SDK client is built with retries disabled:
//! a modify the SDK silently re-sent could have been applied twice, and the
//! mutation engine already owns the conflict retry loop.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::{AddPrefixListEntry, ManagedPrefixList, RemovePrefixListEntry};
use aws_sdk_ec2::Client;
use tracing::{debug, instrument};

use prefix_sync_core::{
    ApiError, ApiResult, ModifyOutput, MutationIntent, MutationRequest, PrefixListApi,
    PrefixListSummary,
};

/// Code EC2 returns when describing a prefix list id that does not exist.
pub const PREFIX_LIST_NOT_FOUND: &str = "InvalidPrefixListID.NotFound";

/// EC2-backed prefix list service.
#[derive(Debug, Clone)]
pub struct Ec2PrefixListApi {
    client: Client,
}

impl Ec2PrefixListApi {
    /// Wrap an existing client (its retry configuration is used as is).
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client for `region` from the default credential chain, with
    /// SDK retries disabled.
    pub async fn from_region(region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .retry_config(RetryConfig::disabled())
            .load()
            .await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl PrefixListApi for Ec2PrefixListApi {
    #[instrument(skip(self))]
    async fn describe(&self, prefix_list_id: &str) -> ApiResult<Vec<PrefixListSummary>> {
        let output = match self
            .client
            .describe_managed_prefix_lists()
            .prefix_list_ids(prefix_list_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if is_not_found(err.code()) => {
                debug!("prefix list not found");
                return Ok(Vec::new());
            }
            Err(err) => return Err(api_error(err)),
        };

        output
            .prefix_lists()
            .iter()
            .map(|list| summary(list, prefix_list_id))
            .collect()
    }

    #[instrument(skip(self, request), fields(prefix_list_id = %request.prefix_list_id, version = request.current_version))]
    async fn modify(&self, request: &MutationRequest) -> ApiResult<ModifyOutput> {
        let current_version = i64::try_from(request.current_version).map_err(|_| {
            ApiError::InvalidResponse(format!(
                "version {} does not fit the EC2 API",
                request.current_version
            ))
        })?;
        let (add, remove) = entries(&request.intent);

        let output = self
            .client
            .modify_managed_prefix_list()
            .prefix_list_id(&request.prefix_list_id)
            .current_version(current_version)
            .set_add_entries(add)
            .set_remove_entries(remove)
            .send()
            .await
            .map_err(api_error)?;

        let list = output.prefix_list();
        Ok(ModifyOutput {
            state: list.and_then(|l| l.state()).map(|s| s.as_str().to_string()),
            version: list
                .and_then(|l| l.version())
                .and_then(|v| u64::try_from(v).ok()),
            retry_count: 0,
        })
    }
}

/// Split an intent into the SDK's add/remove entry lists.
pub fn entries(
    intent: &MutationIntent,
) -> (Option<Vec<AddPrefixListEntry>>, Option<Vec<RemovePrefixListEntry>>) {
    match intent {
        MutationIntent::Add { cidr, description } => (
            Some(vec![AddPrefixListEntry::builder()
                .cidr(cidr.to_string())
                .description(description)
                .build()]),
            None,
        ),
        MutationIntent::Remove { cidr } => (
            None,
            Some(vec![RemovePrefixListEntry::builder()
                .cidr(cidr.to_string())
                .build()]),
        ),
    }
}

/// Convert a described list; `requested_id` stands in for a missing id.
pub fn summary(list: &ManagedPrefixList, requested_id: &str) -> ApiResult<PrefixListSummary> {
    let id = list.prefix_list_id().unwrap_or(requested_id).to_string();
    let version = list
        .version()
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| ApiError::InvalidResponse(format!("prefix list {id} has no valid version")))?;

    Ok(PrefixListSummary {
        id,
        version,
        name: list.prefix_list_name().map(str::to_string),
        state: list.state().map(|s| s.as_str().to_string()),
    })
}

/// Whether a describe error means the list does not exist.
pub fn is_not_found(code: Option<&str>) -> bool {
    code == Some(PREFIX_LIST_NOT_FOUND)
}

/// Map an error code/message pair onto [`ApiError`].
///
/// Errors without a service code never reached the service (or were not
/// understood) and become [`ApiError::Transport`] with `context` as detail.
pub fn classify(code: Option<&str>, message: Option<&str>, context: String) -> ApiError {
    match code {
        Some(code) => ApiError::service(code, message.unwrap_or_default()),
        None => ApiError::Transport(context),
    }
}

fn api_error<E, R>(err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    classify(
        err.code(),
        err.message(),
        DisplayErrorContext(&err).to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::PrefixListState;
    use prefix_sync_core::{Cidr, PrefixListRef};
    use std::net::Ipv4Addr;

    fn cidr() -> Cidr {
        Cidr::host(Ipv4Addr::new(10, 0, 2, 67))
    }

    #[test]
    fn add_intent_maps_to_add_entries() {
        let (add, remove) = entries(&MutationIntent::Add {
            cidr: cidr(),
            description: "arn:task".into(),
        });
        let add = add.unwrap();
        assert!(remove.is_none());
        assert_eq!(add.len(), 1);
        assert_eq!(add[0].cidr(), Some("10.0.2.67/32"));
        assert_eq!(add[0].description(), Some("arn:task"));
    }

    #[test]
    fn remove_intent_maps_to_remove_entries() {
        let (add, remove) = entries(&MutationIntent::Remove { cidr: cidr() });
        assert!(add.is_none());
        assert_eq!(remove.unwrap()[0].cidr(), Some("10.0.2.67/32"));
    }

    #[test]
    fn summary_reads_id_version_and_state() {
        let list = ManagedPrefixList::builder()
            .prefix_list_id("pl-0abc")
            .prefix_list_name("tasks")
            .version(7)
            .state(PrefixListState::ModifyComplete)
            .build();

        let summary = summary(&list, "pl-0abc").unwrap();
        assert_eq!(PrefixListRef::from(&summary), PrefixListRef::new("pl-0abc", 7));
        assert_eq!(summary.state.as_deref(), Some("modify-complete"));
        assert_eq!(summary.name.as_deref(), Some("tasks"));
    }

    #[test]
    fn summary_without_version_is_invalid() {
        let list = ManagedPrefixList::builder().prefix_list_id("pl-0abc").build();
        assert!(matches!(
            summary(&list, "pl-0abc"),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn classify_keeps_service_codes() {
        let err = classify(
            Some("IncorrectState"),
            Some("The prefix list is being modified"),
            "ignored".into(),
        );
        assert!(err.is_version_conflict());
        assert_eq!(err.to_string(), "IncorrectState: The prefix list is being modified");
    }

    #[test]
    fn only_the_not_found_code_means_missing_list() {
        assert!(is_not_found(Some("InvalidPrefixListID.NotFound")));
        assert!(!is_not_found(Some("InvalidPrefixListId.Malformed")));
        assert!(!is_not_found(Some("UnauthorizedOperation")));
        assert!(!is_not_found(None));
    }

    #[test]
    fn classify_without_code_is_transport() {
        let err = classify(None, None, "dispatch failure: connection refused".into());
        assert!(matches!(err, ApiError::Transport(ref m) if m.contains("connection refused")));
    }
}
