//! Resolves the current `{id, version}` of the target list.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::api::PrefixListApi;
use crate::error::SyncError;
use crate::model::PrefixListRef;
use crate::Result;

/// Looks up the authoritative version of a prefix list. Never caches.
pub struct PrefixListResolver<A: PrefixListApi + ?Sized> {
    api: Arc<A>,
    region: String,
}

impl<A: PrefixListApi + ?Sized> Clone for PrefixListResolver<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            region: self.region.clone(),
        }
    }
}

impl<A: PrefixListApi + ?Sized> PrefixListResolver<A> {
    /// `region` is only used to make not-found errors actionable.
    pub fn new(api: Arc<A>, region: impl Into<String>) -> Self {
        Self {
            api,
            region: region.into(),
        }
    }

    /// Describe the list and return its current reference.
    ///
    /// An empty answer is fatal: the list is presumed deleted or misconfigured.
    #[instrument(skip(self), fields(region = %self.region))]
    pub async fn resolve(&self, prefix_list_id: &str) -> Result<PrefixListRef> {
        let lists = self
            .api
            .describe(prefix_list_id)
            .await
            .map_err(|source| SyncError::Describe {
                prefix_list_id: prefix_list_id.to_string(),
                source,
            })?;

        let list = lists.first().ok_or_else(|| SyncError::ResourceNotFound {
            prefix_list_id: prefix_list_id.to_string(),
            region: self.region.clone(),
        })?;

        let list_ref = PrefixListRef::from(list);
        debug!(version = list_ref.version, state = ?list.state, "resolved prefix list");
        Ok(list_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryPrefixListApi;

    #[tokio::test]
    async fn resolves_id_and_version() {
        let api = Arc::new(MemoryPrefixListApi::with_list("id", 1));
        let resolver = PrefixListResolver::new(api.clone(), "ca-central-1");

        let list = resolver.resolve("id").await.unwrap();
        assert_eq!(list, PrefixListRef::new("id", 1));
        assert_eq!(api.describe_calls(), 1);
    }

    #[tokio::test]
    async fn missing_list_is_not_found() {
        let api = Arc::new(MemoryPrefixListApi::new());
        let resolver = PrefixListResolver::new(api, "ca-central-1");

        let err = resolver.resolve("pl-missing").await.unwrap_err();
        match err {
            SyncError::ResourceNotFound {
                prefix_list_id,
                region,
            } => {
                assert_eq!(prefix_list_id, "pl-missing");
                assert_eq!(region, "ca-central-1");
            }
            other => panic!("expected ResourceNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn every_resolve_hits_the_service() {
        let api = Arc::new(MemoryPrefixListApi::with_list("id", 1));
        let resolver = PrefixListResolver::new(api.clone(), "ca-central-1");

        resolver.resolve("id").await.unwrap();
        api.set_version("id", 5);
        let list = resolver.resolve("id").await.unwrap();

        assert_eq!(list.version, 5);
        assert_eq!(api.describe_calls(), 2);
    }
}
