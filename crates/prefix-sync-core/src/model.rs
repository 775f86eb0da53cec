//! Prefix list references, mutation intents and requests.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::event::Cidr;

/// Identity and version of a prefix list at the moment it was described.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefixListRef {
    pub id: String,
    pub version: u64,
}

impl PrefixListRef {
    pub fn new(id: impl Into<String>, version: u64) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

/// One list as returned by `Describe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixListSummary {
    pub id: String,
    pub version: u64,
    pub name: Option<String>,
    pub state: Option<String>,
}

impl From<&PrefixListSummary> for PrefixListRef {
    fn from(summary: &PrefixListSummary) -> Self {
        PrefixListRef::new(summary.id.clone(), summary.version)
    }
}

/// The entry change a single invocation wants applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationIntent {
    Add { cidr: Cidr, description: String },
    Remove { cidr: Cidr },
}

impl MutationIntent {
    pub fn cidr(&self) -> Cidr {
        match self {
            MutationIntent::Add { cidr, .. } | MutationIntent::Remove { cidr } => *cidr,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            MutationIntent::Add { .. } => "add",
            MutationIntent::Remove { .. } => "remove",
        }
    }
}

/// A version-fenced modify request.
///
/// Serializes to the service's wire shape:
/// `{"PrefixListId", "CurrentVersion", "AddEntries": [{"Cidr", "Description"}]}`
/// or `{"PrefixListId", "CurrentVersion", "RemoveEntries": [{"Cidr"}]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRequest {
    pub prefix_list_id: String,
    pub current_version: u64,
    pub intent: MutationIntent,
}

impl MutationRequest {
    pub fn new(list: &PrefixListRef, intent: MutationIntent) -> Self {
        Self {
            prefix_list_id: list.id.clone(),
            current_version: list.version,
            intent,
        }
    }

    /// Same intent, fenced on a freshly described list.
    pub fn rebased(&self, list: &PrefixListRef) -> Self {
        Self::new(list, self.intent.clone())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AddEntry<'a> {
    cidr: Cidr,
    description: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RemoveEntry {
    cidr: Cidr,
}

impl Serialize for MutationRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("PrefixListId", &self.prefix_list_id)?;
        map.serialize_entry("CurrentVersion", &self.current_version)?;
        match &self.intent {
            MutationIntent::Add { cidr, description } => map.serialize_entry(
                "AddEntries",
                &[AddEntry {
                    cidr: *cidr,
                    description,
                }],
            )?,
            MutationIntent::Remove { cidr } => {
                map.serialize_entry("RemoveEntries", &[RemoveEntry { cidr: *cidr }])?
            }
        }
        map.end()
    }
}

/// What `Modify` reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyOutput {
    /// List state after the call (e.g. `modify-in-progress`)
    pub state: Option<String>,
    /// Version the service reported, if any
    pub version: Option<u64>,
    /// Transport-level retries the client performed for this call
    pub retry_count: u32,
}
