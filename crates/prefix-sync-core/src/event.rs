//! Task lifecycle events and their interpretation.
//!
//! The inbound record follows the container task state-change shape:
//!
//! ```json
//! {"id": "...", "detail": {"lastStatus": "PENDING", "taskArn": "...",
//!   "attachments": [{"type": "eni", "details": [{"name": "privateIPv4Address", "value": "10.0.2.67"}]}]}}
//! ```
//!
//! Deserialization only insists on `id`, `detail` and `lastStatus`. Everything
//! else is optional so that irrelevant events still parse and are skipped.
//! [`validate`] decides whether the event is relevant at all, and [`extract`]
//! derives the host CIDR from it.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::Result;

/// Attachment type carrying the task's network interface.
pub const ENI_ATTACHMENT: &str = "eni";

/// Attachment detail holding the interface's private address.
pub const PRIVATE_IPV4_DETAIL: &str = "privateIPv4Address";

/// Task status as reported in `detail.lastStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Stopped,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Stopped => "STOPPED",
            TaskStatus::Other(s) => s,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => TaskStatus::Pending,
            "STOPPED" => TaskStatus::Stopped,
            _ => TaskStatus::Other(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{name, value}` pair on an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDetail {
    pub name: String,
    pub value: String,
}

/// A resource attached to the task (network interface, volume, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Vec<AttachmentDetail>,
}

impl Attachment {
    pub fn is_eni(&self) -> bool {
        self.kind == ENI_ATTACHMENT
    }

    /// First detail with the given name.
    pub fn detail(&self, name: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

/// The `detail` body of a task state-change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    pub last_status: TaskStatus,
    /// Only required when the task is added (it becomes the entry description)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_status: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// An inbound task lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: String,
    #[serde(
        rename = "detail-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detail_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Kept verbatim; never interpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub detail: TaskDetail,
}

impl LifecycleEvent {
    pub fn status(&self) -> &TaskStatus {
        &self.detail.last_status
    }

    pub fn task_arn(&self) -> Option<&str> {
        self.detail.task_arn.as_deref()
    }

    /// First network-interface attachment, if any.
    pub fn eni_attachment(&self) -> Option<&Attachment> {
        self.detail.attachments.iter().find(|a| a.is_eni())
    }

    /// The event as a JSON value, for logging.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Why an event was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The status is neither PENDING nor STOPPED
    IrrelevantStatus(TaskStatus),
    /// No network-interface attachment on the task
    MissingEni,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::IrrelevantStatus(status) => {
                write!(f, "task status {status} does not change the prefix list")
            }
            Rejection::MissingEni => write!(f, "task has no {ENI_ATTACHMENT} attachment"),
        }
    }
}

/// Reason the event should be ignored, or `None` if it is actionable.
pub fn rejection(event: &LifecycleEvent) -> Option<Rejection> {
    match event.status() {
        TaskStatus::Pending | TaskStatus::Stopped => {}
        other => return Some(Rejection::IrrelevantStatus(other.clone())),
    }
    if event.eni_attachment().is_none() {
        return Some(Rejection::MissingEni);
    }
    None
}

/// Whether the event calls for a prefix list mutation.
pub fn validate(event: &LifecycleEvent) -> bool {
    rejection(event).is_none()
}

/// A single-host CIDR (`a.b.c.d/32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr(Ipv4Addr);

impl Cidr {
    pub fn host(addr: Ipv4Addr) -> Self {
        Cidr(addr)
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.0
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/32", self.0)
    }
}

impl Serialize for Cidr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which way the list has to move for this event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Add,
    Remove,
}

impl IntentKind {
    pub fn for_status(status: &TaskStatus) -> Option<Self> {
        match status {
            TaskStatus::Pending => Some(IntentKind::Add),
            TaskStatus::Stopped => Some(IntentKind::Remove),
            TaskStatus::Other(_) => None,
        }
    }
}

/// Derive the host CIDR and intent from an event.
///
/// Does not call [`validate`]; callers screen the event first. Fails with
/// [`SyncError::MalformedEvent`] when the address is missing or not IPv4, and
/// with [`SyncError::UnsupportedState`] for statuses without an intent.
pub fn extract(event: &LifecycleEvent) -> Result<(Cidr, IntentKind)> {
    let malformed = |reason: String| SyncError::MalformedEvent {
        event_id: event.id.clone(),
        reason,
    };

    let eni = event
        .eni_attachment()
        .ok_or_else(|| malformed(format!("no {ENI_ATTACHMENT} attachment")))?;
    let raw = eni.detail(PRIVATE_IPV4_DETAIL).ok_or_else(|| {
        malformed(format!(
            "{ENI_ATTACHMENT} attachment has no {PRIVATE_IPV4_DETAIL} detail"
        ))
    })?;
    let addr: Ipv4Addr = raw
        .trim()
        .parse()
        .map_err(|_| malformed(format!("{PRIVATE_IPV4_DETAIL} {raw:?} is not an IPv4 address")))?;

    let kind =
        IntentKind::for_status(event.status()).ok_or_else(|| SyncError::UnsupportedState {
            event_id: event.id.clone(),
            status: event.status().to_string(),
        })?;

    Ok((Cidr::host(addr), kind))
}
