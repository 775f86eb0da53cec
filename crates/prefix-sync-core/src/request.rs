//! Builds version-fenced modify requests from events.

use crate::error::SyncError;
use crate::event::{extract, IntentKind, LifecycleEvent};
use crate::model::{MutationIntent, MutationRequest, PrefixListRef};
use crate::Result;

/// Combine an event with a freshly resolved list reference.
///
/// PENDING adds the task's `/32` with the task ARN as description; STOPPED
/// removes it. The request is fenced on `list.version`. A PENDING event
/// without a task ARN is [`SyncError::MalformedEvent`].
pub fn build(event: &LifecycleEvent, list: &PrefixListRef) -> Result<MutationRequest> {
    let (cidr, kind) = extract(event)?;
    let intent = match kind {
        IntentKind::Add => {
            let description = event.task_arn().ok_or_else(|| SyncError::MalformedEvent {
                event_id: event.id.clone(),
                reason: "PENDING task has no taskArn".into(),
            })?;
            MutationIntent::Add {
                cidr,
                description: description.to_string(),
            }
        }
        IntentKind::Remove => MutationIntent::Remove { cidr },
    };
    Ok(MutationRequest::new(list, intent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TASK_ARN: &str =
        "arn:aws:ecs:ca-central-1:1234567891234:task/project/25d855faf7284494a5eef1ae702b951f";

    fn event(status: &str, addr: &str) -> LifecycleEvent {
        serde_json::from_value(json!({
            "id": "evt-7",
            "detail": {
                "lastStatus": status,
                "taskArn": TASK_ARN,
                "attachments": [{
                    "type": "eni",
                    "details": [{"name": "privateIPv4Address", "value": addr}]
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn pending_builds_add_with_task_arn() {
        let req = build(&event("PENDING", "10.0.2.67"), &PrefixListRef::new("id", 1)).unwrap();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "PrefixListId": "id",
                "CurrentVersion": 1,
                "AddEntries": [{"Cidr": "10.0.2.67/32", "Description": TASK_ARN}]
            })
        );
    }

    #[test]
    fn stopped_builds_remove() {
        let req = build(&event("STOPPED", "10.0.2.4"), &PrefixListRef::new("id", 1)).unwrap();
        assert!(matches!(req.intent, MutationIntent::Remove { .. }));
        assert_eq!(req.intent.cidr().to_string(), "10.0.2.4/32");
    }

    #[test]
    fn version_comes_from_the_reference() {
        let req = build(&event("PENDING", "10.0.2.67"), &PrefixListRef::new("id", 42)).unwrap();
        assert_eq!(req.current_version, 42);
        assert_eq!(req.prefix_list_id, "id");
    }

    fn without_task_arn(status: &str) -> LifecycleEvent {
        serde_json::from_value(json!({
            "id": "evt-8",
            "detail": {
                "lastStatus": status,
                "attachments": [{
                    "type": "eni",
                    "details": [{"name": "privateIPv4Address", "value": "10.0.2.9"}]
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn pending_without_task_arn_is_malformed() {
        let err = build(&without_task_arn("PENDING"), &PrefixListRef::new("id", 1)).unwrap_err();
        assert!(
            matches!(err, SyncError::MalformedEvent { ref event_id, ref reason } if event_id == "evt-8" && reason.contains("taskArn"))
        );
    }

    #[test]
    fn stopped_without_task_arn_still_removes() {
        let req = build(&without_task_arn("STOPPED"), &PrefixListRef::new("id", 1)).unwrap();
        assert!(matches!(req.intent, MutationIntent::Remove { .. }));
        assert_eq!(req.intent.cidr().to_string(), "10.0.2.9/32");
    }

    #[test]
    fn other_status_is_unsupported() {
        let err = build(&event("RUNNING", "10.0.2.67"), &PrefixListRef::new("id", 1)).unwrap_err();
        assert!(matches!(err, SyncError::UnsupportedState { .. }));
    }
}
