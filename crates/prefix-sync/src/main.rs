//! prefix-sync - apply one task lifecycle event to a managed prefix list
//!
//! Reads a task state-change event (file or stdin), adds the task's private
//! address to the prefix list named by `PREFIX_LIST_ID` on PENDING and removes
//! it on STOPPED. Exits non-zero on any fatal error so the delivering system
//! can retry or dead-letter the event.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use prefix_sync_core::obs;
use prefix_sync_core::telemetry::{init_tracing, LogFormat};
use prefix_sync_core::{LifecycleEvent, PrefixListSync, SyncConfig};
use prefix_sync_ec2::Ec2PrefixListApi;

#[derive(Parser, Debug)]
#[command(name = "prefix-sync")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Keep a managed prefix list in step with task lifecycles", long_about = None)]
struct Cli {
    /// Event JSON file ("-" or omitted reads stdin)
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// Print the request that would be sent without modifying the list
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines (same as LOG_FORMAT=json)
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    };
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(format, level);

    let event = read_event(cli.event.as_deref())?;
    let config = SyncConfig::from_env()?;
    info!(
        prefix_list_id = %config.prefix_list_id,
        region = %config.region,
        max_retry_wait_ms = ?config.retry.max_total_wait_ms,
        "prefix-sync starting"
    );

    let api = Arc::new(Ec2PrefixListApi::from_region(config.region.clone()).await);
    let sync = PrefixListSync::new(api, config);

    if cli.dry_run {
        match sync.plan(&event).await? {
            Some(request) => println!("{}", serde_json::to_string_pretty(&request)?),
            None => info!(event_id = %event.id, "event would be skipped"),
        }
        return Ok(());
    }

    let outcome = sync.handle(&event).await?;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

fn read_event(path: Option<&Path>) -> Result<LifecycleEvent> {
    let raw = match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("failed to read event from {}", p.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read event from stdin")?;
            buf
        }
    };
    parse_event(&raw)
}

/// Parse the inbound record; on failure the raw input is logged for replay.
fn parse_event(raw: &str) -> Result<LifecycleEvent> {
    serde_json::from_str(raw)
        .inspect_err(|err| obs::emit_unparseable_event(raw, err))
        .context("event is not a task state-change record")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_test::traced_test;

    const PENDING: &str = r#"{
        "id": "evt-1",
        "detail": {
            "lastStatus": "PENDING",
            "taskArn": "arn:aws:ecs:ca-central-1:1:task/c/1",
            "attachments": [{"type": "eni", "details": [{"name": "privateIPv4Address", "value": "10.0.2.67"}]}]
        }
    }"#;

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from(["prefix-sync", "--event", "e.json", "--dry-run", "--json"])
            .unwrap();
        assert_eq!(cli.event, Some(PathBuf::from("e.json")));
        assert!(cli.dry_run);
        assert!(cli.json);
        assert!(!cli.verbose);
    }

    #[test]
    fn reads_event_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PENDING.as_bytes()).unwrap();

        let event = read_event(Some(file.path())).unwrap();
        assert_eq!(event.id, "evt-1");
        assert_eq!(event.task_arn(), Some("arn:aws:ecs:ca-central-1:1:task/c/1"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_event(Some(Path::new("/nonexistent/event.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/event.json"));
    }

    #[test]
    fn rejects_records_without_detail() {
        assert!(parse_event(r#"{"id": "evt-1"}"#).is_err());
    }

    #[test]
    fn irrelevant_event_with_loose_fields_parses() {
        let event = parse_event(
            r#"{"id": "evt-2", "time": "2021-05-04 19:23:30", "detail": {"lastStatus": "RUNNING"}}"#,
        )
        .unwrap();
        assert_eq!(event.task_arn(), None);
    }

    #[traced_test]
    #[test]
    fn unparseable_event_is_logged_with_payload() {
        assert!(parse_event(r#"{"id": "evt-garbled", "detail": 7}"#).is_err());
        assert!(logs_contain("sync.failed"));
        assert!(logs_contain("evt-garbled"));
    }
}
