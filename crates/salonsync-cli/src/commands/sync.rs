use std::path::{Path, PathBuf};

use salonsync_core::sync::{SyncMode, SyncOutcome, SyncReport};

use crate::commands::common::open_runtime;
use crate::error::CliError;

pub fn format_sync_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();
    for rewrite in &report.created {
        lines.push(format!("created  {} -> {}", rewrite.provisional, rewrite.server));
    }
    for id in &report.updated {
        lines.push(format!("updated  {id}"));
    }
    for conflict in &report.conflicts {
        let resolved = report.resolved.contains(conflict.record_id());
        lines.push(format!(
            "conflict {} local={} remote={}{}",
            conflict.record_id(),
            conflict.local.updated_at,
            conflict.remote.updated_at,
            if resolved {
                ""
            } else {
                "  (run `salonsync resolve <id> --keep local|remote`)"
            }
        ));
    }
    for failure in &report.failures {
        let kind = if failure.transient { "retry" } else { "rejected" };
        lines.push(format!("{kind:<8} {}: {}", failure.record_id, failure.reason));
    }
    if report.aborted {
        lines.push("Connection lost, sync stopped early".to_string());
    } else if !report.refreshed {
        lines.push("Could not refresh appointments from the server".to_string());
    }
    lines
}

pub async fn run_sync(
    force: bool,
    as_json: bool,
    config_path: &Path,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let runtime = open_runtime(config_path, db_path).await?;
    let mode = if force { SyncMode::Forced } else { SyncMode::Normal };
    tracing::debug!("Manual sync requested ({mode:?})");
    let outcome = runtime.sync_now(mode).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        SyncOutcome::Offline => println!("Offline, changes stay queued"),
        SyncOutcome::Skipped => println!("Sync already in progress"),
        SyncOutcome::Completed(report) => {
            for line in format_sync_report_lines(&report) {
                println!("{line}");
            }
            println!("Sync completed: {} change(s) pushed", report.pushed());
        }
    }
    Ok(())
}
