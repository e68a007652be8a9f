use std::path::{Path, PathBuf};
use std::sync::Arc;

use salonsync_core::services::ClientRuntime;
use salonsync_core::sync::SyncEvent;
use tokio::sync::mpsc;

use crate::commands::common::prepare_runtime;
use crate::commands::sync::format_sync_report_lines;
use crate::error::CliError;

pub fn format_event(event: &SyncEvent) -> Vec<String> {
    match event {
        SyncEvent::Conflict(conflict) => vec![format!(
            "conflict {}: local \"{}\" vs remote \"{}\" (run `salonsync resolve {} --keep local|remote`)",
            conflict.record_id(),
            conflict.local.details.client_name,
            conflict.remote.details.client_name,
            conflict.record_id()
        )],
        SyncEvent::Rejected { record_id, reason } => {
            vec![format!("rejected {record_id}: {reason}")]
        }
        SyncEvent::Synced(report) => {
            let mut lines = format_sync_report_lines(report);
            lines.retain(|line| !line.starts_with("conflict"));
            lines
        }
    }
}

pub async fn run_watch(config_path: &Path, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let (config, db_path) = prepare_runtime(config_path, db_path)?;
    let (sender, mut events) = mpsc::unbounded_channel::<SyncEvent>();
    let runtime = ClientRuntime::open_with_observer(config, &db_path, Arc::new(sender)).await?;

    let tasks = runtime.start();
    println!(
        "Watching salon {} (Ctrl-C to stop)",
        runtime.config().salon_id
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                for line in format_event(&event) {
                    println!("{line}");
                }
            }
        }
    }

    tracing::info!("Stopping watch for salon {}", runtime.config().salon_id);
    runtime.shutdown(tasks).await?;
    Ok(())
}
