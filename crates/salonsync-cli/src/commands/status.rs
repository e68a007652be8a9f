use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::commands::common::{format_timestamp, open_runtime};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusItem {
    pub salon_id: String,
    pub api_base_url: String,
    pub online: bool,
    pub pending: usize,
    pub unsaved_changes: bool,
    pub last_sync_at: Option<i64>,
}

pub async fn run_status(
    as_json: bool,
    config_path: &Path,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let runtime = open_runtime(config_path, db_path).await?;
    let online = runtime.check_connectivity().await;
    let store = runtime.engine().store();

    let status = StatusItem {
        salon_id: runtime.config().salon_id.clone(),
        api_base_url: runtime.config().api_base_url.clone(),
        online,
        pending: store.list_pending().await.len(),
        unsaved_changes: store.is_dirty().await,
        last_sync_at: runtime.state().last_sync_at(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Salon:    {}", status.salon_id);
    println!(
        "Backend:  {} ({})",
        status.api_base_url,
        if status.online { "online" } else { "offline" }
    );
    println!("Pending:  {}", status.pending);
    if let Some(last_sync_at) = status.last_sync_at {
        println!("Synced:   {}", format_timestamp(last_sync_at));
    }
    if status.unsaved_changes {
        println!("Warning: some local changes could not be written to disk");
    }
    Ok(())
}
