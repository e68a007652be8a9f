use std::path::{Path, PathBuf};

use crate::commands::common::{open_runtime, pending_to_item, PendingItem};
use crate::error::CliError;

pub async fn run_pending(
    as_json: bool,
    config_path: &Path,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let runtime = open_runtime(config_path, db_path).await?;
    let items = runtime
        .appointments()
        .pending()
        .await
        .iter()
        .map(pending_to_item)
        .collect::<Vec<PendingItem>>();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Nothing waiting to sync.");
        return Ok(());
    }
    for item in items {
        println!(
            "{:<6}  {:<40}  {:<20}  {}",
            item.kind, item.record_id, item.client_name, item.relative_time
        );
    }
    Ok(())
}
