use std::path::{Path, PathBuf};

use salonsync_core::models::Resolution;

use crate::cli::KeepSide;
use crate::commands::common::{normalize_appointment_id, open_runtime};
use crate::error::CliError;

pub const fn resolution_from_arg(keep: KeepSide) -> Resolution {
    match keep {
        KeepSide::Local => Resolution::KeepLocal,
        KeepSide::Remote => Resolution::KeepRemote,
    }
}

pub async fn run_resolve(
    id: &str,
    keep: KeepSide,
    config_path: &Path,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let id = normalize_appointment_id(id)?;
    let runtime = open_runtime(config_path, db_path).await?;
    runtime.check_connectivity().await;

    let record = runtime
        .engine()
        .resolve_by_id(&id, resolution_from_arg(keep))
        .await?;
    if record.pending_sync {
        println!("{} (kept local version, queued for next sync)", record.id);
    } else {
        println!("{}", record.id);
    }
    Ok(())
}
