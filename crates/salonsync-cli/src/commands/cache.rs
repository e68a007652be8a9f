use std::path::{Path, PathBuf};

use crate::cli::CacheCommands;
use crate::commands::common::open_runtime;
use crate::error::CliError;

pub async fn run_cache(
    command: &CacheCommands,
    config_path: &Path,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let runtime = open_runtime(config_path, db_path).await?;
    let cache = runtime.engine().cache();

    match command {
        CacheCommands::Clear => {
            cache.clear_all().await;
            println!("Cache cleared");
        }
        CacheCommands::Cleanup => {
            let evicted = cache.cleanup().await;
            println!("Evicted {evicted} expired entries");
        }
    }
    Ok(())
}
