use std::path::{Path, PathBuf};

use crate::commands::common::{
    appointment_to_list_item, format_appointment_lines, open_runtime, AppointmentListItem,
};
use crate::error::CliError;

pub async fn run_list(
    as_json: bool,
    config_path: &Path,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let runtime = open_runtime(config_path, db_path).await?;
    runtime.check_connectivity().await;
    let appointments = runtime.appointments().list().await;

    if as_json {
        let json_items = appointments
            .iter()
            .map(appointment_to_list_item)
            .collect::<Vec<AppointmentListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if appointments.is_empty() {
        println!("No appointments.");
        return Ok(());
    }
    for line in format_appointment_lines(&appointments) {
        println!("{line}");
    }
    Ok(())
}
