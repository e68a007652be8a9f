use std::path::{Path, PathBuf};

use salonsync_core::AppointmentDetails;

use crate::cli::AddArgs;
use crate::commands::common::{
    minutes_to_millis, open_runtime, parse_price_cents, parse_start_time, payment_from_arg,
};
use crate::error::CliError;

pub fn details_from_args(args: &AddArgs) -> Result<AppointmentDetails, CliError> {
    let client_name = args.client.trim();
    if client_name.is_empty() {
        return Err(CliError::EmptyClientName);
    }
    let starts_at = parse_start_time(&args.at)?;

    Ok(AppointmentDetails {
        client_name: client_name.to_string(),
        service: args.service.trim().to_string(),
        starts_at,
        ends_at: starts_at + minutes_to_millis(args.minutes),
        price_cents: parse_price_cents(&args.price)?,
        payment_method: args.payment.map(payment_from_arg),
        notes: args.notes.clone(),
        ..AppointmentDetails::default()
    })
}

pub async fn run_add(
    args: &AddArgs,
    config_path: &Path,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let details = details_from_args(args)?;
    let runtime = open_runtime(config_path, db_path).await?;
    runtime.check_connectivity().await;

    let appointment = runtime.appointments().create(details).await?;
    if appointment.pending_sync {
        println!("{} (queued, will sync when online)", appointment.id);
    } else {
        println!("{}", appointment.id);
    }
    Ok(())
}
