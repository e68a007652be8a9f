use std::path::{Path, PathBuf};

use salonsync_core::AppointmentDetails;

use crate::cli::EditArgs;
use crate::commands::common::{
    minutes_to_millis, normalize_appointment_id, open_runtime, parse_price_cents,
    parse_start_time, payment_from_arg, status_from_arg,
};
use crate::error::CliError;

/// Apply the fields given in `args` on top of `current`.
pub fn apply_edits(
    current: &AppointmentDetails,
    args: &EditArgs,
) -> Result<AppointmentDetails, CliError> {
    let mut details = current.clone();

    if let Some(client) = &args.client {
        let client = client.trim();
        if client.is_empty() {
            return Err(CliError::EmptyClientName);
        }
        details.client_name = client.to_string();
    }
    if let Some(service) = &args.service {
        details.service = service.trim().to_string();
    }
    if let Some(at) = &args.at {
        let duration = current.ends_at - current.starts_at;
        details.starts_at = parse_start_time(at)?;
        details.ends_at = details.starts_at + duration;
    }
    if let Some(minutes) = args.minutes {
        details.ends_at = details.starts_at + minutes_to_millis(minutes);
    }
    if let Some(price) = &args.price {
        details.price_cents = parse_price_cents(price)?;
    }
    if let Some(status) = args.status {
        details.status = status_from_arg(status);
    }
    if let Some(payment) = args.payment {
        details.payment_method = Some(payment_from_arg(payment));
    }
    if let Some(notes) = &args.notes {
        details.notes = Some(notes.clone()).filter(|notes| !notes.trim().is_empty());
    }

    Ok(details)
}

pub async fn run_edit(
    args: &EditArgs,
    config_path: &Path,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let id = normalize_appointment_id(&args.id)?;
    let runtime = open_runtime(config_path, db_path).await?;
    let current = runtime.appointments().get(&id).await?;

    let details = apply_edits(&current.details, args)?;
    if details == current.details {
        return Err(CliError::NothingToEdit);
    }

    runtime.check_connectivity().await;
    let updated = runtime.appointments().update(&id, details).await?;
    if updated.pending_sync {
        println!("{} (queued, will sync when online)", updated.id);
    } else {
        println!("{}", updated.id);
    }
    Ok(())
}
