use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use salonsync_core::config::ClientConfig;
use salonsync_core::models::{Appointment, AppointmentStatus, PaymentMethod, PendingMutation};
use salonsync_core::services::ClientRuntime;
use salonsync_core::util::unix_millis_now;
use salonsync_core::RecordId;
use serde::Serialize;

use crate::cli::{Payment, Status};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct AppointmentListItem {
    pub id: String,
    pub client_name: String,
    pub service: String,
    pub starts_at: i64,
    pub starts_at_iso: String,
    pub ends_at: i64,
    pub price_cents: i64,
    pub status: AppointmentStatus,
    pub pending_sync: bool,
}

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub record_id: String,
    pub kind: String,
    pub client_name: String,
    pub enqueued_at: i64,
    pub relative_time: String,
}

pub fn resolve_config_path(cli_config: Option<PathBuf>) -> PathBuf {
    cli_config
        .or_else(|| env::var_os("SALONSYNC_CONFIG").map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(env::temp_dir)
        .join("salonsync")
        .join("config.json")
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("salonsync")
        .join("salonsync.db")
}

/// Flag, then config (including `SALONSYNC_DB_PATH`), then the per-user default.
pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &ClientConfig) -> PathBuf {
    cli_db_path
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(default_db_path)
}

/// Read the config file and apply environment overrides.
pub fn load_config(config_path: &Path) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::load_from_path(config_path)?;
    config.apply_env()?;
    Ok(config)
}

/// Load, override and validate the config; returns it with the database path to open.
pub fn prepare_runtime(
    config_path: &Path,
    cli_db_path: Option<PathBuf>,
) -> Result<(ClientConfig, PathBuf), CliError> {
    let config = load_config(config_path)?;
    let db_path = resolve_db_path(cli_db_path, &config);
    config.validate().map_err(|error| {
        CliError::Config(format!(
            "{error}. Run `salonsync config init` or set SALONSYNC_* variables (config file: {})",
            config_path.display()
        ))
    })?;
    Ok((config, db_path))
}

pub async fn open_runtime(
    config_path: &Path,
    cli_db_path: Option<PathBuf>,
) -> Result<ClientRuntime, CliError> {
    let (config, db_path) = prepare_runtime(config_path, cli_db_path)?;
    tracing::debug!(
        "Opening salon {} from {} (config {})",
        config.salon_id,
        db_path.display(),
        config_path.display()
    );
    Ok(ClientRuntime::open(config, &db_path).await?)
}

pub fn normalize_appointment_id(id: &str) -> Result<RecordId, CliError> {
    id.parse::<RecordId>()
        .map_err(|_| CliError::EmptyAppointmentId)
}

/// Parse a start time given as RFC 3339 or `YYYY-MM-DD HH:MM` in local time.
pub fn parse_start_time(raw: &str) -> Result<i64, CliError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.timestamp_millis());
    }

    let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M")
        .map_err(|_| CliError::InvalidStartTime(raw.to_string()))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.timestamp_millis())
        .ok_or_else(|| CliError::InvalidStartTime(raw.to_string()))
}

/// Parse an amount such as `25`, `25.5` or `25.50` into cents.
pub fn parse_price_cents(raw: &str) -> Result<i64, CliError> {
    let invalid = || CliError::InvalidPrice(raw.to_string());
    let trimmed = raw.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    if whole.is_empty()
        || fraction.len() > 2
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole: i64 = whole.parse().map_err(|_| invalid())?;
    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => fraction.parse().map_err(|_| invalid())?,
    };
    whole
        .checked_mul(100)
        .and_then(|value| value.checked_add(cents))
        .ok_or_else(invalid)
}

pub fn minutes_to_millis(minutes: u32) -> i64 {
    i64::from(minutes) * 60_000
}

pub const fn status_from_arg(status: Status) -> AppointmentStatus {
    match status {
        Status::Scheduled => AppointmentStatus::Scheduled,
        Status::Confirmed => AppointmentStatus::Confirmed,
        Status::Completed => AppointmentStatus::Completed,
        Status::Cancelled => AppointmentStatus::Cancelled,
        Status::NoShow => AppointmentStatus::NoShow,
    }
}

pub const fn payment_from_arg(payment: Payment) -> PaymentMethod {
    match payment {
        Payment::Cash => PaymentMethod::Cash,
        Payment::Card => PaymentMethod::Card,
        Payment::Transfer => PaymentMethod::Transfer,
        Payment::Other => PaymentMethod::Other,
    }
}

pub fn format_price(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}

pub fn format_appointment_lines(appointments: &[Appointment]) -> Vec<String> {
    appointments
        .iter()
        .map(|appointment| {
            let marker = if appointment.pending_sync { "*" } else { " " };
            let details = &appointment.details;
            format!(
                "{marker} {:<38}  {}  {:<20}  {:<16}  {:>8}  {:?}",
                appointment.id.as_str(),
                format_timestamp(details.starts_at),
                details.client_name,
                details.service,
                format_price(details.price_cents),
                details.status
            )
        })
        .collect()
}

pub fn appointment_to_list_item(appointment: &Appointment) -> AppointmentListItem {
    let details = &appointment.details;
    AppointmentListItem {
        id: appointment.id.to_string(),
        client_name: details.client_name.clone(),
        service: details.service.clone(),
        starts_at: details.starts_at,
        starts_at_iso: format_timestamp(details.starts_at),
        ends_at: details.ends_at,
        price_cents: details.price_cents,
        status: details.status,
        pending_sync: appointment.pending_sync,
    }
}

pub fn pending_to_item(mutation: &PendingMutation) -> PendingItem {
    PendingItem {
        record_id: mutation.record_id.to_string(),
        kind: format!("{:?}", mutation.kind).to_lowercase(),
        client_name: mutation.payload.details.client_name.clone(),
        enqueued_at: mutation.enqueued_at,
        relative_time: format_relative_time(mutation.enqueued_at, unix_millis_now()),
    }
}
