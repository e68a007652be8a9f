use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] salonsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Appointment ID cannot be empty")]
    EmptyAppointmentId,
    #[error("Client name cannot be empty")]
    EmptyClientName,
    #[error("Invalid start time '{0}': use RFC 3339 or YYYY-MM-DD HH:MM")]
    InvalidStartTime(String),
    #[error("Invalid price '{0}': use a non-negative amount with at most two decimals")]
    InvalidPrice(String),
    #[error("Nothing to change: pass at least one field to edit")]
    NothingToEdit,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Config file already exists at {0} (use --force to overwrite)")]
    ConfigExists(String),
}
