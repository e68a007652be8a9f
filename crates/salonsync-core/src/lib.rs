//! salonsync-core - Offline cache and synchronization layer for salonsync
//!
//! This crate contains the appointment models, the tiered cache, the durable
//! record store with its pending-mutation queue, and the sync engine that
//! reconciles the queue with the salon backend.

pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod storage;
pub mod store;
pub mod sync;
pub mod util;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use models::{Appointment, AppointmentDetails, RecordId};
