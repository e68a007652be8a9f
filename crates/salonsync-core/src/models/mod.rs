//! Data models for salonsync

mod appointment;
mod conflict;
mod mutation;

pub use appointment::{
    Appointment, AppointmentDetails, AppointmentStatus, PaymentMethod, RecordId,
    PROVISIONAL_ID_PREFIX,
};
pub use conflict::{Conflict, Resolution};
pub use mutation::{MutationKind, PendingMutation};
