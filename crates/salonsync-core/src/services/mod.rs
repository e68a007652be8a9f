//! Client-facing services built on the cache, store and sync engine.

mod appointments;
mod runtime;

pub use appointments::AppointmentService;
pub use runtime::{ClientRuntime, Engine, RuntimeTasks};
