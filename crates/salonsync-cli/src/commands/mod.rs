pub mod add;
pub mod cache;
pub mod common;
pub mod completions;
pub mod config;
pub mod edit;
pub mod list;
pub mod pending;
pub mod resolve;
pub mod status;
pub mod sync;
pub mod watch;
