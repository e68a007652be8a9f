//! Database layer for salonsync

mod connection;
mod kv;
mod migrations;

pub use connection::Database;
pub use kv::LibSqlStorage;
