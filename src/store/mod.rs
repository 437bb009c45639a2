//! Durable scan output.

pub mod log;

pub use log::ResultLog;
