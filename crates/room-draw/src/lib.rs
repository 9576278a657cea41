pub mod config;
pub mod draw;
pub mod error;
pub mod telemetry;
