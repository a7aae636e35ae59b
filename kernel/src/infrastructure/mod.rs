/// Configuration management for the kernel.
pub mod config;
/// Logging setup.
pub mod telemetry;
