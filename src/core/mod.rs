//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod stats;
pub mod types;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
