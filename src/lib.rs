//! Glashatay - Telegram bot for admin-authored broadcasts and scenarios
//!
//! Admins compose multi-media broadcast messages through a step-by-step,
//! resumable workflow, then send them immediately or schedule them; scheduled
//! sends survive process restarts. Separately, admins author "scenario"
//! content bundles that end users retrieve via a short /start deep-link code.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, domain types, stats, exports
//! - `storage`: JSON-per-collection durable stores
//! - `dispatch`: recipient fan-out with per-recipient failure isolation
//! - `scheduler`: durable one-shot broadcast scheduling
//! - `telegram`: bot wiring, command/callback/workflow handlers

pub mod core;
pub mod dispatch;
pub mod scheduler;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use dispatch::ContentSender;
pub use scheduler::BroadcastScheduler;
pub use storage::Stores;
