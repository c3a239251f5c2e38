//! Telegram bot integration and handlers

pub mod admin;
pub mod bot;
pub mod callbacks;
pub mod commands;
pub mod preview;
pub mod schema;
pub mod sender;
pub mod workflow;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use schema::{schema, HandlerDeps, HandlerError, HandlerResult};
pub use sender::TelegramSender;
