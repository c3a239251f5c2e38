//! Dispatcher schema and handler chain builders

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::scheduler::BroadcastScheduler;
use crate::storage::Stores;
use crate::telegram::admin::is_admin;
use crate::telegram::bot::Command;
use crate::telegram::{callbacks, commands, workflow};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for handlers
pub type HandlerResult = Result<(), HandlerError>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub stores: Arc<Stores>,
    pub scheduler: Arc<BroadcastScheduler>,
    /// Username of the bot account, used to build deep links
    pub bot_username: Option<String>,
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same handler tree is used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_session = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Command handler
        .branch(command_handler(deps_commands))
        // Admin workflow sessions (text and media replies to prompts)
        .branch(session_handler(deps_session))
        // Callback query handler (inline keyboard buttons)
        .branch(callback_handler(deps_callback))
}

/// Handler for bot commands (/start, /broadcast, /scheduled, etc.)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                commands::handle_command(bot, msg, cmd, deps).await
            }
        },
    ))
}

/// Handler for non-command messages from admins with an open workflow
/// session. Messages without a session fall through and are ignored.
fn session_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| is_admin(msg.chat.id.0))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(session) = deps.stores.sessions.get(msg.chat.id.0).await else {
                    return Ok(());
                };
                workflow::handle_step(&bot, &deps, &msg, session).await?;
                Ok(())
            }
        })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { callbacks::handle_callback(bot, q, deps).await }
    })
}
