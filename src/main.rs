use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;

use glashatay::core::{config, init_logger, log_startup_configuration, stats};
use glashatay::scheduler::BroadcastScheduler;
use glashatay::storage::Stores;
use glashatay::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramSender};

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, storage, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    // Catch panics from handler tasks so one bad update does not take the
    // process down silently
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    log_startup_configuration();

    let stores = Arc::new(Stores::open(config::DATA_DIR.as_str())?);

    let bot = create_bot()?;

    let me = bot.get_me().await?;
    let bot_username = me.user.username.clone();
    log::info!(
        "Bot started: @{}",
        bot_username.as_deref().unwrap_or("<unknown username>")
    );

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let sender = Arc::new(TelegramSender::new(bot.clone()));
    let scheduler = BroadcastScheduler::new(Arc::clone(&stores), sender);

    // Re-arm timers for every send still marked as scheduled
    let restored = scheduler.restore_on_startup().await;
    log::info!("Startup restore complete: {} timer(s) armed", restored);

    stats::start_stats_reporter(bot.clone(), Arc::clone(&stores), *config::stats::REPORT_INTERVAL_HOURS);

    let deps = HandlerDeps {
        stores,
        scheduler,
        bot_username,
    };

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
