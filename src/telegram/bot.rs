//! Bot initialization and command registration

use reqwest::ClientBuilder;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// Request timeout for HTTP requests to the Bot API
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    /// Deep-link payload: the scenario code, empty on a plain /start
    #[command(description = "начать (с кодом сценария — получить его материалы)")]
    Start(String),
    #[command(description = "проверка, что бот работает")]
    Ping,
    #[command(description = "создать рассылку (только для администраторов)")]
    Broadcast,
    #[command(description = "создать сценарий (только для администраторов)")]
    Scenario,
    #[command(description = "запланированные рассылки (только для администраторов)")]
    Scheduled,
    #[command(description = "выгрузка контактов (только для администраторов)")]
    Contacts,
    #[command(description = "статистика пользователей (только для администраторов)")]
    Users,
    #[command(description = "экспорт рассылок и сценариев (только для администраторов)")]
    Export,
}

/// Creates a Bot instance with custom or default API URL
pub fn create_bot() -> anyhow::Result<Bot> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;

    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        Bot::from_env_with_client(client).set_api_url(url)
    } else {
        Bot::from_env_with_client(client)
    };

    Ok(bot)
}

/// Sets up the command list shown in the Telegram UI.
///
/// Admin-only commands are registered too; for everyone else they are
/// silent no-ops.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "начать"),
        BotCommand::new("ping", "проверка, что бот работает"),
        BotCommand::new("broadcast", "создать рассылку (админ)"),
        BotCommand::new("scenario", "создать сценарий (админ)"),
        BotCommand::new("scheduled", "запланированные рассылки (админ)"),
        BotCommand::new("contacts", "выгрузка контактов (админ)"),
        BotCommand::new("users", "статистика пользователей (админ)"),
        BotCommand::new("export", "экспорт рассылок и сценариев (админ)"),
    ])
    .await?;

    Ok(())
}
