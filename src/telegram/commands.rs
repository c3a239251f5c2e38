//! Command handlers: user-facing /start and /ping, admin authoring and
//! reporting commands

use chrono::DateTime;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::config;
use crate::core::config::schedule::{reference_offset, TIME_FORMAT};
use crate::core::error::AppResult;
use crate::core::export;
use crate::core::stats;
use crate::core::types::{User, WorkflowKind};
use crate::dispatch::compose_body;
use crate::telegram::admin::is_admin;
use crate::telegram::bot::Command;
use crate::telegram::schema::{HandlerDeps, HandlerResult};
use crate::telegram::{sender, workflow};

pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, deps: HandlerDeps) -> HandlerResult {
    let chat_id = msg.chat.id;

    match cmd {
        Command::Start(ref payload) => {
            handle_start(&bot, &msg, &deps, payload.trim()).await?;
            return Ok(());
        }
        Command::Ping => {
            bot.send_message(chat_id, "🏓 Понг! Бот на связи.").await?;
            return Ok(());
        }
        _ => {}
    }

    // Everything below is admin-only; for anyone else the command is a
    // silent no-op so its existence stays invisible
    if !is_admin(chat_id.0) {
        log::debug!("Ignoring admin command from non-admin {}", chat_id.0);
        return Ok(());
    }

    match cmd {
        // Handled above before the admin gate
        Command::Start(_) | Command::Ping => {}
        Command::Broadcast => workflow::start(&bot, &deps, chat_id, WorkflowKind::Broadcast).await?,
        Command::Scenario => workflow::start(&bot, &deps, chat_id, WorkflowKind::Scenario).await?,
        Command::Scheduled => handle_scheduled(&bot, &deps, chat_id).await?,
        Command::Contacts => handle_contacts(&bot, &deps, chat_id).await?,
        Command::Users => {
            let report = stats::build_report(&deps.stores).await;
            bot.send_message(chat_id, report).await?;
        }
        Command::Export => handle_export(&bot, &deps, chat_id).await?,
    }
    Ok(())
}

/// /start: registers the user, then either delivers the scenario named by
/// the deep-link payload or greets with the welcome text
async fn handle_start(bot: &Bot, msg: &Message, deps: &HandlerDeps, payload: &str) -> AppResult<()> {
    let chat_id = msg.chat.id;

    if let Some(from) = msg.from.as_ref() {
        let user = User {
            id: from.id.0 as i64,
            first_name: from.first_name.clone(),
            username: from.username.clone().unwrap_or_default(),
            phone: String::new(),
            last_active: String::new(),
        };
        deps.stores.users.register_or_touch(user).await?;
    }

    if payload.is_empty() {
        bot.send_message(chat_id, config::WELCOME_TEXT.as_str()).await?;
        return Ok(());
    }

    match deps.stores.scenarios.get(payload).await {
        Some(scenario) => {
            log::info!("Delivering scenario '{}' to user {}", payload, chat_id.0);
            let body = compose_body(&scenario);
            sender::send_payload(bot, chat_id, &body, scenario.attachment.as_ref()).await?;
        }
        None => {
            log::info!("User {} asked for unknown scenario code '{}'", chat_id.0, payload);
            bot.send_message(chat_id, "❌ Сценарий с таким кодом не найден.").await?;
        }
    }
    Ok(())
}

/// /scheduled: one message per pending ledger row, with edit/cancel buttons
async fn handle_scheduled(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    let pending = deps.stores.ledger.scheduled().await;
    if pending.is_empty() {
        bot.send_message(chat_id, "📭 Запланированных рассылок нет.").await?;
        return Ok(());
    }

    for entry in pending {
        let when = DateTime::parse_from_rfc3339(&entry.run_at)
            .map(|at| at.with_timezone(&reference_offset()).format(TIME_FORMAT).to_string())
            .unwrap_or_else(|_| entry.run_at.clone());

        let snippet = match deps.stores.broadcasts.get(&entry.broadcast_id).await {
            Some(record) => {
                let mut text: String = record.text.chars().take(60).collect();
                if record.text.chars().count() > 60 {
                    text.push('…');
                }
                text
            }
            None => "(рассылка удалена)".to_string(),
        };

        let keyboard = InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::callback("✏️ Изменить".to_string(), format!("sch:edit:{}", entry.job_id)),
            InlineKeyboardButton::callback("🗑 Отменить".to_string(), format!("sch:del:{}", entry.job_id)),
        ]]);

        bot.send_message(chat_id, format!("🕒 {when}\n\n{snippet}"))
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

/// /contacts: CSV of every reachable user, sent as a document
async fn handle_contacts(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    let users = deps.stores.users.all().await;
    if users.is_empty() {
        bot.send_message(chat_id, "📭 Пользователей пока нет.").await?;
        return Ok(());
    }
    export::send_csv_document(bot, chat_id, "contacts.csv", export::contacts_to_csv(&users)).await
}

/// /export: saved broadcasts and published scenarios as two CSV documents
async fn handle_export(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId) -> AppResult<()> {
    let broadcasts: Vec<_> = deps.stores.broadcasts.all().await.into_values().collect();
    let scenarios: Vec<_> = deps.stores.scenarios.all().await.into_iter().collect();

    if broadcasts.is_empty() && scenarios.is_empty() {
        bot.send_message(chat_id, "📭 Экспортировать пока нечего.").await?;
        return Ok(());
    }
    if !broadcasts.is_empty() {
        export::send_csv_document(bot, chat_id, "broadcasts.csv", export::broadcasts_to_csv(&broadcasts)).await?;
    }
    if !scenarios.is_empty() {
        export::send_csv_document(bot, chat_id, "scenarios.csv", export::scenarios_to_csv(&scenarios)).await?;
    }
    Ok(())
}
