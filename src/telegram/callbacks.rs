//! Inline keyboard actions: preview menus, post-save menu, schedule list
//!
//! Callback data is prefix-routed: `bc:<action>:<id>` for broadcasts,
//! `sc:<action>:<id>` for scenarios, `sch:<action>:<job_id>` for ledger rows.

use teloxide::prelude::*;

use crate::core::error::{AppError, AppResult};
use crate::core::types::{Draft, Session, WorkflowKind, WorkflowStep};
use crate::dispatch::run_broadcast;
use crate::telegram::admin::is_admin;
use crate::telegram::preview::{saved_broadcast_keyboard, send_preview};
use crate::telegram::schema::{HandlerDeps, HandlerResult};
use crate::telegram::workflow;

pub async fn handle_callback(bot: Bot, q: CallbackQuery, deps: HandlerDeps) -> HandlerResult {
    // Always acknowledge, even for data we end up ignoring
    bot.answer_callback_query(q.id.clone()).await?;

    let admin_id = q.from.id.0 as i64;
    if !is_admin(admin_id) {
        return Ok(());
    }
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        return Ok(());
    };
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let mut parts = data.splitn(3, ':');
    let (Some(ns), Some(action), Some(id)) = (parts.next(), parts.next(), parts.next()) else {
        log::warn!("Ignoring malformed callback data '{}'", data);
        return Ok(());
    };

    match ns {
        "bc" => handle_broadcast_action(&bot, &deps, chat_id, action, id).await?,
        "sc" => handle_scenario_action(&bot, &deps, chat_id, action, id).await?,
        "sch" => handle_schedule_action(&bot, &deps, chat_id, action, id).await?,
        _ => log::warn!("Ignoring callback with unknown namespace '{}'", ns),
    }
    Ok(())
}

async fn handle_broadcast_action(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    action: &str,
    id: &str,
) -> AppResult<()> {
    match action {
        "save" => match deps.stores.promote_broadcast(id).await {
            Ok(_) => {
                log::info!("Admin {} saved broadcast {}", chat_id.0, id);
                bot.send_message(chat_id, "✅ Сохранено. Выберите действие:")
                    .reply_markup(saved_broadcast_keyboard(id))
                    .await?;
            }
            Err(AppError::NotFound(_)) => {
                bot.send_message(chat_id, workflow::DRAFT_GONE).await?;
            }
            Err(e) => return Err(e),
        },
        "now" => match run_broadcast(&deps.stores, deps.scheduler.sender(), id).await {
            Ok(delivered) => {
                bot.send_message(chat_id, format!("✅ Отправлено {delivered} пользователям.")).await?;
            }
            Err(AppError::NotFound(_)) => {
                bot.send_message(chat_id, "❌ Рассылка не найдена.").await?;
            }
            Err(e) => return Err(e),
        },
        "schedule" => {
            if deps.stores.broadcasts.get(id).await.is_none() {
                bot.send_message(chat_id, "❌ Рассылка не найдена.").await?;
                return Ok(());
            }
            deps.stores
                .sessions
                .set(
                    chat_id.0,
                    Session {
                        kind: WorkflowKind::Broadcast,
                        target_id: id.to_string(),
                        step: WorkflowStep::AwaitingRunAt,
                    },
                )
                .await?;
            bot.send_message(
                chat_id,
                format!(
                    "🕒 Введите время отправки в формате {} (время московское):",
                    crate::core::config::schedule::TIME_FORMAT_HINT
                ),
            )
            .await?;
        }
        "edit_text" | "edit_file" | "edit_link" => {
            start_edit(bot, deps, chat_id, WorkflowKind::Broadcast, action, id).await?;
        }
        "delete" => {
            if deps.stores.broadcast_drafts.remove(id).await?.is_some() {
                bot.send_message(chat_id, "🗑 Черновик удалён.").await?;
                return Ok(());
            }
            if deps.stores.broadcasts.remove(id).await?.is_some() {
                // Orphaned timers must not fire after the record is gone
                for job_id in deps.stores.ledger.scheduled_jobs_for_broadcast(id).await {
                    if let Err(e) = deps.scheduler.cancel(&job_id).await {
                        log::warn!("Failed to cancel job {} for deleted broadcast {}: {}", job_id, id, e);
                    }
                }
                bot.send_message(chat_id, "🗑 Рассылка удалена.").await?;
                return Ok(());
            }
            bot.send_message(chat_id, workflow::DRAFT_GONE).await?;
        }
        _ => log::warn!("Ignoring unknown broadcast action '{}'", action),
    }
    Ok(())
}

async fn handle_scenario_action(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    action: &str,
    id: &str,
) -> AppResult<()> {
    match action {
        "save" => {
            if deps.stores.scenario_drafts.get(id).await.is_none() {
                bot.send_message(chat_id, workflow::DRAFT_GONE).await?;
                return Ok(());
            }
            deps.stores
                .sessions
                .set(
                    chat_id.0,
                    Session {
                        kind: WorkflowKind::Scenario,
                        target_id: id.to_string(),
                        step: WorkflowStep::AwaitingCode,
                    },
                )
                .await?;
            bot.send_message(chat_id, workflow::CODE_PROMPT).await?;
        }
        "edit_text" | "edit_file" | "edit_link" => {
            start_edit(bot, deps, chat_id, WorkflowKind::Scenario, action, id).await?;
        }
        "delete" => {
            if deps.stores.scenario_drafts.remove(id).await?.is_some() {
                bot.send_message(chat_id, "🗑 Черновик удалён.").await?;
            } else {
                bot.send_message(chat_id, workflow::DRAFT_GONE).await?;
            }
        }
        _ => log::warn!("Ignoring unknown scenario action '{}'", action),
    }
    Ok(())
}

/// Re-opens a field of a draft for editing. A saved broadcast is first pulled
/// back into draft mode: its pending timers are parked as `editing` and the
/// record leaves the saved table until the admin saves again.
async fn start_edit(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    kind: WorkflowKind,
    action: &str,
    id: &str,
) -> AppResult<()> {
    let drafts = match kind {
        WorkflowKind::Broadcast => &deps.stores.broadcast_drafts,
        WorkflowKind::Scenario => &deps.stores.scenario_drafts,
    };

    if drafts.get(id).await.is_none() {
        let demoted = kind == WorkflowKind::Broadcast && demote_for_editing(deps, id).await?;
        if !demoted {
            bot.send_message(chat_id, workflow::DRAFT_GONE).await?;
            return Ok(());
        }
    }

    let (step, prompt) = match action {
        "edit_text" => (WorkflowStep::EditingText, workflow::text_prompt(kind)),
        "edit_file" => (WorkflowStep::EditingAttachment, workflow::ATTACHMENT_PROMPT),
        _ => (WorkflowStep::EditingLink, workflow::LINK_PROMPT),
    };

    deps.stores
        .sessions
        .set(
            chat_id.0,
            Session {
                kind,
                target_id: id.to_string(),
                step,
            },
        )
        .await?;
    bot.send_message(chat_id, prompt).await?;
    Ok(())
}

/// Fetches the broadcast draft for editing, pulling a still-saved record
/// back into draft mode first. A stale button pressed after an earlier
/// demotion still finds the existing draft.
async fn resolve_editable_draft(deps: &HandlerDeps, broadcast_id: &str) -> AppResult<Option<Draft>> {
    demote_for_editing(deps, broadcast_id).await?;
    Ok(deps.stores.broadcast_drafts.get(broadcast_id).await)
}

/// Moves a saved broadcast back to the draft table, parking its pending
/// timers first. Returns `false` when no saved record exists either.
async fn demote_for_editing(deps: &HandlerDeps, broadcast_id: &str) -> AppResult<bool> {
    if deps.stores.broadcasts.get(broadcast_id).await.is_none() {
        return Ok(false);
    }
    for job_id in deps.stores.ledger.scheduled_jobs_for_broadcast(broadcast_id).await {
        deps.scheduler.mark_editing(&job_id).await?;
    }
    deps.stores.demote_broadcast(broadcast_id).await?;
    Ok(true)
}

async fn handle_schedule_action(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    action: &str,
    job_id: &str,
) -> AppResult<()> {
    match action {
        "edit" => {
            let Some(entry) = deps.stores.ledger.find_by_job(job_id).await else {
                bot.send_message(chat_id, "❌ Запись не найдена.").await?;
                return Ok(());
            };
            match resolve_editable_draft(deps, &entry.broadcast_id).await? {
                Some(draft) => send_preview(bot, chat_id, WorkflowKind::Broadcast, &draft).await?,
                None => {
                    bot.send_message(chat_id, "❌ Рассылка не найдена.").await?;
                }
            }
        }
        "del" => match deps.scheduler.cancel(job_id).await {
            Ok(()) => {
                bot.send_message(chat_id, "🗑 Запланированная отправка отменена.").await?;
            }
            Err(AppError::NotFound(_)) => {
                bot.send_message(chat_id, "❌ Запись не найдена.").await?;
            }
            Err(e) => return Err(e),
        },
        _ => log::warn!("Ignoring unknown schedule action '{}'", action),
    }
    Ok(())
}
