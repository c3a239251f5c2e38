//! Step-by-step authoring workflows for broadcasts and scenarios
//!
//! Every admin has at most one durable session; each inbound message is
//! matched against the persisted step. Unusable input re-prompts the same
//! step without advancing, so a stray sticker never derails the flow.

use teloxide::prelude::*;
use uuid::Uuid;

use crate::core::config::schedule::{reference_offset, TIME_FORMAT, TIME_FORMAT_HINT};
use crate::core::error::{AppError, AppResult};
use crate::core::types::{Attachment, MediaKind, Session, WorkflowKind, WorkflowStep};
use crate::scheduler::parse_run_at;
use crate::storage::DraftStore;
use crate::telegram::preview;
use crate::telegram::schema::HandlerDeps;

/// Replies that clear an optional field instead of filling it
const NEGATIONS: [&str; 4] = ["нет", "не", "no", "none"];

/// "No attachment" / "no link" sentinel, matched case-insensitively
pub fn is_negation(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    NEGATIONS.iter().any(|n| *n == lowered)
}

/// Pulls a resendable media reference out of an inbound message
pub fn extract_attachment(msg: &Message) -> Option<Attachment> {
    if let Some(doc) = msg.document() {
        return Some(Attachment {
            kind: MediaKind::Document,
            file_id: doc.file.id.0.clone(),
        });
    }
    if let Some(audio) = msg.audio() {
        return Some(Attachment {
            kind: MediaKind::Audio,
            file_id: audio.file.id.0.clone(),
        });
    }
    if let Some(video) = msg.video() {
        return Some(Attachment {
            kind: MediaKind::Video,
            file_id: video.file.id.0.clone(),
        });
    }
    if let Some(sizes) = msg.photo() {
        // Telegram sends several resolutions; keep the largest
        let best = sizes.iter().max_by_key(|p| p.width * p.height)?;
        return Some(Attachment {
            kind: MediaKind::Photo,
            file_id: best.file.id.0.clone(),
        });
    }
    if let Some(animation) = msg.animation() {
        return Some(Attachment {
            kind: MediaKind::Animation,
            file_id: animation.file.id.0.clone(),
        });
    }
    if let Some(note) = msg.video_note() {
        return Some(Attachment {
            kind: MediaKind::VideoNote,
            file_id: note.file.id.0.clone(),
        });
    }
    None
}

fn draft_store<'a>(deps: &'a HandlerDeps, kind: WorkflowKind) -> &'a DraftStore {
    match kind {
        WorkflowKind::Broadcast => &deps.stores.broadcast_drafts,
        WorkflowKind::Scenario => &deps.stores.scenario_drafts,
    }
}

pub(crate) fn text_prompt(kind: WorkflowKind) -> &'static str {
    match kind {
        WorkflowKind::Broadcast => "📝 Введите текст рассылки:",
        WorkflowKind::Scenario => "📝 Введите текст сценария:",
    }
}

pub(crate) const ATTACHMENT_PROMPT: &str = "📎 Пришлите файл (или напишите «нет»):";
pub(crate) const LINK_PROMPT: &str = "🔗 Пришлите ссылку (или напишите «нет»):";
pub(crate) const CODE_PROMPT: &str = "🔑 Введите код сценария (латиницей, без пробелов):";
pub(crate) const DRAFT_GONE: &str = "❌ Черновик не найден.";

/// Starts a fresh authoring workflow: creates an empty draft and asks for
/// its text. Any previous session of this admin is replaced.
pub async fn start(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId, kind: WorkflowKind) -> AppResult<()> {
    let draft_id = Uuid::new_v4().to_string();
    draft_store(deps, kind).create(&draft_id).await?;

    deps.stores
        .sessions
        .set(
            chat_id.0,
            Session {
                kind,
                target_id: draft_id.clone(),
                step: WorkflowStep::CollectingText,
            },
        )
        .await?;

    log::info!("Admin {} started {:?} draft {}", chat_id.0, kind, draft_id);
    bot.send_message(chat_id, text_prompt(kind)).await?;
    Ok(())
}

/// Routes one inbound admin message through the session's current step
pub async fn handle_step(bot: &Bot, deps: &HandlerDeps, msg: &Message, session: Session) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let kind = session.kind;
    let drafts = draft_store(deps, kind);
    let id = session.target_id.clone();

    match session.step {
        WorkflowStep::CollectingText => {
            let Some(text) = msg.text() else {
                bot.send_message(chat_id, text_prompt(kind)).await?;
                return Ok(());
            };
            if !merge_or_bail(bot, deps, drafts, chat_id, &id, text.to_string(), |d, t| d.text = t).await? {
                return Ok(());
            }
            advance(deps, chat_id, session, WorkflowStep::CollectingAttachment).await?;
            bot.send_message(chat_id, ATTACHMENT_PROMPT).await?;
        }
        WorkflowStep::CollectingAttachment => {
            match collect_attachment(msg) {
                AttachmentInput::Skip => {}
                AttachmentInput::Media(attachment) => {
                    if !merge_or_bail(bot, deps, drafts, chat_id, &id, Some(attachment), |d, a| d.attachment = a)
                        .await?
                    {
                        return Ok(());
                    }
                }
                AttachmentInput::Unusable => {
                    bot.send_message(chat_id, ATTACHMENT_PROMPT).await?;
                    return Ok(());
                }
            }
            advance(deps, chat_id, session, WorkflowStep::CollectingLink).await?;
            bot.send_message(chat_id, LINK_PROMPT).await?;
        }
        WorkflowStep::CollectingLink => {
            let Some(text) = msg.text() else {
                bot.send_message(chat_id, LINK_PROMPT).await?;
                return Ok(());
            };
            let link = if is_negation(text) { String::new() } else { text.trim().to_string() };
            if !merge_or_bail(bot, deps, drafts, chat_id, &id, link, |d, l| d.link = l).await? {
                return Ok(());
            }
            finish_with_preview(bot, deps, chat_id, kind, &id).await?;
        }
        WorkflowStep::EditingText => {
            let Some(text) = msg.text() else {
                bot.send_message(chat_id, text_prompt(kind)).await?;
                return Ok(());
            };
            if !merge_or_bail(bot, deps, drafts, chat_id, &id, text.to_string(), |d, t| d.text = t).await? {
                return Ok(());
            }
            finish_with_preview(bot, deps, chat_id, kind, &id).await?;
        }
        WorkflowStep::EditingAttachment => {
            let value = match collect_attachment(msg) {
                AttachmentInput::Skip => None,
                AttachmentInput::Media(attachment) => Some(attachment),
                AttachmentInput::Unusable => {
                    bot.send_message(chat_id, ATTACHMENT_PROMPT).await?;
                    return Ok(());
                }
            };
            if !merge_or_bail(bot, deps, drafts, chat_id, &id, value, |d, a| d.attachment = a).await? {
                return Ok(());
            }
            finish_with_preview(bot, deps, chat_id, kind, &id).await?;
        }
        WorkflowStep::EditingLink => {
            let Some(text) = msg.text() else {
                bot.send_message(chat_id, LINK_PROMPT).await?;
                return Ok(());
            };
            let link = if is_negation(text) { String::new() } else { text.trim().to_string() };
            if !merge_or_bail(bot, deps, drafts, chat_id, &id, link, |d, l| d.link = l).await? {
                return Ok(());
            }
            finish_with_preview(bot, deps, chat_id, kind, &id).await?;
        }
        WorkflowStep::AwaitingCode => {
            let code = match msg.text().map(str::trim) {
                Some(code) if !code.is_empty() && !code.contains(char::is_whitespace) => code.to_string(),
                _ => {
                    bot.send_message(chat_id, CODE_PROMPT).await?;
                    return Ok(());
                }
            };
            match deps.stores.publish_scenario(&id, &code).await {
                Ok(_) => {
                    deps.stores.sessions.clear(chat_id.0).await?;
                    let reply = match deps.bot_username.as_deref() {
                        Some(username) => format!(
                            "✅ Сценарий сохранён под кодом «{code}».\n\nСсылка для пользователей:\nhttps://t.me/{username}?start={code}"
                        ),
                        None => format!("✅ Сценарий сохранён под кодом «{code}»."),
                    };
                    log::info!("Admin {} published scenario code '{}'", chat_id.0, code);
                    bot.send_message(chat_id, reply).await?;
                }
                Err(AppError::NotFound(_)) => {
                    deps.stores.sessions.clear(chat_id.0).await?;
                    bot.send_message(chat_id, DRAFT_GONE).await?;
                }
                Err(e) => return Err(e),
            }
        }
        WorkflowStep::AwaitingRunAt => {
            let Some(text) = msg.text() else {
                bot.send_message(chat_id, format!("🕒 Введите время в формате {TIME_FORMAT_HINT}:")).await?;
                return Ok(());
            };
            let run_at = match parse_run_at(text) {
                Ok(at) => at,
                Err(AppError::Validation(_)) => {
                    // Session stays put so the admin can just retype
                    bot.send_message(
                        chat_id,
                        format!("❌ Не понял время. Нужен формат {TIME_FORMAT_HINT}, и время должно быть в будущем."),
                    )
                    .await?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            if deps.stores.broadcasts.get(&id).await.is_none() {
                deps.stores.sessions.clear(chat_id.0).await?;
                bot.send_message(chat_id, "❌ Рассылка не найдена.").await?;
                return Ok(());
            }

            deps.scheduler.schedule(&id, run_at).await?;
            deps.stores.sessions.clear(chat_id.0).await?;

            let local = run_at.with_timezone(&reference_offset());
            bot.send_message(chat_id, format!("✅ Запланировано на {}.", local.format(TIME_FORMAT)))
                .await?;
        }
    }
    Ok(())
}

enum AttachmentInput {
    Skip,
    Media(Attachment),
    Unusable,
}

fn collect_attachment(msg: &Message) -> AttachmentInput {
    if let Some(attachment) = extract_attachment(msg) {
        return AttachmentInput::Media(attachment);
    }
    match msg.text() {
        Some(text) if is_negation(text) => AttachmentInput::Skip,
        _ => AttachmentInput::Unusable,
    }
}

/// Applies one field mutation; on a vanished draft clears the session and
/// tells the admin instead of resurrecting the item.
async fn merge_or_bail<V>(
    bot: &Bot,
    deps: &HandlerDeps,
    drafts: &DraftStore,
    chat_id: ChatId,
    id: &str,
    value: V,
    apply: impl FnOnce(&mut crate::core::types::Draft, V),
) -> AppResult<bool> {
    if drafts.merge(id, |d| apply(d, value)).await? {
        return Ok(true);
    }
    deps.stores.sessions.clear(chat_id.0).await?;
    bot.send_message(chat_id, DRAFT_GONE).await?;
    Ok(false)
}

async fn advance(deps: &HandlerDeps, chat_id: ChatId, mut session: Session, step: WorkflowStep) -> AppResult<()> {
    session.step = step;
    deps.stores.sessions.set(chat_id.0, session).await
}

/// Ends the collecting/editing flow: session is cleared, preview is shown
async fn finish_with_preview(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    kind: WorkflowKind,
    draft_id: &str,
) -> AppResult<()> {
    deps.stores.sessions.clear(chat_id.0).await?;
    match draft_store(deps, kind).get(draft_id).await {
        Some(draft) => preview::send_preview(bot, chat_id, kind, &draft).await,
        None => {
            bot.send_message(chat_id, DRAFT_GONE).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppResult;
    use crate::scheduler::BroadcastScheduler;
    use crate::storage::Stores;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_negation_sentinels() {
        assert!(is_negation("нет"));
        assert!(is_negation("  НЕТ "));
        assert!(is_negation("No"));
        assert!(is_negation("none"));
        assert!(!is_negation("нету"));
        assert!(!is_negation("https://example.com"));
        assert!(!is_negation(""));
    }

    /// Builds a plain text Message the way Bot API would serialize it
    fn text_message(chat_id: i64, text: &str) -> Message {
        serde_json::from_value(json!({
            "message_id": 1,
            "date": 1_700_000_000,
            "chat": {"id": chat_id, "type": "private", "first_name": "Тест"},
            "from": {"id": chat_id, "is_bot": false, "first_name": "Тест"},
            "text": text,
        }))
        .unwrap()
    }

    #[test]
    fn test_collect_attachment_classification() {
        assert!(matches!(collect_attachment(&text_message(10, "нет")), AttachmentInput::Skip));
        assert!(matches!(collect_attachment(&text_message(10, "None")), AttachmentInput::Skip));
        // Arbitrary text is neither a skip nor a media reference
        assert!(matches!(
            collect_attachment(&text_message(10, "вот мой файл")),
            AttachmentInput::Unusable
        ));
        assert!(matches!(collect_attachment(&text_message(10, "")), AttachmentInput::Unusable));
    }

    struct NullSender;

    #[async_trait]
    impl crate::dispatch::ContentSender for NullSender {
        async fn send_content(
            &self,
            _recipient_id: i64,
            _text: &str,
            _attachment: Option<&Attachment>,
        ) -> AppResult<()> {
            Ok(())
        }
    }

    fn offline_deps(dir: &tempfile::TempDir) -> (HandlerDeps, Bot) {
        let stores = Arc::new(Stores::open(dir.path()).unwrap());
        let scheduler = BroadcastScheduler::new(Arc::clone(&stores), Arc::new(NullSender));
        let deps = HandlerDeps {
            stores,
            scheduler,
            bot_username: None,
        };
        // Unroutable API URL; sends fail fast and never leave the machine
        let bot = Bot::new("123456:TEST").set_api_url(url::Url::parse("http://127.0.0.1:9/").unwrap());
        (deps, bot)
    }

    /// Unusable input at the attachment step re-prompts without touching the
    /// persisted session or the draft
    #[tokio::test]
    async fn test_unusable_attachment_input_keeps_step() {
        let dir = tempdir().unwrap();
        let (deps, bot) = offline_deps(&dir);

        deps.stores.broadcast_drafts.create("d1").await.unwrap();
        let session = Session {
            kind: WorkflowKind::Broadcast,
            target_id: "d1".to_string(),
            step: WorkflowStep::CollectingAttachment,
        };
        deps.stores.sessions.set(10, session.clone()).await.unwrap();

        // The re-prompt send itself fails (no API behind the URL); only the
        // state left behind matters here
        let _ = handle_step(&bot, &deps, &text_message(10, "вот мой файл"), session).await;

        let kept = deps.stores.sessions.get(10).await.unwrap();
        assert_eq!(kept.step, WorkflowStep::CollectingAttachment);
        assert_eq!(kept.target_id, "d1");
        assert!(deps.stores.broadcast_drafts.get("d1").await.unwrap().attachment.is_none());
    }

    /// The negation sentinel does advance: attachment skipped, next step saved
    #[tokio::test]
    async fn test_skip_advances_to_link_step() {
        let dir = tempdir().unwrap();
        let (deps, bot) = offline_deps(&dir);

        deps.stores.broadcast_drafts.create("d1").await.unwrap();
        let session = Session {
            kind: WorkflowKind::Broadcast,
            target_id: "d1".to_string(),
            step: WorkflowStep::CollectingAttachment,
        };
        deps.stores.sessions.set(10, session.clone()).await.unwrap();

        let _ = handle_step(&bot, &deps, &text_message(10, "нет"), session).await;

        let kept = deps.stores.sessions.get(10).await.unwrap();
        assert_eq!(kept.step, WorkflowStep::CollectingLink);
    }
}
