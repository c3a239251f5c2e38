//! Draft preview rendering and action keyboards

use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile};

use crate::core::error::AppResult;
use crate::core::types::{Draft, MediaKind, WorkflowKind};

/// Shorthand for a callback button
fn cb(label: &str, data: String) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label.to_string(), data)
}

/// Callback-data namespace per workflow kind
pub fn callback_ns(kind: WorkflowKind) -> &'static str {
    match kind {
        WorkflowKind::Broadcast => "bc",
        WorkflowKind::Scenario => "sc",
    }
}

/// Preview body: accumulated text, attachment note and link
pub fn render_preview_text(kind: WorkflowKind, draft: &Draft) -> String {
    let mut text = match kind {
        WorkflowKind::Broadcast => format!("📢 Предпросмотр рассылки:\n\n{}", draft.text),
        WorkflowKind::Scenario => format!("📘 Предпросмотр сценария:\n\n{}", draft.text),
    };
    if let Some(ref attachment) = draft.attachment {
        text.push_str(&format!("\n\n📎 Вложение: {}", attachment.kind.label()));
    }
    if !draft.link.is_empty() {
        text.push_str(&format!("\n\n🔗 {}", draft.link));
    }
    text
}

/// Action menu shown under every preview
pub fn preview_keyboard(kind: WorkflowKind, draft_id: &str) -> InlineKeyboardMarkup {
    let ns = callback_ns(kind);
    InlineKeyboardMarkup::new(vec![
        vec![cb("✅ Сохранить", format!("{ns}:save:{draft_id}"))],
        vec![cb("✏️ Изменить текст", format!("{ns}:edit_text:{draft_id}"))],
        vec![cb("✏️ Изменить файл", format!("{ns}:edit_file:{draft_id}"))],
        vec![cb("✏️ Изменить ссылку", format!("{ns}:edit_link:{draft_id}"))],
        vec![cb("❌ Удалить", format!("{ns}:delete:{draft_id}"))],
    ])
}

/// Menu shown after a broadcast is saved: send now or schedule
pub fn saved_broadcast_keyboard(broadcast_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![cb("🚀 Отправить", format!("bc:now:{broadcast_id}"))],
        vec![cb("🕒 Запланировать", format!("bc:schedule:{broadcast_id}"))],
    ])
}

/// Sends the draft preview with its action menu.
///
/// An attached media payload is resent from its stored file_id so the admin
/// sees exactly what recipients will get.
pub async fn send_preview(bot: &Bot, chat_id: ChatId, kind: WorkflowKind, draft: &Draft) -> AppResult<()> {
    let text = render_preview_text(kind, draft);
    let keyboard = preview_keyboard(kind, &draft.id);

    let Some(ref attachment) = draft.attachment else {
        bot.send_message(chat_id, text).reply_markup(keyboard).await?;
        return Ok(());
    };

    let file = InputFile::file_id(FileId(attachment.file_id.clone()));
    match attachment.kind {
        MediaKind::Document => {
            bot.send_document(chat_id, file).caption(text).reply_markup(keyboard).await?;
        }
        MediaKind::Audio => {
            bot.send_audio(chat_id, file).caption(text).reply_markup(keyboard).await?;
        }
        MediaKind::Video => {
            bot.send_video(chat_id, file).caption(text).reply_markup(keyboard).await?;
        }
        MediaKind::Photo => {
            bot.send_photo(chat_id, file).caption(text).reply_markup(keyboard).await?;
        }
        MediaKind::Animation => {
            bot.send_animation(chat_id, file).caption(text).reply_markup(keyboard).await?;
        }
        MediaKind::VideoNote => {
            // Video notes carry neither captions nor keyboards
            bot.send_video_note(chat_id, file).await?;
            bot.send_message(chat_id, text).reply_markup(keyboard).await?;
        }
    }
    Ok(())
}
