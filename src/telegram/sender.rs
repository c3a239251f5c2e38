//! Telegram implementation of the dispatcher's `ContentSender` capability

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};

use crate::core::error::AppResult;
use crate::core::types::{Attachment, MediaKind};
use crate::dispatch::ContentSender;

/// Sends one content payload to one chat, matching the attachment kind.
///
/// The stored file_id is reused as-is, so media is never re-uploaded. Video
/// notes cannot carry captions, so the text follows as a separate message.
pub async fn send_payload(bot: &Bot, chat_id: ChatId, text: &str, attachment: Option<&Attachment>) -> AppResult<()> {
    let Some(attachment) = attachment else {
        bot.send_message(chat_id, text).await?;
        return Ok(());
    };

    let file = InputFile::file_id(FileId(attachment.file_id.clone()));
    match attachment.kind {
        MediaKind::Document => {
            bot.send_document(chat_id, file).caption(text).await?;
        }
        MediaKind::Audio => {
            bot.send_audio(chat_id, file).caption(text).await?;
        }
        MediaKind::Video => {
            bot.send_video(chat_id, file).caption(text).await?;
        }
        MediaKind::Photo => {
            bot.send_photo(chat_id, file).caption(text).await?;
        }
        MediaKind::Animation => {
            bot.send_animation(chat_id, file).caption(text).await?;
        }
        MediaKind::VideoNote => {
            bot.send_video_note(chat_id, file).await?;
            if !text.is_empty() {
                bot.send_message(chat_id, text).await?;
            }
        }
    }
    Ok(())
}

/// `ContentSender` backed by the live bot
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        TelegramSender { bot }
    }
}

#[async_trait]
impl ContentSender for TelegramSender {
    async fn send_content(&self, recipient_id: i64, text: &str, attachment: Option<&Attachment>) -> AppResult<()> {
        send_payload(&self.bot, ChatId(recipient_id), text, attachment).await
    }
}
