//! Mock content sender for dispatch and scheduler tests
//!
//! Records every delivery attempt instead of talking to Telegram, with
//! per-recipient scripted failures.

#![allow(dead_code)] // Not every test binary uses every helper

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use glashatay::core::types::{Attachment, MediaKind};
use glashatay::core::{AppError, AppResult};
use glashatay::ContentSender;

/// One recorded delivery attempt
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient_id: i64,
    pub text: String,
    pub attachment_kind: Option<MediaKind>,
}

pub struct MockSender {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<i64>>,
}

impl MockSender {
    pub fn new() -> Arc<Self> {
        Arc::new(MockSender {
            sent: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        })
    }

    /// Every send to `recipient_id` will fail from now on
    pub async fn fail_for(&self, recipient_id: i64) {
        self.failing.lock().await.insert(recipient_id);
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Recipient ids of successful sends, in delivery order
    pub async fn recipients(&self) -> Vec<i64> {
        self.sent.lock().await.iter().map(|m| m.recipient_id).collect()
    }
}

#[async_trait]
impl ContentSender for MockSender {
    async fn send_content(&self, recipient_id: i64, text: &str, attachment: Option<&Attachment>) -> AppResult<()> {
        if self.failing.lock().await.contains(&recipient_id) {
            return Err(AppError::Validation(format!("mock delivery failure for {recipient_id}")));
        }
        self.sent.lock().await.push(SentMessage {
            recipient_id,
            text: text.to_string(),
            attachment_kind: attachment.map(|a| a.kind),
        });
        Ok(())
    }
}
