//! Broadcast fan-out with per-recipient failure isolation

use async_trait::async_trait;

use crate::core::error::{AppError, AppResult};
use crate::core::types::{Attachment, Draft, User};
use crate::storage::Stores;

/// Transport capability the dispatcher needs: deliver one content payload to
/// one recipient. The Telegram implementation lives in `telegram::sender`;
/// tests substitute a mock.
#[async_trait]
pub trait ContentSender: Send + Sync {
    async fn send_content(&self, recipient_id: i64, text: &str, attachment: Option<&Attachment>) -> AppResult<()>;
}

/// Final message body: the record text plus the link appended the way the
/// admin saw it in the preview
pub fn compose_body(record: &Draft) -> String {
    if record.link.is_empty() {
        record.text.clone()
    } else {
        format!("{}\n\n🔗 {}", record.text, record.link)
    }
}

/// Attempts delivery of `record` to every recipient, independently.
///
/// One send per recipient, no retries; a failed recipient is logged and
/// skipped. Returns the number of sends that did not fail — a best-effort
/// count, not a delivery receipt.
pub async fn dispatch_record<S: ContentSender + ?Sized>(sender: &S, recipients: &[User], record: &Draft) -> u32 {
    let body = compose_body(record);
    let mut delivered = 0u32;

    for recipient in recipients {
        match sender.send_content(recipient.id, &body, record.attachment.as_ref()).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                log::warn!("Broadcast {} -> user {} failed: {}", record.id, recipient.id, e);
            }
        }
    }

    log::info!(
        "Broadcast {} dispatched to {}/{} recipient(s)",
        record.id,
        delivered,
        recipients.len()
    );
    delivered
}

/// Runs a saved broadcast against the full user list and persists the
/// delivered count back onto the record.
///
/// An unreadable user list degrades to an empty recipient set (count 0);
/// only a missing broadcast record is an error.
pub async fn run_broadcast<S: ContentSender + ?Sized>(stores: &Stores, sender: &S, broadcast_id: &str) -> AppResult<u32> {
    let record = stores
        .broadcasts
        .get(broadcast_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("broadcast {broadcast_id}")))?;

    let recipients = stores.users.all().await;
    let delivered = dispatch_record(sender, &recipients, &record).await;

    if let Err(e) = stores.broadcasts.set_delivered(broadcast_id, delivered).await {
        log::error!("Failed to persist delivered count for {}: {}", broadcast_id, e);
    }

    Ok(delivered)
}
