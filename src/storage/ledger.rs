//! Durable schedule ledger: one row per scheduling request

use crate::core::error::AppResult;
use crate::core::types::{ScheduleEntry, ScheduleStatus};
use crate::storage::json_store::JsonStore;

pub struct ScheduleLedger {
    inner: JsonStore<Vec<ScheduleEntry>>,
}

impl ScheduleLedger {
    pub fn new(inner: JsonStore<Vec<ScheduleEntry>>) -> Self {
        ScheduleLedger { inner }
    }

    pub async fn append(&self, entry: ScheduleEntry) -> AppResult<()> {
        self.inner
            .update(|entries| {
                entries.push(entry);
            })
            .await
    }

    pub async fn all(&self) -> Vec<ScheduleEntry> {
        self.inner.load().await
    }

    /// Rows still waiting for their timer to fire
    pub async fn scheduled(&self) -> Vec<ScheduleEntry> {
        self.inner
            .load()
            .await
            .into_iter()
            .filter(|e| e.status == ScheduleStatus::Scheduled)
            .collect()
    }

    pub async fn find_by_job(&self, job_id: &str) -> Option<ScheduleEntry> {
        self.inner.load().await.into_iter().find(|e| e.job_id == job_id)
    }

    /// Sets the status of the row with the given job id.
    /// Returns `false` when no such row exists.
    pub async fn set_status(&self, job_id: &str, status: ScheduleStatus) -> AppResult<bool> {
        self.inner
            .update(|entries| match entries.iter_mut().find(|e| e.job_id == job_id) {
                Some(entry) => {
                    entry.status = status;
                    true
                }
                None => false,
            })
            .await
    }

    /// Flips every still-`scheduled` row for the broadcast to `done`.
    ///
    /// A broadcast scheduled twice has two matching rows; flipping all of
    /// them keeps `fire` idempotent and order-independent.
    pub async fn mark_done_for_broadcast(&self, broadcast_id: &str) -> AppResult<usize> {
        self.inner
            .update(|entries| {
                let mut flipped = 0;
                for entry in entries.iter_mut() {
                    if entry.broadcast_id == broadcast_id && entry.status == ScheduleStatus::Scheduled {
                        entry.status = ScheduleStatus::Done;
                        flipped += 1;
                    }
                }
                flipped
            })
            .await
    }

    /// Job ids of still-`scheduled` rows for the broadcast (used when the
    /// broadcast is pulled back into draft mode)
    pub async fn scheduled_jobs_for_broadcast(&self, broadcast_id: &str) -> Vec<String> {
        self.inner
            .load()
            .await
            .into_iter()
            .filter(|e| e.broadcast_id == broadcast_id && e.status == ScheduleStatus::Scheduled)
            .map(|e| e.job_id)
            .collect()
    }
}
