//! Durable one-shot broadcast scheduling
//!
//! Each schedule request arms a `tokio::spawn`ed timer task and appends a
//! ledger row. The ledger is authoritative: on process start every row still
//! marked `scheduled` is re-attached to a live timer, so past-due sends fire
//! immediately and future ones fire on schedule.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::config::schedule::{reference_offset, TIME_FORMAT};
use crate::core::error::{AppError, AppResult};
use crate::core::types::{format_instant, ScheduleEntry, ScheduleStatus};
use crate::dispatch::{run_broadcast, ContentSender};
use crate::storage::Stores;

pub struct BroadcastScheduler {
    stores: Arc<Stores>,
    sender: Arc<dyn ContentSender>,
    /// Live timers by job id; at most one per job. Best-effort: the ledger
    /// row stays authoritative even when aborting a handle fails or the
    /// handle is already gone.
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

/// Parses an admin-entered wall-clock time ("ДД.ММ.ГГ ЧЧ:ММ") in the
/// reference zone and normalizes it to a UTC instant.
///
/// Rejects malformed input and instants not strictly in the future.
pub fn parse_run_at(input: &str) -> AppResult<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), TIME_FORMAT)
        .map_err(|e| AppError::Validation(format!("bad schedule time '{}': {}", input.trim(), e)))?;

    let local = reference_offset()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| AppError::Validation(format!("ambiguous schedule time '{}'", input.trim())))?;

    let run_at = local.with_timezone(&Utc);
    if run_at <= Utc::now() {
        return Err(AppError::Validation(format!("schedule time {} is not in the future", local)));
    }
    Ok(run_at)
}

impl BroadcastScheduler {
    pub fn new(stores: Arc<Stores>, sender: Arc<dyn ContentSender>) -> Arc<Self> {
        Arc::new(BroadcastScheduler {
            stores,
            sender,
            timers: Mutex::new(HashMap::new()),
        })
    }

    /// Arms one future one-shot send of the broadcast at `run_at` and appends
    /// a `scheduled` ledger row. Returns the fresh job id.
    pub async fn schedule(self: &Arc<Self>, broadcast_id: &str, run_at: DateTime<Utc>) -> AppResult<String> {
        let job_id = Uuid::new_v4().to_string();

        self.stores
            .ledger
            .append(ScheduleEntry {
                job_id: job_id.clone(),
                broadcast_id: broadcast_id.to_string(),
                run_at: format_instant(run_at),
                status: ScheduleStatus::Scheduled,
            })
            .await?;

        self.arm(job_id.clone(), broadcast_id.to_string(), run_at);
        log::info!("Scheduled broadcast {} as job {} at {}", broadcast_id, job_id, run_at);
        Ok(job_id)
    }

    /// Spawns the timer task for a job. Past-due instants fire immediately.
    ///
    /// The handle is inserted while the timers lock is held: `fire` takes the
    /// same lock to remove itself, so even a zero-delay task cannot complete
    /// before its handle is registered (and then linger in the map).
    fn arm(self: &Arc<Self>, job_id: String, broadcast_id: String, run_at: DateTime<Utc>) {
        let delay = (run_at - Utc::now()).to_std().unwrap_or_default();
        let scheduler = Arc::clone(self);
        let task_job_id = job_id.clone();

        let task = async move {
            tokio::time::sleep(delay).await;
            scheduler.fire(&task_job_id, &broadcast_id).await;
        };

        if let Ok(mut timers) = self.timers.lock() {
            timers.insert(job_id, tokio::spawn(task));
        } else {
            // Poisoned lock: run the send untracked rather than dropping it
            tokio::spawn(task);
        }
    }

    /// Shared transport, reused for immediate "send now" dispatches
    pub fn sender(&self) -> &dyn ContentSender {
        self.sender.as_ref()
    }

    /// Count of currently armed timers (diagnostics and tests)
    pub fn armed_count(&self) -> usize {
        self.timers.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Runs a fired job: dispatches the broadcast, persists the delivered
    /// count and flips every matching `scheduled` ledger row to `done`.
    ///
    /// Tolerated no-ops: the job was already fired or cancelled, or the
    /// broadcast was deleted after scheduling.
    pub async fn fire(&self, job_id: &str, broadcast_id: &str) {
        if let Ok(mut timers) = self.timers.lock() {
            timers.remove(job_id);
        }

        match self.stores.ledger.find_by_job(job_id).await {
            Some(entry) if entry.status == ScheduleStatus::Scheduled => {}
            Some(entry) => {
                log::debug!("Job {} already {:?}, skipping fire", job_id, entry.status);
                return;
            }
            None => {
                log::warn!("Job {} fired but has no ledger row, skipping", job_id);
                return;
            }
        }

        match run_broadcast(&self.stores, self.sender.as_ref(), broadcast_id).await {
            Ok(delivered) => {
                log::info!("Job {} delivered broadcast {} to {} recipient(s)", job_id, broadcast_id, delivered);
            }
            Err(AppError::NotFound(_)) => {
                // Broadcast deleted after scheduling
                log::info!("Job {} fired for deleted broadcast {}, nothing to send", job_id, broadcast_id);
                return;
            }
            Err(e) => {
                log::error!("Job {} failed to dispatch broadcast {}: {}", job_id, broadcast_id, e);
                return;
            }
        }

        match self.stores.ledger.mark_done_for_broadcast(broadcast_id).await {
            Ok(flipped) => log::debug!("Job {}: flipped {} ledger row(s) to done", job_id, flipped),
            Err(e) => log::error!("Job {}: failed to update ledger: {}", job_id, e),
        }
    }

    /// Best-effort disarm of the live timer, then unconditionally marks the
    /// ledger row `cancelled`. The row, not the timer, is authoritative.
    pub async fn cancel(&self, job_id: &str) -> AppResult<()> {
        self.disarm(job_id);
        if !self.stores.ledger.set_status(job_id, ScheduleStatus::Cancelled).await? {
            return Err(AppError::NotFound(format!("schedule entry {job_id}")));
        }
        log::info!("Cancelled job {}", job_id);
        Ok(())
    }

    /// Disarms the timer and parks the ledger row in the inert `editing`
    /// state while the broadcast is pulled back into draft mode. The row is
    /// not revived automatically; the admin re-schedules after re-saving.
    pub async fn mark_editing(&self, job_id: &str) -> AppResult<()> {
        self.disarm(job_id);
        if !self.stores.ledger.set_status(job_id, ScheduleStatus::Editing).await? {
            return Err(AppError::NotFound(format!("schedule entry {job_id}")));
        }
        log::info!("Job {} parked for editing", job_id);
        Ok(())
    }

    fn disarm(&self, job_id: &str) {
        if let Ok(mut timers) = self.timers.lock() {
            if let Some(handle) = timers.remove(job_id) {
                handle.abort();
            }
        }
    }

    /// Re-attaches a live timer to every `scheduled` ledger row. A row with
    /// a malformed timestamp is logged and skipped; it never blocks the rest.
    /// Returns the number of timers re-armed.
    pub async fn restore_on_startup(self: &Arc<Self>) -> usize {
        let pending = self.stores.ledger.scheduled().await;
        let mut restored = 0;

        for entry in pending {
            let run_at = match DateTime::parse_from_rfc3339(&entry.run_at) {
                Ok(at) => at.with_timezone(&Utc),
                Err(e) => {
                    log::warn!(
                        "Cannot restore job {} (broadcast {}): bad run_at '{}': {}",
                        entry.job_id,
                        entry.broadcast_id,
                        entry.run_at,
                        e
                    );
                    continue;
                }
            };
            self.arm(entry.job_id, entry.broadcast_id, run_at);
            restored += 1;
        }

        log::info!("Restored {} scheduled broadcast(s)", restored);
        restored
    }
}
