//! JSON-per-collection durable storage

pub mod drafts;
pub mod json_store;
pub mod ledger;
pub mod records;
pub mod sessions;
pub mod users;

// Re-exports for convenience
pub use drafts::DraftStore;
pub use json_store::JsonStore;
pub use ledger::ScheduleLedger;
pub use records::{BroadcastStore, ScenarioStore};
pub use sessions::SessionStore;
pub use users::UserStore;

use std::path::Path;

use crate::core::error::{AppError, AppResult};
use crate::core::types::Draft;

/// All durable collections, opened once at startup and passed to every
/// component instead of being reached for as ambient global state.
pub struct Stores {
    pub users: UserStore,
    pub broadcast_drafts: DraftStore,
    pub scenario_drafts: DraftStore,
    pub broadcasts: BroadcastStore,
    pub scenarios: ScenarioStore,
    pub ledger: ScheduleLedger,
    pub sessions: SessionStore,
}

impl Stores {
    /// Opens every collection under `data_dir`, creating the directory if
    /// needed. Files themselves are created lazily on first write.
    pub fn open(data_dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = data_dir.as_ref();
        fs_err::create_dir_all(dir)?;

        Ok(Stores {
            users: UserStore::new(JsonStore::new(dir.join("users.json"))),
            broadcast_drafts: DraftStore::new(JsonStore::new(dir.join("broadcast_drafts.json"))),
            scenario_drafts: DraftStore::new(JsonStore::new(dir.join("scenario_drafts.json"))),
            broadcasts: BroadcastStore::new(JsonStore::new(dir.join("broadcasts.json"))),
            scenarios: ScenarioStore::new(JsonStore::new(dir.join("scenarios.json"))),
            ledger: ScheduleLedger::new(JsonStore::new(dir.join("schedule_ledger.json"))),
            sessions: SessionStore::new(JsonStore::new(dir.join("sessions.json"))),
        })
    }

    /// Promotes a broadcast draft into the saved-broadcast table.
    ///
    /// The draft is removed first so exactly one authoritative copy exists;
    /// a missing draft is reported, not invented.
    pub async fn promote_broadcast(&self, draft_id: &str) -> AppResult<Draft> {
        let draft = self
            .broadcast_drafts
            .remove(draft_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("broadcast draft {draft_id}")))?;
        self.broadcasts.insert(draft.clone()).await?;
        Ok(draft)
    }

    /// Pulls a saved broadcast back into draft mode for re-editing.
    /// Inverse of [`promote_broadcast`]: the record leaves the saved table.
    pub async fn demote_broadcast(&self, broadcast_id: &str) -> AppResult<Draft> {
        let record = self
            .broadcasts
            .remove(broadcast_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("broadcast {broadcast_id}")))?;
        self.broadcast_drafts.insert(record.clone()).await?;
        Ok(record)
    }

    /// Publishes a scenario draft under its admin-chosen code, removing the
    /// draft. A reused code overwrites the previous scenario.
    pub async fn publish_scenario(&self, draft_id: &str, code: &str) -> AppResult<Draft> {
        let draft = self
            .scenario_drafts
            .remove(draft_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("scenario draft {draft_id}")))?;
        self.scenarios.publish(code, draft.clone()).await?;
        Ok(draft)
    }
}
