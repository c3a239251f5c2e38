//! In-progress draft storage (one collection for broadcasts, one for scenarios)

use std::collections::HashMap;

use crate::core::error::AppResult;
use crate::core::types::Draft;
use crate::storage::json_store::JsonStore;

pub struct DraftStore {
    inner: JsonStore<HashMap<String, Draft>>,
}

impl DraftStore {
    pub fn new(inner: JsonStore<HashMap<String, Draft>>) -> Self {
        DraftStore { inner }
    }

    /// Inserts a fresh empty draft under `id`
    pub async fn create(&self, id: &str) -> AppResult<()> {
        let draft = Draft::new(id);
        self.inner
            .update(|drafts| {
                drafts.insert(draft.id.clone(), draft);
            })
            .await
    }

    /// Inserts (or replaces) a complete draft, e.g. one re-materialized from
    /// a saved record
    pub async fn insert(&self, draft: Draft) -> AppResult<()> {
        self.inner
            .update(|drafts| {
                drafts.insert(draft.id.clone(), draft);
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Option<Draft> {
        self.inner.load().await.remove(id)
    }

    /// Applies a single-field mutation to an existing draft.
    /// Returns `false` (without writing a new entry) when the draft is gone.
    pub async fn merge(&self, id: &str, mutate: impl FnOnce(&mut Draft)) -> AppResult<bool> {
        self.inner
            .update(|drafts| match drafts.get_mut(id) {
                Some(draft) => {
                    mutate(draft);
                    true
                }
                None => false,
            })
            .await
    }

    /// Removes and returns the draft, if present
    pub async fn remove(&self, id: &str) -> AppResult<Option<Draft>> {
        self.inner.update(|drafts| drafts.remove(id)).await
    }
}
