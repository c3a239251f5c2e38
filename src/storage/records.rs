//! Finalized record storage: saved broadcasts (by generated id) and
//! published scenarios (by admin-chosen code)

use std::collections::HashMap;

use crate::core::error::AppResult;
use crate::core::types::Draft;
use crate::storage::json_store::JsonStore;

/// Saved broadcasts, keyed by their generated broadcast id
pub struct BroadcastStore {
    inner: JsonStore<HashMap<String, Draft>>,
}

impl BroadcastStore {
    pub fn new(inner: JsonStore<HashMap<String, Draft>>) -> Self {
        BroadcastStore { inner }
    }

    pub async fn get(&self, id: &str) -> Option<Draft> {
        self.inner.load().await.remove(id)
    }

    pub async fn all(&self) -> HashMap<String, Draft> {
        self.inner.load().await
    }

    pub async fn insert(&self, record: Draft) -> AppResult<()> {
        self.inner
            .update(|records| {
                records.insert(record.id.clone(), record);
            })
            .await
    }

    pub async fn remove(&self, id: &str) -> AppResult<Option<Draft>> {
        self.inner.update(|records| records.remove(id)).await
    }

    /// Persists the delivered count reported by a dispatch run
    pub async fn set_delivered(&self, id: &str, delivered: u32) -> AppResult<bool> {
        self.inner
            .update(|records| match records.get_mut(id) {
                Some(record) => {
                    record.delivered = delivered;
                    true
                }
                None => false,
            })
            .await
    }
}

/// Published scenarios, keyed by their short deep-link code.
///
/// Codes are not checked for uniqueness: re-using a code overwrites the
/// previous scenario (accepted last-writer-wins behavior).
pub struct ScenarioStore {
    inner: JsonStore<HashMap<String, Draft>>,
}

impl ScenarioStore {
    pub fn new(inner: JsonStore<HashMap<String, Draft>>) -> Self {
        ScenarioStore { inner }
    }

    pub async fn get(&self, code: &str) -> Option<Draft> {
        self.inner.load().await.remove(code)
    }

    pub async fn all(&self) -> HashMap<String, Draft> {
        self.inner.load().await
    }

    pub async fn publish(&self, code: &str, scenario: Draft) -> AppResult<()> {
        self.inner
            .update(|scenarios| {
                scenarios.insert(code.to_string(), scenario);
            })
            .await
    }
}
