//! Durable per-admin workflow sessions
//!
//! One session per admin chat id: the current workflow kind, its target item,
//! and the step the next inbound message will be matched against. Persisting
//! the step (instead of registering an in-process "next message" callback)
//! makes workflows survive restarts and keeps a second concurrent workflow
//! from the same admin from clobbering a pending continuation.

use std::collections::HashMap;

use crate::core::error::AppResult;
use crate::core::types::Session;
use crate::storage::json_store::JsonStore;

pub struct SessionStore {
    inner: JsonStore<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new(inner: JsonStore<HashMap<i64, Session>>) -> Self {
        SessionStore { inner }
    }

    pub async fn get(&self, admin_id: i64) -> Option<Session> {
        self.inner.load().await.remove(&admin_id)
    }

    /// Starts or replaces the admin's session (one workflow per admin)
    pub async fn set(&self, admin_id: i64, session: Session) -> AppResult<()> {
        self.inner
            .update(|sessions| {
                sessions.insert(admin_id, session);
            })
            .await
    }

    pub async fn clear(&self, admin_id: i64) -> AppResult<()> {
        self.inner
            .update(|sessions| {
                sessions.remove(&admin_id);
            })
            .await
    }
}
