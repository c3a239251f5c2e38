//! Registered end users — the broadcast distribution list

use chrono::Utc;

use crate::core::error::AppResult;
use crate::core::types::{format_instant, User};
use crate::storage::json_store::JsonStore;

pub struct UserStore {
    inner: JsonStore<Vec<User>>,
}

impl UserStore {
    pub fn new(inner: JsonStore<Vec<User>>) -> Self {
        UserStore { inner }
    }

    pub async fn all(&self) -> Vec<User> {
        self.inner.load().await
    }

    pub async fn count(&self) -> usize {
        self.inner.load().await.len()
    }

    /// Registers a user on first contact, refreshes name/handle and
    /// `last_active` on every subsequent one
    pub async fn register_or_touch(&self, mut user: User) -> AppResult<()> {
        user.last_active = format_instant(Utc::now());
        self.inner
            .update(|users| match users.iter_mut().find(|u| u.id == user.id) {
                Some(existing) => {
                    existing.first_name = user.first_name;
                    existing.username = user.username;
                    if !user.phone.is_empty() {
                        existing.phone = user.phone;
                    }
                    existing.last_active = user.last_active;
                }
                None => {
                    users.push(user);
                }
            })
            .await
    }
}
