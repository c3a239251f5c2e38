//! Generic JSON-file-backed collection store
//!
//! Each logical collection (users, drafts, broadcasts, scenarios, schedule
//! ledger, sessions) lives in its own JSON file and is read-modify-written as
//! a whole. A per-store async mutex serializes mutations so an interactive
//! edit and a scheduled firing cannot lose each other's writes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::core::error::AppResult;

pub struct JsonStore<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _collection: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonStore {
            path: path.into(),
            lock: Mutex::new(()),
            _collection: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the collection, falling back to an empty default when the file
    /// is missing or unreadable. Corruption is logged, never propagated.
    fn read(&self) -> T {
        match fs_err::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Store {} is corrupt, using empty default: {}", self.path.display(), e);
                    T::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => T::default(),
            Err(e) => {
                log::warn!("Store {} is unreadable, using empty default: {}", self.path.display(), e);
                T::default()
            }
        }
    }

    fn write(&self, value: &T) -> AppResult<()> {
        let bytes = serde_json::to_vec(value)?;
        fs_err::write(&self.path, bytes)?;
        Ok(())
    }

    /// Snapshot of the current collection
    pub async fn load(&self) -> T {
        let _guard = self.lock.lock().await;
        self.read()
    }

    /// Read-modify-write the whole collection under the store lock
    pub async fn update<R>(&self, mutate: impl FnOnce(&mut T) -> R) -> AppResult<R> {
        let _guard = self.lock.lock().await;
        let mut value = self.read();
        let result = mutate(&mut value);
        self.write(&value)?;
        Ok(result)
    }
}
