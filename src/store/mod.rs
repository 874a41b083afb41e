//! Persisted key-value store
//!
//! Values are JSON documents addressed by a short key. Writes replace the
//! whole value for a key.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Key holding the bookshelf collection
pub const BOOKS_KEY: &str = "books";

/// Key holding the dark-mode flag (`"true"` / `"false"`)
pub const DARK_MODE_KEY: &str = "darkMode";

/// Durable JSON key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: &Value) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Store handle shared between the bookshelf and app state
pub type SharedStore = Arc<dyn KeyValueStore>;

impl dyn KeyValueStore {
    /// Read and deserialize the value under `key`
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize and write `value` under `key`
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, &serde_json::to_value(value)?)
    }
}
