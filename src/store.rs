//! In-memory record store for completed downloads
//!
//! Maps [`ItemId`] to [`StoredItem`] for the lifetime of the process. Shared by
//! concurrent transfers and serving requests: mutation takes the write lock,
//! lookups share the read lock.
//!
//! The API is synchronous so the serving path can drop a record from a `Drop`
//! implementation once its backing file is gone.

use crate::error::{Error, Result};
use crate::types::{ItemId, StoredItem};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Record store keyed by item identifier
#[derive(Debug, Default)]
pub struct RecordStore {
    items: RwLock<HashMap<ItemId, StoredItem>>,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `id`
    pub fn save(&self, id: ItemId, item: StoredItem) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(id, item);
        Ok(())
    }

    /// Look up the record for `id`
    ///
    /// Returns [`Error::NotFound`] when no record exists.
    pub fn get(&self, id: &ItemId) -> Result<StoredItem> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("item {id}")))
    }

    /// Remove the record for `id`, returning it
    ///
    /// Returns [`Error::NotFound`] when no record exists.
    pub fn remove(&self, id: &ItemId) -> Result<StoredItem> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items
            .remove(id)
            .ok_or_else(|| Error::NotFound(format!("item {id}")))
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
