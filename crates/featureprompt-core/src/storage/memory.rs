//! In-memory counter store.

use std::collections::HashMap;

use super::{CounterStore, StoredValue};
use crate::error::StoreResult;

/// Counter store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl CounterStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<StoredValue>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: StoredValue) -> StoreResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.values.remove(key);
        Ok(())
    }
}
