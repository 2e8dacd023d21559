//! In-memory subscriber store.
//!
//! Backs the service in tests and local runs without PostgreSQL. Follows the
//! same contract as the database: one row per email, conflicts reported on
//! insert, `updated` bumped on every write.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::storage::{StoreError, SubscriberStore};

/// A stored subscriber row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub email: String,
    pub token: String,
    pub updated: SystemTime,
}

/// A thread-safe map of email -> subscriber.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<DashMap<String, Subscriber>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the row for `email`.
    pub fn get(&self, email: &str) -> Option<Subscriber> {
        self.rows.get(email).map(|row| row.value().clone())
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn insert(&self, email: &str, token: &str) -> Result<(), StoreError> {
        match self.rows.entry(email.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(Subscriber {
                    email: email.to_string(),
                    token: token.to_string(),
                    updated: SystemTime::now(),
                });
                Ok(())
            }
        }
    }

    async fn refresh_token(&self, email: &str, token: &str) -> Result<(), StoreError> {
        let mut row = self.rows.get_mut(email).ok_or(StoreError::Missing)?;
        row.token = token.to_string();
        row.updated = SystemTime::now();
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
