//! Whole-collection key-value persistence for batches, students and
//! attendance records.
//!
//! Every read returns the complete collection and every write replaces it.
//! Reads are tolerant: a collection that was never written, or whose body no
//! longer decodes, reads as empty.

use crate::model::{AttendanceRecord, Batch, Student};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;

pub const DEFAULT_NAMESPACE: &str = "smartattend";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode collection: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Batches,
    Students,
    Attendance,
}

impl Collection {
    pub fn suffix(self) -> &'static str {
        match self {
            Collection::Batches => "batches",
            Collection::Students => "students",
            Collection::Attendance => "attendance",
        }
    }

    pub fn key(self, namespace: &str) -> String {
        format!("{}_{}", namespace, self.suffix())
    }
}

/// An entity persisted as one element of a JSON-array collection.
pub trait Entity: Serialize + DeserializeOwned {
    const COLLECTION: Collection;
}

impl Entity for Batch {
    const COLLECTION: Collection = Collection::Batches;
}

impl Entity for Student {
    const COLLECTION: Collection = Collection::Students;
}

impl Entity for AttendanceRecord {
    const COLLECTION: Collection = Collection::Attendance;
}

pub trait RecordStore {
    /// Raw JSON body of a collection, `None` if it was never written.
    fn load(&self, collection: Collection) -> Result<Option<String>, StoreError>;

    /// Replace the whole collection body.
    fn save(&self, collection: Collection, body: String) -> Result<(), StoreError>;
}

pub fn get<T: Entity>(store: &dyn RecordStore) -> Result<Vec<T>, StoreError> {
    let Some(body) = store.load(T::COLLECTION)? else {
        return Ok(Vec::new());
    };
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Vec<T>>(&body) {
        Ok(items) => Ok(items),
        Err(e) => {
            tracing::warn!(
                collection = T::COLLECTION.suffix(),
                error = %e,
                "collection body does not decode, reading as empty"
            );
            Ok(Vec::new())
        }
    }
}

pub fn put<T: Entity>(store: &dyn RecordStore, items: &[T]) -> Result<(), StoreError> {
    let body = serde_json::to_string(items)?;
    store.save(T::COLLECTION, body)
}

pub struct SqliteStore {
    conn: Connection,
    namespace: String,
}

impl SqliteStore {
    pub fn new(conn: Connection, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl RecordStore for SqliteStore {
    fn load(&self, collection: Collection) -> Result<Option<String>, StoreError> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM collections WHERE key = ?",
                [collection.key(&self.namespace)],
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(body)
    }

    fn save(&self, collection: Collection, body: String) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO collections(key, body, updated_at)
             VALUES(?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
               body = excluded.body,
               updated_at = excluded.updated_at",
            (
                collection.key(&self.namespace),
                &body,
                Utc::now().to_rfc3339(),
            ),
        )?;
        Ok(())
    }
}

/// In-process store used by unit tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    bodies: RefCell<HashMap<Collection, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl RecordStore for MemoryStore {
    fn load(&self, collection: Collection) -> Result<Option<String>, StoreError> {
        Ok(self.bodies.borrow().get(&collection).cloned())
    }

    fn save(&self, collection: Collection, body: String) -> Result<(), StoreError> {
        self.bodies.borrow_mut().insert(collection, body);
        Ok(())
    }
}
