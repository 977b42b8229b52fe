//! Record store collaborator boundary.
//!
//! The core does not own a storage engine. A host-supplied [`RecordStore`]
//! acks or rejects each snapshot; the version manager only merges a record
//! into its local collection after the store acked it, so a failed persist
//! leaves everything retryable.

use crate::records::SavedRecord;

/// Errors reported by the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// The store rejected this record.
    Rejected(String),
    /// The store could not be reached.
    Unavailable(String),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Rejected(e) => write!(f, "record store rejected the record: {}", e),
            PersistError::Unavailable(e) => write!(f, "record store unavailable: {}", e),
        }
    }
}

impl std::error::Error for PersistError {}

/// Durable home for saved records.
pub trait RecordStore {
    /// Persist one record snapshot. Persistence is at-least-once from the
    /// caller's perspective: re-persisting a record with an existing id
    /// must overwrite it, not duplicate it.
    fn persist(&mut self, record: &SavedRecord) -> Result<(), PersistError>;
}

/// In-memory store for tests and headless hosts. The next persist can be
/// told to fail, to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    persisted: Vec<SavedRecord>,
    fail_next: Option<PersistError>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `persist` call fail with `error`.
    pub fn fail_next(&mut self, error: PersistError) {
        self.fail_next = Some(error);
    }

    /// Everything persisted so far, latest version of each record.
    pub fn persisted(&self) -> &[SavedRecord] {
        &self.persisted
    }
}

impl RecordStore for MemoryRecordStore {
    fn persist(&mut self, record: &SavedRecord) -> Result<(), PersistError> {
        if let Some(error) = self.fail_next.take() {
            log::warn!("memory store: failing persist of record {}", record.id);
            return Err(error);
        }
        match self.persisted.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => self.persisted.push(record.clone()),
        }
        Ok(())
    }
}
