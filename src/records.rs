//! Saved records and version management.
//!
//! A save snapshots the in-progress note into a [`SavedRecord`]. With a
//! record selected, saving overwrites that record in place (same id); with
//! no selection it creates a new record at the front of the collection. The
//! store is asked to persist first — only an acked snapshot is merged
//! locally, so a failed persist leaves both the collection and the
//! in-progress note untouched and the user can retry.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::note::{ClinicalNote, SoapNote};
use crate::store::{PersistError, RecordStore};

/// Identifier of a saved record.
///
/// Derived from the wall clock at creation time and bumped past the last
/// issued id on collision, so ids are unique, immutable and roughly
/// creation-ordered. Never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The patient an editing session is charting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientContext {
    pub chart_id: String,
    pub display_name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl PatientContext {
    pub fn new(chart_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            chart_id: chart_id.into(),
            display_name: display_name.into(),
            gender: None,
            birth_date: None,
        }
    }

    /// Calendar-accurate age as of `today`: year difference, minus one if
    /// the birthday hasn't come around yet this year.
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        let birth = self.birth_date?;
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        Some(age)
    }
}

/// A persisted note snapshot.
///
/// `soap` and `chief_complaint` are copies taken at save time, decoupled
/// from further in-progress edits. The id never changes after creation; a
/// re-save of a selected record replaces every other field wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecord {
    pub id: RecordId,
    pub patient_id: String,
    pub patient_name: String,
    /// Display-formatted creation timestamp.
    pub created_at: String,
    pub chief_complaint: String,
    pub soap: SoapNote,
}

/// Errors from the save pipeline.
#[derive(Debug)]
pub enum SaveError {
    /// The note failed pre-save validation and never reached the store.
    Validation(String),
    /// The record store rejected the snapshot; local state is unchanged.
    Persistence(PersistError),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Validation(e) => write!(f, "note failed validation: {}", e),
            SaveError::Persistence(e) => write!(f, "failed to persist record: {}", e),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Validation(_) => None,
            SaveError::Persistence(e) => Some(e),
        }
    }
}

/// Ordered collection of saved records plus the current selection.
///
/// Records are kept most-recent-first. The selection, when set, always
/// names an existing record: `select` refuses unknown ids and `reset`
/// clears it.
pub struct RecordVersionManager {
    records: Vec<SavedRecord>,
    selected: Option<RecordId>,
    last_issued: u64,
    require_nonempty_note: bool,
}

impl RecordVersionManager {
    pub fn new(require_nonempty_note: bool) -> Self {
        Self {
            records: Vec::new(),
            selected: None,
            last_issued: 0,
            require_nonempty_note,
        }
    }

    pub fn records(&self) -> &[SavedRecord] {
        &self.records
    }

    pub fn selected(&self) -> Option<RecordId> {
        self.selected
    }

    /// Snapshot `note` into the collection.
    ///
    /// With a selected record the snapshot keeps its id and replaces it in
    /// place (collection length and order unchanged); otherwise a new id is
    /// issued, the record is prepended, and it becomes the selection. The
    /// store persists before the local merge — on failure nothing local
    /// changes and the error is returned for the caller to surface.
    pub fn save(
        &mut self,
        note: &ClinicalNote,
        patient: &PatientContext,
        store: &mut dyn RecordStore,
    ) -> Result<SavedRecord, SaveError> {
        if self.require_nonempty_note && note.is_empty() {
            return Err(SaveError::Validation(
                "chief complaint and all SOAP sections are empty".to_string(),
            ));
        }

        let overwriting = self
            .selected
            .and_then(|id| self.position(id).map(|pos| (id, pos)));
        let id = match overwriting {
            Some((id, _)) => id,
            None => self.next_id(),
        };

        let record = SavedRecord {
            id,
            patient_id: patient.chart_id.clone(),
            patient_name: patient.display_name.clone(),
            created_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            chief_complaint: note.chief_complaint.clone(),
            soap: note.soap.clone(),
        };

        store.persist(&record).map_err(SaveError::Persistence)?;

        match overwriting {
            Some((_, pos)) => {
                self.records[pos] = record.clone();
                log::info!("record {}: overwritten in place", id);
            }
            None => {
                self.records.insert(0, record.clone());
                self.selected = Some(id);
                log::info!("record {}: created ({} total)", id, self.records.len());
            }
        }

        Ok(record)
    }

    /// Load a record's content into a fresh note for editing and make it
    /// the selection. The stored record is untouched until the next save.
    /// Unknown ids leave the selection unchanged and return `None`.
    pub fn select(&mut self, id: RecordId) -> Option<ClinicalNote> {
        let record = self.records.iter().find(|r| r.id == id)?;
        self.selected = Some(id);
        Some(ClinicalNote {
            chief_complaint: record.chief_complaint.clone(),
            soap: record.soap.clone(),
        })
    }

    /// Clear the selection: the next save creates a new record. Callers
    /// pair this with resetting the note they are editing.
    pub fn reset(&mut self) {
        self.selected = None;
    }

    /// Records for one patient, in collection order. Without an active
    /// patient context the full collection is returned.
    pub fn filter_by_patient<'a>(
        &'a self,
        patient_id: Option<&'a str>,
    ) -> impl Iterator<Item = &'a SavedRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| patient_id.map_or(true, |id| record.patient_id == id))
    }

    fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Millisecond wall clock, bumped past the last issued id when two
    /// saves land in the same millisecond.
    fn next_id(&mut self) -> RecordId {
        let now = Local::now().timestamp_millis().max(0) as u64;
        let id = now.max(self.last_issued + 1);
        self.last_issued = id;
        RecordId(id)
    }
}

impl Default for RecordVersionManager {
    fn default() -> Self {
        Self::new(true)
    }
}
