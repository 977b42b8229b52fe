//! Streaming dictation into structured SOAP clinical notes.
//!
//! This crate is the headless core of a clinical documentation tool: it
//! routes live speech-recognition results into a structured note (chief
//! complaint plus Subjective/Objective/Assessment/Plan buffers) and manages
//! the versioned collection of saved records per patient encounter.
//!
//! # Architecture
//!
//! ```text
//! CaptureSource ──▶ CaptureEvent channel ──▶ DictationSession (per target)
//!                                                    │ final text
//!                                                    ▼
//!                              Segmenter ──▶ Classifier ──▶ ClinicalNote
//!                                                                │ save
//!                                                                ▼
//!                              RecordStore ◀── RecordVersionManager
//! ```
//!
//! Capture, persistence and document rendering are host-supplied
//! collaborators behind traits; the scripted capture source in [`capture`]
//! drives every dictation path without a real device.

pub mod capture;
pub mod classifier;
pub mod dictation;
pub mod export;
pub mod note;
pub mod records;
pub mod segmenter;
pub mod session;
pub mod settings;
pub mod store;

pub use capture::{
    CaptureErrorCode, CaptureEvent, CaptureRequest, CaptureSource, CaptureUnsupported,
    ScriptStep, ScriptedCapture, TranscriptEntry,
};
pub use classifier::classify;
pub use dictation::{DictationManager, DictationUpdate};
pub use export::{compact_timestamp, suggested_filename, DocumentRenderer, RenderError};
pub use note::{apply_classified, ClinicalNote, NoteCategory, SoapNote};
pub use records::{
    PatientContext, RecordId, RecordVersionManager, SaveError, SavedRecord,
};
pub use segmenter::segment;
pub use session::{DictationSession, DictationTarget, SessionReaction, SessionStatus};
pub use settings::{load_settings, save_settings, AppSettings, Locale};
pub use store::{MemoryRecordStore, PersistError, RecordStore};
