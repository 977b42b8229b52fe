//! Dictation session state machine.
//!
//! One session wraps one capture target and moves through
//! `Idle → Listening → (Idle | Erroring → Idle)`. All capture callbacks
//! funnel through [`DictationSession::handle_event`], which is re-entrancy
//! safe: events carrying a stale capture id, or arriving while the session
//! is not in a state that can use them, are dropped.
//!
//! Sessions never touch the note. They distill capture events into
//! [`SessionReaction`]s and leave merging to the owning manager.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::{CaptureErrorCode, CaptureEvent, TranscriptEntry};

/// What a session is dictating into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DictationTarget {
    /// Free-text chief complaint; final text is appended raw.
    ChiefComplaint,
    /// SOAP buffers; final text is segmented and classified.
    SoapBuffer,
}

impl DictationTarget {
    pub fn label(&self) -> &'static str {
        match self {
            DictationTarget::ChiefComplaint => "chief complaint",
            DictationTarget::SoapBuffer => "SOAP buffer",
        }
    }
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Listening,
    /// A capture error was reported; the collaborator's terminal end event
    /// completes the transition back to Idle.
    Erroring,
}

/// Outcome of feeding one capture event to a session.
///
/// The owning manager acts on these; `None` means the event was
/// interim-only, stale, or arrived out of state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionReaction {
    /// Concatenated final text, ready to merge into the target.
    FinalText(String),
    /// The capture source reported a runtime error; the session is Erroring.
    Failed(CaptureErrorCode),
    /// The capture ended; the session is Idle again.
    Stopped,
    None,
}

/// State machine for one capture target.
#[derive(Debug)]
pub struct DictationSession {
    target: DictationTarget,
    status: SessionStatus,
    capture_id: Option<Uuid>,
}

impl DictationSession {
    pub fn new(target: DictationTarget) -> Self {
        Self {
            target,
            status: SessionStatus::Idle,
            capture_id: None,
        }
    }

    pub fn target(&self) -> DictationTarget {
        self.target
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_listening(&self) -> bool {
        self.status == SessionStatus::Listening
    }

    /// The capture this session currently belongs to, if any.
    pub fn capture_id(&self) -> Option<Uuid> {
        self.capture_id
    }

    /// Mark the session Listening under `capture_id`. Called by the manager
    /// only after the capture source accepted the start request.
    pub(crate) fn begin(&mut self, capture_id: Uuid) {
        self.capture_id = Some(capture_id);
        self.status = SessionStatus::Listening;
        log::info!(
            "session [{}]: Listening (capture {})",
            self.target.label(),
            capture_id
        );
    }

    /// Synchronous forced stop, used when another target takes over the
    /// capture device. The capture id is kept so late events for it are
    /// recognized and dropped as stale.
    pub(crate) fn force_idle(&mut self) {
        if self.status != SessionStatus::Idle {
            log::info!("session [{}]: forced to Idle", self.target.label());
        }
        self.status = SessionStatus::Idle;
    }

    /// Feed one capture event through the session.
    pub fn handle_event(&mut self, event: &CaptureEvent) -> SessionReaction {
        let Some(current) = self.capture_id else {
            log::debug!(
                "session [{}]: dropping event with no capture bound",
                self.target.label()
            );
            return SessionReaction::None;
        };
        if event.capture_id() != current {
            log::debug!(
                "session [{}]: dropping stale event for capture {}",
                self.target.label(),
                event.capture_id()
            );
            return SessionReaction::None;
        }

        match (self.status, event) {
            (SessionStatus::Listening, CaptureEvent::Results { entries, .. }) => {
                let text = final_text(entries);
                if text.is_empty() {
                    // Interim-only batch: transient UI feedback, nothing to merge.
                    SessionReaction::None
                } else {
                    SessionReaction::FinalText(text)
                }
            }
            (SessionStatus::Listening, CaptureEvent::Error { code, .. }) => {
                log::warn!(
                    "session [{}]: capture error '{}'",
                    self.target.label(),
                    code
                );
                self.status = SessionStatus::Erroring;
                SessionReaction::Failed(code.clone())
            }
            (SessionStatus::Listening, CaptureEvent::Ended { .. })
            | (SessionStatus::Erroring, CaptureEvent::Ended { .. }) => {
                log::info!("session [{}]: Idle", self.target.label());
                self.status = SessionStatus::Idle;
                SessionReaction::Stopped
            }
            _ => {
                log::debug!(
                    "session [{}]: dropping {:?} event in {:?}",
                    self.target.label(),
                    event_kind(event),
                    self.status
                );
                SessionReaction::None
            }
        }
    }
}

/// Concatenate the text of final entries, in order, no separator — interim
/// entries are skipped entirely.
fn final_text(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .filter(|entry| entry.is_final)
        .map(|entry| entry.text.as_str())
        .collect()
}

fn event_kind(event: &CaptureEvent) -> &'static str {
    match event {
        CaptureEvent::Results { .. } => "results",
        CaptureEvent::Error { .. } => "error",
        CaptureEvent::Ended { .. } => "ended",
    }
}
