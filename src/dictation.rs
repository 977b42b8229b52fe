//! Dictation coordinator.
//!
//! [`DictationManager`] owns the note being edited, one
//! [`DictationSession`] per capture target, and the capture source. It
//! enforces the single-Listening invariant (starting a target force-stops
//! whichever session currently holds the device), routes capture events to
//! the session that owns them, and runs finalized SOAP text through
//! segmentation and classification before merging it into the note.
//!
//! All work is event-driven and runs to completion: the host either calls
//! [`DictationManager::handle_event`] directly or drives the async
//! [`DictationManager::run_loop`] over the capture event channel.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::capture::{
    CaptureErrorCode, CaptureEvent, CaptureRequest, CaptureSource, CaptureUnsupported,
};
use crate::classifier::classify;
use crate::note::{apply_classified, ClinicalNote, NoteCategory};
use crate::segmenter::segment;
use crate::session::{DictationSession, DictationTarget, SessionReaction, SessionStatus};
use crate::settings::Locale;

/// Capacity of the capture event channel. Capture sources deliver small
/// batches; a stalled consumer loses events rather than blocking the host's
/// speech callback.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// What a processed capture event did, for hosts that surface progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictationUpdate {
    /// Final text was merged into the note.
    Merged { target: DictationTarget },
    /// The capture source failed; the session returns to Idle on its
    /// terminal end event and the caller may start again.
    CaptureFailed {
        target: DictationTarget,
        code: CaptureErrorCode,
    },
    /// A session finished and is Idle again.
    SessionEnded { target: DictationTarget },
    /// Interim-only, stale, or unroutable event — nothing changed.
    Ignored,
}

/// Owns the in-progress note and coordinates dictation into it.
pub struct DictationManager<C: CaptureSource> {
    note: ClinicalNote,
    complaint: DictationSession,
    soap: DictationSession,
    capture: C,
    locale: Locale,
    events_tx: mpsc::Sender<CaptureEvent>,
}

impl<C: CaptureSource> DictationManager<C> {
    /// Build a manager around a capture source. The returned receiver is
    /// the capture event channel; feed it to [`Self::run_loop`] or drain it
    /// into [`Self::handle_event`].
    pub fn new(capture: C, locale: Locale) -> (Self, mpsc::Receiver<CaptureEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let manager = Self {
            note: ClinicalNote::new(),
            complaint: DictationSession::new(DictationTarget::ChiefComplaint),
            soap: DictationSession::new(DictationTarget::SoapBuffer),
            capture,
            locale,
            events_tx,
        };
        (manager, events_rx)
    }

    pub fn note(&self) -> &ClinicalNote {
        &self.note
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn session_status(&self, target: DictationTarget) -> SessionStatus {
        self.session(target).status()
    }

    /// Start dictating into `target`.
    ///
    /// At most one session may be Listening system-wide: any session
    /// currently holding the device is forced to Idle (and its capture
    /// stopped) before the new capture starts, so fragments from two
    /// targets can never interleave. Fails with [`CaptureUnsupported`] when
    /// the host has no capture capability; every session is then Idle.
    pub fn start(&mut self, target: DictationTarget) -> Result<(), CaptureUnsupported> {
        for t in [DictationTarget::ChiefComplaint, DictationTarget::SoapBuffer] {
            let session = self.session_mut(t);
            if session.is_listening() {
                let stale = session.capture_id();
                session.force_idle();
                if let Some(id) = stale {
                    self.capture.stop(id);
                }
            }
        }

        let capture_id = Uuid::new_v4();
        let request = CaptureRequest {
            capture_id,
            locale_tag: self.locale.capture_tag().to_string(),
        };
        self.capture.start(request, self.events_tx.clone())?;
        self.session_mut(target).begin(capture_id);
        Ok(())
    }

    /// Request a graceful stop of whichever session is Listening. The
    /// session stays Listening until the capture source's end event
    /// arrives; results delivered in between are still merged.
    pub fn stop(&mut self) {
        for t in [DictationTarget::ChiefComplaint, DictationTarget::SoapBuffer] {
            let session = self.session(t);
            if session.is_listening() {
                if let Some(id) = session.capture_id() {
                    log::info!("session [{}]: stop requested", t.label());
                    self.capture.stop(id);
                }
            }
        }
    }

    /// Feed one capture event through the owning session and merge any
    /// resulting final text. Safe against stale deliveries — events no
    /// session recognizes are dropped.
    pub fn handle_event(&mut self, event: CaptureEvent) -> DictationUpdate {
        let Some(target) = self.route(&event) else {
            log::debug!("dictation: dropping unroutable capture event");
            return DictationUpdate::Ignored;
        };

        match self.session_mut(target).handle_event(&event) {
            SessionReaction::FinalText(text) => {
                self.merge_final(target, &text);
                DictationUpdate::Merged { target }
            }
            SessionReaction::Failed(code) => DictationUpdate::CaptureFailed { target, code },
            SessionReaction::Stopped => DictationUpdate::SessionEnded { target },
            SessionReaction::None => DictationUpdate::Ignored,
        }
    }

    /// Consume the capture event channel until every sender is gone.
    pub async fn run_loop(&mut self, events_rx: &mut mpsc::Receiver<CaptureEvent>) {
        log::info!("dictation event loop started");
        while let Some(event) = events_rx.recv().await {
            self.handle_event(event);
        }
        log::info!("dictation event loop ended");
    }

    /// Replace one SOAP buffer wholesale (direct user edit). Supersedes any
    /// in-flight classification aimed at that buffer.
    pub fn set_soap_buffer(&mut self, category: NoteCategory, text: impl Into<String>) {
        *self.note.soap.get_mut(category) = text.into();
    }

    /// Replace the chief complaint wholesale (direct user edit).
    pub fn set_chief_complaint(&mut self, text: impl Into<String>) {
        self.note.chief_complaint = text.into();
    }

    /// Load a note for editing (e.g. a saved record selected for revision).
    pub fn load_note(&mut self, note: ClinicalNote) {
        self.note = note;
    }

    /// Discard the in-progress note (new record, patient switch).
    pub fn reset_note(&mut self) {
        self.note = ClinicalNote::new();
    }

    fn session(&self, target: DictationTarget) -> &DictationSession {
        match target {
            DictationTarget::ChiefComplaint => &self.complaint,
            DictationTarget::SoapBuffer => &self.soap,
        }
    }

    fn session_mut(&mut self, target: DictationTarget) -> &mut DictationSession {
        match target {
            DictationTarget::ChiefComplaint => &mut self.complaint,
            DictationTarget::SoapBuffer => &mut self.soap,
        }
    }

    /// Which target's session owns this event's capture id, if any.
    fn route(&self, event: &CaptureEvent) -> Option<DictationTarget> {
        let id = event.capture_id();
        if self.complaint.capture_id() == Some(id) {
            Some(DictationTarget::ChiefComplaint)
        } else if self.soap.capture_id() == Some(id) {
            Some(DictationTarget::SoapBuffer)
        } else {
            None
        }
    }

    fn merge_final(&mut self, target: DictationTarget, text: &str) {
        match target {
            DictationTarget::ChiefComplaint => {
                self.note.append_chief_complaint(text);
                log::debug!("merged {} chars into chief complaint", text.len());
            }
            DictationTarget::SoapBuffer => {
                let classified = segment(text).map(|fragment| (classify(fragment), fragment));
                self.note = apply_classified(classified, &self.note);
                log::debug!("classified {} chars into SOAP buffers", text.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ScriptStep, ScriptedCapture, TranscriptEntry};

    fn manager_with(
        capture: ScriptedCapture,
    ) -> (
        DictationManager<ScriptedCapture>,
        mpsc::Receiver<CaptureEvent>,
    ) {
        DictationManager::new(capture, Locale::Korean)
    }

    fn drain(
        manager: &mut DictationManager<ScriptedCapture>,
        events_rx: &mut mpsc::Receiver<CaptureEvent>,
    ) -> Vec<DictationUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = events_rx.try_recv() {
            updates.push(manager.handle_event(event));
        }
        updates
    }

    #[test]
    fn test_soap_dictation_classifies_into_buffers() {
        let mut capture = ScriptedCapture::new();
        capture.push_script(vec![
            ScriptStep::Results(vec![TranscriptEntry::finalized(
                "두통이 있어요. 혈압은 140에 90입니다.",
            )]),
            ScriptStep::End,
        ]);
        let (mut manager, mut events_rx) = manager_with(capture);

        manager.start(DictationTarget::SoapBuffer).unwrap();
        drain(&mut manager, &mut events_rx);

        assert_eq!(manager.note().soap.subjective, "두통이 있어요");
        assert_eq!(manager.note().soap.objective, "혈압은 140에 90입니다");
        assert_eq!(
            manager.session_status(DictationTarget::SoapBuffer),
            SessionStatus::Idle
        );
    }

    #[test]
    fn test_chief_complaint_dictation_appends_raw() {
        let mut capture = ScriptedCapture::new();
        capture.push_script(vec![
            ScriptStep::Results(vec![TranscriptEntry::finalized("머리가 아파서 왔어요")]),
            ScriptStep::Results(vec![TranscriptEntry::finalized("어제부터요")]),
            ScriptStep::End,
        ]);
        let (mut manager, mut events_rx) = manager_with(capture);

        manager.start(DictationTarget::ChiefComplaint).unwrap();
        drain(&mut manager, &mut events_rx);

        // Raw append, space-joined, no classification
        assert_eq!(manager.note().chief_complaint, "머리가 아파서 왔어요 어제부터요");
        assert!(manager.note().soap.is_empty());
    }

    #[test]
    fn test_interim_results_are_not_merged() {
        let mut capture = ScriptedCapture::new();
        capture.push_script(vec![
            ScriptStep::Results(vec![TranscriptEntry::interim("두통")]),
            ScriptStep::End,
        ]);
        let (mut manager, mut events_rx) = manager_with(capture);

        manager.start(DictationTarget::SoapBuffer).unwrap();
        let updates = drain(&mut manager, &mut events_rx);

        assert!(manager.note().is_empty());
        assert!(updates.contains(&DictationUpdate::Ignored));
    }

    #[test]
    fn test_starting_second_target_forces_first_to_idle() {
        let mut capture = ScriptedCapture::new();
        capture.push_script(vec![]);
        capture.push_script(vec![]);
        let (mut manager, _events_rx) = manager_with(capture);

        manager.start(DictationTarget::SoapBuffer).unwrap();
        let first_id = manager.capture().started()[0].capture_id;
        assert!(manager.session_status(DictationTarget::SoapBuffer) == SessionStatus::Listening);

        manager.start(DictationTarget::ChiefComplaint).unwrap();

        assert_eq!(
            manager.session_status(DictationTarget::SoapBuffer),
            SessionStatus::Idle
        );
        assert_eq!(
            manager.session_status(DictationTarget::ChiefComplaint),
            SessionStatus::Listening
        );
        // The first capture was stopped before the second started
        assert_eq!(manager.capture().stopped(), &[first_id]);
        assert_eq!(manager.capture().started().len(), 2);
    }

    #[test]
    fn test_unsupported_capture_fails_start_and_stays_idle() {
        let (mut manager, _events_rx) = manager_with(ScriptedCapture::unsupported());

        let result = manager.start(DictationTarget::SoapBuffer);

        assert_eq!(result, Err(CaptureUnsupported));
        assert_eq!(
            manager.session_status(DictationTarget::SoapBuffer),
            SessionStatus::Idle
        );
    }

    #[test]
    fn test_capture_error_surfaces_and_session_recovers() {
        let mut capture = ScriptedCapture::new();
        capture.push_script(vec![
            ScriptStep::Error(CaptureErrorCode::NotAllowed),
            ScriptStep::End,
        ]);
        let (mut manager, mut events_rx) = manager_with(capture);

        manager.start(DictationTarget::SoapBuffer).unwrap();

        let first = events_rx.try_recv().unwrap();
        let update = manager.handle_event(first);
        assert_eq!(
            update,
            DictationUpdate::CaptureFailed {
                target: DictationTarget::SoapBuffer,
                code: CaptureErrorCode::NotAllowed,
            }
        );
        assert_eq!(
            manager.session_status(DictationTarget::SoapBuffer),
            SessionStatus::Erroring
        );

        let second = events_rx.try_recv().unwrap();
        let update = manager.handle_event(second);
        assert_eq!(
            update,
            DictationUpdate::SessionEnded {
                target: DictationTarget::SoapBuffer,
            }
        );
        assert_eq!(
            manager.session_status(DictationTarget::SoapBuffer),
            SessionStatus::Idle
        );
        // The note in progress is never discarded on error
        assert!(manager.note().is_empty());
    }

    #[test]
    fn test_direct_edit_replaces_buffer() {
        let (mut manager, _events_rx) = manager_with(ScriptedCapture::new());
        manager.set_soap_buffer(NoteCategory::Plan, "처방전 참조");
        manager.set_soap_buffer(NoteCategory::Plan, "수정된 계획");
        assert_eq!(manager.note().soap.plan, "수정된 계획");

        manager.set_chief_complaint("두통");
        assert_eq!(manager.note().chief_complaint, "두통");
    }

    #[test]
    fn test_reset_note_clears_everything() {
        let (mut manager, _events_rx) = manager_with(ScriptedCapture::new());
        manager.set_chief_complaint("두통");
        manager.set_soap_buffer(NoteCategory::Assessment, "긴장성 두통 의심");
        manager.reset_note();
        assert!(manager.note().is_empty());
    }

    #[tokio::test]
    async fn test_run_loop_drains_until_senders_drop() {
        let mut capture = ScriptedCapture::new();
        capture.push_script(vec![
            ScriptStep::Results(vec![TranscriptEntry::finalized("기침이 나요")]),
            ScriptStep::End,
        ]);
        let (mut manager, mut events_rx) = manager_with(capture);

        manager.start(DictationTarget::SoapBuffer).unwrap();
        // ScriptedCapture holds a sender clone; time out instead of waiting
        // for it to drop.
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            manager.run_loop(&mut events_rx),
        )
        .await;

        assert_eq!(manager.note().soap.subjective, "기침이 나요");
    }
}
