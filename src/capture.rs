//! Capture collaborator boundary.
//!
//! The core never touches a microphone. A host-supplied [`CaptureSource`]
//! produces already-transcribed text and reports through [`CaptureEvent`]
//! values sent into the dictation channel — the result/error/end callbacks
//! of host speech APIs, reshaped as messages so the state machine stays
//! testable without a real device.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// One transcript chunk from the capture source.
///
/// Interim entries are transient UI feedback and are never merged into the
/// note; only final entries carry text the session acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,
    #[serde(rename = "isFinal")]
    pub is_final: bool,
}

impl TranscriptEntry {
    /// An interim (still revisable) entry.
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    /// A final (complete and stable) entry.
    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Runtime error codes reported by the capture source.
///
/// Mirrors the error codes of host speech-recognition APIs. All of these are
/// recoverable: the session returns to Idle and the caller may start again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureErrorCode {
    /// No speech was detected before the host's silence timeout.
    NoSpeech,
    /// Audio capture failed (no microphone, device busy).
    AudioCapture,
    /// The user or host denied capture permission.
    NotAllowed,
    /// The host's recognition backend was unreachable.
    Network,
    /// Capture was aborted by the host.
    Aborted,
    /// Any other host-specific code, passed through verbatim.
    Other(String),
}

impl CaptureErrorCode {
    /// Parse a host-reported code string.
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => CaptureErrorCode::NoSpeech,
            "audio-capture" => CaptureErrorCode::AudioCapture,
            "not-allowed" => CaptureErrorCode::NotAllowed,
            "network" => CaptureErrorCode::Network,
            "aborted" => CaptureErrorCode::Aborted,
            other => CaptureErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CaptureErrorCode::NoSpeech => "no-speech",
            CaptureErrorCode::AudioCapture => "audio-capture",
            CaptureErrorCode::NotAllowed => "not-allowed",
            CaptureErrorCode::Network => "network",
            CaptureErrorCode::Aborted => "aborted",
            CaptureErrorCode::Other(code) => code,
        }
    }
}

impl std::fmt::Display for CaptureErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events produced by the capture source.
///
/// Every event names the capture it belongs to so stale deliveries — a
/// result arriving after the session moved on — can be dropped.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// A batch of transcript entries (interim and/or final).
    Results {
        capture_id: Uuid,
        entries: Vec<TranscriptEntry>,
    },
    /// The source hit a runtime error. Its terminal `Ended` still follows.
    Error {
        capture_id: Uuid,
        code: CaptureErrorCode,
    },
    /// The source stopped (explicit stop, silence timeout, or after error).
    Ended { capture_id: Uuid },
}

impl CaptureEvent {
    /// The capture this event belongs to.
    pub fn capture_id(&self) -> Uuid {
        match self {
            CaptureEvent::Results { capture_id, .. } => *capture_id,
            CaptureEvent::Error { capture_id, .. } => *capture_id,
            CaptureEvent::Ended { capture_id } => *capture_id,
        }
    }
}

/// No capture capability exists on the host.
///
/// Fatal for the session that tried to start, not for the process: the note
/// being edited is untouched and direct edits keep working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureUnsupported;

impl std::fmt::Display for CaptureUnsupported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "speech capture is not supported on this host")
    }
}

impl std::error::Error for CaptureUnsupported {}

/// Start parameters handed to the capture source.
///
/// The locale tag is opaque to the core; the source forwards it to whatever
/// recognition backend it wraps.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub capture_id: Uuid,
    pub locale_tag: String,
}

/// A source of streaming transcription results.
///
/// Implementations wrap a host speech API. Events for a capture are sent
/// through the channel handed to `start`, tagged with the request's capture
/// id.
pub trait CaptureSource: Send + 'static {
    /// Begin capturing. Fails immediately when the host has no capture
    /// capability; runtime problems after a successful start are reported
    /// as [`CaptureEvent::Error`] instead.
    fn start(
        &mut self,
        request: CaptureRequest,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Result<(), CaptureUnsupported>;

    /// Request capture stop. Termination is reported asynchronously via
    /// [`CaptureEvent::Ended`], not synchronously.
    fn stop(&mut self, capture_id: Uuid);
}

/// One step of a scripted capture, replayed in order on `start`.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Results(Vec<TranscriptEntry>),
    Error(CaptureErrorCode),
    End,
}

/// Capture source that replays scripted events instead of listening to a
/// device. Each `start` consumes the next queued script and tags its events
/// with the real capture id; `stop` emits the terminal `Ended` event the
/// way real backends do. Sufficient to drive every session path in tests
/// and headless hosts.
#[derive(Default)]
pub struct ScriptedCapture {
    scripts: VecDeque<Vec<ScriptStep>>,
    unsupported: bool,
    started: Vec<CaptureRequest>,
    stopped: Vec<Uuid>,
    live: Option<(Uuid, mpsc::Sender<CaptureEvent>)>,
}

impl ScriptedCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose `start` always fails with [`CaptureUnsupported`].
    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::default()
        }
    }

    /// Queue the script the next `start` will replay.
    pub fn push_script(&mut self, steps: Vec<ScriptStep>) {
        self.scripts.push_back(steps);
    }

    /// Requests seen so far, in order.
    pub fn started(&self) -> &[CaptureRequest] {
        &self.started
    }

    /// Capture ids `stop` was called with, in order.
    pub fn stopped(&self) -> &[Uuid] {
        &self.stopped
    }
}

impl CaptureSource for ScriptedCapture {
    fn start(
        &mut self,
        request: CaptureRequest,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Result<(), CaptureUnsupported> {
        if self.unsupported {
            return Err(CaptureUnsupported);
        }

        let capture_id = request.capture_id;
        for step in self.scripts.pop_front().unwrap_or_default() {
            let event = match step {
                ScriptStep::Results(entries) => CaptureEvent::Results {
                    capture_id,
                    entries,
                },
                ScriptStep::Error(code) => CaptureEvent::Error { capture_id, code },
                ScriptStep::End => CaptureEvent::Ended { capture_id },
            };
            if events.try_send(event).is_err() {
                log::warn!("scripted capture: event channel full, dropping step");
            }
        }

        self.live = Some((capture_id, events));
        self.started.push(request);
        Ok(())
    }

    fn stop(&mut self, capture_id: Uuid) {
        self.stopped.push(capture_id);
        if let Some((live_id, events)) = &self.live {
            if *live_id == capture_id {
                let _ = events.try_send(CaptureEvent::Ended { capture_id });
            }
        }
    }
}
