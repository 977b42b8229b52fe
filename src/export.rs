//! Document renderer collaborator boundary.
//!
//! Turning a finished note into a downloadable artifact is delegated to a
//! host-supplied renderer. The core only owns the filename contract:
//! `<prefix>-<patientName>-<YYYYMMDDHHmmss>.<ext>` with a deterministic,
//! zero-padded timestamp component.

use chrono::{DateTime, Local};

use crate::note::ClinicalNote;
use crate::records::PatientContext;

/// The renderer could not produce a document.
#[derive(Debug, Clone)]
pub struct RenderError(pub String);

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to render document: {}", self.0)
    }
}

impl std::error::Error for RenderError {}

/// Renders a note into a binary document artifact (one-way collaborator).
pub trait DocumentRenderer {
    fn render(&self, note: &ClinicalNote, patient: &PatientContext) -> Result<Vec<u8>, RenderError>;
}

/// Zero-padded `YYYYMMDDHHmmss`, no separators.
pub fn compact_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// Suggested filename for a rendered document:
/// `<prefix>-<patientName>-<YYYYMMDDHHmmss>.<ext>`. The prefix is the
/// caller's (localized) document label; the extension comes without a dot.
pub fn suggested_filename(
    prefix: &str,
    patient_name: &str,
    at: DateTime<Local>,
    extension: &str,
) -> String {
    format!(
        "{}-{}-{}.{}",
        prefix,
        patient_name,
        compact_timestamp(at),
        extension
    )
}
