//! Clinical note model and accumulation rules.
//!
//! A note is a free-text chief complaint plus a four-part SOAP record.
//! Buffers only grow: classified fragments append on a new line, the chief
//! complaint appends space-joined. Accumulation never fails — classification
//! problems surface as text landing in the Subjective bucket, not as errors.

use serde::{Deserialize, Serialize};

/// The four sections of a SOAP note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteCategory {
    /// Patient-reported symptoms and history.
    Subjective,
    /// Measured or observed clinical findings.
    Objective,
    /// Diagnosis or clinical impression.
    Assessment,
    /// Treatment, prescriptions and follow-up.
    Plan,
}

impl NoteCategory {
    /// Evaluation order used by the classifier. Objective wins over
    /// Assessment, Assessment over Plan, Plan over Subjective; Subjective is
    /// also the fallback bucket for fragments nothing matches.
    pub fn priority_order() -> &'static [NoteCategory] {
        &[
            NoteCategory::Objective,
            NoteCategory::Assessment,
            NoteCategory::Plan,
            NoteCategory::Subjective,
        ]
    }

    /// Display label for this section.
    pub fn label(&self) -> &'static str {
        match self {
            NoteCategory::Subjective => "Subjective",
            NoteCategory::Objective => "Objective",
            NoteCategory::Assessment => "Assessment",
            NoteCategory::Plan => "Plan",
        }
    }
}

impl std::fmt::Display for NoteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The four persistent SOAP buffers.
///
/// Each buffer is a newline-joined accumulation of appended fragments in
/// insertion order — never reordered, never deduplicated, never truncated
/// except by an explicit reset or direct edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapNote {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

impl SoapNote {
    /// Read the buffer for one section.
    pub fn get(&self, category: NoteCategory) -> &str {
        match category {
            NoteCategory::Subjective => &self.subjective,
            NoteCategory::Objective => &self.objective,
            NoteCategory::Assessment => &self.assessment,
            NoteCategory::Plan => &self.plan,
        }
    }

    /// Mutable access to the buffer for one section.
    pub fn get_mut(&mut self, category: NoteCategory) -> &mut String {
        match category {
            NoteCategory::Subjective => &mut self.subjective,
            NoteCategory::Objective => &mut self.objective,
            NoteCategory::Assessment => &mut self.assessment,
            NoteCategory::Plan => &mut self.plan,
        }
    }

    /// Append a fragment to one section: `"\n" + fragment` when the buffer
    /// already has content, the fragment itself when it is empty.
    pub fn append(&mut self, category: NoteCategory, fragment: &str) {
        let buffer = self.get_mut(category);
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(fragment);
    }

    /// True when every section is empty.
    pub fn is_empty(&self) -> bool {
        self.subjective.is_empty()
            && self.objective.is_empty()
            && self.assessment.is_empty()
            && self.plan.is_empty()
    }
}

/// The note currently being edited: chief complaint plus SOAP buffers.
///
/// Owned by the active editing context and mutated only through the
/// accumulation operations here (or a direct buffer edit); reset to empty on
/// "new record" or patient switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalNote {
    pub chief_complaint: String,
    pub soap: SoapNote,
}

impl ClinicalNote {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the chief complaint and all four SOAP buffers are empty.
    pub fn is_empty(&self) -> bool {
        self.chief_complaint.is_empty() && self.soap.is_empty()
    }

    /// Append raw final transcript text to the chief complaint, space-joined.
    /// Chief-complaint dictation bypasses classification entirely.
    pub fn append_chief_complaint(&mut self, text: &str) {
        if !self.chief_complaint.is_empty() {
            self.chief_complaint.push(' ');
        }
        self.chief_complaint.push_str(text);
    }
}

/// Append classified fragments into a copy of `note`, in order.
///
/// Pure transform: the input note is untouched and an empty fragment
/// sequence returns an equal note.
pub fn apply_classified<'a, I>(fragments: I, note: &ClinicalNote) -> ClinicalNote
where
    I: IntoIterator<Item = (NoteCategory, &'a str)>,
{
    let mut updated = note.clone();
    for (category, fragment) in fragments {
        updated.soap.append(category, fragment);
    }
    updated
}
