//! Core text pipeline for the voice lecture engine.
//!
//! Turns a LaTeX-flavored lecture summary into a speech-ready script,
//! extracts semantic anchors (student questions, professor tricks, math
//! proofs, key concepts) from it, and estimates playback progress so
//! anchors can be fired against a live audio byte stream.

pub mod anchors;
pub mod normalize;
pub mod progress;

use serde::{Deserialize, Serialize};

/// Classification of a semantic anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorType {
    Concept,
    StudentQuestion,
    ProfTrick,
    MathProof,
}

impl AnchorType {
    /// Fixed human-readable label per anchor type.
    pub fn label(&self) -> &'static str {
        match self {
            AnchorType::Concept => "Concept",
            AnchorType::StudentQuestion => "Student Question",
            AnchorType::ProfTrick => "Professor Trick",
            AnchorType::MathProof => "Math Proof",
        }
    }

    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorType::Concept => "concept",
            AnchorType::StudentQuestion => "student_question",
            AnchorType::ProfTrick => "prof_trick",
            AnchorType::MathProof => "math_proof",
        }
    }
}

impl std::fmt::Display for AnchorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic marker that can be used to sync content state with audio.
///
/// Spans are byte offsets into the normalized script text, with
/// `span_start < span_end <= text.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticAnchor {
    pub anchor_id: String,
    pub anchor_type: AnchorType,
    pub span_start: usize,
    pub span_end: usize,
    pub label: String,
    pub text: String,
}

/// Parsed teaching script generated from LaTeX summary source.
///
/// Immutable after creation; scoped to a single synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeachingScript {
    pub text: String,
    pub anchors: Vec<SemanticAnchor>,
}

/// Convert LaTeX-heavy summary text into a speech-ready script plus anchors.
///
/// Never fails: malformed LaTeX degrades to pass-through text and a
/// sentence that matches no marker simply produces no anchor.
pub fn latex_to_teaching_script(latex_summary: &str) -> TeachingScript {
    let text = normalize::normalize(latex_summary);
    let anchors = anchors::extract(&text);
    TeachingScript { text, anchors }
}
