//! Semantic anchor extraction.
//!
//! Scans normalized script text sentence by sentence and classifies each
//! sentence with first-match priority: student question, professor
//! trick, math-heavy proof, then key concept. Sentences matching nothing
//! produce no anchor.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{AnchorType, SemanticAnchor};

/// A sentence is everything up to and including its `.`, `!` or `?`.
static SENTENCE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+[.!?]?").unwrap());

static STUDENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\ba student asked\b").unwrap(),
        Regex::new(r"\bstudent question\b").unwrap(),
    ]
});

static TRICK_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| vec![Regex::new(r"\bprof(?:essor)?'?s trick\b").unwrap()]);

const CONCEPT_MARKERS: [&str; 3] = ["core concept", "important point", "key idea"];

/// Spoken math-operator tokens produced by the normalizer. Two or more
/// distinct tokens in one sentence mark it as math-heavy.
const MATH_TOKENS: [&str; 8] = [
    " equals ",
    " plus ",
    " minus ",
    " over ",
    " square root ",
    " squared",
    " cubed",
    " to the power of ",
];

/// Extract ordered anchors from normalized text.
///
/// Anchors are emitted in text order, which doubles as their canonical
/// sort order by ascending `span_end`.
pub fn extract(normalized_text: &str) -> Vec<SemanticAnchor> {
    let mut anchors = Vec::new();

    for sentence_match in SENTENCE_PATTERN.find_iter(normalized_text) {
        let sentence = sentence_match.as_str().trim();
        if sentence.is_empty() {
            continue;
        }

        let lower = sentence.to_lowercase();
        let Some(anchor_type) = classify(&lower) else {
            continue;
        };

        anchors.push(SemanticAnchor {
            anchor_id: format!("anchor_{}", anchors.len() + 1),
            anchor_type,
            span_start: sentence_match.start(),
            span_end: sentence_match.end(),
            label: anchor_type.label().to_string(),
            text: sentence.to_string(),
        });
    }

    anchors
}

fn classify(sentence_lower: &str) -> Option<AnchorType> {
    if STUDENT_PATTERNS.iter().any(|p| p.is_match(sentence_lower)) {
        return Some(AnchorType::StudentQuestion);
    }
    if TRICK_PATTERNS.iter().any(|p| p.is_match(sentence_lower)) {
        return Some(AnchorType::ProfTrick);
    }
    if is_math_heavy(sentence_lower) {
        return Some(AnchorType::MathProof);
    }
    if CONCEPT_MARKERS.iter().any(|m| sentence_lower.contains(m)) {
        return Some(AnchorType::Concept);
    }
    None
}

fn is_math_heavy(sentence_lower: &str) -> bool {
    MATH_TOKENS
        .iter()
        .filter(|token| sentence_lower.contains(*token))
        .count()
        >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_student_question_first() {
        // Matches both a student marker and math tokens; student wins.
        let text = "A student asked why a plus b equals c.";
        let anchors = extract(text);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].anchor_type, AnchorType::StudentQuestion);
        assert_eq!(anchors[0].label, "Student Question");
    }

    #[test]
    fn classifies_prof_trick_variants() {
        for text in ["The prof's trick is substitution.", "The professor's trick helps."] {
            let anchors = extract(text);
            assert_eq!(anchors.len(), 1, "no anchor for {text:?}");
            assert_eq!(anchors[0].anchor_type, AnchorType::ProfTrick);
        }
    }

    #[test]
    fn math_heavy_needs_two_distinct_tokens() {
        assert!(extract("Here a plus b makes a sum.").is_empty());
        let anchors = extract("Here a plus b equals c.");
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].anchor_type, AnchorType::MathProof);
    }

    #[test]
    fn classifies_concept_markers() {
        let anchors = extract("The key idea is momentum conservation.");
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].anchor_type, AnchorType::Concept);
        assert_eq!(anchors[0].label, "Concept");
    }

    #[test]
    fn unmatched_sentences_produce_no_anchor() {
        assert!(extract("Nothing remarkable happens here.").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn anchors_are_ordered_with_valid_spans() {
        let text = "The key idea is inertia. Plain filler sentence here. \
                    A student asked about friction! The prof's trick is symmetry.";
        let anchors = extract(text);
        assert_eq!(anchors.len(), 3);
        assert_eq!(anchors[0].anchor_id, "anchor_1");
        assert_eq!(anchors[1].anchor_id, "anchor_2");
        assert_eq!(anchors[2].anchor_id, "anchor_3");

        let mut prev_end = 0;
        for anchor in &anchors {
            assert!(anchor.span_start < anchor.span_end);
            assert!(anchor.span_end <= text.len());
            assert!(anchor.span_end >= prev_end, "anchors out of text order");
            prev_end = anchor.span_end;
        }
    }

    #[test]
    fn extraction_is_idempotent_on_normalized_text() {
        let text = "A student asked about limits. The key idea is continuity.";
        let first = extract(text);
        let second = extract(text);
        assert_eq!(first, second);
    }
}
