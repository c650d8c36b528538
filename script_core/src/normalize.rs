//! LaTeX-to-spoken-text normalization.
//!
//! Converts the math markup found in lecture summaries (`\frac`, `\sqrt`,
//! exponents, bare operators) into words a TTS voice can read, and strips
//! common escape sequences. The normalizer never fails: constructs it
//! cannot parse are left in place.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Safety limit on substitution passes for nested constructs. Input
/// nested deeper than this is passed through unconverted.
const MAX_REWRITE_PASSES: usize = 10;

static FRAC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\frac\{([^{}]+)\}\{([^{}]+)\}").unwrap());

static SQRT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\sqrt\{([^{}]+)\}").unwrap());

static EXPONENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9)\]])\s*\^\s*(?:\{([^{}]+)\}|([A-Za-z0-9]+))").unwrap());

// Operators are only spoken when they sit directly between two
// alphanumeric/parenthesis tokens, so unrelated hyphens and punctuation
// stay untouched. The replacement re-emits both neighbor characters.
static PLUS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9)])\s*\+\s*([A-Za-z0-9(])").unwrap());

static EQUALS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9)])\s*=\s*([A-Za-z0-9(])").unwrap());

static MINUS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9)])\s*-\s*([A-Za-z0-9(])").unwrap());

static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize LaTeX markup into speech-ready text.
///
/// Deterministic and pure. The substitution order matters: fractions and
/// roots are expanded before exponents, and operators are spoken last so
/// they also catch the `+`/`=` signs that appear inside expanded
/// fraction numerators.
pub fn normalize(latex_text: &str) -> String {
    let text = strip_escapes(latex_text);
    let text = rewrite_bounded(&FRAC_PATTERN, "$1 over $2", text);
    let text = rewrite_bounded(&SQRT_PATTERN, "square root of $1", text);
    let text = replace_exponents(&text);
    let text = replace_operators(text);
    collapse_whitespace(&text)
}

fn strip_escapes(text: &str) -> String {
    text.replace("\\n", " ")
        .replace("\\%", " percent")
        .replace("\\$", " dollar")
        .replace('`', "'")
        .trim()
        .to_string()
}

/// Apply `pattern -> replacement` repeatedly until a fixed point, bounded
/// by [`MAX_REWRITE_PASSES`]. One pass handles one nesting level of
/// `\frac`/`\sqrt`; the operator patterns also need re-scanning because
/// each match consumes its right-hand neighbor character.
fn rewrite_bounded(pattern: &Regex, replacement: &str, mut text: String) -> String {
    for _ in 0..MAX_REWRITE_PASSES {
        match pattern.replace_all(&text, replacement) {
            // Borrowed means nothing matched: fixed point reached.
            Cow::Borrowed(_) => break,
            Cow::Owned(next) => text = next,
        }
    }
    text
}

fn replace_exponents(text: &str) -> String {
    EXPONENT_PATTERN
        .replace_all(text, |caps: &Captures| {
            let base = &caps[1];
            let exponent = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            match exponent {
                "2" => format!("{base} squared"),
                "3" => format!("{base} cubed"),
                _ => format!("{base} to the power of {exponent}"),
            }
        })
        .into_owned()
}

fn replace_operators(text: String) -> String {
    let text = rewrite_bounded(&PLUS_PATTERN, "$1 plus $2", text);
    let text = rewrite_bounded(&EQUALS_PATTERN, "$1 equals $2", text);
    rewrite_bounded(&MINUS_PATTERN, "$1 minus $2", text)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_PATTERN.replace_all(text, " ").trim().to_string()
}
