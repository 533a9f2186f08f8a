use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("static regex");
}

/// Normalizes a topic label: trimmed, first letter upper-case, the rest lower-case.
/// Returns `None` when nothing but whitespace was given.
pub fn normalize_topic(topic: &str) -> Option<String> {
    let trimmed = topic.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;

    let mut normalized: String = first.to_uppercase().collect();
    normalized.push_str(&chars.as_str().to_lowercase());
    Some(normalized)
}

/// Normalizes an answer for comparison: lower-case, trimmed, without trailing
/// punctuation, single spaces, and no runs of the same punctuation mark.
pub fn normalize_answer(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped = lowered
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .trim_start();
    let spaced = WHITESPACE_RUN.replace_all(stripped, " ");
    collapse_repeated_punctuation(&spaced)
}

fn collapse_repeated_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    for c in text.chars() {
        if c.is_ascii_punctuation() && previous == Some(c) {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }
    out
}
