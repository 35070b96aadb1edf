//! Cleanup of user-typed topics.

use serde::Serialize;

/// Letters repeated at least this many times in a row collapse to one
const REPEAT_COLLAPSE_RUN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTopic {
    /// Input exactly as received
    pub raw: String,
    /// Trimmed, single-spaced, repeated letters collapsed
    pub cleaned: String,
    /// `cleaned` with each word capitalized
    pub display: String,
    /// `raw` differs from `display` in casing, spacing or spelling
    pub was_corrected: bool,
}

impl NormalizedTopic {
    /// Whether normalization changed letters, not just casing or spacing
    pub fn spelling_changed(&self) -> bool {
        collapse_whitespace(&self.raw).to_lowercase() != self.cleaned.to_lowercase()
    }
}

pub fn normalize_topic(raw: &str) -> NormalizedTopic {
    let cleaned = collapse_repeated_letters(&collapse_whitespace(raw));
    let display = cleaned
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    NormalizedTopic {
        raw: raw.to_string(),
        was_corrected: raw != display,
        cleaned,
        display,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "sciiience" -> "science"; doubled letters ("balloon") are left alone.
fn collapse_repeated_letters(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && same_letter(chars[i + run], c) {
            run += 1;
        }

        if c.is_alphabetic() && run >= REPEAT_COLLAPSE_RUN {
            out.push(c);
        } else {
            out.extend(&chars[i..i + run]);
        }
        i += run;
    }

    out
}

fn same_letter(a: char, b: char) -> bool {
    a == b || (a.is_alphabetic() && a.to_lowercase().eq(b.to_lowercase()))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
