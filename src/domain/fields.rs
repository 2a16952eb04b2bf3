//! `KEY: value` line helpers shared by the shape detectors.

use crate::domain::ParsedRecord;
use regex::Regex;
use std::sync::LazyLock;

static KEY_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t\-*•]*([A-Za-z][A-Za-z0-9 ._/()]{0,40}?)[ \t]*:[ \t]*(.*?)[ \t]*$")
        .expect("key-value regex")
});

/// Extracts every `KEY: value` line of `block`, keys normalized with [`normalize_key`].
///
/// Later duplicates do not overwrite earlier values.
pub fn extract_key_values(block: &str) -> ParsedRecord {
    let mut record = ParsedRecord::new();
    for caps in KEY_VALUE_RE.captures_iter(block) {
        let key = normalize_key(&caps[1]);
        if key.is_empty() {
            continue;
        }
        let value = caps[2].trim().to_string();
        record.entry(key).or_insert(value);
    }
    record
}

/// Uppercases, turns `.`/`_` into spaces and collapses whitespace: `"Gol. darah"` → `"GOL DARAH"`.
pub fn normalize_key(raw: &str) -> String {
    raw.to_uppercase()
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Value of the first non-placeholder `LABEL: value` line whose label is one of `labels`
/// (case-insensitive).
pub fn labeled_value(block: &str, labels: &[&str]) -> Option<String> {
    KEY_VALUE_RE.captures_iter(block).find_map(|caps| {
        let key = normalize_key(&caps[1]);
        if labels.iter().any(|label| *label == key) {
            non_empty(&caps[2])
        } else {
            None
        }
    })
}

/// `None` for blank values and the `-` placeholder.
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "-" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Splits `text` into the chunks that start at each match of `marker`, discarding the
/// preamble before the first match. Each chunk is paired with the marker's first capture group.
pub fn split_on_marker<'a>(text: &'a str, marker: &Regex) -> Vec<(Option<&'a str>, &'a str)> {
    let mut starts: Vec<(usize, usize, Option<&'a str>)> = Vec::new();
    for caps in marker.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let label = caps.get(1).map(|m| m.as_str());
        starts.push((whole.start(), whole.end(), label));
    }

    let mut blocks = Vec::with_capacity(starts.len());
    for (index, (_, body_start, label)) in starts.iter().enumerate() {
        let body_end = starts
            .get(index + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(text.len());
        blocks.push((*label, &text[*body_start..body_end]));
    }
    blocks
}
