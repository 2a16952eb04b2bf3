use crate::domain::ParsedRecord;
use crate::domain::fields::{extract_key_values, split_on_marker};
use regex::Regex;
use std::sync::LazyLock;

const HEADER: &str = "data ditemukan";

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"👤[ \t]*(\d+)").expect("bullet regex"));

static NAME_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bNAMA[ \t]*:").expect("name field regex"));

pub fn is_name_search(text: &str) -> bool {
    text.to_lowercase().contains(HEADER) && BULLET_RE.is_match(text) && NAME_FIELD_RE.is_match(text)
}

/// One record per `👤 N` bullet; bullets without any `KEY: value` line are dropped.
pub fn parse_name_search(text: &str) -> Vec<ParsedRecord> {
    split_on_marker(text, &BULLET_RE)
        .into_iter()
        .map(|(_, block)| extract_key_values(block))
        .filter(|record| !record.is_empty())
        .collect()
}
