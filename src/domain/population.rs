use crate::domain::ParsedRecord;
use crate::domain::fields::{extract_key_values, split_on_marker};
use regex::Regex;
use std::sync::LazyLock;

static RECORD_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*NO\.[ \t]*(\d+)[ \t]*$").expect("record marker regex")
});

static NIK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t\-*•]*NIK[ \t]*:").expect("nik line regex"));

pub fn is_population_result(text: &str) -> bool {
    RECORD_MARKER_RE.is_match(text) || NIK_LINE_RE.is_match(text)
}

/// One record per `NO. n` marker, or the whole text as a single record when there is no
/// marker but a `NIK:` line.
pub fn parse_population_result(text: &str) -> Vec<ParsedRecord> {
    let blocks: Vec<&str> = if RECORD_MARKER_RE.is_match(text) {
        split_on_marker(text, &RECORD_MARKER_RE)
            .into_iter()
            .map(|(_, block)| block)
            .collect()
    } else if NIK_LINE_RE.is_match(text) {
        vec![text]
    } else {
        Vec::new()
    };

    blocks
        .into_iter()
        .map(|block| {
            extract_key_values(block)
                .into_iter()
                .map(|(key, value)| (normalize_parent_key(&key), value))
                .collect::<ParsedRecord>()
        })
        .filter(|record| !record.is_empty())
        .collect()
}

/// Folds the spelling variants of the mother/father fields: `NAMA LENGKAP IBU`,
/// `NAMA IBU KANDUNG` → `NAMA IBU`; `NIK AYAH KANDUNG` → `NIK AYAH`.
pub fn normalize_parent_key(key: &str) -> String {
    let stripped = key
        .strip_suffix(" KANDUNG")
        .unwrap_or(key);
    match stripped {
        "NAMA LENGKAP IBU" | "IBU" => "NAMA IBU".to_string(),
        "NAMA LENGKAP AYAH" | "AYAH" => "NAMA AYAH".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_numbered_record() {
        let text = "NO. 1\nNIK: 3201010101010001\nNAMA: Budi Santoso\nALAMAT: Jl. Mawar No. 1";
        assert!(is_population_result(text));
        let records = parse_population_result(text);
        assert_eq!(records.len(), 1);
        let expected: ParsedRecord = [
            ("NIK", "3201010101010001"),
            ("NAMA", "Budi Santoso"),
            ("ALAMAT", "Jl. Mawar No. 1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(records[0], expected);
    }

    #[test]
    fn splits_multiple_numbered_records() {
        let text = "Hasil:\nNO. 1\nNIK: 1\nNAMA: A\nNO. 2\nNIK: 2\nNAMA: B\nNama Ibu Kandung: C";
        let records = parse_population_result(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("NAMA IBU").map(String::as_str), Some("C"));
    }

    #[test]
    fn treats_unnumbered_nik_text_as_one_record() {
        let records = parse_population_result("NIK: 1\nNAMA: A\nIBU KANDUNG: C");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("NAMA IBU").map(String::as_str), Some("C"));
    }

    #[test]
    fn rejects_text_without_markers() {
        assert!(!is_population_result("NAMA: A"));
        assert!(parse_population_result("NAMA: A").is_empty());
    }
}
