use crate::domain::FaceMatch;
use crate::domain::fields::{labeled_value, split_on_marker};
use regex::Regex;
use std::sync::LazyLock;

const HEADER: &str = "face recognition result";

static RESULT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-{2,}[ \t]*RESULT[ \t]*(\d+)[ \t]*-{2,}").expect("result marker regex")
});

static SIMILARITY_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(?:similarity|kemiripan)\s*:").expect("similarity regex"));

const NIK_LABELS: &[&str] = &["NIK"];
const SIMILARITY_LABELS: &[&str] = &["SIMILARITY", "KEMIRIPAN", "SCORE"];
const NAME_LABELS: &[&str] = &["NAMA", "NAME", "NAMA LENGKAP"];
const BIRTH_LABELS: &[&str] = &["TTL", "TEMPAT/TGL LAHIR", "TEMPAT/TANGGAL LAHIR", "BIRTH"];
const ADDRESS_LABELS: &[&str] = &["ALAMAT", "ADDRESS"];

pub fn is_face_recognition(text: &str) -> bool {
    if text.to_lowercase().contains(HEADER) {
        return true;
    }
    RESULT_MARKER_RE.is_match(text) && SIMILARITY_LABEL_RE.is_match(text)
}

/// Ranked matches, one per `--RESULT N--` block. A block with none of the known labels is
/// skipped.
pub fn parse_face_recognition(text: &str) -> Vec<FaceMatch> {
    let mut matches = Vec::new();
    for (ordinal, (label, block)) in split_on_marker(text, &RESULT_MARKER_RE)
        .into_iter()
        .enumerate()
    {
        let fallback_rank = u32::try_from(ordinal + 1).unwrap_or(u32::MAX);
        let rank = label
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(fallback_rank);
        let record = FaceMatch {
            rank,
            similarity: labeled_value(block, SIMILARITY_LABELS),
            nik: labeled_value(block, NIK_LABELS),
            name: labeled_value(block, NAME_LABELS),
            birth: labeled_value(block, BIRTH_LABELS),
            address: labeled_value(block, ADDRESS_LABELS),
        };
        if record.similarity.is_none()
            && record.nik.is_none()
            && record.name.is_none()
            && record.birth.is_none()
            && record.address.is_none()
        {
            continue;
        }
        matches.push(record);
    }
    matches
}
