use crate::domain::RawMessage;

/// Placeholder the bot posts while a lookup is in flight.
pub const PENDING_MARKER: &str = "mengirim permintaan";

/// What the surviving in-flight placeholder is displayed as.
pub const PENDING_DISPLAY: &str = "Sedang diproses..";

const INTRO_PHRASES: &[&str] = &["access track bts"];

const HIDDEN_STATUS_PHRASES: &[&str] = &[
    "please wait",
    "processing",
    "mohon tunggu",
    "harap tunggu",
    "feature menu",
    "menu fitur",
    "too many requests",
    "rate limit",
    "limit exceeded",
    "limit harian",
    "file uploaded",
    "upload successful",
    "berhasil diunggah",
    "berhasil diupload",
];

const SYSTEM_LINE_PHRASES: &[&str] = &[
    "on proses",
    "message sent successfully",
    "pesan berhasil dikirim",
];

/// Onboarding chatter: the `/start` command echo and the bot's marketing blurb.
pub fn is_intro(text: &str) -> bool {
    let trimmed = text.trim_start();
    if trimmed
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("/start"))
    {
        return true;
    }
    let lowered = text.to_lowercase();
    INTRO_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Transient status notices. These can come back through the push channel, so they are
/// filtered on every render, not only at load.
pub fn is_hidden_status(text: &str) -> bool {
    let collapsed = collapse_lowercase(text);
    HIDDEN_STATUS_PHRASES
        .iter()
        .any(|phrase| collapsed.contains(phrase))
}

pub fn is_pending(text: &str) -> bool {
    collapse_lowercase(text).contains(PENDING_MARKER)
}

/// System lines are always hidden; the pending placeholder is hidden everywhere except at its
/// last occurrence in `all`.
pub fn should_hide_message(msg: &RawMessage, index: usize, all: &[&RawMessage]) -> bool {
    let text = collapse_lowercase(msg.text_or_empty());
    if SYSTEM_LINE_PHRASES
        .iter()
        .any(|phrase| text.contains(phrase))
    {
        return true;
    }
    if !text.contains(PENDING_MARKER) {
        return false;
    }

    let last_pending = all
        .iter()
        .rposition(|other| is_pending(other.text_or_empty()));
    last_pending != Some(index)
}

fn collapse_lowercase(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
