use regex::Regex;
use std::sync::LazyLock;

const FENCE: &str = "```";

static DISCLAIMER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\[\s*(?:don'?t\s+share|do\s+not\s+share|jangan\s+(?:di)?(?:sebar(?:kan|luaskan)?|bagikan|share))[^\[\]]*\]",
    )
    .expect("disclaimer regex")
});

/// Unifies line endings, then strips code fences and the "don't share" marker from a bot reply.
///
/// Repeats until nothing changes, so `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.replace("\r\n", "\n").replace('\r', "\n").trim().to_string();
    loop {
        let next = normalize_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

pub fn normalize_opt(raw: Option<&str>) -> String {
    raw.map(normalize).unwrap_or_default()
}

fn normalize_once(text: &str) -> String {
    let cleaned = DISCLAIMER_RE.replace_all(text, "");
    let mut out = cleaned.trim();
    if let Some(rest) = out.strip_prefix(FENCE) {
        out = rest.trim_start();
    }
    if let Some(rest) = out.strip_suffix(FENCE) {
        out = rest.trim_end();
    }
    out.trim().to_string()
}
