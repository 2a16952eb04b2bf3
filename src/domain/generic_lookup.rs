use crate::domain::fields::non_empty;
use crate::domain::{GenericLookup, Person};
use regex::Regex;
use std::sync::LazyLock;

static PHONE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^phone[ \t]+([^:\s].*)$").expect("phone line regex"));

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(contact|reg[ \t]*data|wallet[ \t]+information|database[ \t]+information|expedition[ \t]+information|recidivist[ \t]+information|vehicle[ \t]+information)[ \t]*:[ \t]*(.*)$",
    )
    .expect("section regex")
});

static WALLET_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9]*)(?:[ \t]*:[ \t]*|[ \t]+)(.+)$").expect("wallet regex")
});

static PERSON_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(name|email|phone|dob)[ \t]*:[ \t]*(.*)$").expect("person field regex")
});

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Section {
    Wallet,
    Database,
    Text(TextSection),
}

/// Sections whose body is kept as free text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TextSection {
    Contact,
    RegData,
    Expedition,
    Recidivist,
    Vehicle,
}

impl Section {
    fn from_header(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered.starts_with("wallet") {
            Self::Wallet
        } else if lowered.starts_with("database") {
            Self::Database
        } else if lowered.starts_with("contact") {
            Self::Text(TextSection::Contact)
        } else if lowered.starts_with("reg") {
            Self::Text(TextSection::RegData)
        } else if lowered.starts_with("expedition") {
            Self::Text(TextSection::Expedition)
        } else if lowered.starts_with("recidivist") {
            Self::Text(TextSection::Recidivist)
        } else {
            Self::Text(TextSection::Vehicle)
        }
    }
}

pub fn is_generic_lookup(text: &str) -> bool {
    text.lines().map(str::trim).any(|line| {
        PHONE_LINE_RE.is_match(line) || SECTION_RE.is_match(line)
    })
}

#[derive(Default)]
struct Collected {
    contact: Vec<String>,
    reg_data: Vec<String>,
    expedition: Vec<String>,
    recidivist: Vec<String>,
    vehicle: Vec<String>,
    current_person: Person,
}

/// Reads every section that is present; sections that are absent stay `None`/empty.
pub fn parse_generic_lookup(text: &str) -> GenericLookup {
    let mut out = GenericLookup::default();
    let mut collected = Collected::default();
    let mut section: Option<Section> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if let Some(caps) = PHONE_LINE_RE.captures(line) {
            close_person(&mut out, &mut collected);
            section = None;
            if out.query_phone.is_none() {
                out.query_phone = non_empty(&caps[1]);
            }
            continue;
        }

        if let Some(caps) = SECTION_RE.captures(line) {
            close_person(&mut out, &mut collected);
            let next = Section::from_header(&caps[1]);
            section = Some(next);
            push_line(&mut out, &mut collected, next, &caps[2]);
            continue;
        }

        let Some(current) = section else {
            continue;
        };

        if line.is_empty() {
            match current {
                Section::Text(TextSection::Contact | TextSection::RegData) => section = None,
                Section::Text(text_section) => {
                    body_for(&mut collected, text_section).push(String::new());
                }
                Section::Database => close_person(&mut out, &mut collected),
                Section::Wallet if !out.wallets.is_empty() => section = None,
                Section::Wallet => {}
            }
            continue;
        }

        push_line(&mut out, &mut collected, current, line);
    }
    close_person(&mut out, &mut collected);

    out.contact = join_inline(&collected.contact);
    out.reg_data = join_inline(&collected.reg_data);
    out.expedition = join_block(&collected.expedition);
    out.recidivist = join_block(&collected.recidivist);
    out.vehicle = join_block(&collected.vehicle);
    out
}

fn push_line(out: &mut GenericLookup, collected: &mut Collected, section: Section, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match section {
        Section::Wallet => {
            if let Some(caps) = WALLET_LINE_RE.captures(line) {
                if let Some(value) = non_empty(&caps[2]) {
                    out.wallets
                        .entry(caps[1].to_uppercase())
                        .or_insert(value);
                }
            }
        }
        Section::Database => {
            let Some(caps) = PERSON_FIELD_RE.captures(line) else {
                return;
            };
            let key = caps[1].to_lowercase();
            let value = non_empty(&caps[2]);
            if key == "name" {
                close_person(out, collected);
            }
            let person = &mut collected.current_person;
            let slot = match key.as_str() {
                "name" => &mut person.name,
                "email" => &mut person.email,
                "phone" => &mut person.phone,
                _ => &mut person.dob,
            };
            if slot.is_none() {
                *slot = value;
            }
        }
        Section::Text(text_section) => body_for(collected, text_section).push(line.to_string()),
    }
}

fn body_for(collected: &mut Collected, section: TextSection) -> &mut Vec<String> {
    match section {
        TextSection::Contact => &mut collected.contact,
        TextSection::RegData => &mut collected.reg_data,
        TextSection::Expedition => &mut collected.expedition,
        TextSection::Recidivist => &mut collected.recidivist,
        TextSection::Vehicle => &mut collected.vehicle,
    }
}

fn close_person(out: &mut GenericLookup, collected: &mut Collected) {
    let person = std::mem::take(&mut collected.current_person);
    if !person.is_empty() {
        out.people.push(person);
    }
}

fn join_inline(lines: &[String]) -> Option<String> {
    let parts: Vec<&str> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && *line != "-")
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn join_block(lines: &[String]) -> Option<String> {
    non_empty(&lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Phone 6281234567890\nContact: Budi Kantor\nReg Data: 3201010101010001 / 3201010101019999\n\nWallet information:\nDANA BUDI SANTOSO\nOVO: Rp 10.000\ngopay -\n\nDatabase information:\nName: Budi Santoso\nEmail: budi@example.com\nPhone: 081234567890\nDOB: 1990-01-01\n\nName: B. Santoso\nEmail: b@example.com\nName: Budi S\n\nVehicle information:\nB 1234 XYZ\nHonda Beat\n";

    #[test]
    fn detects_structural_sections() {
        assert!(is_generic_lookup(SAMPLE));
        assert!(is_generic_lookup("Wallet information:\nDANA x"));
        assert!(is_generic_lookup("  Phone 0812"));
        assert!(!is_generic_lookup("Phone: 0812"));
        assert!(!is_generic_lookup("NIK: 1\nNAMA: A"));
    }

    #[test]
    fn parses_top_level_fields() {
        let parsed = parse_generic_lookup(SAMPLE);
        assert_eq!(parsed.query_phone.as_deref(), Some("6281234567890"));
        assert_eq!(parsed.contact.as_deref(), Some("Budi Kantor"));
        assert_eq!(
            parsed.reg_data.as_deref(),
            Some("3201010101010001 / 3201010101019999")
        );
        assert_eq!(parsed.vehicle.as_deref(), Some("B 1234 XYZ\nHonda Beat"));
        assert_eq!(parsed.expedition, None);
    }

    #[test]
    fn parses_wallet_providers() {
        let parsed = parse_generic_lookup(SAMPLE);
        assert_eq!(parsed.wallets.len(), 2);
        assert_eq!(
            parsed.wallets.get("DANA").map(String::as_str),
            Some("BUDI SANTOSO")
        );
        assert_eq!(parsed.wallets.get("OVO").map(String::as_str), Some("Rp 10.000"));
    }

    #[test]
    fn blank_line_ends_wallet_section() {
        let parsed = parse_generic_lookup(
            "Wallet information:\n\nDANA Budi\nOVO Rp 5.000\n\nNote: data may be outdated\nUpdated daily",
        );
        assert_eq!(parsed.wallets.len(), 2);
        assert_eq!(parsed.wallets.get("DANA").map(String::as_str), Some("Budi"));
        assert!(!parsed.wallets.contains_key("NOTE"));
        assert!(!parsed.wallets.contains_key("UPDATED"));
    }

    #[test]
    fn name_key_and_blank_lines_split_people() {
        let parsed = parse_generic_lookup(SAMPLE);
        assert_eq!(parsed.people.len(), 3);
        assert_eq!(parsed.people[0].dob.as_deref(), Some("1990-01-01"));
        assert_eq!(parsed.people[1].name.as_deref(), Some("B. Santoso"));
        assert_eq!(parsed.people[1].email.as_deref(), Some("b@example.com"));
        assert_eq!(parsed.people[2].name.as_deref(), Some("Budi S"));
        assert_eq!(parsed.people[2].email, None);
    }

    #[test]
    fn unrelated_text_yields_empty_lookup() {
        let parsed = parse_generic_lookup("just text\nNIK: 1");
        assert!(!parsed.has_content());
    }
}
