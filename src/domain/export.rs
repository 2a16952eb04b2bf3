use crate::domain::{FamilyCard, FamilyMember, GenericLookup, ParsedRecord, ResultView};

const MISSING: &str = "-";

/// Known record fields in display order, with their labels.
pub const PREFERRED_FIELDS: &[(&str, &str)] = &[
    ("NIK", "NIK"),
    ("NO KK", "No. KK"),
    ("NKK", "No. KK"),
    ("NAMA", "Nama"),
    ("NAMA LENGKAP", "Nama Lengkap"),
    ("TTL", "TTL"),
    ("TEMPAT LAHIR", "Tempat Lahir"),
    ("TANGGAL LAHIR", "Tanggal Lahir"),
    ("TGL LAHIR", "Tgl Lahir"),
    ("JENIS KELAMIN", "Jenis Kelamin"),
    ("GOL DARAH", "Gol. Darah"),
    ("AGAMA", "Agama"),
    ("STATUS", "Status"),
    ("STATUS PERKAWINAN", "Status Perkawinan"),
    ("HUBUNGAN", "Hubungan"),
    ("PENDIDIKAN", "Pendidikan"),
    ("PEKERJAAN", "Pekerjaan"),
    ("ALAMAT", "Alamat"),
    ("RT/RW", "RT/RW"),
    ("KELURAHAN", "Kelurahan"),
    ("KEL", "Kelurahan"),
    ("KECAMATAN", "Kecamatan"),
    ("KEC", "Kecamatan"),
    ("KABUPATEN", "Kabupaten"),
    ("KAB", "Kabupaten"),
    ("KOTA", "Kota"),
    ("PROVINSI", "Provinsi"),
    ("PROP", "Provinsi"),
    ("NIK IBU", "NIK Ibu"),
    ("NAMA IBU", "Nama Ibu"),
    ("NIK AYAH", "NIK Ayah"),
    ("NAMA AYAH", "Nama Ayah"),
];

/// `(label, value)` pairs of a record: known fields in [`PREFERRED_FIELDS`] order, then the
/// remaining keys alphabetically under their raw name.
///
/// Aliases sharing a label collapse into one line; the first alias in table order wins.
pub fn ordered_fields(record: &ParsedRecord) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(record.len());
    for (key, label) in PREFERRED_FIELDS {
        let Some(value) = record.get(*key) else {
            continue;
        };
        if out.iter().any(|(seen, _)| seen == label) {
            continue;
        }
        out.push(((*label).to_string(), value.clone()));
    }
    // BTreeMap iteration is already alphabetical.
    for (key, value) in record {
        if !PREFERRED_FIELDS.iter().any(|(known, _)| known == key) {
            out.push((key.clone(), value.clone()));
        }
    }
    out
}

/// Labeled member fields, in export order.
pub fn member_fields(member: &FamilyMember) -> [(&'static str, Option<&str>); 14] {
    [
        ("NIK", member.nik.as_deref()),
        ("Nama", member.name.as_deref()),
        ("TTL", member.birth.as_deref()),
        ("Jenis Kelamin", member.gender.as_deref()),
        ("Hubungan", member.relationship.as_deref()),
        ("Status Perkawinan", member.marital_status.as_deref()),
        ("Agama", member.religion.as_deref()),
        ("Gol. Darah", member.blood_type.as_deref()),
        ("Pendidikan", member.education.as_deref()),
        ("Pekerjaan", member.occupation.as_deref()),
        ("NIK Ibu", member.mother_nik.as_deref()),
        ("Nama Ibu", member.mother_name.as_deref()),
        ("NIK Ayah", member.father_nik.as_deref()),
        ("Nama Ayah", member.father_name.as_deref()),
    ]
}

pub fn area_fields(card: &FamilyCard) -> [(&'static str, Option<&str>); 6] {
    [
        ("No. KK", card.nkk.as_deref()),
        ("Alamat", card.area.address.as_deref()),
        ("Provinsi", card.area.province.as_deref()),
        ("Kabupaten/Kota", card.area.regency.as_deref()),
        ("Kecamatan", card.area.district.as_deref()),
        ("Kelurahan/Desa", card.area.village.as_deref()),
    ]
}

/// Flat clipboard text for `view`. `raw_fallback` is used for views without a structured
/// export (face recognition, plain text).
pub fn build_export_text(view: &ResultView, raw_fallback: &str) -> String {
    match view {
        ResultView::FamilyCard(card) => export_family_card(card),
        ResultView::NameSearch(records) => export_records("HASIL PENCARIAN NAMA", records),
        ResultView::PopulationRecords(records) => export_records("DATA KEPENDUDUKAN", records),
        ResultView::GenericLookup(lookup) => export_generic(lookup),
        ResultView::FaceRecognition(_) | ResultView::PlainText(_) => raw_fallback.to_string(),
    }
}

fn export_family_card(card: &FamilyCard) -> String {
    let mut lines = vec!["KARTU KELUARGA".to_string()];
    for (label, value) in area_fields(card) {
        lines.push(format!("{label}: {}", value.unwrap_or(MISSING)));
    }
    for (index, member) in card.members.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("Anggota {}", index + 1));
        for (label, value) in member_fields(member) {
            lines.push(format!("{label}: {}", value.unwrap_or(MISSING)));
        }
    }
    lines.join("\n")
}

fn export_records(header: &str, records: &[ParsedRecord]) -> String {
    let mut lines = vec![header.to_string()];
    for (index, record) in records.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("Data {}", index + 1));
        for (label, value) in ordered_fields(record) {
            let value = if value.trim().is_empty() {
                MISSING.to_string()
            } else {
                value
            };
            lines.push(format!("{label}: {value}"));
        }
    }
    lines.join("\n")
}

fn export_generic(lookup: &GenericLookup) -> String {
    let mut lines: Vec<String> = Vec::new();
    if let Some(phone) = &lookup.query_phone {
        lines.push(format!("Phone: {phone}"));
    }
    if let Some(contact) = &lookup.contact {
        lines.push(format!("Contact: {contact}"));
    }
    if let Some(reg_data) = &lookup.reg_data {
        lines.push(format!("Reg Data: {reg_data}"));
    }

    if !lookup.wallets.is_empty() {
        push_section_gap(&mut lines);
        lines.push("Wallet information:".to_string());
        for (provider, value) in &lookup.wallets {
            lines.push(format!("{provider}: {value}"));
        }
    }

    if !lookup.people.is_empty() {
        push_section_gap(&mut lines);
        lines.push("Database information:".to_string());
        for (index, person) in lookup.people.iter().enumerate() {
            if index > 0 {
                lines.push(String::new());
            }
            lines.push(format!("Name: {}", person.name.as_deref().unwrap_or(MISSING)));
            lines.push(format!("Email: {}", person.email.as_deref().unwrap_or(MISSING)));
            lines.push(format!("Phone: {}", person.phone.as_deref().unwrap_or(MISSING)));
            lines.push(format!("DOB: {}", person.dob.as_deref().unwrap_or(MISSING)));
        }
    }

    for (title, body) in [
        ("Expedition information:", &lookup.expedition),
        ("Recidivist information:", &lookup.recidivist),
        ("Vehicle information:", &lookup.vehicle),
    ] {
        if let Some(body) = body {
            push_section_gap(&mut lines);
            lines.push(title.to_string());
            lines.push(body.clone());
        }
    }

    lines.join("\n")
}

fn push_section_gap(lines: &mut Vec<String>) {
    if !lines.is_empty() {
        lines.push(String::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FamilyArea, Person, parse_family_card, resolve};

    fn record(pairs: &[(&str, &str)]) -> ParsedRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn family_card_export_contains_every_nik() {
        let text = "NIK: 3201010101010001\nNAMA: Budi\nHUBUNGAN: KEPALA\nPROVINSI: Jawa Barat\nNIK: 3201010101010002\nNAMA: Ani\nHUBUNGAN: ISTRI\nNIK: 3201010101010003\nNAMA: Caca\n";
        let card = parse_family_card(text).expect("card");
        let out = build_export_text(&ResultView::FamilyCard(card.clone()), text);
        for member in &card.members {
            let nik = member.nik.as_deref().expect("nik");
            assert!(out.contains(nik), "missing {nik} in {out}");
        }
        assert!(out.starts_with("KARTU KELUARGA\nNo. KK: -\n"));
        assert!(out.contains("Provinsi: Jawa Barat"));
        assert!(out.contains("Agama: -"));
    }

    #[test]
    fn alias_spellings_share_one_label() {
        let fields = ordered_fields(&record(&[
            ("PROP", "Jawa Barat"),
            ("PROVINSI", "Jawa Barat"),
            ("KAB", "Bogor"),
            ("KABUPATEN", "Kab. Bogor"),
            ("NKK", "3201"),
            ("NO KK", "3201"),
        ]));
        let labels: Vec<&str> = fields.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["No. KK", "Kabupaten", "Provinsi"]);
        assert_eq!(fields[1].1, "Kab. Bogor");
    }

    #[test]
    fn records_export_known_fields_first_then_extras_sorted() {
        let records = vec![record(&[
            ("ZODIAK", "Leo"),
            ("ALAMAT", "Bogor"),
            ("NIK", "1"),
            ("HOBI", "Catur"),
            ("NAMA", "Budi"),
        ])];
        let out = build_export_text(&ResultView::PopulationRecords(records), "");
        assert_eq!(
            out,
            "DATA KEPENDUDUKAN\n\nData 1\nNIK: 1\nNama: Budi\nAlamat: Bogor\nHOBI: Catur\nZODIAK: Leo"
        );
    }

    #[test]
    fn empty_record_lists_produce_header_only() {
        assert_eq!(
            build_export_text(&ResultView::NameSearch(Vec::new()), "raw"),
            "HASIL PENCARIAN NAMA"
        );
        let empty_card = FamilyCard {
            nkk: None,
            area: FamilyArea::default(),
            members: Vec::new(),
        };
        let out = build_export_text(&ResultView::FamilyCard(empty_card), "raw");
        assert!(out.starts_with("KARTU KELUARGA"));
        assert!(!out.contains("Anggota"));
    }

    #[test]
    fn generic_export_lists_sections() {
        let mut lookup = GenericLookup {
            query_phone: Some("628123".to_string()),
            ..GenericLookup::default()
        };
        lookup
            .wallets
            .insert("DANA".to_string(), "Budi".to_string());
        lookup.people.push(Person {
            name: Some("Budi".to_string()),
            email: None,
            phone: Some("0812".to_string()),
            dob: None,
        });
        let out = build_export_text(&ResultView::GenericLookup(lookup), "");
        assert_eq!(
            out,
            "Phone: 628123\n\nWallet information:\nDANA: Budi\n\nDatabase information:\nName: Budi\nEmail: -\nPhone: 0812\nDOB: -"
        );
    }

    #[test]
    fn plain_and_face_views_fall_back_to_text() {
        let view = resolve("halo");
        assert_eq!(build_export_text(&view, "halo"), "halo");
        let face = ResultView::FaceRecognition(Vec::new());
        assert_eq!(build_export_text(&face, "raw face"), "raw face");
    }
}
