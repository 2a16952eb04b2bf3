use crate::domain::fields::{extract_key_values, labeled_value, non_empty};
use crate::domain::{FamilyArea, FamilyCard, FamilyMember, ParsedRecord};
use regex::Regex;
use std::sync::LazyLock;

const HEADER: &str = "detail from family number data";

static NIK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t\-*•]*NIK[ \t]*:").expect("nik line regex"));

static MEMBER_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t\-*•]*(?:HUBUNGAN|STATUS|ALAMAT|PROP|PROV|KAB|KEC)[^:\n]*:")
        .expect("member label regex")
});

static KK_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{16})\b").expect("kk number regex"));

const NKK_LABELS: &[&str] = &["NO KK", "NKK", "NOMOR KK", "NO KARTU KELUARGA", "KK"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum KkField {
    Nik,
    Nkk,
    Name,
    Birth,
    BirthPlace,
    BirthDate,
    Gender,
    Relationship,
    MaritalStatus,
    Religion,
    BloodType,
    Education,
    Occupation,
    MotherNik,
    MotherName,
    FatherNik,
    FatherName,
    Address,
    Province,
    Regency,
    District,
    Village,
}

fn canonical_field(key: &str) -> Option<KkField> {
    let field = match key {
        "NIK" => KkField::Nik,
        "NO KK" | "NKK" | "NOMOR KK" | "NO KARTU KELUARGA" | "KK" => KkField::Nkk,
        "NAMA" | "NAMA LENGKAP" => KkField::Name,
        "TTL" | "TEMPAT/TGL LAHIR" | "TEMPAT/TANGGAL LAHIR" | "TEMPAT TANGGAL LAHIR" => {
            KkField::Birth
        }
        "TEMPAT LAHIR" | "TMPT LAHIR" => KkField::BirthPlace,
        "TANGGAL LAHIR" | "TGL LAHIR" => KkField::BirthDate,
        "JENIS KELAMIN" | "KELAMIN" | "JK" | "GENDER" => KkField::Gender,
        "HUBUNGAN" | "HUBUNGAN KELUARGA" | "STATUS HUBUNGAN" | "SHDK" => KkField::Relationship,
        "STATUS" | "STATUS PERKAWINAN" | "STATUS KAWIN" => KkField::MaritalStatus,
        "AGAMA" => KkField::Religion,
        "GOL DARAH" | "GOLONGAN DARAH" => KkField::BloodType,
        "PENDIDIKAN" | "PENDIDIKAN TERAKHIR" => KkField::Education,
        "PEKERJAAN" | "JENIS PEKERJAAN" => KkField::Occupation,
        "NIK IBU" | "NIK IBU KANDUNG" => KkField::MotherNik,
        "NAMA IBU" | "NAMA IBU KANDUNG" | "NAMA LENGKAP IBU" => KkField::MotherName,
        "NIK AYAH" | "NIK AYAH KANDUNG" => KkField::FatherNik,
        "NAMA AYAH" | "NAMA AYAH KANDUNG" | "NAMA LENGKAP AYAH" => KkField::FatherName,
        "ALAMAT" => KkField::Address,
        "PROP" | "PROV" | "PROVINSI" | "PROPINSI" => KkField::Province,
        "KAB" | "KABUPATEN" | "KOTA" | "KAB/KOTA" | "KABUPATEN/KOTA" => KkField::Regency,
        "KEC" | "KECAMATAN" => KkField::District,
        "KEL" | "KELURAHAN" | "DESA" | "KEL/DESA" | "KELURAHAN/DESA" => KkField::Village,
        _ => return None,
    };
    Some(field)
}

pub fn is_family_card(text: &str) -> bool {
    if text.to_lowercase().contains(HEADER) {
        return true;
    }
    NIK_LINE_RE.find_iter(text).count() >= 2 && MEMBER_LABEL_RE.is_match(text)
}

/// Per-member fields as they appeared in one `NIK:`-anchored block.
#[derive(Debug, Default)]
struct MemberBlock {
    member: FamilyMember,
    nkk: Option<String>,
    area: FamilyArea,
}

/// Splits the reply into `NIK:`-anchored member blocks and folds them into one household.
///
/// Returns `None` when there is no member block at all.
pub fn parse_family_card(text: &str) -> Option<FamilyCard> {
    let starts: Vec<usize> = NIK_LINE_RE.find_iter(text).map(|m| m.start()).collect();
    let first = *starts.first()?;
    let header = &text[..first];

    let blocks: Vec<MemberBlock> = starts
        .iter()
        .enumerate()
        .map(|(index, start)| {
            let end = starts.get(index + 1).copied().unwrap_or(text.len());
            parse_member_block(&extract_key_values(&text[*start..end]))
        })
        .collect();

    let area = FamilyArea {
        address: majority(blocks.iter().map(|b| b.area.address.as_deref())),
        province: majority(blocks.iter().map(|b| b.area.province.as_deref())),
        regency: majority(blocks.iter().map(|b| b.area.regency.as_deref())),
        district: majority(blocks.iter().map(|b| b.area.district.as_deref())),
        village: majority(blocks.iter().map(|b| b.area.village.as_deref())),
    };
    let nkk = majority(blocks.iter().map(|b| b.nkk.as_deref())).or_else(|| header_nkk(header));
    let members = blocks.into_iter().map(|block| block.member).collect();

    Some(FamilyCard { nkk, area, members })
}

fn parse_member_block(record: &ParsedRecord) -> MemberBlock {
    let mut block = MemberBlock::default();
    let mut birth_place: Option<String> = None;
    let mut birth_date: Option<String> = None;

    for (key, value) in record {
        let Some(field) = canonical_field(key) else {
            continue;
        };
        let value = non_empty(value);
        let slot = match field {
            KkField::Nik => &mut block.member.nik,
            KkField::Nkk => &mut block.nkk,
            KkField::Name => &mut block.member.name,
            KkField::Birth => &mut block.member.birth,
            KkField::BirthPlace => &mut birth_place,
            KkField::BirthDate => &mut birth_date,
            KkField::Gender => &mut block.member.gender,
            KkField::Relationship => &mut block.member.relationship,
            KkField::MaritalStatus => &mut block.member.marital_status,
            KkField::Religion => &mut block.member.religion,
            KkField::BloodType => &mut block.member.blood_type,
            KkField::Education => &mut block.member.education,
            KkField::Occupation => &mut block.member.occupation,
            KkField::MotherNik => &mut block.member.mother_nik,
            KkField::MotherName => &mut block.member.mother_name,
            KkField::FatherNik => &mut block.member.father_nik,
            KkField::FatherName => &mut block.member.father_name,
            KkField::Address => &mut block.area.address,
            KkField::Province => &mut block.area.province,
            KkField::Regency => &mut block.area.regency,
            KkField::District => &mut block.area.district,
            KkField::Village => &mut block.area.village,
        };
        // Aliases can collide (NAMA vs NAMA LENGKAP); keep the first non-empty one.
        if slot.is_none() {
            *slot = value;
        }
    }

    if block.member.birth.is_none() {
        block.member.birth = match (birth_place, birth_date) {
            (Some(place), Some(date)) => Some(format!("{place}, {date}")),
            (place, date) => place.or(date),
        };
    }
    block
}

fn header_nkk(header: &str) -> Option<String> {
    labeled_value(header, NKK_LABELS).or_else(|| {
        KK_NUMBER_RE
            .captures(header)
            .map(|caps| caps[1].to_string())
    })
}

/// Most frequent value; on a tie the one seen first wins.
fn majority<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for value in values.into_iter().flatten() {
        match tally.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => tally.push((value, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in tally {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}
