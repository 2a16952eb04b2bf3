use crate::domain::{
    FaceMatch, FamilyCard, GenericLookup, ParsedRecord, ResultView, area_fields, member_fields,
    ordered_fields,
};
use unicode_width::UnicodeWidthStr;

const MISSING: &str = "-";
const MAX_CELL_WIDTH: usize = 48;

/// Terminal text for one resolved view.
pub fn render_view(view: &ResultView) -> String {
    match view {
        ResultView::FaceRecognition(matches) => render_face_matches(matches),
        ResultView::NameSearch(records) => render_records("Hasil Pencarian Nama", records),
        ResultView::FamilyCard(card) => render_family_card(card),
        ResultView::GenericLookup(lookup) => render_generic(lookup),
        ResultView::PopulationRecords(records) => render_records("Data Kependudukan", records),
        ResultView::PlainText(text) => text.clone(),
    }
}

fn render_face_matches(matches: &[FaceMatch]) -> String {
    let headers = ["No", "Kemiripan", "NIK", "Nama", "TTL", "Alamat"];
    let rows: Vec<Vec<String>> = matches
        .iter()
        .map(|m| {
            vec![
                m.rank.to_string(),
                cell(m.similarity.as_deref()),
                cell(m.nik.as_deref()),
                cell(m.name.as_deref()),
                cell(m.birth.as_deref()),
                cell(m.address.as_deref()),
            ]
        })
        .collect();
    format!("FACE RECOGNITION RESULT\n{}", render_table(&headers, &rows))
}

fn render_records(title: &str, records: &[ParsedRecord]) -> String {
    let mut blocks = vec![title.to_uppercase()];
    for (index, record) in records.iter().enumerate() {
        let pairs = ordered_fields(record);
        blocks.push(format!("#{}\n{}", index + 1, render_pairs(&pairs)));
    }
    blocks.join("\n\n")
}

fn render_family_card(card: &FamilyCard) -> String {
    let area: Vec<(String, String)> = area_fields(card)
        .into_iter()
        .map(|(label, value)| (label.to_string(), cell(value)))
        .collect();
    let mut blocks = vec![format!("KARTU KELUARGA\n{}", render_pairs(&area))];

    let headers = ["No", "NIK", "Nama", "TTL", "Hubungan", "Status", "Pekerjaan"];
    let rows: Vec<Vec<String>> = card
        .members
        .iter()
        .enumerate()
        .map(|(index, member)| {
            vec![
                (index + 1).to_string(),
                cell(member.nik.as_deref()),
                cell(member.name.as_deref()),
                cell(member.birth.as_deref()),
                cell(member.relationship.as_deref()),
                cell(member.marital_status.as_deref()),
                cell(member.occupation.as_deref()),
            ]
        })
        .collect();
    blocks.push(render_table(&headers, &rows));

    for (index, member) in card.members.iter().enumerate() {
        let pairs: Vec<(String, String)> = member_fields(member)
            .into_iter()
            .map(|(label, value)| (label.to_string(), cell(value)))
            .collect();
        blocks.push(format!("Anggota {}\n{}", index + 1, render_pairs(&pairs)));
    }
    blocks.join("\n\n")
}

fn render_generic(lookup: &GenericLookup) -> String {
    let mut blocks: Vec<String> = Vec::new();

    let mut summary: Vec<(String, String)> = Vec::new();
    for (label, value) in [
        ("Phone", &lookup.query_phone),
        ("Contact", &lookup.contact),
        ("Reg Data", &lookup.reg_data),
    ] {
        if let Some(value) = value {
            summary.push((label.to_string(), value.clone()));
        }
    }
    if !summary.is_empty() {
        blocks.push(render_pairs(&summary));
    }

    if !lookup.wallets.is_empty() {
        let rows: Vec<Vec<String>> = lookup
            .wallets
            .iter()
            .map(|(provider, value)| vec![provider.clone(), value.clone()])
            .collect();
        blocks.push(format!(
            "WALLET\n{}",
            render_table(&["Provider", "Info"], &rows)
        ));
    }

    for (index, person) in lookup.people.iter().enumerate() {
        let pairs = vec![
            ("Name".to_string(), cell(person.name.as_deref())),
            ("Email".to_string(), cell(person.email.as_deref())),
            ("Phone".to_string(), cell(person.phone.as_deref())),
            ("DOB".to_string(), cell(person.dob.as_deref())),
        ];
        blocks.push(format!("DATABASE #{}\n{}", index + 1, render_pairs(&pairs)));
    }

    for (title, body) in [
        ("EXPEDITION", &lookup.expedition),
        ("RECIDIVIST", &lookup.recidivist),
        ("VEHICLE", &lookup.vehicle),
    ] {
        if let Some(body) = body {
            blocks.push(format!("{title}\n{body}"));
        }
    }

    blocks.join("\n\n")
}

/// `label : value` lines with the colons aligned.
pub fn render_pairs(pairs: &[(String, String)]) -> String {
    let label_width = pairs
        .iter()
        .map(|(label, _)| UnicodeWidthStr::width(label.as_str()))
        .max()
        .unwrap_or(0);
    pairs
        .iter()
        .map(|(label, value)| format!("{} : {value}", pad_right(label, label_width)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(*header))
        .collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| truncate_end(value, MAX_CELL_WIDTH))
                .collect()
        })
        .collect();
    for row in &rows {
        for (index, value) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(UnicodeWidthStr::width(value.as_str()));
            }
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(index, value)| pad_right(value, widths.get(index).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(headers.to_vec())];
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

fn cell(value: Option<&str>) -> String {
    value.unwrap_or(MISSING).to_string()
}

fn pad_right(text: &str, width: usize) -> String {
    let current = UnicodeWidthStr::width(text);
    if current >= width {
        return text.to_string();
    }
    format!("{}{}", text, " ".repeat(width.saturating_sub(current)))
}

fn truncate_end(text: &str, max_width: usize) -> String {
    let flattened = text.replace('\n', " ");
    if UnicodeWidthStr::width(flattened.as_str()) <= max_width {
        return flattened;
    }
    let ellipsis = "…";
    let available = max_width.saturating_sub(UnicodeWidthStr::width(ellipsis));
    let mut out = String::new();
    for ch in flattened.chars() {
        let next = format!("{out}{ch}");
        if UnicodeWidthStr::width(next.as_str()) > available {
            break;
        }
        out.push(ch);
    }
    out.push_str(ellipsis);
    out
}
