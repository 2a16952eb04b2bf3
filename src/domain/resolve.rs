use crate::domain::{
    DisplayDecision, ResultView, is_face_recognition, is_family_card, is_generic_lookup,
    is_name_search, is_population_result, normalize, parse_face_recognition, parse_family_card,
    parse_generic_lookup, parse_name_search, parse_population_result,
};
use tracing::trace;

/// One reply shape: a cheap predicate plus the parser that runs when it fires.
///
/// The parser returns `None` when it finds nothing worth showing, in which case resolution
/// falls through to the next entry.
#[derive(Clone, Copy)]
pub struct Detector {
    pub decision: DisplayDecision,
    pub matches: fn(&str) -> bool,
    pub parse: fn(&str) -> Option<ResultView>,
}

/// Evaluation order. First entry whose predicate and parser both succeed wins.
pub const DETECTORS: [Detector; 5] = [
    Detector {
        decision: DisplayDecision::FaceRecognition,
        matches: is_face_recognition,
        parse: parse_face_view,
    },
    Detector {
        decision: DisplayDecision::NameSearch,
        matches: is_name_search,
        parse: parse_name_view,
    },
    Detector {
        decision: DisplayDecision::FamilyCard,
        matches: is_family_card,
        parse: parse_family_view,
    },
    Detector {
        decision: DisplayDecision::GenericLookup,
        matches: is_generic_lookup,
        parse: parse_generic_view,
    },
    Detector {
        decision: DisplayDecision::PopulationRecords,
        matches: is_population_result,
        parse: parse_population_view,
    },
];

/// Normalizes `raw` and picks exactly one view for it.
pub fn resolve(raw: &str) -> ResultView {
    resolve_normalized(&normalize(raw))
}

pub fn resolve_normalized(normalized: &str) -> ResultView {
    for detector in DETECTORS.iter().filter(|detector| (detector.matches)(normalized)) {
        if let Some(view) = (detector.parse)(normalized) {
            return view;
        }
        trace!(decision = detector.decision.label(), "detector matched but parsed nothing");
    }
    ResultView::PlainText(normalized.to_string())
}

fn parse_face_view(text: &str) -> Option<ResultView> {
    let matches = parse_face_recognition(text);
    (!matches.is_empty()).then_some(ResultView::FaceRecognition(matches))
}

fn parse_name_view(text: &str) -> Option<ResultView> {
    let records = parse_name_search(text);
    (!records.is_empty()).then_some(ResultView::NameSearch(records))
}

fn parse_family_view(text: &str) -> Option<ResultView> {
    parse_family_card(text)
        .filter(|card| !card.members.is_empty())
        .map(ResultView::FamilyCard)
}

fn parse_generic_view(text: &str) -> Option<ResultView> {
    let lookup = parse_generic_lookup(text);
    lookup
        .has_content()
        .then_some(ResultView::GenericLookup(lookup))
}

fn parse_population_view(text: &str) -> Option<ResultView> {
    let records = parse_population_result(text);
    (!records.is_empty()).then_some(ResultView::PopulationRecords(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParsedRecord;

    const FACE_BLOCK: &str = "FACE RECOGNITION RESULT\n--RESULT 1--\nNIK: 3201010101010001\nSimilarity: 99%\nNama: Budi\n";
    const FAMILY_BLOCK: &str = "NIK: 3201010101010001\nNAMA: Budi\nHUBUNGAN: KEPALA KELUARGA\nNIK: 3201010101010002\nNAMA: Ani\nHUBUNGAN: ISTRI\n";

    #[test]
    fn detector_order_is_fixed() {
        let order: Vec<DisplayDecision> = DETECTORS.iter().map(|d| d.decision).collect();
        assert_eq!(
            order,
            vec![
                DisplayDecision::FaceRecognition,
                DisplayDecision::NameSearch,
                DisplayDecision::FamilyCard,
                DisplayDecision::GenericLookup,
                DisplayDecision::PopulationRecords,
            ]
        );
    }

    #[test]
    fn each_detector_claims_its_own_sample() {
        let samples = [
            FACE_BLOCK,
            "Data Ditemukan\n👤 1\nNAMA: Budi\n",
            FAMILY_BLOCK,
            "Phone 628123\nWallet information:\nDANA Budi",
            "NIK: 1\nNAMA: Budi",
        ];
        for (detector, sample) in DETECTORS.iter().zip(samples) {
            assert!((detector.matches)(sample), "{:?}", detector.decision);
            let view = (detector.parse)(sample).expect("parsed view");
            assert_eq!(view.decision(), detector.decision);
        }
    }

    #[test]
    fn face_recognition_beats_family_card() {
        let text = format!("{FACE_BLOCK}\n{FAMILY_BLOCK}");
        assert!(is_family_card(&text));
        assert_eq!(resolve(&text).decision(), DisplayDecision::FaceRecognition);
    }

    #[test]
    fn family_card_beats_population_records() {
        assert_eq!(resolve(FAMILY_BLOCK).decision(), DisplayDecision::FamilyCard);
    }

    #[test]
    fn unrecognized_text_is_plain_and_normalized() {
        let raw = "```\nHalo, silakan pilih menu\n```";
        assert_eq!(
            resolve(raw),
            ResultView::PlainText("Halo, silakan pilih menu".to_string())
        );
    }

    #[test]
    fn predicate_without_parse_output_falls_through() {
        let text = "FACE RECOGNITION RESULT\nTidak ada hasil";
        assert_eq!(resolve(text).decision(), DisplayDecision::PlainText);
    }

    #[test]
    fn numbered_population_record_end_to_end() {
        let text = "NO. 1\nNIK: 3201010101010001\nNAMA: Budi Santoso\nALAMAT: Jl. Mawar No. 1";
        let ResultView::PopulationRecords(records) = resolve(text) else {
            panic!("expected population records");
        };
        let expected: ParsedRecord = [
            ("NIK", "3201010101010001"),
            ("NAMA", "Budi Santoso"),
            ("ALAMAT", "Jl. Mawar No. 1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(records, vec![expected]);
    }

    #[test]
    fn crlf_population_records_split_per_marker() {
        let text = "NO. 1\r\nNIK: 1\r\nNAMA: A\r\nNO. 2\r\nNIK: 2\r\nNAMA: B\r\n";
        let ResultView::PopulationRecords(records) = resolve(text) else {
            panic!("expected population records");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("NIK").map(String::as_str), Some("2"));
        assert_eq!(records[1].get("NAMA").map(String::as_str), Some("B"));
    }

    #[test]
    fn resolution_is_deterministic() {
        let text = format!("{FACE_BLOCK}\n{FAMILY_BLOCK}");
        assert_eq!(resolve(&text), resolve(&text));
        assert_eq!(resolve(&text), resolve(&normalize(&text)));
    }
}
