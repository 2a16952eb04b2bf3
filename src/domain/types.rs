use serde::Deserialize;
use std::collections::BTreeMap;

pub const JPEG_MIME: &str = "image/jpeg";

/// Field name (uppercased) to value, as extracted from one `KEY: value` block.
pub type ParsedRecord = BTreeMap<String, String>;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ChatButton {
    pub text: String,
    pub data: String,
}

/// One bot reply, as delivered by the results feed or the push channel.
///
/// Both feeds are accepted: the results feed names the body `result_text` and the timestamp
/// `created_at`, the chat feed uses `text` and `date`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct RawMessage {
    pub id: i64,
    #[serde(default, alias = "result_text")]
    pub text: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default, alias = "date")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub buttons: Vec<ChatButton>,
}

impl RawMessage {
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn is_jpeg(&self) -> bool {
        self.mime_type.as_deref() == Some(JPEG_MIME)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct CompanyDoc {
    pub id: i64,
    pub nama: String,
    pub url: String,
    pub prefix: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisplayDecision {
    FaceRecognition,
    NameSearch,
    FamilyCard,
    GenericLookup,
    PopulationRecords,
    PlainText,
}

impl DisplayDecision {
    pub fn label(self) -> &'static str {
        match self {
            Self::FaceRecognition => "face-recognition",
            Self::NameSearch => "name-search",
            Self::FamilyCard => "family-card",
            Self::GenericLookup => "generic-lookup",
            Self::PopulationRecords => "population-records",
            Self::PlainText => "plain-text",
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FaceMatch {
    pub rank: u32,
    pub similarity: Option<String>,
    pub nik: Option<String>,
    pub name: Option<String>,
    pub birth: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FamilyMember {
    pub nik: Option<String>,
    pub name: Option<String>,
    pub birth: Option<String>,
    pub gender: Option<String>,
    pub relationship: Option<String>,
    pub marital_status: Option<String>,
    pub religion: Option<String>,
    pub blood_type: Option<String>,
    pub education: Option<String>,
    pub occupation: Option<String>,
    pub mother_nik: Option<String>,
    pub mother_name: Option<String>,
    pub father_nik: Option<String>,
    pub father_name: Option<String>,
}

/// Household-level address, each field chosen by majority vote across members.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FamilyArea {
    pub address: Option<String>,
    pub province: Option<String>,
    pub regency: Option<String>,
    pub district: Option<String>,
    pub village: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FamilyCard {
    pub nkk: Option<String>,
    pub area: FamilyArea,
    pub members: Vec<FamilyMember>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Person {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub dob: Option<String>,
}

impl Person {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.dob.is_none()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GenericLookup {
    pub query_phone: Option<String>,
    pub contact: Option<String>,
    pub reg_data: Option<String>,
    pub wallets: BTreeMap<String, String>,
    pub people: Vec<Person>,
    pub expedition: Option<String>,
    pub recidivist: Option<String>,
    pub vehicle: Option<String>,
}

impl GenericLookup {
    pub fn has_content(&self) -> bool {
        self.query_phone.is_some()
            || self.contact.is_some()
            || self.reg_data.is_some()
            || !self.wallets.is_empty()
            || !self.people.is_empty()
            || self.expedition.is_some()
            || self.recidivist.is_some()
            || self.vehicle.is_some()
    }
}

/// The parsed form of one message, tagged by the shape that claimed it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResultView {
    FaceRecognition(Vec<FaceMatch>),
    NameSearch(Vec<ParsedRecord>),
    FamilyCard(FamilyCard),
    GenericLookup(GenericLookup),
    PopulationRecords(Vec<ParsedRecord>),
    PlainText(String),
}

impl ResultView {
    pub fn decision(&self) -> DisplayDecision {
        match self {
            Self::FaceRecognition(_) => DisplayDecision::FaceRecognition,
            Self::NameSearch(_) => DisplayDecision::NameSearch,
            Self::FamilyCard(_) => DisplayDecision::FamilyCard,
            Self::GenericLookup(_) => DisplayDecision::GenericLookup,
            Self::PopulationRecords(_) => DisplayDecision::PopulationRecords,
            Self::PlainText(_) => DisplayDecision::PlainText,
        }
    }

    /// Views that get a copy action in the result list.
    pub fn is_copyable(&self) -> bool {
        matches!(
            self,
            Self::FamilyCard(_) | Self::NameSearch(_) | Self::PopulationRecords(_)
        )
    }
}
