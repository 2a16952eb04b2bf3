/// A lookup category offered by the bot, addressed by its slash command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LookupFeature {
    pub label: &'static str,
    pub command: &'static str,
}

pub const LOOKUP_FEATURES: [LookupFeature; 11] = [
    LookupFeature { label: "NIK", command: "nik" },
    LookupFeature { label: "CEK KK", command: "kk" },
    LookupFeature { label: "CEK POS", command: "cp" },
    LookupFeature { label: "NOPOL", command: "nopol" },
    LookupFeature { label: "NOKA", command: "noka" },
    LookupFeature { label: "NOSIN", command: "nosin" },
    LookupFeature { label: "NAMA", command: "nama" },
    LookupFeature { label: "FR", command: "fr" },
    LookupFeature { label: "PHONE", command: "phone" },
    LookupFeature { label: "HP2NIK", command: "hp2nik" },
    LookupFeature { label: "INFO", command: "info" },
];

/// Accepts the command (`kk`, `/kk`) or the menu label (`CEK KK`), case-insensitively.
pub fn find_lookup_feature(name: &str) -> Option<LookupFeature> {
    let wanted = name.trim().trim_start_matches('/');
    LOOKUP_FEATURES.iter().copied().find(|feature| {
        feature.command.eq_ignore_ascii_case(wanted) || feature.label.eq_ignore_ascii_case(wanted)
    })
}

impl LookupFeature {
    pub fn message(&self, query: &str) -> String {
        format!("/{} {}", self.command, query.trim())
    }
}
