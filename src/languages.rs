//! Supported recognition languages.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

pub const LANGUAGES: &[Language] = &[
    Language { code: "eng", name: "English" },
    Language { code: "hrv", name: "Croatian" },
    Language { code: "fra", name: "French" },
    Language { code: "deu", name: "German" },
    Language { code: "spa", name: "Spanish" },
    Language { code: "ita", name: "Italian" },
    Language { code: "eng+hrv", name: "English + Croatian" },
];

/// Human-readable name used as prompt context for the vision model.
///
/// Combined codes are resolved per component; unknown codes read as English.
pub fn display_name(code: &str) -> String {
    if let Some(lang) = LANGUAGES.iter().find(|l| l.code == code) {
        return lang.name.to_string();
    }

    code.split('+')
        .map(|part| {
            LANGUAGES
                .iter()
                .find(|l| l.code == part)
                .map(|l| l.name)
                .unwrap_or("English")
        })
        .collect::<Vec<_>>()
        .join(" + ")
}
