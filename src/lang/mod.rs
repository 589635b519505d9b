//! Language detection for the eight supported corpus languages.
//!
//! Detection is a deterministic function of the input text: a Unicode script
//! census decides the CJK/Hangul/Cyrillic cases, and a function-word profile
//! separates the Latin-script languages. Anything unrecognized falls back to
//! English.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::types::{AppError, Result};

/// A supported corpus language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// Korean
    Ko,
    /// English (the fallback for unknown input)
    #[default]
    En,
    /// Japanese
    Ja,
    /// Chinese
    Zh,
    /// Spanish
    Es,
    /// French
    Fr,
    /// German
    De,
    /// Russian
    Ru,
}

impl Lang {
    /// The ISO 639-1 code for this language.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
            Self::Ja => "ja",
            Self::Zh => "zh",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Ru => "ru",
        }
    }

    /// All supported languages, in a stable order.
    pub fn all() -> [Lang; 8] {
        [
            Self::Ko,
            Self::En,
            Self::Ja,
            Self::Zh,
            Self::Es,
            Self::Fr,
            Self::De,
            Self::Ru,
        ]
    }

    /// Parse a code, mapping anything unsupported to [`Lang::En`].
    pub fn from_code_or_default(code: &str) -> Lang {
        code.parse().unwrap_or_default()
    }
}

impl FromStr for Lang {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ko" => Ok(Self::Ko),
            "en" => Ok(Self::En),
            "ja" => Ok(Self::Ja),
            "zh" => Ok(Self::Zh),
            "es" => Ok(Self::Es),
            "fr" => Ok(Self::Fr),
            "de" => Ok(Self::De),
            "ru" => Ok(Self::Ru),
            other => Err(AppError::Validation(format!(
                "Unsupported language code: {}. Supported: ko, en, ja, zh, es, fr, de, ru",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Script census
// ============================================================================

#[derive(Debug, Default)]
struct ScriptCounts {
    hangul: usize,
    kana: usize,
    han: usize,
    cyrillic: usize,
    latin: usize,
}

fn census(text: &str) -> ScriptCounts {
    let mut counts = ScriptCounts::default();
    for c in text.chars() {
        match c as u32 {
            // Hangul syllables, jamo, compatibility jamo
            0xAC00..=0xD7AF | 0x1100..=0x11FF | 0x3130..=0x318F => counts.hangul += 1,
            // Hiragana and Katakana
            0x3040..=0x309F | 0x30A0..=0x30FF => counts.kana += 1,
            // CJK unified ideographs (+ extension A)
            0x4E00..=0x9FFF | 0x3400..=0x4DBF => counts.han += 1,
            0x0400..=0x04FF => counts.cyrillic += 1,
            _ if c.is_ascii_alphabetic() || matches!(c as u32, 0x00C0..=0x024F) => {
                counts.latin += 1
            }
            _ => {}
        }
    }
    counts
}

// ============================================================================
// Latin-script profiles
// ============================================================================

// Function words with little overlap between the four Latin-script
// languages. Shared articles ("la", "de", "en") are deliberately absent.
const EN_WORDS: &[&str] = &[
    "the", "of", "and", "is", "that", "to", "it", "with", "for", "this", "are", "was", "what",
    "be", "have", "from",
];
const ES_WORDS: &[&str] = &[
    "el", "los", "las", "una", "es", "por", "para", "como", "pero", "sus", "esta", "este",
    "cuando", "hay",
];
const FR_WORDS: &[&str] = &[
    "le", "les", "des", "une", "est", "dans", "pour", "qui", "avec", "sur", "pas", "cette",
    "aux", "sont",
];
const DE_WORDS: &[&str] = &[
    "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "mit", "von", "auf", "dem",
    "den", "als", "auch", "sich",
];

fn profile_score(tokens: &[String], words: &[&str]) -> usize {
    tokens.iter().filter(|t| words.contains(&t.as_str())).count()
}

fn detect_latin(text: &str) -> Lang {
    let tokens: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let scores = [
        (Lang::En, profile_score(&tokens, EN_WORDS)),
        (Lang::Es, profile_score(&tokens, ES_WORDS)),
        (Lang::Fr, profile_score(&tokens, FR_WORDS)),
        (Lang::De, profile_score(&tokens, DE_WORDS)),
    ];

    // Strictly-greater comparison keeps English on ties (and on all-zero).
    let mut best = (Lang::En, 0usize);
    for (lang, score) in scores {
        if score > best.1 {
            best = (lang, score);
        }
    }
    best.0
}

/// Detect the language of a text fragment.
///
/// The result is a pure function of `text`: the same input always yields the
/// same language. Empty or unrecognizable input yields [`Lang::En`].
pub fn detect(text: &str) -> Lang {
    let counts = census(text);

    // Any kana marks Japanese even when Han ideographs dominate, since
    // Japanese prose mixes both scripts while Chinese prose has no kana.
    if counts.kana > 0 && counts.kana + counts.han >= counts.hangul {
        return Lang::Ja;
    }
    if counts.hangul > 0
        && counts.hangul >= counts.han
        && counts.hangul >= counts.cyrillic
        && counts.hangul >= counts.latin
    {
        return Lang::Ko;
    }
    if counts.han > 0 && counts.han >= counts.cyrillic && counts.han >= counts.latin {
        return Lang::Zh;
    }
    if counts.cyrillic > 0 && counts.cyrillic >= counts.latin {
        return Lang::Ru;
    }
    if counts.latin > 0 {
        return detect_latin(text);
    }

    Lang::En
}
