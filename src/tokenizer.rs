//! Token classifier: splits address text into tokens and tags each one.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dictionary::Dictionary;
use crate::error::{Result, ensure_not_blank};
use crate::types::{Token, TokenTag};

// Alternatives are tried leftmost-first. Every non-whitespace character starts
// a match of at least one of them, so tokenization covers the whole input.
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?P<acronym>\p{L}(?:\.\p{L})+\.?)
        | (?P<alnum>[\p{L}\p{M}\p{N}]*\p{N}[\p{L}\p{M}\p{N}]*(?:-\p{N}+)*)
        | (?P<word>\p{L}[\p{L}\p{M}]*(?:['’]\p{L}[\p{L}\p{M}]*)*)
        | (?P<punct>[^\s\p{L}\p{N}]+)
        ",
    )
    .unwrap()
});

static ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:st|nd|rd|th)$").unwrap());

/// Lowercase `text`, collapse whitespace runs to a single space and trim.
pub fn prepare(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Dictionary-backed token classifier.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    dictionary: Arc<Dictionary>,
}

impl Tokenizer {
    /// Create a classifier over `dictionary`.
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self { dictionary }
    }

    /// The dictionary used for tagging.
    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    /// Split `text` into tagged tokens.
    ///
    /// Offsets refer to `text` as given; callers normally pass the output of
    /// [`prepare`]. Token forms are lowercased either way.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EmptyInput`] for empty or whitespace-only input.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        ensure_not_blank(text, "tokenize")?;

        let tokens = TOKEN_PATTERN
            .captures_iter(text)
            .filter_map(|caps| {
                let (kind, m) = if let Some(m) = caps.name("acronym") {
                    (Kind::Acronym, m)
                } else if let Some(m) = caps.name("alnum") {
                    (Kind::Alphanumeric, m)
                } else if let Some(m) = caps.name("word") {
                    (Kind::Word, m)
                } else {
                    (Kind::Punctuation, caps.name("punct")?)
                };

                let form = normalize_form(kind, m.as_str());
                let tag = self.classify(kind, &form);
                Some(Token::new(m.start(), m.end(), form, tag))
            })
            .collect();

        Ok(tokens)
    }

    fn classify(&self, kind: Kind, form: &str) -> TokenTag {
        match kind {
            Kind::Punctuation => TokenTag::Punctuation,
            Kind::Alphanumeric => {
                if form.chars().all(char::is_numeric) {
                    TokenTag::Number
                } else if ORDINAL.is_match(form) {
                    TokenTag::Ordinal
                } else {
                    TokenTag::Alphanumeric
                }
            }
            Kind::Acronym | Kind::Word => self.dictionary.tag(form).unwrap_or(TokenTag::Unknown),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Acronym,
    Alphanumeric,
    Word,
    Punctuation,
}

fn normalize_form(kind: Kind, raw: &str) -> String {
    let lower = raw.to_lowercase();
    match kind {
        Kind::Acronym => lower.chars().filter(|c| *c != '.').collect(),
        Kind::Word => lower.chars().filter(|c| *c != '\'' && *c != '’').collect(),
        Kind::Alphanumeric | Kind::Punctuation => lower,
    }
}
