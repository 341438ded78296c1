//! Expansion dictionary: abbreviation expansions plus the closed state and
//! country sets used by the labeler.
//!
//! The dictionary is read from a small sectioned text resource:
//!
//! ```text
//! # comment
//! [street_type]
//! st = street
//! avenue
//!
//! [country]
//! united kingdom
//! ```
//!
//! Every entry line is either a bare surface form (the token is tagged by its
//! section but has no expansions) or `surface = exp1, exp2`. Loading is all or
//! nothing: the first malformed line aborts with [`Error::DictionaryLoad`].
//!
//! The bundled resource is compiled into the crate and loaded at most once per
//! process by [`bundled`].

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{Error, Result};
use crate::types::TokenTag;

/// Source of the dictionary compiled into the crate.
pub const BUNDLED_SOURCE: &str = include_str!("../resources/expansions.dict");

static BUNDLED: OnceCell<std::result::Result<Arc<Dictionary>, (usize, String)>> = OnceCell::new();

/// Get the process-wide dictionary built from [`BUNDLED_SOURCE`].
///
/// The first caller parses the resource; concurrent callers block until it is
/// done. A load failure is remembered, so every caller observes the same error.
pub fn bundled() -> Result<Arc<Dictionary>> {
    let loaded = BUNDLED.get_or_init(|| {
        log::debug!("Loading bundled expansion dictionary");
        Dictionary::parse(BUNDLED_SOURCE)
            .map(Arc::new)
            .map_err(|err| match err {
                Error::DictionaryLoad { line, message } => (line, message),
                other => (0, other.to_string()),
            })
    });

    match loaded {
        Ok(dictionary) => Ok(Arc::clone(dictionary)),
        Err((line, message)) => Err(Error::dictionary_load(*line, message.clone())),
    }
}

/// Resource sections, in the order they contribute tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Street types ("st", "avenue")
    StreetType,
    /// Compass directions
    Directional,
    /// Unit designators
    Unit,
    /// Level designators
    Level,
    /// Post office box designators
    PoBox,
    /// Titles and honorifics
    Title,
    /// Miscellaneous abbreviations
    Abbreviation,
    /// State/region codes
    State,
    /// Country names, possibly multi-word
    Country,
}

impl Section {
    /// Parse a section header name.
    pub fn from_name(name: &str) -> Option<Self> {
        let section = match name {
            "street_type" => Section::StreetType,
            "directional" => Section::Directional,
            "unit" => Section::Unit,
            "level" => Section::Level,
            "po_box" => Section::PoBox,
            "title" => Section::Title,
            "abbreviation" => Section::Abbreviation,
            "state" => Section::State,
            "country" => Section::Country,
            _ => return None,
        };
        Some(section)
    }

    /// Tag given to tokens whose first occurrence is in this section.
    pub fn tag(&self) -> TokenTag {
        match self {
            Section::StreetType => TokenTag::StreetType,
            Section::Directional => TokenTag::Directional,
            Section::Unit => TokenTag::Unit,
            Section::Level => TokenTag::Level,
            Section::PoBox => TokenTag::PoBox,
            Section::Title => TokenTag::Title,
            Section::Abbreviation => TokenTag::Abbreviation,
            Section::State => TokenTag::State,
            Section::Country => TokenTag::Country,
        }
    }
}

/// Read-only lookup tables built from a dictionary resource.
#[derive(Debug, Default)]
pub struct Dictionary {
    expansions: HashMap<String, Vec<String>>,
    tags: HashMap<String, TokenTag>,
    states: HashSet<String>,
    countries: HashSet<String>,
    max_country_words: usize,
}

impl Dictionary {
    /// Parse a dictionary resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DictionaryLoad`] naming the first malformed line, or
    /// line 0 if the resource has no entries at all.
    pub fn parse(source: &str) -> Result<Self> {
        let mut dictionary = Dictionary::default();
        let mut section = None;

        for (index, raw) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();

            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| {
                    Error::dictionary_load(line_no, format!("unterminated section header `{line}`"))
                })?;
                let name = name.trim();
                section = Some(Section::from_name(name).ok_or_else(|| {
                    Error::dictionary_load(line_no, format!("unknown section `{name}`"))
                })?);
                continue;
            }

            let section = section.ok_or_else(|| {
                Error::dictionary_load(line_no, "entry appears before any [section] header")
            })?;
            let (surface, expansions) = parse_entry(line, section, line_no)?;
            dictionary.insert(section, surface, expansions);
        }

        if dictionary.tags.is_empty() && dictionary.countries.is_empty() {
            return Err(Error::dictionary_load(0, "resource contains no entries"));
        }

        log::debug!(
            "Loaded expansion dictionary: {} surface forms, {} states, {} countries",
            dictionary.tags.len(),
            dictionary.states.len(),
            dictionary.countries.len()
        );

        Ok(dictionary)
    }

    /// Load a dictionary resource from a file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading expansion dictionary from {}", path.display());
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::dictionary_load(0, format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&source)
    }

    /// Expansions for a surface form, in resource order. Empty if unknown.
    pub fn expansions(&self, surface: &str) -> &[String] {
        self.expansions
            .get(surface)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tag of a single-word surface form, if the dictionary knows it.
    pub fn tag(&self, surface: &str) -> Option<TokenTag> {
        self.tags.get(surface).copied()
    }

    /// Whether `code` belongs to the closed state/region set.
    pub fn is_state(&self, code: &str) -> bool {
        self.states.contains(code)
    }

    /// Whether the space-joined `phrase` is a known country name.
    pub fn is_country(&self, phrase: &str) -> bool {
        self.countries.contains(phrase)
    }

    /// Word count of the longest country phrase.
    pub fn max_country_words(&self) -> usize {
        self.max_country_words
    }

    /// Number of distinct single-word surface forms.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether no single-word surface forms were loaded.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn insert(&mut self, section: Section, surface: String, expansions: Vec<String>) {
        let words = surface.split(' ').count();

        match section {
            Section::State => {
                self.states.insert(surface.clone());
            }
            Section::Country => {
                self.countries.insert(surface.clone());
                self.max_country_words = self.max_country_words.max(words);
            }
            _ => {}
        }

        if words > 1 {
            return;
        }

        self.tags.entry(surface.clone()).or_insert(section.tag());

        let list = self.expansions.entry(surface).or_default();
        for expansion in expansions {
            if !list.contains(&expansion) {
                list.push(expansion);
            }
        }
    }
}

fn parse_entry(line: &str, section: Section, line_no: usize) -> Result<(String, Vec<String>)> {
    let (surface, list) = match line.split_once('=') {
        Some((surface, list)) => (surface, Some(list)),
        None => (line, None),
    };

    let surface = surface
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if surface.is_empty() {
        return Err(Error::dictionary_load(line_no, "empty surface form"));
    }

    let multi_word = surface.contains(' ');
    if multi_word && section != Section::Country {
        return Err(Error::dictionary_load(
            line_no,
            format!("multi-word surface `{surface}` is only allowed in [country]"),
        ));
    }

    let mut expansions = Vec::new();
    if let Some(list) = list {
        if multi_word {
            return Err(Error::dictionary_load(
                line_no,
                format!("multi-word surface `{surface}` cannot carry expansions"),
            ));
        }

        for item in list.split(',') {
            let item = item.trim().to_lowercase();
            if item.is_empty() {
                return Err(Error::dictionary_load(
                    line_no,
                    format!("empty expansion for `{surface}`"),
                ));
            }
            if item.chars().any(char::is_whitespace) {
                return Err(Error::dictionary_load(
                    line_no,
                    format!("expansion `{item}` must be a single word"),
                ));
            }
            if item != surface {
                expansions.push(item);
            }
        }
    }

    Ok((surface, expansions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_bundled_dictionary_loads() {
        let dictionary = bundled().expect("bundled dictionary should load");
        assert!(!dictionary.is_empty());
        assert_eq!(dictionary.expansions("st"), &["street", "saint"]);
        assert_eq!(dictionary.expansions("ave"), &["avenue"]);
        assert_eq!(dictionary.tag("st"), Some(TokenTag::StreetType));
        assert_eq!(dictionary.tag("ny"), Some(TokenTag::State));
        assert!(dictionary.is_state("ny"));
        assert!(dictionary.is_country("united kingdom"));
        assert!(dictionary.max_country_words() >= 2);
    }

    #[test]
    fn test_bundled_is_shared() {
        let first = bundled().unwrap();
        let second = bundled().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_entries_pass_through() {
        let dictionary = bundled().unwrap();
        assert!(dictionary.expansions("main").is_empty());
        assert_eq!(dictionary.tag("main"), None);
    }

    #[test]
    fn test_first_section_wins_tag_and_orders_expansions() {
        let dictionary = Dictionary::parse(
            "[title]\nst = saint\n\n[street_type]\nst = street, saint\n",
        )
        .unwrap();
        assert_eq!(dictionary.tag("st"), Some(TokenTag::Title));
        assert_eq!(dictionary.expansions("st"), &["saint", "street"]);
    }

    #[test]
    fn test_comments_and_case() {
        let dictionary =
            Dictionary::parse("# header\n[street_type]\nAVE = Avenue # trailing\n").unwrap();
        assert_eq!(dictionary.expansions("ave"), &["avenue"]);
    }

    #[test]
    fn test_entry_before_section() {
        let err = Dictionary::parse("st = street\n").unwrap_err();
        assert_matches!(err, Error::DictionaryLoad { line: 1, .. });
    }

    #[test]
    fn test_unknown_section() {
        let err = Dictionary::parse("[street_type]\nst = street\n[suburbs]\n").unwrap_err();
        assert_matches!(err, Error::DictionaryLoad { line: 3, .. });
    }

    #[test]
    fn test_unterminated_header() {
        let err = Dictionary::parse("[street_type\n").unwrap_err();
        assert_matches!(err, Error::DictionaryLoad { line: 1, .. });
    }

    #[test]
    fn test_multi_word_expansion_rejected() {
        let err = Dictionary::parse("[po_box]\npo = post office\n").unwrap_err();
        assert_matches!(err, Error::DictionaryLoad { line: 2, ref message } if message.contains("single word"));
    }

    #[test]
    fn test_multi_word_surface_outside_country_rejected() {
        let err = Dictionary::parse("[state]\nnew york\n").unwrap_err();
        assert_matches!(err, Error::DictionaryLoad { line: 2, .. });
    }

    #[test]
    fn test_empty_expansion_rejected() {
        let err = Dictionary::parse("[street_type]\nst =\n").unwrap_err();
        assert_matches!(err, Error::DictionaryLoad { line: 2, .. });

        let err = Dictionary::parse("[street_type]\nst = street,,\n").unwrap_err();
        assert_matches!(err, Error::DictionaryLoad { line: 2, .. });
    }

    #[test]
    fn test_empty_resource_rejected() {
        let err = Dictionary::parse("# nothing here\n\n").unwrap_err();
        assert_matches!(err, Error::DictionaryLoad { line: 0, .. });
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.dict");
        std::fs::write(&path, "[street_type]\nst = street\n").unwrap();

        let dictionary = Dictionary::load_file(&path).unwrap();
        assert_eq!(dictionary.len(), 1);

        let err = Dictionary::load_file(dir.path().join("missing.dict")).unwrap_err();
        assert_matches!(err, Error::DictionaryLoad { line: 0, .. });
    }
}
