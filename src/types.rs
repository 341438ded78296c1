//! Common types and enums for oxidize-postal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structural role assigned to part of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// House number (e.g., "123", "221b")
    HouseNumber,
    /// Road/street name (e.g., "main st")
    Road,
    /// Unit/apartment designator and number (e.g., "apt 2b")
    Unit,
    /// Floor/level (e.g., "fl 3", "3rd floor")
    Level,
    /// Post office box (e.g., "po box 123")
    PoBox,
    /// Postcode (e.g., "10001", "sw1a 1aa")
    Postcode,
    /// City/locality
    City,
    /// State/province code (e.g., "ny")
    State,
    /// Country (e.g., "usa", "united kingdom")
    Country,
}

impl Label {
    /// All labels in canonical address order.
    pub const ALL: [Label; 9] = [
        Label::HouseNumber,
        Label::Road,
        Label::Unit,
        Label::Level,
        Label::PoBox,
        Label::City,
        Label::State,
        Label::Postcode,
        Label::Country,
    ];

    /// The snake_case name used in mappings and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::HouseNumber => "house_number",
            Label::Road => "road",
            Label::Unit => "unit",
            Label::Level => "level",
            Label::PoBox => "po_box",
            Label::Postcode => "postcode",
            Label::City => "city",
            Label::State => "state",
            Label::Country => "country",
        }
    }

    /// Parse a label from its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Label::ALL.into_iter().find(|label| label.as_str() == name)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic class assigned to a token by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenTag {
    /// Digits only ("123")
    Number,
    /// Digits with an ordinal suffix ("5th", "21st")
    Ordinal,
    /// Any other digit-bearing token ("221b", "10001-1234", "sw1a")
    Alphanumeric,
    /// Street type ("st", "avenue")
    StreetType,
    /// Compass direction ("n", "nw", "north")
    Directional,
    /// Unit designator ("apt", "suite")
    Unit,
    /// Level designator ("fl", "floor")
    Level,
    /// Post office box designator ("po", "box")
    PoBox,
    /// Honorific or title ("saint", "mt")
    Title,
    /// State or region code ("ny")
    State,
    /// Country name ("usa", "france")
    Country,
    /// Other dictionary abbreviation
    Abbreviation,
    /// Run of punctuation characters
    Punctuation,
    /// Not recognised
    Unknown,
}

impl TokenTag {
    /// Whether the tag marks a numeric-like token.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TokenTag::Number | TokenTag::Ordinal | TokenTag::Alphanumeric
        )
    }
}

/// A span of the classifier input with its normalized form and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    start: usize,
    end: usize,
    text: String,
    tag: TokenTag,
}

impl Token {
    pub(crate) fn new(start: usize, end: usize, text: String, tag: TokenTag) -> Self {
        Self {
            start,
            end,
            text,
            tag,
        }
    }

    /// Byte offset where the token starts in the classified text.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset one past the end of the token.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Normalized lowercase form.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Classifier tag.
    pub fn tag(&self) -> TokenTag {
        self.tag
    }

    /// Whether the token carries address content (is not punctuation).
    pub fn is_word(&self) -> bool {
        self.tag != TokenTag::Punctuation
    }
}

/// A labeled address component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledComponent {
    /// Structural role
    pub label: Label,
    /// Reconstructed value
    pub value: String,
}

impl LabeledComponent {
    /// Create a new labeled component.
    pub fn new(label: Label, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_names() {
        assert_eq!(Label::HouseNumber.as_str(), "house_number");
        assert_eq!(Label::from_name("po_box"), Some(Label::PoBox));
        assert_eq!(Label::from_name("suburb"), None);
        for label in Label::ALL {
            assert_eq!(Label::from_name(&label.to_string()), Some(label));
        }
    }

    #[test]
    fn test_label_serde_name() {
        let json = serde_json::to_string(&Label::HouseNumber).unwrap();
        assert_eq!(json, "\"house_number\"");
    }

    #[test]
    fn test_token_accessors() {
        let token = Token::new(4, 8, "main".to_string(), TokenTag::Unknown);
        assert_eq!(token.start(), 4);
        assert_eq!(token.end(), 8);
        assert_eq!(token.text(), "main");
        assert!(token.is_word());
        assert!(!Token::new(8, 9, ",".to_string(), TokenTag::Punctuation).is_word());
        assert!(TokenTag::Ordinal.is_numeric());
        assert!(!TokenTag::StreetType.is_numeric());
    }
}
