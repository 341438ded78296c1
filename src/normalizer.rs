//! Address normalization: one canonical string per address.

use std::sync::Arc;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result, ensure_not_blank};
use crate::parser::{AddressParser, ParsedAddress};
use crate::types::Label;

/// Renders parsed addresses in a fixed component order.
#[derive(Debug, Clone)]
pub struct AddressNormalizer {
    parser: AddressParser,
}

impl AddressNormalizer {
    /// Create a new normalizer over `dictionary`.
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self {
            parser: AddressParser::new(dictionary),
        }
    }

    /// Normalize an address string.
    ///
    /// Components are rendered as `house_number road, unit, level, po_box,
    /// city, STATE postcode, COUNTRY`, skipping absent ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] for empty or whitespace-only input and
    /// [`Error::NoComponents`] when the parse labels nothing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use oxidize_postal::{AddressNormalizer, dictionary};
    ///
    /// let normalizer = AddressNormalizer::new(dictionary::bundled()?);
    /// let normalized = normalizer.normalize("123 Main St, New York, NY 10001")?;
    /// assert_eq!(normalized, "123 main st, new york, NY 10001");
    /// # Ok::<(), oxidize_postal::Error>(())
    /// ```
    pub fn normalize(&self, input: &str) -> Result<String> {
        ensure_not_blank(input, "normalize")?;

        let parsed = self.parser.parse(input)?;
        render(&parsed).ok_or_else(|| Error::no_components(input))
    }

    /// Normalize multiple address strings in batch.
    pub fn normalize_batch(&self, inputs: &[&str]) -> Result<Vec<String>> {
        inputs.iter().map(|input| self.normalize(input)).collect()
    }
}

fn render(parsed: &ParsedAddress) -> Option<String> {
    let mut parts = Vec::new();

    let street = join_present(&[parsed.get(Label::HouseNumber), parsed.get(Label::Road)]);
    parts.extend(street);

    for label in [Label::Unit, Label::Level, Label::PoBox, Label::City] {
        if let Some(value) = parsed.get(label) {
            parts.push(value.to_string());
        }
    }

    let state = parsed.get(Label::State).map(str::to_uppercase);
    let region = join_present(&[state.as_deref(), parsed.get(Label::Postcode)]);
    parts.extend(region);

    if let Some(country) = parsed.get(Label::Country) {
        parts.push(country.to_uppercase());
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn join_present(values: &[Option<&str>]) -> Option<String> {
    let present: Vec<&str> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(" "))
    }
}
