//! Address parsing functionality.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::error::{Result, ensure_not_blank};
use crate::labeler::Labeler;
use crate::tokenizer::{Tokenizer, prepare};
use crate::types::{Label, LabeledComponent};

/// High-level address parser with idiomatic Rust API.
#[derive(Debug, Clone)]
pub struct AddressParser {
    tokenizer: Tokenizer,
    labeler: Labeler,
}

impl AddressParser {
    /// Create a new parser over `dictionary`.
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self {
            tokenizer: Tokenizer::new(Arc::clone(&dictionary)),
            labeler: Labeler::new(dictionary),
        }
    }

    /// Parse an address string into structured components.
    ///
    /// # Arguments
    ///
    /// * `address` - The address string to parse
    ///
    /// # Returns
    ///
    /// A `ParsedAddress` containing the labeled components, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EmptyInput`] if the address is empty or only
    /// whitespace.
    ///
    /// # Example
    ///
    /// ```rust
    /// use oxidize_postal::{AddressParser, Label, dictionary};
    ///
    /// let parser = AddressParser::new(dictionary::bundled()?);
    /// let parsed = parser.parse("123 Main St, New York, NY 10001")?;
    /// assert_eq!(parsed.get(Label::HouseNumber), Some("123"));
    /// # Ok::<(), oxidize_postal::Error>(())
    /// ```
    pub fn parse(&self, address: &str) -> Result<ParsedAddress> {
        ensure_not_blank(address, "parse")?;
        let tokens = self.tokenizer.tokenize(&prepare(address))?;
        let components = self.labeler.label(&tokens)?;
        Ok(ParsedAddress::from_components(components))
    }

    /// Parse multiple addresses in batch, stopping at the first failure.
    pub fn parse_batch(&self, addresses: &[&str]) -> Result<Vec<ParsedAddress>> {
        addresses.iter().map(|addr| self.parse(addr)).collect()
    }

    /// Parse multiple addresses in parallel using multiple threads.
    ///
    /// Results come back in input order; each address gets its own result so
    /// one bad input does not discard the rest.
    ///
    /// # Example
    ///
    /// ```rust
    /// use oxidize_postal::{AddressParser, dictionary};
    ///
    /// let parser = AddressParser::new(dictionary::bundled()?);
    /// let addresses = vec![
    ///     "123 Main St, New York, NY",
    ///     "456 Oak Ave, Los Angeles, CA",
    ///     "789 Pine Rd, Chicago, IL",
    /// ];
    ///
    /// for result in parser.parse_batch_parallel(&addresses) {
    ///     match result {
    ///         Ok(parsed) => println!("Parsed: {:?}", parsed.get(oxidize_postal::Label::City)),
    ///         Err(e) => println!("Error: {}", e),
    ///     }
    /// }
    /// # Ok::<(), oxidize_postal::Error>(())
    /// ```
    #[cfg(feature = "parallel")]
    pub fn parse_batch_parallel(&self, addresses: &[&str]) -> Vec<Result<ParsedAddress>> {
        use rayon::prelude::*;

        addresses.par_iter().map(|addr| self.parse(addr)).collect()
    }

    /// Parse multiple addresses in parallel and keep only the successes.
    #[cfg(feature = "parallel")]
    pub fn parse_batch_parallel_ok(&self, addresses: &[&str]) -> Vec<ParsedAddress> {
        self.parse_batch_parallel(addresses)
            .into_iter()
            .filter_map(|result| result.ok())
            .collect()
    }
}

/// Structured representation of a parsed address.
///
/// A mapping from [`Label`] to value with at most one value per label,
/// ordered by position in the input. Serializes as a JSON object keyed by the
/// snake_case label names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedAddress {
    components: IndexMap<Label, String>,
}

impl ParsedAddress {
    /// Build a parse result; a repeated label replaces the earlier value.
    pub fn from_components(components: impl IntoIterator<Item = LabeledComponent>) -> Self {
        let mut parsed = ParsedAddress::default();
        for component in components {
            parsed.components.shift_remove(&component.label);
            parsed.components.insert(component.label, component.value);
        }
        parsed
    }

    /// Value for `label`, if present.
    pub fn get(&self, label: Label) -> Option<&str> {
        self.components.get(&label).map(String::as_str)
    }

    /// Components in input order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &str)> {
        self.components
            .iter()
            .map(|(label, value)| (*label, value.as_str()))
    }

    /// Components as an ordered list of labeled pairs.
    pub fn to_components(&self) -> Vec<LabeledComponent> {
        self.iter()
            .map(|(label, value)| LabeledComponent::new(label, value))
            .collect()
    }

    /// Get all components as a map keyed by label name.
    pub fn components(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(label, value)| (label.as_str().to_string(), value.to_string()))
            .collect()
    }

    /// Serialize to a JSON object string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Number of labeled components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if the parsed address has any components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
