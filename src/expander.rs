//! Address expansion: every combination of the per-token abbreviation
//! expansions, in a fixed order and up to a configurable cap.

use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::error::{Result, ensure_not_blank};
use crate::tokenizer::{Tokenizer, prepare};
use crate::types::Token;

/// Default upper bound on generated combinations.
pub const DEFAULT_MAX_COMBINATIONS: usize = 10_000;

/// Unique expanded strings in generation order.
pub type ExpansionSet = IndexSet<String>;

/// High-level address expander with builder pattern.
#[derive(Debug, Clone)]
pub struct AddressExpander {
    tokenizer: Tokenizer,
    max_combinations: usize,
}

impl AddressExpander {
    /// Create a new expander over `dictionary` with the default cap.
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self {
            tokenizer: Tokenizer::new(dictionary),
            max_combinations: DEFAULT_MAX_COMBINATIONS,
        }
    }

    /// Set the maximum number of combinations produced per input (at least 1).
    pub fn with_max_combinations(mut self, max_combinations: usize) -> Self {
        self.max_combinations = max_combinations.max(1);
        self
    }

    /// The configured combination cap.
    pub fn max_combinations(&self) -> usize {
        self.max_combinations
    }

    /// Expand abbreviations in an address string.
    ///
    /// The first expansion is always the input itself, lowercased with
    /// punctuation removed; the rest follow in lexicographic order of the
    /// per-token candidate lists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EmptyInput`] for empty or whitespace-only input.
    ///
    /// # Example
    ///
    /// ```rust
    /// use oxidize_postal::{AddressExpander, dictionary};
    ///
    /// let expander = AddressExpander::new(dictionary::bundled()?);
    /// let expanded = expander.expand("123 Main St")?;
    /// assert!(expanded.contains("123 main street"));
    /// # Ok::<(), oxidize_postal::Error>(())
    /// ```
    pub fn expand(&self, input: &str) -> Result<ExpandedAddress> {
        ensure_not_blank(input, "expand")?;
        let tokens = self.tokenizer.tokenize(&prepare(input))?;
        let expansions = self.expand_tokens(&tokens);
        Ok(ExpandedAddress {
            original: input.to_string(),
            expansions: expansions.into_iter().collect(),
        })
    }

    /// Expand already classified tokens.
    ///
    /// Punctuation tokens only separate words. If there are no word tokens
    /// the result is the punctuation itself, space separated.
    pub fn expand_tokens(&self, tokens: &[Token]) -> ExpansionSet {
        let candidates: Vec<Vec<&str>> = tokens
            .iter()
            .filter(|token| token.is_word())
            .map(|token| self.candidates(token))
            .collect();

        let mut set = ExpansionSet::new();
        if candidates.is_empty() {
            set.insert(tokens.iter().map(Token::text).collect::<Vec<_>>().join(" "));
            return set;
        }

        // Odometer over candidate indices, last token turning fastest.
        let mut odometer = vec![0usize; candidates.len()];
        loop {
            let combination = odometer
                .iter()
                .zip(&candidates)
                .map(|(&choice, options)| options[choice])
                .collect::<Vec<_>>()
                .join(" ");
            set.insert(combination);

            if set.len() >= self.max_combinations {
                break;
            }

            let mut position = candidates.len();
            loop {
                if position == 0 {
                    return set;
                }
                position -= 1;
                odometer[position] += 1;
                if odometer[position] < candidates[position].len() {
                    break;
                }
                odometer[position] = 0;
            }
        }

        set
    }

    /// Expand multiple address strings in batch.
    pub fn expand_batch(&self, inputs: &[&str]) -> Result<Vec<ExpandedAddress>> {
        inputs.iter().map(|input| self.expand(input)).collect()
    }

    /// Expand multiple address strings in parallel, one result per input.
    #[cfg(feature = "parallel")]
    pub fn expand_batch_parallel(&self, inputs: &[&str]) -> Vec<Result<ExpandedAddress>> {
        use rayon::prelude::*;

        inputs.par_iter().map(|input| self.expand(input)).collect()
    }

    fn candidates<'t>(&'t self, token: &'t Token) -> Vec<&'t str> {
        let mut options = vec![token.text()];
        for expansion in self.tokenizer.dictionary().expansions(token.text()) {
            if !options.contains(&expansion.as_str()) {
                options.push(expansion.as_str());
            }
        }
        options
    }
}

/// Result of address expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedAddress {
    /// Original input string
    pub original: String,
    /// All generated expansions, input form first
    pub expansions: Vec<String>,
}

impl ExpandedAddress {
    /// Get the first expansion (the input's own normalized form).
    pub fn primary(&self) -> Option<&str> {
        self.expansions.first().map(|s| s.as_str())
    }

    /// Get all expansions except the first.
    pub fn alternatives(&self) -> &[String] {
        if self.expansions.len() > 1 {
            &self.expansions[1..]
        } else {
            &[]
        }
    }

    /// Whether `candidate` is among the expansions.
    pub fn contains(&self, candidate: &str) -> bool {
        self.expansions.iter().any(|e| e == candidate)
    }

    /// Check if expansion produced any results.
    pub fn is_empty(&self) -> bool {
        self.expansions.is_empty()
    }

    /// Get the number of expansions.
    pub fn len(&self) -> usize {
        self.expansions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    fn expander() -> AddressExpander {
        AddressExpander::new(dictionary::bundled().unwrap())
    }

    #[test]
    fn test_expanded_address() {
        let expanded = ExpandedAddress {
            original: "St".to_string(),
            expansions: vec!["st".to_string(), "street".to_string(), "saint".to_string()],
        };

        assert_eq!(expanded.primary(), Some("st"));
        assert_eq!(expanded.alternatives(), &["street".to_string(), "saint".to_string()]);
        assert!(expanded.contains("saint"));
        assert!(!expanded.is_empty());
        assert_eq!(expanded.len(), 3);
    }

    #[test]
    fn test_expand_order() {
        let expanded = expander().expand("123 Main St").unwrap();
        assert_eq!(
            expanded.expansions,
            ["123 main st", "123 main street", "123 main saint"]
        );
    }

    #[test]
    fn test_expand_abbreviations() {
        for (address, expected) in [
            ("456 Oak Ave", "456 oak avenue"),
            ("789 Pine Rd", "789 pine road"),
            ("100 N Main Blvd", "100 north main boulevard"),
        ] {
            let expanded = expander().expand(address).unwrap();
            assert!(expanded.contains(expected), "{expected} missing from {:?}", expanded.expansions);
        }
    }

    #[test]
    fn test_token_count_preserved() {
        let expanded = expander().expand("123 St. James St, N.E. Washington").unwrap();
        for expansion in &expanded.expansions {
            assert_eq!(expansion.split(' ').count(), 6, "{expansion}");
        }
        assert!(expanded.contains("123 saint james street northeast washington"));
    }

    #[test]
    fn test_numbers_preserved() {
        for address in ["123 5th Avenue", "456 21st Street", "789 42nd Road"] {
            let house_number = address.split(' ').next().unwrap();
            let expanded = expander().expand(address).unwrap();
            assert!(expanded.expansions.iter().all(|e| e.starts_with(house_number)));
        }
    }

    #[test]
    fn test_cap_truncates_to_prefix() {
        let address = "1 St Dr Ave Ct St Dr";
        let full = expander().expand(address).unwrap();
        let capped = expander().with_max_combinations(5).expand(address).unwrap();

        assert_eq!(capped.len(), 5);
        assert_eq!(capped.expansions[..], full.expansions[..5]);
    }

    #[test]
    fn test_cap_minimum_is_one() {
        let capped = expander().with_max_combinations(0);
        assert_eq!(capped.max_combinations(), 1);
        assert_eq!(capped.expand("1 Main St").unwrap().expansions, ["1 main st"]);
    }

    #[test]
    fn test_deterministic() {
        let first = expander().expand("123 Main St NYC NY").unwrap();
        for _ in 0..5 {
            assert_eq!(expander().expand("123 Main St NYC NY").unwrap(), first);
        }
    }

    #[test]
    fn test_punctuation_only() {
        let expanded = expander().expand("!!! ,").unwrap();
        assert_eq!(expanded.expansions, ["!!! ,"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(expander().expand("").unwrap_err().is_empty_input());
        assert!(expander().expand("\n\t ").unwrap_err().is_empty_input());
    }

    #[test]
    fn test_expand_batch() {
        let results = expander().expand_batch(&["1 Main St", "2 Oak Ave"]).unwrap();
        assert_eq!(results[1].primary(), Some("2 oak ave"));
        assert!(expander().expand_batch(&["1 Main St", " "]).is_err());
    }
}
