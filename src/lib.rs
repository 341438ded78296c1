//! # oxidize-postal
//!
//! Native address normalization and expansion for Rust.
//!
//! A reduced, dependency-light reimplementation of the runtime side of an
//! address engine: a token classifier, a static abbreviation dictionary, a
//! bounded expansion generator and a rule based component labeler.
//!
//! ## Features
//!
//! - **Address Parsing**: Label house numbers, roads, units, cities, states,
//!   postcodes and countries
//! - **Address Expansion**: Every combination of abbreviation expansions, in a
//!   deterministic order
//! - **Address Normalization**: One canonical string per address
//! - **Thread Safe**: All operations share a read-only dictionary
//!
//! ## Quick Start
//!
//! ```rust
//! use oxidize_postal::{Label, Postal};
//!
//! let postal = Postal::new()?;
//!
//! let parsed = postal.parse_address("123 Main St, New York, NY 10001")?;
//! assert_eq!(parsed.get(Label::HouseNumber), Some("123"));
//! assert_eq!(parsed.get(Label::Postcode), Some("10001"));
//!
//! let expansions = postal.expand_address("123 Main St")?;
//! assert!(expansions.iter().any(|e| e == "123 main street"));
//! # Ok::<(), oxidize_postal::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod data;
pub mod dictionary;
pub mod error;
pub mod expander;
pub mod labeler;
pub mod normalizer;
pub mod parser;
pub mod tokenizer;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

// Re-export main API
pub use data::{DataConfig, DataManager, DownloadOutcome};
pub use dictionary::Dictionary;
pub use error::{Error, Result};
pub use expander::{AddressExpander, DEFAULT_MAX_COMBINATIONS, ExpandedAddress, ExpansionSet};
pub use normalizer::AddressNormalizer;
pub use parser::{AddressParser, ParsedAddress};
pub use types::*;

/// Main entry point for oxidize-postal functionality.
///
/// Holds the configuration and the shared dictionary. Cloning is cheap and
/// clones can be moved to other threads.
///
/// # Examples
///
/// ```rust
/// use oxidize_postal::Postal;
///
/// let postal = Postal::new()?;
///
/// let parsed = postal.parse_address("123 Main St, New York, NY")?;
/// let normalized = postal.normalize_address("123 Main St, New York, NY")?;
/// assert_eq!(normalized, "123 main st, new york, NY");
/// # Ok::<(), oxidize_postal::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Postal {
    config: PostalConfig,
    dictionary: Arc<Dictionary>,
}

impl Postal {
    /// Create a handle over the bundled dictionary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DictionaryLoad`] if the bundled dictionary is
    /// malformed.
    pub fn new() -> Result<Self> {
        Self::with_config(PostalConfig::default())
    }

    /// Create a handle with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration; a `dictionary_path` replaces the bundled
    ///   dictionary with one read from disk
    ///
    /// # Examples
    ///
    /// ```rust
    /// use oxidize_postal::{Postal, PostalConfig};
    ///
    /// let config = PostalConfig::builder()
    ///     .max_combinations(100)
    ///     .build();
    ///
    /// let postal = Postal::with_config(config)?;
    /// assert_eq!(postal.expander().max_combinations(), 100);
    /// # Ok::<(), oxidize_postal::Error>(())
    /// ```
    pub fn with_config(config: PostalConfig) -> Result<Self> {
        let dictionary = match &config.dictionary_path {
            Some(path) => Arc::new(Dictionary::load_file(path)?),
            None => dictionary::bundled()?,
        };

        Ok(Self { config, dictionary })
    }

    /// Create a new address parser.
    pub fn parser(&self) -> AddressParser {
        AddressParser::new(Arc::clone(&self.dictionary))
    }

    /// Create a new address expander using the configured combination cap.
    pub fn expander(&self) -> AddressExpander {
        AddressExpander::new(Arc::clone(&self.dictionary))
            .with_max_combinations(self.config.max_combinations)
    }

    /// Create a new address normalizer.
    pub fn normalizer(&self) -> AddressNormalizer {
        AddressNormalizer::new(Arc::clone(&self.dictionary))
    }

    /// Parse an address string into structured components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] for empty or whitespace-only input.
    pub fn parse_address(&self, address: &str) -> Result<ParsedAddress> {
        self.parser().parse(address)
    }

    /// Parse an address and serialize the components as a JSON object.
    pub fn parse_address_to_json(&self, address: &str) -> Result<String> {
        self.parse_address(address)?.to_json()
    }

    /// Expand abbreviations in an address string.
    ///
    /// The first element is the input's own lowercased form.
    pub fn expand_address(&self, address: &str) -> Result<Vec<String>> {
        Ok(self.expander().expand(address)?.expansions)
    }

    /// Expand an address and serialize the expansions as a JSON array.
    pub fn expand_address_to_json(&self, address: &str) -> Result<String> {
        Ok(serde_json::to_string(&self.expand_address(address)?)?)
    }

    /// Normalize an address into its canonical single string form.
    pub fn normalize_address(&self, address: &str) -> Result<String> {
        self.normalizer().normalize(address)
    }

    /// Data manager for the configured data directory.
    pub fn data_manager(&self) -> DataManager {
        DataManager::with_config(self.config.data_config.clone())
    }

    /// The dictionary shared by every parser, expander and normalizer.
    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    /// Get the configuration used by this instance.
    pub fn config(&self) -> &PostalConfig {
        &self.config
    }
}

/// Configuration for [`Postal`].
#[derive(Debug, Clone)]
pub struct PostalConfig {
    /// Upper bound on expansions produced per address
    pub max_combinations: usize,

    /// Dictionary file to load instead of the bundled one
    pub dictionary_path: Option<PathBuf>,

    /// Data management configuration
    pub data_config: DataConfig,
}

impl Default for PostalConfig {
    fn default() -> Self {
        Self {
            max_combinations: DEFAULT_MAX_COMBINATIONS,
            dictionary_path: None,
            data_config: DataConfig::default(),
        }
    }
}

impl PostalConfig {
    /// Create a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use oxidize_postal::PostalConfig;
    ///
    /// let config = PostalConfig::builder()
    ///     .data_dir("/tmp/postal")
    ///     .dictionary_from_data_dir()
    ///     .build();
    ///
    /// assert_eq!(
    ///     config.dictionary_path.as_deref(),
    ///     Some(std::path::Path::new("/tmp/postal/address_expansions/expansions.dict"))
    /// );
    /// ```
    pub fn builder() -> PostalConfigBuilder {
        PostalConfigBuilder::new()
    }
}

/// Builder for PostalConfig.
#[derive(Debug, Clone)]
pub struct PostalConfigBuilder {
    max_combinations: usize,
    dictionary_path: Option<PathBuf>,
    dictionary_from_data_dir: bool,
    data_config: DataConfig,
}

impl PostalConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            max_combinations: DEFAULT_MAX_COMBINATIONS,
            dictionary_path: None,
            dictionary_from_data_dir: false,
            data_config: DataConfig::default(),
        }
    }

    /// Set the expansion cap (values below 1 are raised to 1).
    pub fn max_combinations(mut self, max: usize) -> Self {
        self.max_combinations = max.max(1);
        self
    }

    /// Load the dictionary from `path` instead of the bundled copy.
    pub fn dictionary_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.dictionary_path = Some(path.into());
        self.dictionary_from_data_dir = false;
        self
    }

    /// Load the dictionary from the data directory.
    pub fn dictionary_from_data_dir(mut self) -> Self {
        self.dictionary_path = None;
        self.dictionary_from_data_dir = true;
        self
    }

    /// Set the data configuration.
    pub fn data_config(mut self, config: DataConfig) -> Self {
        self.data_config = config;
        self
    }

    /// Set a custom data directory.
    pub fn data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_config.data_dir = dir.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> PostalConfig {
        let dictionary_path = if self.dictionary_from_data_dir {
            Some(self.data_config.data_dir.join(data::DICTIONARY_FILE))
        } else {
            self.dictionary_path
        };

        PostalConfig {
            max_combinations: self.max_combinations,
            dictionary_path,
            data_config: self.data_config,
        }
    }
}

impl Default for PostalConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an address with the bundled dictionary.
///
/// ```rust
/// let parsed = oxidize_postal::parse_address("123 Main St, New York, NY 10001")?;
/// assert_eq!(parsed.get(oxidize_postal::Label::State), Some("ny"));
/// # Ok::<(), oxidize_postal::Error>(())
/// ```
pub fn parse_address(address: &str) -> Result<ParsedAddress> {
    Postal::new()?.parse_address(address)
}

/// Parse an address with the bundled dictionary and return JSON.
pub fn parse_address_to_json(address: &str) -> Result<String> {
    Postal::new()?.parse_address_to_json(address)
}

/// Expand an address with the bundled dictionary.
pub fn expand_address(address: &str) -> Result<Vec<String>> {
    Postal::new()?.expand_address(address)
}

/// Expand an address with the bundled dictionary and return a JSON array.
pub fn expand_address_to_json(address: &str) -> Result<String> {
    Postal::new()?.expand_address_to_json(address)
}

/// Normalize an address with the bundled dictionary.
pub fn normalize_address(address: &str) -> Result<String> {
    Postal::new()?.normalize_address(address)
}

/// Ensure the data directory is populated, blocking until done.
///
/// Returns `true` once the required files are present, whether they were
/// fetched now or already there. Use [`DataManager::download`] to tell the
/// two apart.
///
/// # Errors
///
/// Besides the [`DataManager::download`] errors, returns
/// [`Error::DownloadFailure`] when called from inside an async runtime.
pub fn download_data(force: bool) -> Result<bool> {
    download_blocking(&DataManager::new(), force)
}

fn download_blocking(manager: &DataManager, force: bool) -> Result<bool> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(Error::download_failure(
            "download_data cannot block inside an async runtime; await DataManager::download instead",
        ));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(manager.download(force))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const ADDRESSES: &[&str] = &[
        "123 Main St, New York, NY 10001",
        "781 Franklin Ave, Apt 2, Brooklyn, NY 11216, USA",
        "1600 Pennsylvania Ave NW, Washington, DC 20500",
        "350 5th Ave, New York, NY 10118",
        "10 Downing St, London, SW1A 2AA, UK",
        "PO Box 42, Springfield, IL 62701",
        "221B Baker St, London",
    ];

    #[test]
    fn test_postal_config_builder() {
        let config = PostalConfig::builder()
            .max_combinations(0)
            .dictionary_path("/tmp/custom.dict")
            .build();

        assert_eq!(config.max_combinations, 1);
        assert_eq!(config.dictionary_path, Some(PathBuf::from("/tmp/custom.dict")));

        let default = PostalConfig::default();
        assert_eq!(default.max_combinations, DEFAULT_MAX_COMBINATIONS);
        assert!(default.dictionary_path.is_none());
    }

    #[test]
    fn test_postal_custom_dictionary() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.dict");
        std::fs::write(&path, "[street_type]\nst = street\n[state]\nzz\n").unwrap();

        let postal = Postal::with_config(PostalConfig::builder().dictionary_path(&path).build())
            .unwrap();
        assert_eq!(
            postal.expand_address("1 Main St").unwrap(),
            ["1 main st", "1 main street"]
        );
        assert!(postal.dictionary().is_state("zz"));
    }

    #[test]
    fn test_postal_missing_dictionary_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = PostalConfig::builder()
            .data_dir(dir.path())
            .dictionary_from_data_dir()
            .build();

        assert!(matches!(
            Postal::with_config(config),
            Err(Error::DictionaryLoad { .. })
        ));
    }

    #[test]
    fn test_download_blocking_reports_present_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(data::DICTIONARY_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[street_type]\nst = street\n").unwrap();

        let manager = DataManager::with_data_dir(dir.path());
        assert!(download_blocking(&manager, false).unwrap());
    }

    #[tokio::test]
    async fn test_download_blocking_inside_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DataManager::with_data_dir(dir.path());
        assert!(matches!(
            download_blocking(&manager, false),
            Err(Error::DownloadFailure { .. })
        ));
    }

    #[test]
    fn test_free_functions() {
        init_logging();
        let parsed = parse_address("123 Main St, New York, NY 10001").unwrap();
        assert_eq!(parsed.get(Label::HouseNumber), Some("123"));
        assert_eq!(parsed.get(Label::State), Some("ny"));
        assert_eq!(parsed.get(Label::Postcode), Some("10001"));

        let expansions = expand_address("123 Main St").unwrap();
        assert!(expansions.iter().any(|e| e == "123 main street"));

        let normalized = normalize_address("123 Main St, New York, NY 10001")
            .unwrap()
            .to_lowercase();
        for part in ["123", "main", "new york", "ny", "10001"] {
            assert!(normalized.contains(part), "{part} missing from {normalized}");
        }
    }

    #[test]
    fn test_json_round_trips() {
        for address in ADDRESSES {
            let json = parse_address_to_json(address).unwrap();
            let back: ParsedAddress = serde_json::from_str(&json).unwrap();
            assert_eq!(back, parse_address(address).unwrap());

            let json = expand_address_to_json(address).unwrap();
            let back: Vec<String> = serde_json::from_str(&json).unwrap();
            assert_eq!(back, expand_address(address).unwrap());
        }
    }

    #[test]
    fn test_empty_input_everywhere() {
        for input in ["", " ", "\t\n  "] {
            for err in [
                parse_address(input).unwrap_err(),
                parse_address_to_json(input).unwrap_err(),
                expand_address(input).unwrap_err(),
                expand_address_to_json(input).unwrap_err(),
                normalize_address(input).unwrap_err(),
            ] {
                assert!(err.is_empty_input());
                assert!(err.to_string().to_lowercase().contains("empty"));
            }
        }
    }

    #[test]
    fn test_expansion_token_counts() {
        let postal = Postal::new().unwrap();
        let tokenizer = tokenizer::Tokenizer::new(Arc::clone(postal.dictionary()));

        for address in ADDRESSES {
            let words = tokenizer
                .tokenize(&tokenizer::prepare(address))
                .unwrap()
                .iter()
                .filter(|token| token.is_word())
                .count();

            let expansions = postal.expand_address(address).unwrap();
            assert!(!expansions.is_empty());
            for expansion in &expansions {
                assert_eq!(expansion.split(' ').count(), words, "{expansion}");
            }
        }
    }

    #[test]
    fn test_parse_labels_unique() {
        for address in ADDRESSES {
            let parsed = parse_address(address).unwrap();
            let labels: HashSet<Label> = parsed.iter().map(|(label, _)| label).collect();
            assert_eq!(labels.len(), parsed.len());
        }
    }

    #[test]
    fn test_deterministic() {
        for address in ADDRESSES {
            assert_eq!(expand_address(address).unwrap(), expand_address(address).unwrap());
            assert_eq!(parse_address(address).unwrap(), parse_address(address).unwrap());
        }
    }

    #[test]
    fn test_concurrent_matches_sequential() {
        let postal = Postal::new().unwrap();
        let expected: Vec<_> = ADDRESSES
            .iter()
            .map(|a| {
                (
                    postal.parse_address(a).unwrap(),
                    postal.expand_address(a).unwrap(),
                )
            })
            .collect();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let postal = postal.clone();
                std::thread::spawn(move || {
                    ADDRESSES
                        .iter()
                        .map(|a| {
                            (
                                postal.parse_address(a).unwrap(),
                                postal.expand_address(a).unwrap(),
                            )
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
