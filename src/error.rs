//! Error types and handling for oxidize-postal.

/// Result type alias for oxidize-postal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for oxidize-postal operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Blank input passed to a text operation
    #[error("Address cannot be empty: {operation} requires a non-empty, non-whitespace string")]
    EmptyInput {
        /// Operation that rejected the input
        operation: &'static str,
    },

    /// Input had no recognisable address components to normalize
    #[error("Failed to parse any recognizable address components from {input:?}")]
    NoComponents {
        /// Input as given
        input: String,
    },

    /// The expansion dictionary resource is malformed or missing
    #[error("Failed to load expansion dictionary (line {line}): {message}")]
    DictionaryLoad {
        /// 1-based line of the offending entry, 0 when not line specific
        line: usize,
        /// Error message
        message: String,
    },

    /// Required data files or the fetch tool are not available
    #[error("Data unavailable: {message}")]
    DataUnavailable {
        /// Error message
        message: String,
    },

    /// A data download attempt failed
    #[error("Data download failed: {message}")]
    DownloadFailure {
        /// Error message
        message: String,
    },

    /// JSON serialization errors
    #[error("JSON serialization error: {source}")]
    Serialization {
        /// Source error
        #[from]
        source: serde_json::Error,
    },

    /// I/O errors
    #[error("I/O error: {source}")]
    Io {
        /// Source error
        #[from]
        source: std::io::Error,
    },

    /// Network errors (for data downloads)
    #[cfg(feature = "runtime-data")]
    #[error("Network error: {message}")]
    NetworkError {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a new empty input error
    pub fn empty_input(operation: &'static str) -> Self {
        Self::EmptyInput { operation }
    }

    /// Create a new no-components error
    pub fn no_components(input: impl Into<String>) -> Self {
        Self::NoComponents {
            input: input.into(),
        }
    }

    /// Create a new dictionary load error
    pub fn dictionary_load(line: usize, message: impl Into<String>) -> Self {
        Self::DictionaryLoad {
            line,
            message: message.into(),
        }
    }

    /// Create a new data unavailable error
    pub fn data_unavailable(message: impl Into<String>) -> Self {
        Self::DataUnavailable {
            message: message.into(),
        }
    }

    /// Create a new download failure
    pub fn download_failure(message: impl Into<String>) -> Self {
        Self::DownloadFailure {
            message: message.into(),
        }
    }

    /// Create a new network error
    #[cfg(feature = "runtime-data")]
    pub fn network_error(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Whether this error signals caller-correctable blank input.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, Self::EmptyInput { .. })
    }
}

/// Reject empty or whitespace-only input for `operation`.
pub(crate) fn ensure_not_blank(text: &str, operation: &'static str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::empty_input(operation));
    }
    Ok(())
}
