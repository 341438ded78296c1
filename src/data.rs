//! Data file management for oxidize-postal.
//!
//! The engine only needs the expansion dictionary on disk when it is told to
//! read one from the data directory; everything else ships compiled in. The
//! data directory is fetched either by an external fetch tool
//! (`<tool> download all <dir>`) or, with the `runtime-data` feature, from a
//! `.tar.gz` archive URL.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "OXIDIZE_POSTAL_DATA_DIR";

/// Location of the expansion dictionary inside the data directory.
pub const DICTIONARY_FILE: &str = "address_expansions/expansions.dict";

/// Files that must exist for the data directory to count as available.
pub const REQUIRED_FILES: &[&str] = &[DICTIONARY_FILE];

/// System-wide data directories checked before the per-user one.
pub const SYSTEM_DATA_DIRS: &[&str] = &["/usr/local/share/libpostal", "/usr/share/libpostal"];

/// Directories searched for the fetch tool in addition to `PATH`.
const TOOL_DIRS: &[&str] = &["/usr/local/bin", "/usr/bin"];

/// What [`DataManager::download`] did to make the data available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A fetch ran and produced the required files
    Downloaded,
    /// The required files were already present and `force` was not set
    AlreadyPresent,
}

impl DownloadOutcome {
    /// Whether a fetch actually ran.
    pub fn is_downloaded(&self) -> bool {
        matches!(self, Self::Downloaded)
    }
}

/// Data file manager.
#[derive(Debug, Clone)]
pub struct DataManager {
    data_dir: PathBuf,
    config: DataConfig,
}

impl DataManager {
    /// Create a new data manager with the default data directory.
    pub fn new() -> Self {
        Self::with_config(DataConfig::default())
    }

    /// Create a new data manager with a custom data directory.
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self::with_config(DataConfig {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..DataConfig::default()
        })
    }

    /// Create a new data manager with custom configuration.
    pub fn with_config(config: DataConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            config,
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the configuration.
    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    /// Path of the expansion dictionary inside the data directory.
    pub fn dictionary_path(&self) -> PathBuf {
        self.data_dir.join(DICTIONARY_FILE)
    }

    /// Required files not present in the data directory.
    pub fn missing_files(&self) -> Vec<&'static str> {
        REQUIRED_FILES
            .iter()
            .copied()
            .filter(|file| !self.data_dir.join(file).is_file())
            .collect()
    }

    /// Check if required data files are present.
    pub fn is_data_available(&self) -> bool {
        self.data_dir.is_dir() && self.missing_files().is_empty()
    }

    /// Verify the data files.
    ///
    /// Every required file must exist and be non-empty. With
    /// `verify_integrity` set the dictionary must also parse.
    pub fn verify_data(&self) -> Result<()> {
        for file in REQUIRED_FILES {
            let path = self.data_dir.join(file);
            let metadata = std::fs::metadata(&path).map_err(|e| {
                Error::data_unavailable(format!("Missing data file {}: {e}", path.display()))
            })?;

            if metadata.len() == 0 {
                return Err(Error::data_unavailable(format!(
                    "Empty data file: {}",
                    path.display()
                )));
            }
        }

        if self.config.verify_integrity {
            Dictionary::load_file(self.dictionary_path())?;
        }

        Ok(())
    }

    /// Remove the data directory. Returns whether anything was removed.
    pub fn cleanup(&self) -> Result<bool> {
        if !self.data_dir.exists() {
            log::info!("No data found at {}", self.data_dir.display());
            return Ok(false);
        }

        log::info!("Removing data from {}", self.data_dir.display());
        std::fs::remove_dir_all(&self.data_dir)?;
        Ok(true)
    }

    /// Ensure data files exist, fetching them if missing or if `force` is set.
    ///
    /// On success the required files are present; the outcome tells whether
    /// a fetch was needed.
    ///
    /// # Errors
    ///
    /// * [`Error::DataUnavailable`] if no fetch tool or archive URL is
    ///   available, or the fetch finished without producing the required files.
    /// * [`Error::DownloadFailure`] if the fetch itself failed.
    pub async fn download(&self, force: bool) -> Result<DownloadOutcome> {
        if !force && self.is_data_available() {
            log::info!("Data already present at {}", self.data_dir.display());
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        log::info!("Fetching data into {}", self.data_dir.display());

        match self.find_fetch_tool() {
            Some(tool) => self.run_fetch_tool(&tool)?,
            None => self.fetch_archive().await?,
        }

        let missing = self.missing_files();
        if !missing.is_empty() {
            return Err(Error::data_unavailable(format!(
                "Download finished but files are still missing: {}",
                missing.join(", ")
            )));
        }

        if self.config.verify_integrity {
            self.verify_data()?;
        }

        log::info!("Data download completed");
        Ok(DownloadOutcome::Downloaded)
    }

    /// Locate the fetch tool: an explicit path, or a name searched on `PATH`
    /// and the usual binary directories.
    pub fn find_fetch_tool(&self) -> Option<PathBuf> {
        let tool = Path::new(&self.config.fetch_tool);
        if tool.components().count() > 1 {
            return tool.is_file().then(|| tool.to_path_buf());
        }

        let path_dirs = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
            .unwrap_or_default();

        path_dirs
            .into_iter()
            .chain(TOOL_DIRS.iter().map(PathBuf::from))
            .map(|dir| dir.join(tool))
            .find(|candidate| candidate.is_file())
    }

    /// Run the fetch tool, retrying once with `sudo` on a permission failure.
    fn run_fetch_tool(&self, tool: &Path) -> Result<()> {
        log::info!("Running {} download all {}", tool.display(), self.data_dir.display());

        let output = Command::new(tool)
            .arg("download")
            .arg("all")
            .arg(&self.data_dir)
            .output()
            .map_err(|e| {
                Error::download_failure(format!("Failed to run {}: {e}", tool.display()))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !self.config.elevate_on_permission_denied || !needs_elevation(&stderr) {
            return Err(Error::download_failure(format!(
                "{} exited with {}: {}",
                tool.display(),
                output.status,
                stderr.trim()
            )));
        }

        log::warn!(
            "Permission denied writing {}, retrying once with sudo",
            self.data_dir.display()
        );

        // Inherit stdio so sudo can prompt for a password.
        let status = Command::new("sudo")
            .arg(tool)
            .arg("download")
            .arg("all")
            .arg(&self.data_dir)
            .status()
            .map_err(|e| Error::download_failure(format!("Failed to run sudo: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::download_failure(format!(
                "Privileged retry of {} exited with {status}",
                tool.display()
            )))
        }
    }

    #[cfg(not(feature = "runtime-data"))]
    async fn fetch_archive(&self) -> Result<()> {
        Err(Error::data_unavailable(format!(
            "Fetch tool `{}` not found and the runtime-data feature is disabled",
            self.config.fetch_tool
        )))
    }

    #[cfg(feature = "runtime-data")]
    async fn fetch_archive(&self) -> Result<()> {
        let Some(url) = self.config.archive_url.as_deref() else {
            return Err(Error::data_unavailable(format!(
                "Fetch tool `{}` not found and no archive URL is configured",
                self.config.fetch_tool
            )));
        };

        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            Error::download_failure(format!(
                "Failed to create data directory {}: {e}",
                self.data_dir.display()
            ))
        })?;

        self.download_and_extract(url).await
    }

    /// Download a `.tar.gz` archive and unpack it into the data directory.
    #[cfg(feature = "runtime-data")]
    async fn download_and_extract(&self, url: &str) -> Result<()> {
        use futures::StreamExt;
        use std::io::Write;

        log::info!("Downloading data archive from {url}");

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .build()
            .map_err(|e| Error::network_error(format!("Failed to build HTTP client: {e}")))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network_error(format!("Failed to download data: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::download_failure(format!(
                "Download failed with status: {}",
                response.status()
            )));
        }

        let archive_path = self.data_dir.join("data.tar.gz");
        let mut file = std::fs::File::create(&archive_path)?;
        let mut stream = response.bytes_stream();
        let mut received = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| Error::network_error(format!("Failed to read response: {e}")))?;
            received += chunk.len();
            file.write_all(&chunk)?;
        }
        file.flush()?;
        drop(file);

        log::debug!("Downloaded {received} bytes, extracting");

        let extracted = self.extract_tar_gz(&archive_path);
        if let Err(e) = std::fs::remove_file(&archive_path) {
            log::warn!("Failed to remove {}: {e}", archive_path.display());
        }
        extracted
    }

    #[cfg(feature = "runtime-data")]
    fn extract_tar_gz(&self, archive_path: &Path) -> Result<()> {
        use flate2::read::GzDecoder;
        use tar::Archive;

        let file = std::fs::File::open(archive_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));

        archive.unpack(&self.data_dir).map_err(|e| {
            Error::download_failure(format!("Failed to extract archive: {e}"))
        })
    }
}

impl Default for DataManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether fetch tool output reports a permission failure worth one
/// privileged retry.
pub fn needs_elevation(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    stderr.contains("permission denied") || stderr.contains("operation not permitted")
}

/// Get the default data directory.
///
/// `OXIDIZE_POSTAL_DATA_DIR` wins, then a system directory that already holds
/// the dictionary, then the per-user data directory.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    for dir in SYSTEM_DATA_DIRS {
        let path = PathBuf::from(dir);
        if path.join(DICTIONARY_FILE).is_file() {
            return path;
        }
    }

    match dirs::data_dir() {
        Some(dir) => dir.join("oxidize-postal"),
        None => PathBuf::from(".oxidize-postal"),
    }
}

/// Configuration for data management.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Data directory path
    pub data_dir: PathBuf,
    /// Name or path of the external fetch tool
    pub fetch_tool: String,
    /// Retry the fetch tool once under `sudo` when it reports a permission error
    pub elevate_on_permission_denied: bool,
    /// `.tar.gz` archive used when the fetch tool is not installed
    pub archive_url: Option<String>,
    /// Whether to verify data integrity after download
    pub verify_integrity: bool,
    /// Timeout for archive downloads
    pub timeout_seconds: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            fetch_tool: "libpostal_data".to_string(),
            elevate_on_permission_denied: true,
            archive_url: None,
            verify_integrity: true,
            timeout_seconds: 300, // 5 minutes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn manager(dir: &Path) -> DataManager {
        DataManager::with_config(DataConfig {
            data_dir: dir.to_path_buf(),
            fetch_tool: dir.join("no-such-tool").to_string_lossy().into_owned(),
            elevate_on_permission_denied: false,
            ..DataConfig::default()
        })
    }

    fn install_dictionary(dir: &Path, contents: &str) {
        let path = dir.join(DICTIONARY_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_data_manager_default() {
        let manager = DataManager::new();
        assert!(!manager.data_dir().as_os_str().is_empty());
        assert!(manager.dictionary_path().ends_with(DICTIONARY_FILE));
    }

    #[test]
    fn test_data_config_default() {
        let config = DataConfig::default();
        assert_eq!(config.fetch_tool, "libpostal_data");
        assert!(config.verify_integrity);
        assert!(config.elevate_on_permission_denied);
        assert!(config.timeout_seconds > 0);
        assert_eq!(config.archive_url, None);
    }

    #[test]
    fn test_availability() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        assert!(!manager.is_data_available());
        assert_eq!(manager.missing_files(), [DICTIONARY_FILE]);

        install_dictionary(dir.path(), "[street_type]\nst = street\n");
        assert!(manager.is_data_available());
        assert!(manager.missing_files().is_empty());
        manager.verify_data().unwrap();
    }

    #[test]
    fn test_verify_rejects_empty_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        assert_matches!(manager.verify_data(), Err(Error::DataUnavailable { .. }));

        install_dictionary(dir.path(), "");
        assert_matches!(manager.verify_data(), Err(Error::DataUnavailable { .. }));

        install_dictionary(dir.path(), "st = street\n");
        assert_matches!(manager.verify_data(), Err(Error::DictionaryLoad { .. }));
    }

    #[test]
    fn test_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let manager = manager(&data_dir);
        assert!(!manager.cleanup().unwrap());

        install_dictionary(&data_dir, "[street_type]\nst = street\n");
        assert!(manager.cleanup().unwrap());
        assert!(!data_dir.exists());
    }

    #[test]
    fn test_needs_elevation() {
        assert!(needs_elevation("mkdir: cannot create directory: Permission denied"));
        assert!(needs_elevation("rm: OPERATION NOT PERMITTED"));
        assert!(!needs_elevation("curl: (6) Could not resolve host"));
        assert!(!needs_elevation(""));
    }

    #[tokio::test]
    async fn test_download_skipped_when_present() {
        let dir = tempfile::tempdir().unwrap();
        install_dictionary(dir.path(), "[street_type]\nst = street\n");
        let outcome = manager(dir.path()).download(false).await.unwrap();
        assert_eq!(outcome, DownloadOutcome::AlreadyPresent);
        assert!(!outcome.is_downloaded());
    }

    #[test]
    fn test_download_without_tool_or_archive() {
        let dir = tempfile::tempdir().unwrap();
        let result = tokio_test::block_on(manager(dir.path()).download(false));
        assert_matches!(result, Err(Error::DataUnavailable { .. }));
    }

    #[cfg(unix)]
    fn write_tool(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fetch-tool");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_with_fetch_tool() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let tool = write_tool(
            dir.path(),
            "#!/bin/sh\n\
             mkdir -p \"$3/address_expansions\"\n\
             printf '[street_type]\\nst = street\\n' > \"$3/address_expansions/expansions.dict\"\n",
        );

        let manager = DataManager::with_config(DataConfig {
            data_dir: data_dir.clone(),
            fetch_tool: tool.to_string_lossy().into_owned(),
            elevate_on_permission_denied: false,
            ..DataConfig::default()
        });

        assert_eq!(manager.find_fetch_tool(), Some(tool));
        assert_eq!(manager.download(false).await.unwrap(), DownloadOutcome::Downloaded);
        assert!(manager.is_data_available());
        assert_eq!(
            manager.download(false).await.unwrap(),
            DownloadOutcome::AlreadyPresent
        );
        assert_eq!(manager.download(true).await.unwrap(), DownloadOutcome::Downloaded);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = write_tool(dir.path(), "#!/bin/sh\necho 'network unreachable' >&2\nexit 3\n");

        let manager = DataManager::with_config(DataConfig {
            data_dir: dir.path().join("data"),
            fetch_tool: tool.to_string_lossy().into_owned(),
            elevate_on_permission_denied: true,
            ..DataConfig::default()
        });

        let err = manager.download(false).await.unwrap_err();
        assert_matches!(err, Error::DownloadFailure { ref message } if message.contains("network unreachable"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_tool_succeeds_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let tool = write_tool(dir.path(), "#!/bin/sh\nexit 0\n");

        let manager = DataManager::with_config(DataConfig {
            data_dir: dir.path().join("data"),
            fetch_tool: tool.to_string_lossy().into_owned(),
            ..DataConfig::default()
        });

        let err = manager.download(false).await.unwrap_err();
        assert_matches!(err, Error::DataUnavailable { .. });
    }
}
