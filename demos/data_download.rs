//! Example demonstrating data directory management.
//!
//! Checks the data directory, fetches it when missing and then loads the
//! expansion dictionary from it.
//!
//! Run with: cargo run --example data_download

use oxidize_postal::{DataManager, DownloadOutcome, Postal, PostalConfig, Result};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    println!("=== oxidize-postal Data Download Example ===\n");

    let data_manager = DataManager::new();

    println!("Data directory: {}", data_manager.data_dir().display());
    println!("Data available: {}\n", data_manager.is_data_available());

    match data_manager.download(false).await {
        Ok(DownloadOutcome::Downloaded) => println!("1. Data download completed successfully"),
        Ok(DownloadOutcome::AlreadyPresent) => println!("1. Data files are already available"),
        Err(e) => {
            println!("1. Data download failed: {e}");
            println!("   Install the libpostal_data tool or set an archive URL and try again.");
            return Err(e);
        }
    }

    match data_manager.verify_data() {
        Ok(()) => println!("   Data verification passed"),
        Err(e) => println!("   Data verification failed: {e}"),
    }

    println!("\n2. Loading the dictionary from the data directory...");
    let config = PostalConfig::builder()
        .data_dir(data_manager.data_dir())
        .dictionary_from_data_dir()
        .build();
    let postal = Postal::with_config(config)?;
    println!("   {} surface forms loaded", postal.dictionary().len());

    let normalized = postal.normalize_address("123 Main Street, New York, NY 10001")?;
    println!("   Normalization test: {normalized}");

    println!("\n=== Data download example completed ===");
    Ok(())
}
