//! Basic usage example for oxidize-postal.
//!
//! Parses, expands and normalizes a handful of addresses, then shows the
//! JSON forms.
//!
//! Run with: cargo run --example basic_usage

use oxidize_postal::{Error, Label, Postal, PostalConfig};

fn main() -> Result<(), Error> {
    println!("oxidize-postal Basic Usage Example");
    println!("==================================\n");

    let postal = Postal::with_config(PostalConfig::builder().max_combinations(16).build())?;

    let addresses = [
        "781 Franklin Ave Crown Heights Brooklyn NYC NY 11216 USA",
        "123 Main St, New York, NY 10001",
        "1600 Pennsylvania Ave NW, Washington, DC 20500",
        "350 5th Ave, NYC, NY 10118",
    ];

    for (i, address) in addresses.iter().enumerate() {
        println!("--- Example {} ---", i + 1);
        println!("Original: {address}");

        let parsed = postal.parse_address(address)?;
        println!("Parsed components:");
        for (label, value) in parsed.iter() {
            println!("  {label}: {value}");
        }

        let expanded = postal.expand_address(address)?;
        let preview: Vec<_> = expanded.iter().take(3).collect();
        println!(
            "Expansions ({}): {:?}{}",
            expanded.len(),
            preview,
            if expanded.len() > 3 { "..." } else { "" }
        );

        println!("Normalized: {}", postal.normalize_address(address)?);
        println!();
    }

    println!("--- Batch Processing ---");
    let batch = ["123 Main St, Boston, MA", "456 Oak Ave, Portland, OR", "789 Pine Rd, Austin, TX"];
    for (address, parsed) in batch.iter().zip(postal.parser().parse_batch(&batch)?) {
        println!(
            "  {address} -> City: {}",
            parsed.get(Label::City).unwrap_or("Unknown")
        );
    }
    println!();

    println!("--- JSON Output Example ---");
    println!("Parsed as JSON: {}", postal.parse_address_to_json(addresses[0])?);
    println!("Expanded as JSON: {}", postal.expand_address_to_json("350 5th Ave")?);

    Ok(())
}
