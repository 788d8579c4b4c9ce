//! Generates a deck from a local template and a JSON data file.
//!
//! Run with: cargo run --example generate <template.pptx> <data.json> [output_dir]

use std::env;
use std::fs;
use vision_deck::{
    DeckStore, DirectoryStore, GenerationData, GenerationOptions, Generator, GeneratorConfig, Package, Result,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: cargo run --example generate <template.pptx> <data.json> [output_dir]");
        return Ok(());
    }
    let output_dir = args.get(3).map(String::as_str).unwrap_or("output");

    let package = Package::from_bytes(&fs::read(&args[1])?)?;
    let data: GenerationData = serde_json::from_str(&fs::read_to_string(&args[2])?)?;

    // One set of template slides per workstation
    let options = GenerationOptions { duplicate_per_workstation: true, ..Default::default() };

    let generator = Generator::new(GeneratorConfig::default());
    let deck = generator.generate_package(package, &data, &options, None)?;

    let location = DirectoryStore::new(output_dir).put(&deck.file_name, &deck.bytes)?;
    println!("Wrote {location}");
    println!("{}", serde_json::to_string_pretty(&deck.report)?);

    Ok(())
}
