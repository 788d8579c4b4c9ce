//! Prints the style preview of a template as JSON.
//!
//! Run with: cargo run --example inspect_styles <template.pptx>

use std::env;
use std::fs;
use vision_deck::{extract_styles_from_bytes, GeneratorConfig, Result};

fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: cargo run --example inspect_styles <template.pptx>");
        return Ok(());
    };

    let styles = extract_styles_from_bytes(&fs::read(&path)?, &GeneratorConfig::default())?;

    println!("Slide size: {} x {} EMU", styles.slide_size.0, styles.slide_size.1);
    for (slot, hex) in &styles.theme_colors {
        println!("{slot:>10}: {hex}");
    }
    println!("{}", serde_json::to_string_pretty(&styles)?);

    Ok(())
}
