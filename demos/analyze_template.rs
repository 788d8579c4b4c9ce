//! Lists the slides of a template with their detected roles.
//!
//! Run with: cargo run --example analyze_template <template.pptx>

use std::env;
use std::fs;
use vision_deck::{analyze, GenerationOptions, GeneratorConfig, KeywordClassifier, Package, Result};

fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: cargo run --example analyze_template <template.pptx>");
        return Ok(());
    };

    let package = Package::from_bytes(&fs::read(&path)?)?;
    println!("{} parts", package.part_count());

    let slides = analyze(
        &package,
        &KeywordClassifier::default(),
        &GeneratorConfig::default(),
        &GenerationOptions::default(),
    )?;

    for slide in &slides {
        println!(
            "#{:<3} {:<28} {:<24} layout={:<16} placeholders={:?}{}",
            slide.index,
            slide.path,
            format!("{:?}", slide.role),
            slide.layout_id.as_deref().unwrap_or("-"),
            slide.placeholders,
            if slide.has_loop { " [loop]" } else { "" }
        );
        for run in slide.text_runs.iter().take(5) {
            println!("       {:?} {:>5.1}pt {}", run.tag, run.font_size, run.text);
        }
    }

    Ok(())
}
