use crate::classifier::SlideClassifier;
use crate::config::{GenerationOptions, GeneratorConfig};
use crate::package::Package;
use crate::parse_xml::{extract_text_runs, find_loop_collections, find_placeholders, layout_reference, layout_type};
use crate::relationships::{parse_relationships, rels_path_for};
use crate::slide::{LayoutCategory, SlideInfo, SlideRole};
use crate::xml_text::TextDocument;
use crate::Result;
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;

struct RawSlide {
    index: usize,
    path: String,
    xml: String,
    layout_id: Option<String>,
    layout_category: LayoutCategory,
}

/// Builds the slide inventory of a package.
///
/// Part contents are read sequentially; the text heuristics then run in
/// parallel since they only read. The package is never modified.
///
/// Slides are returned in numeric part order. With `cover_aware` the first
/// slide is always a cover; explicit role overrides are applied last.
pub fn analyze(
    package: &Package,
    classifier: &dyn SlideClassifier,
    config: &GeneratorConfig,
    options: &GenerationOptions,
) -> Result<Vec<SlideInfo>> {
    let mut layout_categories: HashMap<String, LayoutCategory> = HashMap::new();
    let mut raw_slides = Vec::new();

    for (index, path) in package.slide_paths().into_iter().enumerate() {
        let xml = package.read_text(&path)?;
        let rels_path = rels_path_for(&path);
        let rels = match package.read(&rels_path) {
            Ok(data) => parse_relationships(data)?,
            Err(_) => Vec::new(),
        };

        let (layout_id, layout_category) = match layout_reference(&path, &rels) {
            Some((name, layout_path)) => {
                let category = match layout_categories.get(&layout_path) {
                    Some(category) => category.clone(),
                    None => {
                        let category = match package.read_text(&layout_path) {
                            Ok(layout_xml) => LayoutCategory::from_layout_type(layout_type(&layout_xml)?.as_deref()),
                            Err(_) => LayoutCategory::Unknown,
                        };
                        layout_categories.insert(layout_path, category.clone());
                        category
                    }
                };
                (Some(name), category)
            }
            None => (None, LayoutCategory::Unknown),
        };

        raw_slides.push(RawSlide { index, path, xml, layout_id, layout_category });
    }

    let smart_enabled = options.smart_replace != Some(false);
    let window = config.format_scan_window;

    let mut slides: Vec<SlideInfo> = raw_slides
        .into_par_iter()
        .map(|raw| {
            let text = TextDocument::parse(&raw.xml).logical_text();
            let placeholders = find_placeholders(&text);
            let has_loop = !find_loop_collections(&text).is_empty();
            let role = classifier.classify(&text);

            let text_runs = if smart_enabled && placeholders.is_empty() && !has_loop {
                extract_text_runs(&raw.xml, window, classifier)
            } else {
                Vec::new()
            };

            SlideInfo {
                index: raw.index,
                path: raw.path,
                layout_id: raw.layout_id,
                layout_category: raw.layout_category,
                role,
                placeholders,
                has_loop,
                text_runs,
            }
        })
        .collect();

    for slide in &mut slides {
        if config.cover_aware && slide.index == 0 {
            slide.role = SlideRole::Cover;
        }
        if let Some(role) = options.role_overrides.get(&slide.index) {
            slide.role = *role;
        }
        debug!(
            "slide {} ({}) role={:?} placeholders={} loop={}",
            slide.index,
            slide.path,
            slide.role,
            slide.placeholders.len(),
            slide.has_loop
        );
    }

    Ok(slides)
}
