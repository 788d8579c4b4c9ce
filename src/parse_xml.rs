use crate::classifier::SlideClassifier;
use crate::constants::SLIDE_LAYOUT_REL_TYPE;
use crate::relationships::{resolve_target, Relationship};
use crate::slide::TextRunInfo;
use crate::xml_text::{floor_char_boundary, TextDocument};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;

/// `{{field_name}}`
pub(crate) static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([\p{L}_][\p{L}\p{N}_.\-]*)\s*\}\}").expect("valid placeholder pattern")
});

/// `{{#collection}}`
pub(crate) static LOOP_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*#\s*([\p{L}_][\p{L}\p{N}_]*)\s*\}\}").expect("valid loop pattern"));

/// `{{/collection}}`
pub(crate) static LOOP_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*/\s*([\p{L}_][\p{L}\p{N}_]*)\s*\}\}").expect("valid loop pattern"));

/// `{{img:slot}}`, or `{{img:module_schematic:N}}` once a module block has
/// pinned the marker to module `N`.
pub(crate) static IMAGE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*img\s*:\s*([A-Za-z_]+)(?:\s*:\s*(\d+))?\s*\}\}").expect("valid image marker pattern")
});

/// Any `{{...}}` token, used to pull split markers into a single run.
pub(crate) static ANY_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("valid marker pattern"));

static FONT_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\ssz="(\d+)""#).expect("valid size pattern"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\sb="(1|0|true|false)""#).expect("valid bold pattern"));

/// Collections that may be repeated with `{{#name}}...{{/name}}`.
pub const COLLECTIONS: &[&str] = &["workstations", "modules", "cameras", "lenses", "lights", "controllers"];

/// Size assumed for runs without any size declaration nearby.
pub const DEFAULT_FONT_SIZE: f32 = 18.0;

/// Extracts every `<a:t>` run of a slide together with its formatting.
///
/// Formatting is not resolved structurally: the markup preceding each run is
/// scanned backwards, up to `window` bytes, for the nearest `sz` and `b`
/// attributes. Runs without any declaration fall back to a body-sized,
/// regular weight.
pub fn extract_text_runs(xml: &str, window: usize, classifier: &dyn SlideClassifier) -> Vec<TextRunInfo> {
    let doc = TextDocument::parse(xml);
    doc.nodes()
        .filter(|node| !node.text().trim().is_empty())
        .map(|node| {
            let (font_size, bold) = run_format(xml, node.source.start, window);
            TextRunInfo {
                text: node.text().to_string(),
                font_size,
                bold,
                tag: classifier.tag_run(node.text(), font_size, bold),
            }
        })
        .collect()
}

/// Font size (points) and weight of the run whose text starts at `text_start`.
///
/// The run's own `<a:rPr>` wins when it is inside the window; a missing `b`
/// there means regular weight. Otherwise the nearest declarations of any
/// element in the window are used.
pub fn run_format(xml: &str, text_start: usize, window: usize) -> (f32, bool) {
    let start = floor_char_boundary(xml, text_start.saturating_sub(window));
    let context = &xml[start..text_start];

    let run_props = context.rfind("<a:rPr").map(|pos| &context[pos..]);
    let font_size = run_props
        .and_then(last_font_size)
        .or_else(|| last_font_size(context))
        .unwrap_or(DEFAULT_FONT_SIZE);
    let bold = match run_props {
        Some(props) => last_bold(props).unwrap_or(false),
        None => last_bold(context).unwrap_or(false),
    };
    (font_size, bold)
}

fn last_font_size(markup: &str) -> Option<f32> {
    FONT_SIZE
        .captures_iter(markup)
        .last()
        .and_then(|c| c[1].parse::<f32>().ok())
        .map(|hundredths| hundredths / 100.0)
}

fn last_bold(markup: &str) -> Option<bool> {
    BOLD.captures_iter(markup).last().map(|c| &c[1] == "1" || &c[1] == "true")
}

/// Bare placeholder names in order of first appearance.
pub fn find_placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Known collections that have both an opening and a closing marker.
pub fn find_loop_collections(text: &str) -> Vec<String> {
    let closed: Vec<&str> = LOOP_CLOSE.captures_iter(text).filter_map(|c| c.get(1)).map(|m| m.as_str()).collect();
    let mut names: Vec<String> = Vec::new();
    for caps in LOOP_OPEN.captures_iter(text) {
        let name = &caps[1];
        if COLLECTIONS.contains(&name) && closed.contains(&name) && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Layout part referenced by a slide: `(part name, part path)`.
pub fn layout_reference(slide_path: &str, rels: &[Relationship]) -> Option<(String, String)> {
    let rel = rels.iter().find(|r| r.rel_type == SLIDE_LAYOUT_REL_TYPE)?;
    let path = resolve_target(slide_path, &rel.target);
    let name = path
        .rsplit('/')
        .next()
        .and_then(|file| file.strip_suffix(".xml"))
        .unwrap_or(&path)
        .to_string();
    Some((name, path))
}

/// The `type` attribute of a `p:sldLayout` root element.
pub fn layout_type(layout_xml: &str) -> Result<Option<String>> {
    let doc = roxmltree::Document::parse(layout_xml)?;
    Ok(doc.root_element().attribute("type").map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;
    use crate::slide::TextTag;
    use std::fs;
    use std::path::PathBuf;

    fn load_xml(filename: &str) -> String {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("tests");
        path.push("test_data");
        path.push("xml");
        path.push(filename);
        fs::read_to_string(path).expect("Unable to read test data file")
    }

    #[test]
    fn test_extract_runs_with_formatting() {
        let xml = load_xml("cover_slide.xml");
        let runs = extract_text_runs(&xml, 500, &KeywordClassifier::default());
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].text, "某某电子视觉检测技术方案");
        assert_eq!(runs[0].font_size, 40.0);
        assert!(runs[0].bold);
        assert_eq!(runs[0].tag, TextTag::Title);
        assert_eq!(runs[1].font_size, 20.0);
        assert!(!runs[1].bold);
        assert_eq!(runs[2].tag, TextTag::Date);
    }

    #[test]
    fn test_missing_formatting_defaults_to_body() {
        let xml = "<a:p><a:r><a:t>plain</a:t></a:r></a:p>";
        let runs = extract_text_runs(xml, 500, &KeywordClassifier::default());
        assert_eq!(runs[0].font_size, DEFAULT_FONT_SIZE);
        assert!(!runs[0].bold);
        assert_eq!(runs[0].tag, TextTag::Body);
    }

    #[test]
    fn test_window_limits_the_backward_scan() {
        let padding = "x".repeat(600);
        let xml = format!(r#"<a:rPr sz="4000"/>{padding}<a:t>far</a:t>"#);
        let runs = extract_text_runs(&xml, 500, &KeywordClassifier::default());
        assert_eq!(runs[0].font_size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_placeholders_and_loops() {
        let text = "{{project_name}} {{#workstations}}{{name}}{{/workstations}} {{img:front_view}} {{project_name}} {{#unknown}}{{/unknown}}";
        assert_eq!(find_placeholders(text), vec!["project_name", "name"]);
        assert_eq!(find_loop_collections(text), vec!["workstations"]);
        assert!(find_loop_collections("{{#modules}} never closed").is_empty());
    }

    #[test]
    fn test_layout_reference_and_type() {
        let rels = crate::relationships::parse_relationships(load_xml("rels_with_images.xml").as_bytes()).unwrap();
        let (name, path) = layout_reference("ppt/slides/slide1.xml", &rels).unwrap();
        assert_eq!(name, "slideLayout2");
        assert_eq!(path, "ppt/slideLayouts/slideLayout2.xml");
        assert_eq!(layout_type(&load_xml("slide_layout_title.xml")).unwrap().as_deref(), Some("title"));
    }
}
