//! The generation pipeline: load, analyze, transform, replicate, serialize.

use crate::analyzer::analyze;
use crate::classifier::{KeywordClassifier, SlideClassifier};
use crate::config::{GenerationOptions, GeneratorConfig};
use crate::constants::PPTX_MIME_TYPE;
use crate::data::GenerationData;
use crate::fields::{project_fields, workstation_fields, FieldMap, ImageScope};
use crate::loader::{load_template, Fetcher, HttpFetcher, TemplateSource};
use crate::media::inject_images;
use crate::package::Package;
use crate::parse_xml::find_placeholders;
use crate::replicator::{replicate, snapshot_templates};
use crate::report::{GenerationReport, ReplacementLog, SlideRoleEntry};
use crate::slide::SlideInfo;
use crate::smart::smart_replace;
use crate::store::DeckStore;
use crate::style::{extract_styles, ExtractedStyles};
use crate::template::{apply_template, LoopContext};
use crate::xml_text::TextDocument;
use crate::{Error, Result};
use chrono::Local;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Body of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub template: TemplateSource,
    #[serde(default)]
    pub data: GenerationData,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl GenerationRequest {
    /// Parses a JSON request body.
    ///
    /// # Errors
    ///
    /// Malformed bodies are [`Error::InvalidInput`].
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("malformed generation request: {e}")))
    }
}

/// A finished deck ready to be returned or stored.
#[derive(Debug, Clone)]
pub struct GeneratedDeck {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: &'static str,
    pub report: GenerationReport,
}

/// Turns a requested name into a safe `.pptx` file name.
///
/// Letters and digits of any script, `-` and `_` are kept; everything else
/// becomes `_`. An empty result falls back to `presentation`.
pub fn sanitize_file_name(name: &str) -> String {
    let trimmed = name.trim();
    let stem = match trimmed.len().checked_sub(5) {
        Some(cut) if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".pptx") => &trimmed[..cut],
        _ => trimmed,
    };
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "presentation.pptx".to_string()
    } else {
        format!("{cleaned}.pptx")
    }
}

/// Template-driven deck generator.
///
/// One `Generator` serves any number of requests; every request works on its
/// own [`Package`], so requests share no mutable state.
pub struct Generator {
    config: GeneratorConfig,
    fetcher: Box<dyn Fetcher>,
    classifier: Box<dyn SlideClassifier>,
}

impl Generator {
    /// A generator that downloads over HTTP and classifies with the default
    /// keyword rules.
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            fetcher: Box::new(HttpFetcher::new()),
            classifier: Box::new(KeywordClassifier::default()),
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_classifier(mut self, classifier: impl SlideClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn load(&self, source: &TemplateSource) -> Result<Package> {
        let (package, _) = load_template(source, self.config.template_base_url.as_deref(), self.fetcher.as_ref())?;
        Ok(package)
    }

    /// Slide inventory of a template, without generating anything.
    pub fn analyze_template(&self, source: &TemplateSource, options: &GenerationOptions) -> Result<Vec<SlideInfo>> {
        let package = self.load(source)?;
        analyze(&package, self.classifier.as_ref(), &self.config, options)
    }

    /// Style preview of a template.
    pub fn preview_styles(&self, source: &TemplateSource) -> Result<ExtractedStyles> {
        extract_styles(&self.load(source)?, &self.config)
    }

    /// Downloads the requested template and generates the deck.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDeck> {
        let package = self.load(&request.template)?;
        self.generate_package(package, &request.data, &request.options, request.file_name.as_deref())
    }

    /// Generates a deck and hands it to `store`. Returns the deck and its
    /// stored location.
    pub fn generate_and_store(
        &self,
        request: &GenerationRequest,
        store: &dyn DeckStore,
    ) -> Result<(GeneratedDeck, String)> {
        let deck = self.generate(request)?;
        let location = store.put(&deck.file_name, &deck.bytes)?;
        Ok((deck, location))
    }

    /// Runs the pipeline on an already opened template.
    pub fn generate_package(
        &self,
        mut package: Package,
        data: &GenerationData,
        options: &GenerationOptions,
        file_name: Option<&str>,
    ) -> Result<GeneratedDeck> {
        let project = project_fields(data, &Local::now());
        let slides = analyze(&package, self.classifier.as_ref(), &self.config, options)?;

        let templates = if options.duplicate_per_workstation && !data.workstations.is_empty() {
            snapshot_templates(&package, &slides)?
        } else {
            Vec::new()
        };

        let mut logs = Vec::with_capacity(slides.len());
        let mut images_injected = 0;
        let context = LoopContext::new(data);
        let deck_scope = ImageScope::for_deck(data);

        for slide in &slides {
            let xml = package.read_text(&slide.path)?;
            let mut log = ReplacementLog::new(slide.index);
            match self.transform_slide(&mut package, slide, &xml, &project, &context, &deck_scope, options, &mut log) {
                Ok((out, images)) => {
                    if out != xml {
                        package.write_text(&slide.path, out);
                    }
                    images_injected += images;
                    logs.push(log);
                }
                Err(e) => warn!("slide {} left unchanged: {e}", slide.path),
            }
        }
        info!("transformed {} slide(s)", slides.len());

        let mut copy_logs: Vec<(String, ReplacementLog, usize)> = Vec::new();
        let created = replicate(&mut package, &templates, &data.workstations, |package, template, workstation, index, path| {
            let fields = workstation_fields(workstation, index).merged_over(&project);
            let scope = ImageScope::for_workstation(data, workstation);
            let context = LoopContext::for_workstation(data, workstation);
            let mut log = ReplacementLog::new(template.info.index);

            let slide = SlideInfo { path: path.to_string(), ..template.info.clone() };
            let (out, images) =
                self.transform_slide(package, &slide, &template.xml, &fields, &context, &scope, options, &mut log)?;
            copy_logs.push((path.to_string(), log, images));
            Ok(out)
        });

        let mut report_slides: Vec<SlideRoleEntry> = slides
            .iter()
            .map(|s| SlideRoleEntry { index: s.index, path: s.path.clone(), role: s.role })
            .collect();
        for (offset, copy) in created.iter().enumerate() {
            let index = slides.len() + offset;
            if let Some(role) = slides.iter().find(|s| s.index == copy.source_index).map(|s| s.role) {
                report_slides.push(SlideRoleEntry { index, path: copy.path.clone(), role });
            }
            if let Some(pos) = copy_logs.iter().position(|(path, _, _)| path == &copy.path) {
                let (_, mut log, images) = copy_logs.swap_remove(pos);
                log.set_slide_index(index);
                images_injected += images;
                logs.push(log);
            }
        }

        let unresolved = unresolved_placeholders(&package)?;
        if self.config.strict_placeholders && !unresolved.is_empty() {
            return Err(Error::UnresolvedPlaceholders(unresolved));
        }

        let mut report = GenerationReport {
            slide_count: package.slide_paths().len(),
            available_fields: project.keys().map(str::to_string).collect(),
            slides: report_slides,
            images_injected,
            generated_slides: created.len(),
            unresolved_placeholders: unresolved,
            ..Default::default()
        };
        report.absorb_logs(&logs, self.config.replacement_sample_limit);

        let bytes = package.serialize()?;
        let requested = file_name.filter(|n| !n.trim().is_empty()).unwrap_or(data.project.name.as_str());
        info!(
            "generated deck: {} slides ({} new), {} replacements, {} images",
            report.slide_count, report.generated_slides, report.replaced_fields, report.images_injected
        );

        Ok(GeneratedDeck {
            bytes,
            file_name: sanitize_file_name(requested),
            mime_type: PPTX_MIME_TYPE,
            report,
        })
    }

    /// Text substitution followed by image injection for one slide.
    #[allow(clippy::too_many_arguments)]
    fn transform_slide(
        &self,
        package: &mut Package,
        slide: &SlideInfo,
        xml: &str,
        fields: &FieldMap,
        context: &LoopContext<'_>,
        scope: &ImageScope,
        options: &GenerationOptions,
        log: &mut ReplacementLog,
    ) -> Result<(String, usize)> {
        let text = if !slide.needs_smart_replace() {
            apply_template(xml, context, fields, log)
        } else if options.smart_replace != Some(false) {
            smart_replace(xml, slide, fields, self.config.format_scan_window, log)
        } else {
            xml.to_string()
        };
        inject_images(package, &slide.path, &text, scope, self.fetcher.as_ref())
    }
}

/// Placeholder names still present on any slide, sorted and deduplicated.
fn unresolved_placeholders(package: &Package) -> Result<Vec<String>> {
    let mut names = BTreeSet::new();
    for path in package.slide_paths() {
        let text = TextDocument::parse(&package.read_text(&path)?).logical_text();
        names.extend(find_placeholders(&text));
    }
    Ok(names.into_iter().collect())
}
