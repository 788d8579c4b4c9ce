use crate::slide::SlideRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Thresholds of the logo heuristic used during style extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoDetection {
    /// A picture is a logo candidate only if both sides are below this size.
    pub max_size_inches: f64,
    /// Fraction of the slide trimmed on every side to form the content area;
    /// pictures centered inside it are never logos.
    pub content_margin: f64,
}

impl Default for LogoDetection {
    fn default() -> Self {
        Self { max_size_inches: 3.0, content_margin: 0.2 }
    }
}

/// Engine configuration shared by every generation request.
///
/// Use [`GeneratorConfig::builder()`] to create a configuration instance.
/// This allows you to customize only the desired fields while falling back to sensible defaults for the rest.
///
/// # Configuration Options
///
/// | Parameter | Type | Default | Description |
/// |-----------|------|---------|-------------|
/// | `cover_aware` | `bool` | `true` | The first slide is always treated as the cover |
/// | `format_scan_window` | `usize` | `500` | Bytes scanned backwards from a run for its font size and weight |
/// | `replacement_sample_limit` | `usize` | `50` | Replacement log entries copied into the report |
/// | `strict_placeholders` | `bool` | `false` | Fail when placeholders remain unresolved |
/// | `template_base_url` | `Option<String>` | `None` | Base URL that stored template ids are resolved against |
/// | `logo_detection` | `LogoDetection` | 3 in / 20 % | Logo heuristic thresholds |
///
/// # Example
///
/// ```
/// use vision_deck::GeneratorConfig;
///
/// let config = GeneratorConfig::builder()
///     .strict_placeholders(true)
///     .build();
/// assert!(config.cover_aware);
/// ```
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub cover_aware: bool,
    pub format_scan_window: usize,
    pub replacement_sample_limit: usize,
    pub strict_placeholders: bool,
    pub template_base_url: Option<String>,
    pub logo_detection: LogoDetection,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            cover_aware: true,
            format_scan_window: 500,
            replacement_sample_limit: 50,
            strict_placeholders: false,
            template_base_url: None,
            logo_detection: LogoDetection::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }
}

/// Builder for [`GeneratorConfig`].
///
/// Allows setting individual configuration fields while falling back to defaults for any unspecified values
#[derive(Debug, Default)]
pub struct GeneratorConfigBuilder {
    cover_aware: Option<bool>,
    format_scan_window: Option<usize>,
    replacement_sample_limit: Option<usize>,
    strict_placeholders: Option<bool>,
    template_base_url: Option<String>,
    logo_detection: Option<LogoDetection>,
}

impl GeneratorConfigBuilder {
    pub fn cover_aware(mut self, value: bool) -> Self {
        self.cover_aware = Some(value);
        self
    }

    pub fn format_scan_window(mut self, value: usize) -> Self {
        self.format_scan_window = Some(value);
        self
    }

    pub fn replacement_sample_limit(mut self, value: usize) -> Self {
        self.replacement_sample_limit = Some(value);
        self
    }

    pub fn strict_placeholders(mut self, value: bool) -> Self {
        self.strict_placeholders = Some(value);
        self
    }

    pub fn template_base_url(mut self, value: impl Into<String>) -> Self {
        self.template_base_url = Some(value.into());
        self
    }

    pub fn logo_detection(mut self, value: LogoDetection) -> Self {
        self.logo_detection = Some(value);
        self
    }

    /// Builds the final [`GeneratorConfig`] instance, applying default values for any fields that were not set.
    pub fn build(self) -> GeneratorConfig {
        let defaults = GeneratorConfig::default();
        GeneratorConfig {
            cover_aware: self.cover_aware.unwrap_or(defaults.cover_aware),
            format_scan_window: self.format_scan_window.unwrap_or(defaults.format_scan_window),
            replacement_sample_limit: self.replacement_sample_limit.unwrap_or(defaults.replacement_sample_limit),
            strict_placeholders: self.strict_placeholders.unwrap_or(defaults.strict_placeholders),
            template_base_url: self.template_base_url.or(defaults.template_base_url),
            logo_detection: self.logo_detection.unwrap_or(defaults.logo_detection),
        }
    }
}

/// Options sent along with one generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Append one copy of every template slide per workstation.
    pub duplicate_per_workstation: bool,
    /// Roles forced for specific slide indices.
    pub role_overrides: HashMap<usize, SlideRole>,
    /// `None` enables heuristic replacement on slides without placeholders.
    pub smart_replace: Option<bool>,
}
