mod analyzer;
mod classifier;
mod color;
mod config;
mod constants;
mod content_types;
mod data;
mod fields;
mod generator;
mod loader;
mod media;
mod package;
mod parse_xml;
mod relationships;
mod replicator;
mod report;
mod slide;
mod smart;
mod store;
mod style;
mod template;
mod xml_text;

pub use analyzer::analyze;
pub use classifier::{KeywordClassifier, SlideClassifier};
pub use color::{apply_luminance, hex_to_hsl, hsl_to_hex, preset_color};
pub use config::{GenerationOptions, GeneratorConfig, GeneratorConfigBuilder, LogoDetection};
pub use constants::PPTX_MIME_TYPE;
pub use data::*;
pub use fields::{FieldMap, ImageScope, ImageSlot};
pub use generator::{sanitize_file_name, GeneratedDeck, GenerationRequest, Generator};
pub use loader::{load_template, Fetched, Fetcher, HttpFetcher, TemplateSource};
pub use package::Package;
pub use report::{GenerationReport, ReplacementEntry, ReplacementLog, ReplacementReason, SlideRoleEntry};
pub use slide::{LayoutCategory, SlideInfo, SlideRole, TextRunInfo, TextTag};
pub use store::{DeckStore, DirectoryStore};
pub use style::{
    extract_styles, extract_styles_from_bytes, Background, ExtractedStyles, FontSpec, FooterFlags, GradientStop,
    LayoutInfo, LogoInfo, LogoPosition, PlaceholderGeometry,
};

/// Coarse classification of an [`Error`], stable across message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Download,
    Archive,
    Generation,
    Persistence,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("Template slide could not be read: {0}")]
    SlideSource(String),

    #[error("Unresolved placeholders: {}", .0.join(", "))]
    UnresolvedPlaceholders(Vec<String>),

    #[error("Failed to store generated deck: {0}")]
    Persistence(String),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidInput(_) | Error::Json(_) => ErrorCategory::Input,
            Error::Download { .. } => ErrorCategory::Download,
            Error::InvalidArchive(_) | Error::Zip(_) => ErrorCategory::Archive,
            Error::Persistence(_) => ErrorCategory::Persistence,
            Error::Xml(_)
            | Error::Utf8(_)
            | Error::Io(_)
            | Error::MissingPart(_)
            | Error::SlideSource(_)
            | Error::UnresolvedPlaceholders(_) => ErrorCategory::Generation,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
