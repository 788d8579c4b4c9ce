use serde::{Deserialize, Serialize};

/// Semantic role of a slide inside a proposal deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideRole {
    Cover,
    BasicInfo,
    ProductSchematic,
    TechnicalRequirements,
    ThreeView,
    SchematicDiagram,
    MotionMethod,
    OpticalSolution,
    VisionList,
    BillOfMaterials,
    ThankYou,
    Unknown,
}

impl SlideRole {
    /// Cover and closing slides appear once per deck and are never replicated.
    pub fn is_deck_level(&self) -> bool {
        matches!(self, SlideRole::Cover | SlideRole::ThankYou)
    }
}

/// Layout category taken from the `type` attribute of `p:sldLayout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCategory {
    Title,
    TitleAndContent,
    SectionHeader,
    TwoContent,
    Comparison,
    TitleOnly,
    Blank,
    ContentWithCaption,
    PictureWithCaption,
    Other(String),
    Unknown,
}

impl LayoutCategory {
    pub fn from_layout_type(value: Option<&str>) -> Self {
        match value {
            Some("title") => Self::Title,
            Some("obj") | Some("tx") => Self::TitleAndContent,
            Some("secHead") => Self::SectionHeader,
            Some("twoObj") => Self::TwoContent,
            Some("twoTxTwoObj") => Self::Comparison,
            Some("titleOnly") => Self::TitleOnly,
            Some("blank") => Self::Blank,
            Some("objTx") => Self::ContentWithCaption,
            Some("picTx") => Self::PictureWithCaption,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Unknown,
        }
    }
}

/// Coarse tag of a text run, derived from its size, weight and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTag {
    Title,
    Subtitle,
    Body,
    Date,
    Footer,
    Unknown,
}

/// One `<a:t>` run with the formatting found near it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRunInfo {
    pub text: String,
    /// Font size in points.
    pub font_size: f32,
    pub bold: bool,
    pub tag: TextTag,
}

/// Read-only view of one slide part, computed per generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideInfo {
    pub index: usize,
    pub path: String,
    /// Part name of the referenced layout, e.g. `slideLayout2`.
    pub layout_id: Option<String>,
    pub layout_category: LayoutCategory,
    pub role: SlideRole,
    /// Bare `{{name}}` placeholders in document order, without duplicates.
    pub placeholders: Vec<String>,
    pub has_loop: bool,
    /// Filled only when smart replacement is active.
    pub text_runs: Vec<TextRunInfo>,
}

impl SlideInfo {
    pub fn has_placeholders(&self) -> bool {
        !self.placeholders.is_empty()
    }

    /// Whether the slide goes through heuristic replacement instead of
    /// placeholder substitution.
    pub fn needs_smart_replace(&self) -> bool {
        !self.has_placeholders() && !self.has_loop
    }
}
