//! Heuristic slide and run classification.
//!
//! The default rules are tuned for mixed Chinese/English proposal decks.
//! They are plain case-insensitive regexes evaluated in order; the first
//! match decides the role.

use crate::slide::{SlideRole, TextTag};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}\s*[年/\-.]\s*\d{1,2}\s*[月/\-.]\s*\d{1,2}\s*日?").expect("valid date pattern")
});

const DEFAULT_RULES: &[(SlideRole, &str)] = &[
    (SlideRole::BasicInfo, r"项目信息|基本信息|项目概况|project\s*(info|information|overview)|basic\s*info"),
    (SlideRole::ProductSchematic, r"产品示意|产品图|产品外观|product\s*(schematic|drawing|image|overview)"),
    (
        SlideRole::TechnicalRequirements,
        r"技术要求|检测要求|技术需求|检测需求|technical\s*requirements?|inspection\s*requirements?",
    ),
    (SlideRole::ThreeView, r"三视图|正视图|侧视图|俯视图|three[-\s]?views?|front\s*view"),
    (SlideRole::SchematicDiagram, r"示意图|原理图|布局图|schematic\s*diagram|layout\s*diagram"),
    (SlideRole::MotionMethod, r"运动方式|运动方案|动作流程|运动流程|motion\s*(method|mode|flow)|movement"),
    (SlideRole::OpticalSolution, r"光学方案|成像方案|光学设计|optical\s*(solution|scheme|design)|imaging\s*solution"),
    (SlideRole::VisionList, r"视觉清单|视觉配置|配置清单|vision\s*(list|configuration)"),
    (SlideRole::BillOfMaterials, r"物料清单|硬件清单|\bBOM\b|bill\s*of\s*materials?"),
    (SlideRole::ThankYou, r"谢谢|感谢|thank\s*you|thanks|q\s*&\s*a"),
    (SlideRole::Cover, r"技术方案|解决方案|方案书|technical\s*(plan|proposal)|solution\s*proposal"),
];

/// Strategy that assigns roles to slides and tags to text runs.
pub trait SlideClassifier: Send + Sync {
    /// Role of a slide given all of its text with tags stripped.
    fn classify(&self, text: &str) -> SlideRole;

    /// Tag of one text run given its resolved formatting.
    fn tag_run(&self, text: &str, font_size: f32, bold: bool) -> TextTag {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            TextTag::Unknown
        } else if DATE_PATTERN.is_match(trimmed) {
            TextTag::Date
        } else if font_size <= 10.0 {
            TextTag::Footer
        } else if font_size >= 28.0 || (bold && font_size >= 24.0) {
            TextTag::Title
        } else if font_size >= 20.0 || bold {
            TextTag::Subtitle
        } else {
            TextTag::Body
        }
    }
}

/// Ordered keyword rules.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<(SlideRole, Regex)>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(role, pattern)| (*role, Regex::new(&format!("(?i){pattern}")).expect("valid role pattern")))
            .collect();
        Self { rules }
    }
}

impl KeywordClassifier {
    /// A classifier without any rule; every slide is `Unknown`.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a rule evaluated before all existing ones.
    pub fn with_rule(mut self, role: SlideRole, pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("(?i){pattern}"))
            .map_err(|e| Error::InvalidInput(format!("invalid classifier pattern '{pattern}': {e}")))?;
        self.rules.insert(0, (role, regex));
        Ok(self)
    }
}

impl SlideClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> SlideRole {
        self.rules
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map(|(role, _)| *role)
            .unwrap_or(SlideRole::Unknown)
    }
}
