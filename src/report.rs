use crate::slide::SlideRole;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementReason {
    Placeholder,
    LoopExpansion,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacementEntry {
    pub slide_index: usize,
    pub original: String,
    pub replacement: String,
    pub reason: ReplacementReason,
    /// Field name for placeholders, collection name for loops, heuristic
    /// category (`title`, `company`, `date`, ...) otherwise.
    pub category: String,
}

/// Substitutions made on one slide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplacementLog {
    pub slide_index: usize,
    pub entries: Vec<ReplacementEntry>,
}

impl ReplacementLog {
    pub fn new(slide_index: usize) -> Self {
        Self { slide_index, entries: Vec::new() }
    }

    pub fn record(
        &mut self,
        original: impl Into<String>,
        replacement: impl Into<String>,
        reason: ReplacementReason,
        category: impl Into<String>,
    ) {
        self.entries.push(ReplacementEntry {
            slide_index: self.slide_index,
            original: original.into(),
            replacement: replacement.into(),
            reason,
            category: category.into(),
        });
    }

    /// Moves the log and its entries to another slide position.
    pub fn set_slide_index(&mut self, slide_index: usize) {
        self.slide_index = slide_index;
        for entry in &mut self.entries {
            entry.slide_index = slide_index;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideRoleEntry {
    pub index: usize,
    pub path: String,
    pub role: SlideRole,
}

/// Summary returned together with a generated deck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub slide_count: usize,
    /// Project-level keys that were available for substitution.
    pub available_fields: Vec<String>,
    pub slides: Vec<SlideRoleEntry>,
    pub replaced_fields: usize,
    pub images_injected: usize,
    pub generated_slides: usize,
    /// Placeholder names still present in the output, sorted.
    pub unresolved_placeholders: Vec<String>,
    /// Bounded sample of heuristic replacements, for diagnostics.
    pub replacement_samples: Vec<ReplacementEntry>,
}

impl GenerationReport {
    /// Folds per-slide logs into the totals and the bounded sample.
    pub fn absorb_logs(&mut self, logs: &[ReplacementLog], sample_limit: usize) {
        for log in logs {
            self.replaced_fields += log.len();
            for entry in &log.entries {
                if entry.reason == ReplacementReason::Heuristic && self.replacement_samples.len() < sample_limit {
                    self.replacement_samples.push(entry.clone());
                }
            }
        }
    }
}
