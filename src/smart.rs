//! Heuristic replacement for slides authored without placeholders.
//!
//! The cover slide is handled run by run: each run is tagged as a date, a
//! title or a company name and receives the matching project value. Other
//! slides are searched for `label: value` lines whose value part is swapped.

use crate::classifier::DATE_PATTERN;
use crate::fields::FieldMap;
use crate::parse_xml::run_format;
use crate::report::{ReplacementLog, ReplacementReason};
use crate::slide::{SlideInfo, SlideRole};
use crate::xml_text::TextDocument;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static TITLE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)方案|项目|技术|视觉|检测|plan|project|technical|vision|detection|inspection|proposal")
        .expect("valid title keyword pattern")
});

static TITLE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(视觉检测技术方案|视觉检测方案|技术方案|解决方案|方案|technical\s+plan|technical\s+proposal|proposal|solution|plan)\s*$",
    )
    .expect("valid title suffix pattern")
});

static COMPANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"有限公司|股份|集团|公司|\bCo\.|\bLtd\b|\bInc\b|Corporation|GmbH|\bLLC\b").expect("valid company pattern")
});

/// Size from which a run with a title keyword counts as the deck title.
const TITLE_MIN_FONT_SIZE: f32 = 24.0;

const LABELS: &[(&str, &str)] = &[
    ("project_name", r"(?i)(项目名称|\bproject\s*name)\s*[:：]\s*"),
    ("project_code", r"(?i)(项目编号|项目编码|\bproject\s*(code|no\.?|number))\s*[:：]\s*"),
    ("customer", r"(?i)(客户名称|客户|\bcustomer(\s*name)?)\s*[:：]\s*"),
    ("date", r"(?i)(日期|\bdate)\s*[:：]\s*"),
    ("responsible", r"(?i)(负责人|\bresponsible(\s*person)?)\s*[:：]\s*"),
    ("workstation_count", r"(?i)(工位数量|工位数|\bworkstation\s*count|\bnumber\s*of\s*workstations)\s*[:：]\s*"),
    ("camera_count", r"(?i)(相机数量|相机数|\bcamera\s*count|\bnumber\s*of\s*cameras)\s*[:：]\s*"),
];

static LABEL_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    LABELS
        .iter()
        .map(|(field, pattern)| (*field, Regex::new(pattern).expect("valid label pattern")))
        .collect()
});

/// Applies heuristic replacement to one slide and returns the new markup.
///
/// `window` bounds the backward scan used to find a run's formatting.
pub fn smart_replace(
    xml: &str,
    slide: &SlideInfo,
    fields: &FieldMap,
    window: usize,
    log: &mut ReplacementLog,
) -> String {
    let mut doc = TextDocument::parse(xml);
    let before = log.len();

    if slide.role == SlideRole::Cover {
        replace_cover_runs(&mut doc, xml, fields, window, log);
    } else {
        replace_labeled_values(&mut doc, fields, log);
    }

    if log.len() == before {
        return xml.to_string();
    }
    debug!("smart replace on {}: {} change(s)", slide.path, log.len() - before);
    doc.render()
}

fn replace_cover_runs(doc: &mut TextDocument, xml: &str, fields: &FieldMap, window: usize, log: &mut ReplacementLog) {
    let project_name = fields.get("project_name").unwrap_or_default();
    let customer = fields.get("customer").unwrap_or_default();
    let mut title_done = false;

    for idx in doc.paragraphs().into_iter().flatten() {
        let text = doc.text(idx).to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(found) = DATE_PATTERN.find(&text) {
            let replacement = formatted_date(found.as_str(), fields);
            if !replacement.is_empty() && replacement != found.as_str() {
                let new_text = format!("{}{}{}", &text[..found.start()], replacement, &text[found.end()..]);
                log.record(found.as_str(), replacement, ReplacementReason::Heuristic, "date");
                doc.set_text(idx, new_text);
            }
            continue;
        }

        let Some(range) = doc.source_range(idx) else {
            continue;
        };
        let (font_size, bold) = run_format(xml, range.start, window);

        if !title_done && (font_size >= TITLE_MIN_FONT_SIZE || bold) && TITLE_KEYWORDS.is_match(trimmed) {
            title_done = true;
            if project_name.is_empty() {
                continue;
            }
            let replacement = title_with_suffix(project_name, trimmed);
            log.record(trimmed, replacement.as_str(), ReplacementReason::Heuristic, "title");
            doc.set_text(idx, replacement);
            continue;
        }

        if COMPANY.is_match(trimmed) && !customer.is_empty() && trimmed != customer {
            log.record(trimmed, customer, ReplacementReason::Heuristic, "company");
            doc.set_text(idx, customer.to_string());
        }
    }
}

/// The project date in the style of `original`: Chinese if it uses `年`,
/// otherwise numeric with the original separator.
fn formatted_date(original: &str, fields: &FieldMap) -> String {
    if original.contains('年') {
        return fields.get("date_cn").unwrap_or_default().to_string();
    }
    let (Some(year), Some(month), Some(day)) = (fields.get("year"), fields.get("month"), fields.get("day")) else {
        return String::new();
    };
    let separator = original
        .chars()
        .find(|c| !c.is_ascii_digit() && !c.is_whitespace())
        .unwrap_or('-');
    format!("{year}{separator}{month}{separator}{day}")
}

/// Keeps the descriptive tail of the old title after the new project name.
fn title_with_suffix(project_name: &str, old_title: &str) -> String {
    let Some(caps) = TITLE_SUFFIX.captures(old_title) else {
        return project_name.to_string();
    };
    let suffix = &caps[1];
    if project_name.to_lowercase().ends_with(&suffix.to_lowercase()) {
        return project_name.to_string();
    }
    if suffix.starts_with(|c: char| c.is_ascii_alphabetic()) {
        format!("{project_name} {suffix}")
    } else {
        format!("{project_name}{suffix}")
    }
}

fn replace_labeled_values(doc: &mut TextDocument, fields: &FieldMap, log: &mut ReplacementLog) {
    for paragraph in doc.paragraphs() {
        let text = doc.paragraph_text(&paragraph);

        let mut labels: Vec<(usize, usize, &str)> = LABEL_PATTERNS
            .iter()
            .flat_map(|(field, regex)| regex.find_iter(&text).map(move |m| (m.start(), m.end(), *field)))
            .collect();
        labels.sort_by_key(|&(start, _, _)| start);
        labels.dedup_by(|next, kept| next.0 < kept.1);

        let mut spans = Vec::new();
        for (i, &(_, label_end, field)) in labels.iter().enumerate() {
            let limit = labels.get(i + 1).map(|l| l.0).unwrap_or(text.len());
            let value_end = label_end + text[label_end..limit].trim_end().len();
            spans.push((label_end, value_end, field));
        }

        for (start, end, field) in spans.into_iter().rev() {
            let Some(value) = fields.get(field).filter(|v| !v.is_empty()) else {
                continue;
            };
            let original = &text[start..end];
            if original == value {
                continue;
            }
            log.record(original, value, ReplacementReason::Heuristic, field);
            doc.replace_range(&paragraph, start, end, value);
        }
    }
}
