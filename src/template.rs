//! Placeholder substitution and repetition-block expansion.
//!
//! Blocks are cut out of the raw slide markup between `{{#name}}` and
//! `{{/name}}`. Both markers sit inside `<a:t>` content, so the body always
//! starts and ends inside text and any number of concatenated copies stays
//! balanced markup, whether the block spans runs, paragraphs or shapes.

use crate::data::{GenerationData, Workstation};
use crate::fields::{
    camera_fields, controller_fields, lens_fields, light_fields, module_fields, module_ordinal, workstation_fields,
    FieldMap, ImageSlot,
};
use crate::parse_xml::{ANY_MARKER, COLLECTIONS, IMAGE_MARKER, LOOP_CLOSE, LOOP_OPEN, PLACEHOLDER};
use crate::report::{ReplacementLog, ReplacementReason};
use crate::xml_text::TextDocument;
use log::debug;
use regex::{Captures, Regex};
use std::ops::Range;

/// Replaces every placeholder `fields` knows about. Unknown names stay verbatim.
///
/// Matching runs on the logical text of each paragraph, so a placeholder
/// split over several formatting runs is still found.
pub fn substitute_placeholders(
    doc: &mut TextDocument,
    fields: &FieldMap,
    log: &mut ReplacementLog,
    reason: ReplacementReason,
) -> usize {
    let mut count = 0;
    for paragraph in doc.paragraphs() {
        let mut search_from = 0;
        loop {
            let text = doc.paragraph_text(&paragraph);
            let Some(caps) = PLACEHOLDER.captures_at(&text, search_from) else {
                break;
            };
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                break;
            };

            match fields.get(name.as_str()) {
                Some(value) => {
                    doc.replace_range(&paragraph, whole.start(), whole.end(), value);
                    log.record(whole.as_str(), value, reason, name.as_str());
                    search_from = whole.start() + value.len();
                    count += 1;
                }
                None => search_from = whole.end(),
            }
        }
    }
    count
}

/// Collection a repetition block iterates, relative to the enclosing block.
#[derive(Debug, Clone, Copy)]
pub struct LoopContext<'a> {
    data: &'a GenerationData,
    workstation: Option<&'a Workstation>,
}

impl<'a> LoopContext<'a> {
    pub fn new(data: &'a GenerationData) -> Self {
        Self { data, workstation: None }
    }

    pub fn for_workstation(data: &'a GenerationData, workstation: &'a Workstation) -> Self {
        Self { data, workstation: Some(workstation) }
    }

    /// Field maps of the elements of `collection`, each with the context
    /// nested blocks inside that element see and, for modules, the module's
    /// ordinal among all modules.
    fn items(&self, collection: &str) -> Vec<(FieldMap, LoopContext<'a>, Option<usize>)> {
        let data = self.data;
        match collection {
            "workstations" => data
                .workstations
                .iter()
                .enumerate()
                .map(|(i, w)| (workstation_fields(w, i), Self::for_workstation(data, w), None))
                .collect(),
            "modules" => {
                let owners: Vec<&'a Workstation> = match self.workstation {
                    Some(w) => vec![w],
                    None => data.workstations.iter().collect(),
                };
                owners
                    .into_iter()
                    .flat_map(|w| w.modules.iter().map(move |m| (w, m)))
                    .enumerate()
                    .map(|(i, (w, m))| {
                        (module_fields(m, i, &data.hardware), Self::for_workstation(data, w), module_ordinal(data, m))
                    })
                    .collect()
            }
            "cameras" => data.hardware.cameras.iter().enumerate().map(|(i, c)| (camera_fields(c, i), *self, None)).collect(),
            "lenses" => data.hardware.lenses.iter().enumerate().map(|(i, l)| (lens_fields(l, i), *self, None)).collect(),
            "lights" => data.hardware.lights.iter().enumerate().map(|(i, l)| (light_fields(l, i), *self, None)).collect(),
            "controllers" => data
                .hardware
                .controllers
                .iter()
                .enumerate()
                .map(|(i, c)| (controller_fields(c, i), *self, None))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Pulls every `{{...}}` token that straddles runs into a single run.
pub fn consolidate_markers(xml: &str) -> String {
    let mut doc = TextDocument::parse(xml);
    doc.consolidate(&ANY_MARKER);
    doc.render()
}

/// Expands every known repetition block in `xml`. Markers must already be
/// consolidated. Blocks without a closing marker are left untouched.
pub fn expand_blocks(xml: &str, context: &LoopContext<'_>, log: &mut ReplacementLog) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;

    loop {
        let Some(open) = LOOP_OPEN
            .captures_iter(rest)
            .find(|caps| COLLECTIONS.contains(&&caps[1]))
        else {
            out.push_str(rest);
            break;
        };
        let (Some(open_match), Some(name)) = (open.get(0), open.get(1)) else {
            out.push_str(rest);
            break;
        };
        let name = name.as_str().to_string();

        let Some(close) = find_block_close(rest, open_match.end(), &name) else {
            out.push_str(&rest[..open_match.end()]);
            rest = &rest[open_match.end()..];
            continue;
        };

        out.push_str(&rest[..open_match.start()]);
        let body = &rest[open_match.end()..close.start];
        let items = context.items(&name);
        for (fields, child, ordinal) in &items {
            let nested = match ordinal {
                Some(ordinal) => expand_blocks(&pin_module_images(body, *ordinal), child, log),
                None => expand_blocks(body, child, log),
            };
            let mut doc = TextDocument::parse_fragment(&nested, true);
            substitute_placeholders(&mut doc, fields, log, ReplacementReason::LoopExpansion);
            out.push_str(&doc.render());
        }
        debug!("expanded {{{{#{name}}}}} into {} copies", items.len());
        log.record(
            open_match.as_str(),
            format!("{} item(s)", items.len()),
            ReplacementReason::LoopExpansion,
            name.as_str(),
        );

        rest = &rest[close.end..];
    }

    out
}

/// Points the module schematic markers of a module block body at one module,
/// so every copy of the block shows its own module's image.
fn pin_module_images(body: &str, ordinal: usize) -> String {
    IMAGE_MARKER
        .replace_all(body, |caps: &Captures<'_>| {
            let pinned = caps.get(2).is_some();
            match ImageSlot::from_name(&caps[1]) {
                Some(ImageSlot::ModuleSchematic) if !pinned => format!("{{{{img:module_schematic:{ordinal}}}}}"),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Position of the `{{/name}}` closing the block opened just before `from`,
/// skipping nested blocks of the same name.
fn find_block_close(xml: &str, from: usize, name: &str) -> Option<Range<usize>> {
    let mut depth = 1usize;
    let mut pos = from;

    loop {
        let close = find_marker(&LOOP_CLOSE, xml, pos, name)?;
        match find_marker(&LOOP_OPEN, xml, pos, name) {
            Some(open) if open.start < close.start => {
                depth += 1;
                pos = open.end;
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(close);
                }
                pos = close.end;
            }
        }
    }
}

fn find_marker(pattern: &Regex, xml: &str, from: usize, name: &str) -> Option<Range<usize>> {
    let mut at = from;
    while let Some(caps) = pattern.captures_at(xml, at) {
        let whole = caps.get(0)?;
        if &caps[1] == name {
            return Some(whole.range());
        }
        at = whole.end();
    }
    None
}

/// Runs the placeholder/loop path on one slide: consolidates markers,
/// expands blocks, then substitutes the remaining placeholders.
pub fn apply_template(
    xml: &str,
    context: &LoopContext<'_>,
    fields: &FieldMap,
    log: &mut ReplacementLog,
) -> String {
    let consolidated = consolidate_markers(xml);
    let expanded = expand_blocks(&consolidated, context, log);
    let mut doc = TextDocument::parse(&expanded);
    substitute_placeholders(&mut doc, fields, log, ReplacementReason::Placeholder);
    doc.render()
}
