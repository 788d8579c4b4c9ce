//! Per-workstation slide duplication and manifest patching.

use crate::constants::{
    CONTENT_TYPES_PATH, NOTES_SLIDE_REL_TYPE, PRESENTATION_PATH, PRESENTATION_RELS_PATH, SLIDES_DIR,
    SLIDE_CONTENT_TYPE, SLIDE_REL_TYPE,
};
use crate::content_types::add_override;
use crate::data::Workstation;
use crate::package::Package;
use crate::relationships::{append_relationship, rels_path_for, remove_relationships_of_type};
use crate::slide::SlideInfo;
use crate::{Error, Result};
use log::{debug, info, warn};

/// Content of a slide that is copied once per workstation, captured before
/// the deck-level slides are transformed.
#[derive(Debug, Clone)]
pub struct TemplateSlide {
    pub info: SlideInfo,
    pub xml: String,
    pub rels: Option<String>,
}

/// One slide appended by [`replicate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedSlide {
    pub path: String,
    pub source_index: usize,
    pub workstation_index: usize,
}

/// Whether a slide is repeated per workstation: every slide except the
/// cover, the closing slide and slides that already iterate with a block.
pub fn is_template(slide: &SlideInfo) -> bool {
    !slide.role.is_deck_level() && !slide.has_loop
}

/// Reads the template slides out of the untouched package.
///
/// # Errors
///
/// Returns [`Error::SlideSource`] if a template slide cannot be read.
pub fn snapshot_templates(package: &Package, slides: &[SlideInfo]) -> Result<Vec<TemplateSlide>> {
    slides
        .iter()
        .filter(|slide| is_template(slide))
        .map(|slide| {
            let xml = package
                .read_text(&slide.path)
                .map_err(|e| Error::SlideSource(format!("{}: {e}", slide.path)))?;
            let rels_path = rels_path_for(&slide.path);
            let rels = if package.contains(&rels_path) {
                Some(package.read_text(&rels_path).map_err(|e| Error::SlideSource(format!("{rels_path}: {e}")))?)
            } else {
                None
            };
            Ok(TemplateSlide { info: slide.clone(), xml, rels })
        })
        .collect()
}

/// Appends one copy of every template slide per workstation, in workstation
/// order, after all existing slides.
///
/// `transform` receives the package, the template, the workstation with its
/// index and the path of the new part, and returns the final slide markup.
/// A copy whose transformation or registration fails is logged and left out.
pub fn replicate<F>(
    package: &mut Package,
    templates: &[TemplateSlide],
    workstations: &[Workstation],
    mut transform: F,
) -> Vec<ReplicatedSlide>
where
    F: FnMut(&mut Package, &TemplateSlide, &Workstation, usize, &str) -> Result<String>,
{
    let mut created = Vec::new();

    for (workstation_index, workstation) in workstations.iter().enumerate() {
        for template in templates {
            let number = package.allocate_slide_number();
            let path = format!("{SLIDES_DIR}slide{number}.xml");
            let rels_path = rels_path_for(&path);

            if let Some(rels) = &template.rels {
                package.write_text(&rels_path, remove_relationships_of_type(rels, NOTES_SLIDE_REL_TYPE));
            }

            let outcome = transform(package, template, workstation, workstation_index, &path)
                .and_then(|xml| register_slide(package, &path, xml));
            match outcome {
                Ok(()) => {
                    debug!("{} -> {path} for workstation {}", template.info.path, workstation.name);
                    created.push(ReplicatedSlide {
                        path,
                        source_index: template.info.index,
                        workstation_index,
                    });
                }
                Err(e) => {
                    warn!(
                        "copy of {} for workstation {} skipped: {e}",
                        template.info.path, workstation.name
                    );
                    package.remove(&rels_path);
                }
            }
        }
    }

    info!(
        "replicated {} template slide(s) for {} workstation(s): {} new slide(s)",
        templates.len(),
        workstations.len(),
        created.len()
    );
    created
}

/// Writes a new slide part and appends it to the manifest: presentation
/// relationship, `p:sldId` entry and content-type override.
///
/// Nothing is written unless every manifest part could be patched.
pub fn register_slide(package: &mut Package, path: &str, xml: String) -> Result<()> {
    let target = path.strip_prefix("ppt/").unwrap_or(path);

    let rel_id = package.allocate_relationship_id(PRESENTATION_RELS_PATH);
    let presentation_rels = append_relationship(
        &package.read_text(PRESENTATION_RELS_PATH)?,
        &rel_id,
        SLIDE_REL_TYPE,
        target,
    )?;

    let slide_id = package.allocate_slide_id();
    let presentation = append_slide_id(&package.read_text(PRESENTATION_PATH)?, slide_id, &rel_id)?;
    let content_types = add_override(&package.read_text(CONTENT_TYPES_PATH)?, path, SLIDE_CONTENT_TYPE)?;

    package.write_text(path, xml);
    package.write_text(PRESENTATION_RELS_PATH, presentation_rels);
    package.write_text(PRESENTATION_PATH, presentation);
    package.write_text(CONTENT_TYPES_PATH, content_types);
    Ok(())
}

fn append_slide_id(presentation: &str, slide_id: u32, rel_id: &str) -> Result<String> {
    let entry = format!(r#"<p:sldId id="{slide_id}" r:id="{rel_id}"/>"#);

    if let Some(close) = presentation.find("</p:sldIdLst>") {
        return Ok(format!("{}{entry}{}", &presentation[..close], &presentation[close..]));
    }
    if let Some(empty) = presentation.find("<p:sldIdLst/>") {
        let end = empty + "<p:sldIdLst/>".len();
        return Ok(format!(
            "{}<p:sldIdLst>{entry}</p:sldIdLst>{}",
            &presentation[..empty],
            &presentation[end..]
        ));
    }
    // The list follows the master list when the deck has no slides yet.
    if let Some(masters) = presentation.find("</p:sldMasterIdLst>") {
        let end = masters + "</p:sldMasterIdLst>".len();
        return Ok(format!(
            "{}<p:sldIdLst>{entry}</p:sldIdLst>{}",
            &presentation[..end],
            &presentation[end..]
        ));
    }
    Err(Error::MissingPart("p:sldIdLst in ppt/presentation.xml".to_string()))
}
