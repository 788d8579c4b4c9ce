//! Image marker resolution.
//!
//! A `{{img:slot}}` marker names an image slot. When the current
//! [`ImageScope`] has a URL for it, the bytes are fetched and stored as a new
//! `ppt/media/imageN.ext` part, the slide gets a new image relationship and
//! the shape carrying the marker is swapped for a picture of the same size.

use crate::constants::{CONTENT_TYPES_PATH, EMU_PER_INCH, IMAGE_REL_TYPE, MEDIA_DIR};
use crate::content_types::ensure_default;
use crate::fields::{ImageScope, ImageSlot};
use crate::loader::{Fetched, Fetcher};
use crate::package::Package;
use crate::parse_xml::IMAGE_MARKER;
use crate::relationships::{append_relationship, empty_relationships, rels_path_for};
use crate::template::consolidate_markers;
use crate::xml_text::TextDocument;
use crate::Result;
use image::ImageFormat;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use std::ops::Range;

static SHAPE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<p:cNvPr\s[^>]*?\bid="(\d+)""#).expect("valid id pattern"));
static SHAPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<p:cNvPr\s[^>]*?\bname="([^"]*)""#).expect("valid name pattern"));
static OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a:off\s+x="(-?\d+)"\s+y="(-?\d+)""#).expect("valid offset pattern"));
static EXTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a:ext\s+cx="(\d+)"\s+cy="(\d+)""#).expect("valid extent pattern"));
/// `<p:sp>`, `<p:sp ...>`, `<p:sp/>` and `</p:sp>`, but not `<p:spPr>` or `<p:spTree>`.
static SHAPE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?p:sp(?:\s[^>]*)?/?>").expect("valid shape tag pattern"));

/// Box used for shapes without their own `a:xfrm`: 4 x 3 inches, one inch in.
const DEFAULT_BOX: ShapeBox = ShapeBox { x: EMU_PER_INCH, y: EMU_PER_INCH, cx: 4 * EMU_PER_INCH, cy: 3 * EMU_PER_INCH };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShapeBox {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

impl ShapeBox {
    /// Largest box with the image's aspect ratio that fits inside, centered.
    fn fit(&self, width: u32, height: u32) -> ShapeBox {
        if width == 0 || height == 0 || self.cx <= 0 || self.cy <= 0 {
            return *self;
        }
        let scale = (self.cx as f64 / width as f64).min(self.cy as f64 / height as f64);
        let cx = (width as f64 * scale).round() as i64;
        let cy = (height as f64 * scale).round() as i64;
        ShapeBox { x: self.x + (self.cx - cx) / 2, y: self.y + (self.cy - cy) / 2, cx, cy }
    }
}

/// Media file extension of fetched bytes: the declared content type first,
/// sniffed from the bytes when the server sent nothing useful.
pub fn media_extension(fetched: &Fetched) -> Option<&'static str> {
    let declared = match fetched.content_type.as_deref() {
        Some("image/png") => Some("png"),
        Some("image/jpeg") | Some("image/jpg") | Some("image/pjpeg") => Some("jpeg"),
        Some("image/gif") => Some("gif"),
        Some("image/bmp") | Some("image/x-ms-bmp") => Some("bmp"),
        Some("image/tiff") => Some("tiff"),
        Some("image/webp") => Some("webp"),
        Some("image/svg+xml") => Some("svg"),
        _ => None,
    };
    declared.or_else(|| match image::guess_format(&fetched.bytes).ok()? {
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpeg"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::Bmp => Some("bmp"),
        ImageFormat::Tiff => Some("tiff"),
        ImageFormat::WebP => Some("webp"),
        _ => None,
    })
}

fn pixel_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Resolves every image marker of one slide.
///
/// Returns the new slide markup and the number of injected images. Markers
/// whose slot has no URL, whose download fails or whose bytes are not an
/// image stay in place.
pub fn inject_images(
    package: &mut Package,
    slide_path: &str,
    xml: &str,
    scope: &ImageScope,
    fetcher: &dyn Fetcher,
) -> Result<(String, usize)> {
    if !IMAGE_MARKER.is_match(&TextDocument::parse(xml).logical_text()) {
        return Ok((xml.to_string(), 0));
    }

    let mut xml = consolidate_markers(xml);
    let mut injected = 0;
    let mut search_from = 0;

    while let Some(caps) = IMAGE_MARKER.captures_at(&xml, search_from) {
        let Some(marker) = caps.get(0) else {
            break;
        };
        let marker_range = marker.range();
        let slot_name = caps[1].to_string();
        let module_ordinal = caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok());
        search_from = marker_range.end;

        let Some(slot) = ImageSlot::from_name(&slot_name) else {
            warn!("{slide_path}: unknown image slot '{slot_name}'");
            continue;
        };
        let url = match module_ordinal {
            Some(ordinal) if slot == ImageSlot::ModuleSchematic => scope.module_schematic(ordinal),
            _ => scope.url(slot),
        };
        let Some(url) = url else {
            debug!("{slide_path}: no image for slot '{}'", slot.name());
            continue;
        };
        let Some(shape) = enclosing_shape(&xml, marker_range.start, marker_range.end) else {
            warn!("{slide_path}: image marker '{slot_name}' is not inside a text shape, left in place");
            continue;
        };

        let fetched = match fetcher.fetch(url) {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("{slide_path}: image for slot '{}' skipped: {e}", slot.name());
                continue;
            }
        };
        let Some(ext) = media_extension(&fetched) else {
            warn!("{slide_path}: {url} is not a supported image");
            continue;
        };

        let dropped: Vec<String> = IMAGE_MARKER
            .find_iter(&xml[shape.clone()])
            .filter(|m| shape.start + m.start() != marker_range.start)
            .map(|m| m.as_str().to_string())
            .collect();
        if !dropped.is_empty() {
            warn!(
                "{slide_path}: shape holding '{slot_name}' becomes a picture, dropping {}",
                dropped.join(", ")
            );
        }

        let rel_id = embed_media(package, slide_path, fetched.bytes.clone(), ext)?;
        let frame = shape_box(&xml[shape.clone()]);
        let frame = match pixel_dimensions(&fetched.bytes) {
            Some((w, h)) => frame.fit(w, h),
            None => frame,
        };
        let picture = picture_xml(&xml[shape.clone()], &rel_id, frame);

        xml.replace_range(shape.clone(), &picture);
        search_from = shape.start + picture.len();
        injected += 1;
        debug!("{slide_path}: slot '{}' -> {rel_id}", slot.name());
    }

    Ok((xml, injected))
}

/// Writes the media part, its slide relationship and the extension default.
fn embed_media(package: &mut Package, slide_path: &str, bytes: Vec<u8>, ext: &str) -> Result<String> {
    let index = package.allocate_media_index();
    let file_name = format!("image{index}.{ext}");
    package.write(&format!("{MEDIA_DIR}{file_name}"), bytes);

    let rels_path = rels_path_for(slide_path);
    let rels_xml = if package.contains(&rels_path) {
        package.read_text(&rels_path)?
    } else {
        empty_relationships()
    };
    let rel_id = package.allocate_relationship_id(&rels_path);
    let rels_xml = append_relationship(&rels_xml, &rel_id, IMAGE_REL_TYPE, &format!("../media/{file_name}"))?;
    package.write_text(&rels_path, rels_xml);

    let content_types = package.read_text(CONTENT_TYPES_PATH)?;
    package.write_text(CONTENT_TYPES_PATH, ensure_default(&content_types, ext)?);
    Ok(rel_id)
}

/// Byte range of the innermost `<p:sp>` element containing `start..end`.
///
/// `None` when the marker sits outside any text shape, e.g. in a table cell
/// of a `<p:graphicFrame>`.
fn enclosing_shape(xml: &str, start: usize, end: usize) -> Option<Range<usize>> {
    let mut open_shapes = Vec::new();
    for tag in SHAPE_TAG.find_iter(&xml[..start]) {
        if tag.as_str().starts_with("</") {
            open_shapes.pop();
        } else if !tag.as_str().ends_with("/>") {
            open_shapes.push(tag.start());
        }
    }
    let open = *open_shapes.last()?;

    let mut depth = 1usize;
    for tag in SHAPE_TAG.find_iter(&xml[end..]) {
        if tag.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Some(open..end + tag.end());
            }
        } else if !tag.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    None
}

fn shape_box(shape: &str) -> ShapeBox {
    let offset = OFFSET.captures(shape).and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)));
    let extent = EXTENT.captures(shape).and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)));
    match (offset, extent) {
        (Some((x, y)), Some((cx, cy))) => ShapeBox { x, y, cx, cy },
        _ => DEFAULT_BOX,
    }
}

fn picture_xml(shape: &str, rel_id: &str, frame: ShapeBox) -> String {
    let id = SHAPE_ID.captures(shape).map(|c| c[1].to_string()).unwrap_or_else(|| "0".to_string());
    let name = SHAPE_NAME.captures(shape).map(|c| c[1].to_string()).unwrap_or_else(|| format!("Picture {id}"));
    format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="{name}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
        ),
        id = id,
        name = name,
        rel_id = rel_id,
        x = frame.x,
        y = frame.y,
        cx = frame.cx,
        cy = frame.cy,
    )
}
