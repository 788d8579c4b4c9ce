//! Read-only style preview of a template: theme colors, background, logo,
//! footer flags, fonts and the available layouts.

use crate::color::{apply_luminance, normalize_hex, preset_color};
use crate::config::GeneratorConfig;
use crate::constants::{
    DEFAULT_SLIDE_SIZE, EMU_PER_INCH, IMAGE_REL_TYPE, PRESENTATION_PATH, PRESENTATION_RELS_PATH,
    RELS_NAMESPACE, SLIDE_MASTER_REL_TYPE, THEME_REL_TYPE,
};
use crate::content_types::content_type_for_extension;
use crate::package::Package;
use crate::relationships::{parse_relationships, rels_path_for, resolve_target, Relationship};
use crate::slide::LayoutCategory;
use crate::Result;
use base64::{engine::general_purpose, Engine as _};
use indexmap::IndexMap;
use log::{debug, info};
use roxmltree::{Document, Node};
use serde::Serialize;

/// Theme color slots in the order they appear in `a:clrScheme`.
const SCHEME_SLOTS: &[&str] = &[
    "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5", "accent6", "hlink",
    "folHlink",
];

const COLOR_ELEMENTS: &[&str] = &["srgbClr", "sysClr", "prstClr", "schemeClr"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradientStop {
    /// Position in percent.
    pub position: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Background {
    None,
    Solid { color: String },
    Gradient { stops: Vec<GradientStop>, angle: f64 },
    Image { data_uri: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogoInfo {
    pub data_uri: String,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub position: LogoPosition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FooterFlags {
    pub slide_number: bool,
    pub date: bool,
    pub footer_text: bool,
}

/// Font families and the level-one size of one text style.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FontSpec {
    pub latin: Option<String>,
    pub east_asian: Option<String>,
    /// Points.
    pub size: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceholderGeometry {
    pub ph_type: String,
    pub idx: Option<u32>,
    /// `(x, y)` in EMU, when the layout overrides it.
    pub offset: Option<(i64, i64)>,
    /// `(cx, cy)` in EMU, when the layout overrides it.
    pub extent: Option<(i64, i64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutInfo {
    /// Part name, e.g. `slideLayout1`.
    pub id: String,
    pub name: String,
    pub category: LayoutCategory,
    pub placeholders: Vec<PlaceholderGeometry>,
}

/// Style descriptor of a template, produced once per preview request.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedStyles {
    pub background: Background,
    pub logo: Option<LogoInfo>,
    pub footer: FooterFlags,
    /// Theme slot (`dk1`, `accent1`, ...) to `#RRGGBB`.
    pub theme_colors: IndexMap<String, String>,
    /// Master color map (`bg1` -> `lt1`, ...).
    pub color_map: IndexMap<String, String>,
    pub layouts: Vec<LayoutInfo>,
    pub title_font: FontSpec,
    pub body_font: FontSpec,
    /// Slide width and height in EMU.
    pub slide_size: (i64, i64),
}

/// Extracts the styles of an opened template. The package is not modified.
pub fn extract_styles(package: &Package, config: &GeneratorConfig) -> Result<ExtractedStyles> {
    let slide_size = slide_size(package)?;
    let master_path = master_path(package)?;

    let master_xml = match &master_path {
        Some(path) => Some(package.read_text(path)?),
        None => None,
    };
    let master_rels = match &master_path {
        Some(path) => read_rels(package, path)?,
        None => Vec::new(),
    };

    let theme_path = master_path
        .as_deref()
        .and_then(|master| {
            master_rels
                .iter()
                .find(|r| r.rel_type == THEME_REL_TYPE)
                .map(|r| resolve_target(master, &r.target))
        })
        .unwrap_or_else(|| "ppt/theme/theme1.xml".to_string());
    let theme_xml = if package.contains(&theme_path) {
        Some(package.read_text(&theme_path)?)
    } else {
        None
    };
    let theme_doc = theme_xml.as_deref().map(Document::parse).transpose()?;
    let master_doc = master_xml.as_deref().map(Document::parse).transpose()?;

    let theme_colors = theme_doc.as_ref().map(scheme_colors).unwrap_or_default();
    let color_map = master_doc.as_ref().map(master_color_map).unwrap_or_default();
    let colors = ColorContext { scheme: &theme_colors, color_map: &color_map };

    let (mut title_font, mut body_font) = theme_doc.as_ref().map(theme_fonts).unwrap_or_default();

    let mut background = Background::None;
    let mut logo = None;
    let mut footer = FooterFlags::default();
    if let (Some(doc), Some(path)) = (&master_doc, &master_path) {
        let media = MediaResolver { package, part_path: path, rels: &master_rels };
        background = extract_background(doc, &colors, &media);
        logo = find_logo(doc, &media, slide_size, config);
        footer = footer_flags(doc);
        title_font.size = style_font_size(doc, "titleStyle");
        body_font.size = style_font_size(doc, "bodyStyle");
    }

    let layouts = list_layouts(package)?;
    info!(
        "extracted styles: {} theme colors, {} layouts, logo={}",
        theme_colors.len(),
        layouts.len(),
        logo.is_some()
    );

    Ok(ExtractedStyles {
        background,
        logo,
        footer,
        theme_colors,
        color_map,
        layouts,
        title_font,
        body_font,
        slide_size,
    })
}

/// Opens raw template bytes and extracts their styles.
pub fn extract_styles_from_bytes(bytes: &[u8], config: &GeneratorConfig) -> Result<ExtractedStyles> {
    extract_styles(&Package::from_bytes(bytes)?, config)
}

fn read_rels(package: &Package, part_path: &str) -> Result<Vec<Relationship>> {
    let rels_path = rels_path_for(part_path);
    if package.contains(&rels_path) {
        parse_relationships(package.read(&rels_path)?)
    } else {
        Ok(Vec::new())
    }
}

fn slide_size(package: &Package) -> Result<(i64, i64)> {
    if !package.contains(PRESENTATION_PATH) {
        return Ok(DEFAULT_SLIDE_SIZE);
    }
    let xml = package.read_text(PRESENTATION_PATH)?;
    let doc = Document::parse(&xml)?;
    let size = doc.descendants().find(|n| n.is_element() && n.tag_name().name() == "sldSz").and_then(|n| {
        let cx = n.attribute("cx")?.parse().ok()?;
        let cy = n.attribute("cy")?.parse().ok()?;
        Some((cx, cy))
    });
    Ok(size.unwrap_or(DEFAULT_SLIDE_SIZE))
}

/// The first slide master: the one the presentation references first, or
/// the lowest-numbered master part.
fn master_path(package: &Package) -> Result<Option<String>> {
    if package.contains(PRESENTATION_RELS_PATH) {
        let rels = parse_relationships(package.read(PRESENTATION_RELS_PATH)?)?;
        if let Some(rel) = rels.iter().find(|r| r.rel_type == SLIDE_MASTER_REL_TYPE) {
            let path = resolve_target(PRESENTATION_PATH, &rel.target);
            if package.contains(&path) {
                return Ok(Some(path));
            }
        }
    }
    Ok(numbered_parts(package, "ppt/slideMasters/slideMaster").into_iter().next())
}

/// Parts named `{prefix}N.xml`, ordered by `N`.
fn numbered_parts(package: &Package, prefix: &str) -> Vec<String> {
    let mut parts: Vec<(u32, &str)> = package
        .part_names()
        .filter_map(|name| {
            let number = name.strip_prefix(prefix)?.strip_suffix(".xml")?.parse::<u32>().ok()?;
            Some((number, name))
        })
        .collect();
    parts.sort_by_key(|(n, _)| *n);
    parts.into_iter().map(|(_, name)| name.to_string()).collect()
}

fn element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.tag_name().name() == name)
}

fn descendant<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants().find(|n| n.is_element() && n.tag_name().name() == name)
}

fn color_element<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && COLOR_ELEMENTS.contains(&n.tag_name().name()))
}

struct ColorContext<'c> {
    scheme: &'c IndexMap<String, String>,
    color_map: &'c IndexMap<String, String>,
}

impl ColorContext<'_> {
    /// Resolves a DrawingML color element, including `lumMod`/`lumOff`.
    fn resolve(&self, node: Node) -> Option<String> {
        let val = node.attribute("val").unwrap_or_default();
        let base = match node.tag_name().name() {
            "srgbClr" => normalize_hex(val),
            "sysClr" => node
                .attribute("lastClr")
                .and_then(normalize_hex)
                .or_else(|| match val {
                    "windowText" => Some("#000000".to_string()),
                    "window" => Some("#FFFFFF".to_string()),
                    _ => None,
                }),
            "prstClr" => preset_color(val).map(str::to_string),
            "schemeClr" => {
                let slot = self.color_map.get(val).map(String::as_str).unwrap_or(val);
                self.scheme.get(slot).cloned()
            }
            _ => None,
        }?;

        let percent = |name: &str| {
            element(node, name)
                .and_then(|n| n.attribute("val"))
                .and_then(|v| v.parse::<f64>().ok())
                .map(|v| v / 1000.0)
        };
        let (lum_mod, lum_off) = (percent("lumMod"), percent("lumOff"));
        if lum_mod.is_none() && lum_off.is_none() {
            return Some(base);
        }
        apply_luminance(&base, lum_mod, lum_off)
    }
}

fn scheme_colors(theme: &Document) -> IndexMap<String, String> {
    let empty = IndexMap::new();
    let plain = ColorContext { scheme: &empty, color_map: &empty };
    let mut colors = IndexMap::new();

    let Some(scheme) = descendant(theme.root_element(), "clrScheme") else {
        return colors;
    };
    for slot in SCHEME_SLOTS {
        if let Some(hex) = element(scheme, slot).and_then(color_element).and_then(|c| plain.resolve(c)) {
            colors.insert(slot.to_string(), hex);
        }
    }
    colors
}

fn master_color_map(master: &Document) -> IndexMap<String, String> {
    descendant(master.root_element(), "clrMap")
        .map(|node| {
            node.attributes()
                .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Theme-default typeface tokens (`+mj-lt`, `+mn-ea`, ...) mean "inherit".
fn typeface(font: Node, script: &str) -> Option<String> {
    let face = element(font, script)?.attribute("typeface")?.trim();
    if face.is_empty() || face.starts_with("+mj") || face.starts_with("+mn") {
        None
    } else {
        Some(face.to_string())
    }
}

fn theme_fonts(theme: &Document) -> (FontSpec, FontSpec) {
    let spec = |name: &str| {
        descendant(theme.root_element(), name)
            .map(|font| FontSpec {
                latin: typeface(font, "latin"),
                east_asian: typeface(font, "ea"),
                size: None,
            })
            .unwrap_or_default()
    };
    (spec("majorFont"), spec("minorFont"))
}

fn style_font_size(master: &Document, style: &str) -> Option<f32> {
    let style = descendant(master.root_element(), style)?;
    let props = element(style, "lvl1pPr").and_then(|l| element(l, "defRPr"))?;
    props.attribute("sz")?.parse::<f32>().ok().map(|sz| sz / 100.0)
}

struct MediaResolver<'p> {
    package: &'p Package,
    part_path: &'p str,
    rels: &'p [Relationship],
}

impl MediaResolver<'_> {
    /// The image behind `r:embed` as a base64 data URI.
    fn data_uri(&self, rel_id: &str) -> Option<String> {
        let rel = self.rels.iter().find(|r| r.id == rel_id && r.rel_type == IMAGE_REL_TYPE)?;
        let path = resolve_target(self.part_path, &rel.target);
        let bytes = self.package.read(&path).ok()?;
        let ext = path.rsplit('.').next().unwrap_or_default();
        Some(format!(
            "data:{};base64,{}",
            content_type_for_extension(ext),
            general_purpose::STANDARD.encode(bytes)
        ))
    }
}

fn embed_id<'a>(blip: Node<'a, '_>) -> Option<&'a str> {
    blip.attribute((RELS_NAMESPACE, "embed"))
}

fn extract_background(master: &Document, colors: &ColorContext, media: &MediaResolver) -> Background {
    let Some(bg) = descendant(master.root_element(), "bg") else {
        return Background::None;
    };

    if let Some(props) = element(bg, "bgPr") {
        if let Some(color) = element(props, "solidFill").and_then(color_element).and_then(|c| colors.resolve(c)) {
            return Background::Solid { color };
        }
        if let Some(grad) = element(props, "gradFill") {
            let stops = element(grad, "gsLst")
                .map(|list| {
                    list.children()
                        .filter(|n| n.is_element() && n.tag_name().name() == "gs")
                        .filter_map(|gs| {
                            let position = gs.attribute("pos")?.parse::<f64>().ok()? / 1000.0;
                            let color = color_element(gs).and_then(|c| colors.resolve(c))?;
                            Some(GradientStop { position, color })
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            let angle = element(grad, "lin")
                .and_then(|lin| lin.attribute("ang"))
                .and_then(|a| a.parse::<f64>().ok())
                .map(|a| a / 60000.0)
                .unwrap_or(0.0);
            if !stops.is_empty() {
                return Background::Gradient { stops, angle };
            }
        }
        if let Some(data_uri) = element(props, "blipFill")
            .and_then(|fill| element(fill, "blip"))
            .and_then(embed_id)
            .and_then(|id| media.data_uri(id))
        {
            return Background::Image { data_uri };
        }
    }

    if let Some(color) = element(bg, "bgRef").and_then(color_element).and_then(|c| colors.resolve(c)) {
        return Background::Solid { color };
    }
    Background::None
}

fn xfrm_of(node: Node) -> Option<((i64, i64), (i64, i64))> {
    let xfrm = descendant(node, "xfrm")?;
    let off = element(xfrm, "off")?;
    let ext = element(xfrm, "ext")?;
    Some((
        (off.attribute("x")?.parse().ok()?, off.attribute("y")?.parse().ok()?),
        (ext.attribute("cx")?.parse().ok()?, ext.attribute("cy")?.parse().ok()?),
    ))
}

/// First small picture of the master whose center lies outside the content
/// area.
fn find_logo(
    master: &Document,
    media: &MediaResolver,
    (slide_w, slide_h): (i64, i64),
    config: &GeneratorConfig,
) -> Option<LogoInfo> {
    let detection = config.logo_detection;
    let max_size = (detection.max_size_inches * EMU_PER_INCH as f64) as i64;
    let margin_x = (slide_w as f64 * detection.content_margin) as i64;
    let margin_y = (slide_h as f64 * detection.content_margin) as i64;

    master
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "pic")
        .find_map(|pic| {
            let ((x, y), (cx, cy)) = xfrm_of(pic)?;
            if cx >= max_size || cy >= max_size {
                return None;
            }
            let (center_x, center_y) = (x + cx / 2, y + cy / 2);
            let in_content = center_x > margin_x
                && center_x < slide_w - margin_x
                && center_y > margin_y
                && center_y < slide_h - margin_y;
            if in_content {
                debug!("picture at ({x}, {y}) is inside the content area");
                return None;
            }

            let data_uri = descendant(pic, "blip").and_then(embed_id).and_then(|id| media.data_uri(id))?;
            let position = match (center_x < slide_w / 2, center_y < slide_h / 2) {
                (true, true) => LogoPosition::TopLeft,
                (false, true) => LogoPosition::TopRight,
                (true, false) => LogoPosition::BottomLeft,
                (false, false) => LogoPosition::BottomRight,
            };
            Some(LogoInfo { data_uri, x, y, width: cx, height: cy, position })
        })
}

fn footer_flags(master: &Document) -> FooterFlags {
    let mut flags = FooterFlags::default();
    for ph in master.descendants().filter(|n| n.is_element() && n.tag_name().name() == "ph") {
        match ph.attribute("type") {
            Some("sldNum") => flags.slide_number = true,
            Some("dt") => flags.date = true,
            Some("ftr") => flags.footer_text = true,
            _ => {}
        }
    }
    flags
}

fn list_layouts(package: &Package) -> Result<Vec<LayoutInfo>> {
    let mut layouts = Vec::new();
    for path in numbered_parts(package, "ppt/slideLayouts/slideLayout") {
        let xml = package.read_text(&path)?;
        let doc = Document::parse(&xml)?;
        let root = doc.root_element();

        let placeholders = root
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "sp")
            .filter_map(|sp| {
                let ph = descendant(sp, "ph")?;
                let (offset, extent) = match xfrm_of(sp) {
                    Some((offset, extent)) => (Some(offset), Some(extent)),
                    None => (None, None),
                };
                Some(PlaceholderGeometry {
                    ph_type: ph.attribute("type").unwrap_or("obj").to_string(),
                    idx: ph.attribute("idx").and_then(|i| i.parse().ok()),
                    offset,
                    extent,
                })
            })
            .collect();

        let id = path
            .rsplit('/')
            .next()
            .and_then(|file| file.strip_suffix(".xml"))
            .unwrap_or(&path)
            .to_string();
        layouts.push(LayoutInfo {
            id,
            name: element(root, "cSld").and_then(|c| c.attribute("name")).unwrap_or_default().to_string(),
            category: LayoutCategory::from_layout_type(root.attribute("type")),
            placeholders,
        });
    }
    Ok(layouts)
}
