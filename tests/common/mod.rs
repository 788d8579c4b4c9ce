#![allow(dead_code)]

use image::{ImageOutputFormat, RgbImage};
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use vision_deck::{Error, Fetched, Fetcher, Result};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub fn load_xml(filename: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("test_data");
    path.push("xml");
    path.push(filename);
    fs::read_to_string(path).expect("Unable to read test data file")
}

/// A text shape holding one run per paragraph.
pub fn text_shape(id: u32, paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|text| format!(r#"<a:p><a:r><a:rPr lang="zh-CN" sz="1800"/><a:t>{text}</a:t></a:r></a:p>"#))
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="914400" y="914400"/><a:ext cx="3657600" cy="1828800"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/>{body}</p:txBody></p:sp>"#
    )
}

pub fn slide_xml(shapes: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        shapes.concat()
    )
}

/// A slide with a single text shape.
pub fn simple_slide(paragraphs: &[&str]) -> String {
    slide_xml(&[text_shape(2, paragraphs)])
}

/// Builds a complete `.pptx` around the given slide documents.
///
/// Slide parts are written to the archive in reverse order so readers
/// cannot rely on archive order.
pub fn build_deck(slides: &[String]) -> Vec<u8> {
    let mut parts: Vec<(String, String)> = Vec::new();

    let overrides: String = (1..=slides.len())
        .map(|n| format!(r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#))
        .collect();
    parts.push((
        "[Content_Types].xml".into(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>{overrides}</Types>"#
        ),
    ));
    parts.push((
        "_rels/.rels".into(),
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{RELS_NS}"><Relationship Id="rId1" Type="{REL}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#),
    ));

    let slide_ids: String = (0..slides.len())
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2))
        .collect();
    parts.push((
        "ppt/presentation.xml".into(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
        ),
    ));
    let slide_rels: String = (1..=slides.len())
        .map(|n| format!(r#"<Relationship Id="rId{}" Type="{REL}/slide" Target="slides/slide{n}.xml"/>"#, n + 1))
        .collect();
    parts.push((
        "ppt/_rels/presentation.xml.rels".into(),
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{RELS_NS}"><Relationship Id="rId1" Type="{REL}/slideMaster" Target="slideMasters/slideMaster1.xml"/>{slide_rels}</Relationships>"#),
    ));

    parts.push(("ppt/slideMasters/slideMaster1.xml".into(), load_xml("slide_master.xml")));
    parts.push((
        "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{RELS_NS}"><Relationship Id="rId1" Type="{REL}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{REL}/theme" Target="../theme/theme1.xml"/><Relationship Id="rId3" Type="{REL}/image" Target="../media/image1.png"/></Relationships>"#),
    ));
    parts.push(("ppt/slideLayouts/slideLayout1.xml".into(), load_xml("slide_layout_title.xml")));
    parts.push((
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{RELS_NS}"><Relationship Id="rId1" Type="{REL}/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#),
    ));
    parts.push(("ppt/theme/theme1.xml".into(), load_xml("theme.xml")));

    for (i, slide) in slides.iter().enumerate().rev() {
        let n = i + 1;
        parts.push((format!("ppt/slides/slide{n}.xml"), slide.clone()));
        parts.push((
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{RELS_NS}"><Relationship Id="rId1" Type="{REL}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#),
        ));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.start_file("ppt/media/image1.png", options).unwrap();
    writer.write_all(&png(4, 4)).unwrap();
    writer.finish().unwrap().into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height).write_to(&mut out, ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut out, ImageOutputFormat::Jpeg(80))
        .unwrap();
    out.into_inner()
}

/// Serves canned responses; unknown URLs fail like a 404.
#[derive(Default)]
pub struct StubFetcher {
    responses: HashMap<String, Fetched>,
}

impl StubFetcher {
    pub fn with(mut self, url: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        self.responses.insert(
            url.to_string(),
            Fetched { bytes, content_type: content_type.map(str::to_string) },
        );
        self
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched> {
        self.responses.get(url).cloned().ok_or_else(|| Error::Download {
            url: url.to_string(),
            reason: "HTTP status 404 Not Found".to_string(),
        })
    }
}
