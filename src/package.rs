use crate::constants::{CONTENT_TYPES_PATH, MEDIA_DIR, MIN_SLIDE_ID, PRESENTATION_PATH, SLIDES_DIR};
use crate::relationships::max_relationship_id;
use crate::{Error, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// An opened PowerPoint (pptx) package held in memory.
///
/// `Package` maps part paths to their raw bytes and owns the counters that
/// hand out new slide part numbers, slide ids, relationship ids and media
/// indices. The counters are only reachable through the `allocate_*`
/// methods, so two callers can never receive the same id.
#[derive(Debug, Clone)]
pub struct Package {
    parts: HashMap<String, Vec<u8>>,
    order: Vec<String>,
    max_slide_number: u32,
    max_slide_id: u32,
    max_media_index: u32,
    relationship_ids: HashMap<String, u32>,
}

impl Package {
    /// Opens a package from the raw bytes of a `.pptx` file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchive`] when the bytes do not start with the
    /// zip magic or the central directory cannot be read.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 || &bytes[..2] != b"PK" {
            return Err(Error::InvalidArchive("missing zip signature".to_string()));
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::InvalidArchive(e.to_string()))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            parts.push((name, content));
        }

        Self::from_parts(parts)
    }

    /// Builds a package from already decompressed parts, keeping their order.
    pub fn from_parts(parts: Vec<(String, Vec<u8>)>) -> Result<Self> {
        let mut package = Self {
            parts: HashMap::with_capacity(parts.len()),
            order: Vec::with_capacity(parts.len()),
            max_slide_number: 0,
            max_slide_id: MIN_SLIDE_ID - 1,
            max_media_index: 0,
            relationship_ids: HashMap::new(),
        };
        for (name, content) in parts {
            package.write(&name, content);
        }

        package.max_slide_number = package
            .order
            .iter()
            .filter_map(|p| Self::slide_number(p))
            .max()
            .unwrap_or(0);
        package.max_media_index = package
            .order
            .iter()
            .filter_map(|p| media_index(p))
            .max()
            .unwrap_or(0);
        if package.contains(PRESENTATION_PATH) {
            let manifest = package.read_text(PRESENTATION_PATH)?;
            package.max_slide_id = package.max_slide_id.max(max_slide_id(&manifest)?);
        }

        Ok(package)
    }

    pub fn part_count(&self) -> usize {
        self.order.len()
    }

    /// Part paths in archive order; parts added later come last.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.parts.contains_key(path)
    }

    pub fn read(&self, path: &str) -> Result<&[u8]> {
        self.parts
            .get(path)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingPart(path.to_string()))
    }

    /// Reads an XML part as text, dropping a leading byte order mark.
    pub fn read_text(&self, path: &str) -> Result<String> {
        let text = std::str::from_utf8(self.read(path)?)?;
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }

    /// Inserts or replaces a part. New parts are appended to the archive order.
    pub fn write(&mut self, path: &str, content: Vec<u8>) {
        if self.parts.insert(path.to_string(), content).is_none() {
            self.order.push(path.to_string());
        }
        self.relationship_ids.remove(path);
    }

    pub fn write_text(&mut self, path: &str, content: String) {
        self.write(path, content.into_bytes());
    }

    /// Drops a part. Allocated numbers are not handed out again.
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        let removed = self.parts.remove(path)?;
        self.order.retain(|p| p != path);
        Some(removed)
    }

    /// Slide part paths ordered by their numeric suffix (`slide2` before
    /// `slide10`), independent of the order stored in the archive.
    pub fn slide_paths(&self) -> Vec<String> {
        let mut slides: Vec<(u32, &String)> = self
            .order
            .iter()
            .filter_map(|p| Self::slide_number(p).map(|n| (n, p)))
            .collect();
        slides.sort_by_key(|(n, _)| *n);
        slides.into_iter().map(|(_, p)| p.clone()).collect()
    }

    /// Extracts `N` from `ppt/slides/slideN.xml`.
    pub fn slide_number(path: &str) -> Option<u32> {
        path.strip_prefix(SLIDES_DIR)
            .and_then(|file| file.strip_prefix("slide"))
            .and_then(|s| s.strip_suffix(".xml"))
            .and_then(|num_str| num_str.parse::<u32>().ok())
    }

    pub fn allocate_slide_number(&mut self) -> u32 {
        self.max_slide_number += 1;
        self.max_slide_number
    }

    /// Next id for `p:sldIdLst`, always above every id already in the manifest.
    pub fn allocate_slide_id(&mut self) -> u32 {
        self.max_slide_id += 1;
        self.max_slide_id
    }

    /// Next free `rIdN` inside the given relationships part.
    pub fn allocate_relationship_id(&mut self, rels_path: &str) -> String {
        let current = match self.relationship_ids.get(rels_path) {
            Some(n) => *n,
            None => self
                .read_text(rels_path)
                .map(|xml| max_relationship_id(&xml))
                .unwrap_or(0),
        };
        let next = current + 1;
        self.relationship_ids.insert(rels_path.to_string(), next);
        format!("rId{next}")
    }

    pub fn allocate_media_index(&mut self) -> u32 {
        self.max_media_index += 1;
        self.max_media_index
    }

    /// Compresses every part into a new `.pptx` buffer.
    ///
    /// No XML validation happens here: malformed part content is written as is.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let content_types_first = self
            .order
            .iter()
            .filter(|p| p.as_str() == CONTENT_TYPES_PATH)
            .chain(self.order.iter().filter(|p| p.as_str() != CONTENT_TYPES_PATH));

        for name in content_types_first {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(&self.parts[name])?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

fn media_index(path: &str) -> Option<u32> {
    let file = path.strip_prefix(MEDIA_DIR)?;
    let stem = file.split('.').next()?;
    let digits = stem.trim_start_matches(|c: char| !c.is_ascii_digit());
    digits.parse::<u32>().ok()
}

fn max_slide_id(manifest: &str) -> Result<u32> {
    let doc = roxmltree::Document::parse(manifest)?;
    Ok(doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "sldId")
        .filter_map(|n| n.attribute("id"))
        .filter_map(|id| id.parse::<u32>().ok())
        .max()
        .unwrap_or(0))
}
