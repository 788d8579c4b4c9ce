pub const RELS_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PACKAGE_RELS_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub const IMAGE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const SLIDE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const SLIDE_LAYOUT_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub const SLIDE_MASTER_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
pub const THEME_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
pub const NOTES_SLIDE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";

pub const SLIDE_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
pub const PPTX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
pub const PRESENTATION_PATH: &str = "ppt/presentation.xml";
pub const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";
pub const SLIDES_DIR: &str = "ppt/slides/";
pub const MEDIA_DIR: &str = "ppt/media/";

pub const EMU_PER_INCH: i64 = 914_400;

/// Default slide size (16:9) used when `p:sldSz` is missing.
pub const DEFAULT_SLIDE_SIZE: (i64, i64) = (12_192_000, 6_858_000);

/// Lowest id PowerPoint accepts inside `p:sldIdLst`.
pub const MIN_SLIDE_ID: u32 = 256;
