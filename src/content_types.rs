use crate::{Error, Result};

/// MIME type registered for a media file extension.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "application/octet-stream",
    }
}

/// Whether `[Content_Types].xml` already declares a default for `ext`.
pub fn has_default(content_types: &str, ext: &str) -> bool {
    let lower = content_types.to_ascii_lowercase();
    lower.contains(&format!("extension=\"{}\"", ext.to_ascii_lowercase()))
}

/// Adds a `<Default Extension>` entry unless the extension is already declared.
pub fn ensure_default(content_types: &str, ext: &str) -> Result<String> {
    if has_default(content_types, ext) {
        return Ok(content_types.to_string());
    }
    let entry = format!(
        r#"<Default Extension="{}" ContentType="{}"/>"#,
        ext,
        content_type_for_extension(ext)
    );
    insert_before_close(content_types, &entry)
}

/// Adds an `<Override PartName>` entry for an absolute part name.
pub fn add_override(content_types: &str, part_path: &str, content_type: &str) -> Result<String> {
    let part_name = format!("/{}", part_path.trim_start_matches('/'));
    if content_types.contains(&format!("PartName=\"{part_name}\"")) {
        return Ok(content_types.to_string());
    }
    let entry = format!(r#"<Override PartName="{part_name}" ContentType="{content_type}"/>"#);
    insert_before_close(content_types, &entry)
}

fn insert_before_close(content_types: &str, entry: &str) -> Result<String> {
    let close = content_types
        .rfind("</Types>")
        .ok_or_else(|| Error::MissingPart("</Types> closing tag".to_string()))?;
    let mut out = String::with_capacity(content_types.len() + entry.len());
    out.push_str(&content_types[..close]);
    out.push_str(entry);
    out.push_str(&content_types[close..]);
    Ok(out)
}
