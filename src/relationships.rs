use crate::xml_text::escape_xml;
use crate::{Error, Result};
use roxmltree::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// Parses relationship (`.rels`) XML data into its entries.
///
/// # Errors
///
/// An error is returned if the data is not valid UTF-8 or not well-formed XML.
pub fn parse_relationships(xml_data: &[u8]) -> Result<Vec<Relationship>> {
    let xml_str = std::str::from_utf8(xml_data)?;
    let doc = Document::parse(xml_str)?;
    let root = doc.root_element();

    let mut relationships = Vec::new();
    for rel in root.children().filter(|n| n.is_element() && n.tag_name().name() == "Relationship") {
        if let (Some(id), Some(rel_type), Some(target)) =
            (rel.attribute("Id"), rel.attribute("Type"), rel.attribute("Target"))
        {
            relationships.push(Relationship {
                id: id.to_string(),
                rel_type: rel_type.to_string(),
                target: target.to_string(),
                external: rel.attribute("TargetMode") == Some("External"),
            });
        }
    }

    Ok(relationships)
}

/// Highest numeric suffix among `rIdN` ids in the given markup.
pub fn max_relationship_id(xml: &str) -> u32 {
    let mut max = 0;
    let mut rest = xml;
    while let Some(pos) = rest.find("Id=\"rId") {
        rest = &rest[pos + 7..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse::<u32>() {
            max = max.max(n);
        }
    }
    max
}

/// Appends a relationship entry before the closing `</Relationships>` tag.
pub fn append_relationship(rels_xml: &str, id: &str, rel_type: &str, target: &str) -> Result<String> {
    let close = rels_xml
        .rfind("</Relationships>")
        .ok_or_else(|| Error::MissingPart("</Relationships> closing tag".to_string()))?;

    let entry = format!(
        r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
        id,
        rel_type,
        escape_xml(target)
    );
    let mut out = String::with_capacity(rels_xml.len() + entry.len());
    out.push_str(&rels_xml[..close]);
    out.push_str(&entry);
    out.push_str(&rels_xml[close..]);
    Ok(out)
}

/// Removes every relationship of the given type.
pub fn remove_relationships_of_type(rels_xml: &str, rel_type: &str) -> String {
    let needle = format!("Type=\"{rel_type}\"");
    let mut out = String::with_capacity(rels_xml.len());
    let mut rest = rels_xml;
    while let Some(start) = rest.find("<Relationship ") {
        let Some(len) = rest[start..].find("/>").map(|e| e + 2) else {
            break;
        };
        out.push_str(&rest[..start]);
        let entry = &rest[start..start + len];
        if !entry.contains(&needle) {
            out.push_str(entry);
        }
        rest = &rest[start + len..];
    }
    out.push_str(rest);
    out
}

/// An empty relationships part.
pub fn empty_relationships() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}"></Relationships>"#,
        crate::constants::PACKAGE_RELS_NAMESPACE
    )
}

/// Constructs the path to the relationships file for a given part.
///
/// ```text
/// ppt/slides/slide1.xml -> ppt/slides/_rels/slide1.xml.rels
/// ```
pub fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Resolves a relationship target relative to the part that owns it.
pub fn resolve_target(part_path: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut components: Vec<&str> = part_path.split('/').collect();
    components.pop();
    for piece in target.split('/') {
        match piece {
            ".." => {
                components.pop();
            }
            "." | "" => {}
            other => components.push(other),
        }
    }
    components.join("/")
}
