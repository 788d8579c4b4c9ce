//! Text-level view of DrawingML markup.
//!
//! Slide XML is split into markup segments and `<a:t>` text segments. Text
//! segments are grouped into paragraphs so that edits can work against the
//! logical text of a paragraph even when PowerPoint has split it into many
//! runs with different formatting. Untouched segments are rendered back
//! byte-for-byte.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static TEXT_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<a:t(?:\s[^>]*)?>").expect("valid text tag pattern"));

const TEXT_CLOSE: &str = "</a:t>";
const PARAGRAPH_CLOSE: &str = "</a:p>";

/// Escapes the characters that may not appear verbatim in XML text content.
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Decodes the five predefined entities and numeric character references.
/// Unknown or malformed entities are kept as they are.
pub fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                None
            }
        }
    }
}

/// Largest char boundary of `s` that is `<= index`.
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[derive(Debug, Clone)]
pub struct TextNode {
    raw: String,
    text: String,
    dirty: bool,
    /// Byte range of the escaped content in the source markup.
    pub source: Range<usize>,
}

impl TextNode {
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Markup(String),
    Text(TextNode),
}

/// A slide (or slide fragment) split into markup and editable text nodes.
#[derive(Debug, Clone)]
pub struct TextDocument {
    segments: Vec<Segment>,
}

impl TextDocument {
    pub fn parse(xml: &str) -> Self {
        Self::parse_fragment(xml, false)
    }

    /// Parses a fragment. With `starts_in_text` the fragment begins inside
    /// the content of an `<a:t>` element, which is the case for the body of
    /// a repetition block cut out between two markers.
    pub fn parse_fragment(xml: &str, starts_in_text: bool) -> Self {
        let mut segments = Vec::new();
        let mut pos = 0;

        if starts_in_text {
            let end = xml.find(TEXT_CLOSE).unwrap_or(xml.len());
            segments.push(Segment::Text(Self::node(xml, 0..end)));
            pos = end;
        }

        while pos < xml.len() {
            let Some(open) = TEXT_OPEN.find_at(xml, pos) else {
                push_markup(&mut segments, &xml[pos..]);
                break;
            };

            push_markup(&mut segments, &xml[pos..open.end()]);
            pos = open.end();
            if open.as_str().ends_with("/>") {
                continue;
            }

            let end = xml[pos..].find(TEXT_CLOSE).map(|i| pos + i).unwrap_or(xml.len());
            segments.push(Segment::Text(Self::node(xml, pos..end)));
            pos = end;
        }

        Self { segments }
    }

    fn node(xml: &str, range: Range<usize>) -> TextNode {
        let raw = xml[range.clone()].to_string();
        TextNode {
            text: unescape_xml(&raw),
            raw,
            dirty: false,
            source: range,
        }
    }

    pub fn node_count(&self) -> usize {
        self.segments.iter().filter(|s| matches!(s, Segment::Text(_))).count()
    }

    /// Text nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &TextNode> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Text(node) => Some(node),
            Segment::Markup(_) => None,
        })
    }

    /// Segment indices of text nodes, grouped by paragraph.
    pub fn paragraphs(&self) -> Vec<Vec<usize>> {
        let mut paragraphs = Vec::new();
        let mut current = Vec::new();

        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Text(_) => current.push(idx),
                Segment::Markup(markup) => {
                    if markup.contains(PARAGRAPH_CLOSE) && !current.is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            paragraphs.push(current);
        }
        paragraphs
    }

    pub fn text(&self, idx: usize) -> &str {
        match &self.segments[idx] {
            Segment::Text(node) => &node.text,
            Segment::Markup(_) => "",
        }
    }

    pub fn set_text(&mut self, idx: usize, text: String) {
        if let Segment::Text(node) = &mut self.segments[idx] {
            if node.text != text {
                node.text = text;
                node.dirty = true;
            }
        }
    }

    pub fn source_range(&self, idx: usize) -> Option<Range<usize>> {
        match &self.segments[idx] {
            Segment::Text(node) => Some(node.source.clone()),
            Segment::Markup(_) => None,
        }
    }

    pub fn paragraph_text(&self, nodes: &[usize]) -> String {
        nodes.iter().map(|&i| self.text(i)).collect()
    }

    /// Logical text of the whole document, one line per paragraph.
    pub fn logical_text(&self) -> String {
        self.paragraphs()
            .iter()
            .map(|p| self.paragraph_text(p))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replaces the byte range `start..end` of a paragraph's logical text.
    ///
    /// The new value lands in the node holding `start`; nodes fully covered by
    /// the range are emptied and the node holding `end` keeps its tail, so
    /// the formatting of surrounding text is untouched.
    pub fn replace_range(&mut self, nodes: &[usize], start: usize, end: usize, value: &str) {
        let mut spans = Vec::with_capacity(nodes.len());
        let mut total = 0;
        for &idx in nodes {
            let len = self.text(idx).len();
            spans.push((idx, total, total + len));
            total += len;
        }
        if spans.is_empty() || start > end || end > total {
            return;
        }

        let first = spans
            .iter()
            .position(|&(_, s, e)| start >= s && start < e)
            .unwrap_or(spans.len() - 1);
        let last = if end == start {
            first
        } else {
            spans
                .iter()
                .position(|&(_, s, e)| end > s && end <= e)
                .unwrap_or(first)
        };

        let (first_idx, first_start, _) = spans[first];
        let head = self.text(first_idx)[..start - first_start].to_string();

        if first == last {
            let tail = self.text(first_idx)[end - first_start..].to_string();
            self.set_text(first_idx, format!("{head}{value}{tail}"));
            return;
        }

        let (last_idx, last_start, _) = spans[last];
        let tail = self.text(last_idx)[end - last_start..].to_string();
        self.set_text(first_idx, format!("{head}{value}"));
        for &(idx, _, _) in &spans[first + 1..last] {
            self.set_text(idx, String::new());
        }
        self.set_text(last_idx, tail);
    }

    /// Moves every match of `pattern` that straddles several runs into the
    /// run where it starts, so the token can be found in the raw markup.
    pub fn consolidate(&mut self, pattern: &Regex) {
        for paragraph in self.paragraphs() {
            let text = self.paragraph_text(&paragraph);
            let matches: Vec<(usize, usize, String)> = pattern
                .find_iter(&text)
                .map(|m| (m.start(), m.end(), m.as_str().to_string()))
                .collect();
            for (start, end, token) in matches.into_iter().rev() {
                self.replace_range(&paragraph, start, end, &token);
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Markup(markup) => out.push_str(markup),
                Segment::Text(node) if node.dirty => out.push_str(&escape_xml(&node.text)),
                Segment::Text(node) => out.push_str(&node.raw),
            }
        }
        out
    }
}

fn push_markup(segments: &mut Vec<Segment>, markup: &str) {
    if markup.is_empty() {
        return;
    }
    if let Some(Segment::Markup(last)) = segments.last_mut() {
        last.push_str(markup);
    } else {
        segments.push(Segment::Markup(markup.to_string()));
    }
}
