//! HTML → [`Document`] via the `tl` parser.

use super::{Document, Element, NodeId, NodeKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("HTML parse error: {0}")]
    Parse(String),
}

/// Elements whose content is text, never markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Stands in for a raw-text body while `tl` parses the rest.
const RAW_MARKER: &str = "lazysite-raw-";

/// Parse an HTML document or fragment into an arena tree.
///
/// Text is kept verbatim (entities are not decoded) so serialization
/// reproduces it byte for byte. Whitespace-only text nodes are kept too.
/// The bodies of `script`, `style`, `textarea` and `title` become a single
/// text node each, exactly as written.
pub fn parse(html: &str) -> Result<Document, DomError> {
    let (stashed, bodies) = stash_raw_text(html);
    let vdom = tl::parse(&stashed, tl::ParserOptions::default())
        .map_err(|e| DomError::Parse(e.to_string()))?;
    let parser = vdom.parser();

    let mut doc = Document::new();
    let root = doc.root();
    for handle in vdom.children() {
        import(&mut doc, root, *handle, parser, &bodies);
    }
    Ok(doc)
}

fn import(
    doc: &mut Document,
    parent: NodeId,
    handle: tl::NodeHandle,
    parser: &tl::Parser,
    bodies: &[String],
) {
    let Some(node) = handle.get(parser) else {
        return;
    };

    match node {
        tl::Node::Tag(tag) => {
            let mut element = Element::new(&tag.name().as_utf8_str());
            element.attrs = attributes(tag, &element.name);
            let raw_text = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
            let id = doc.create_element(element);
            doc.append_child(parent, id);

            if raw_text && let Some(body) = stashed_body(tag, parser, bodies) {
                if !body.is_empty() {
                    let text = doc.create_text(body);
                    doc.append_child(id, text);
                }
                return;
            }
            for child in tag.children().top().iter() {
                import(doc, id, *child, parser, bodies);
            }
        }
        tl::Node::Raw(bytes) => {
            let text = bytes.as_utf8_str();
            if !text.is_empty() {
                let id = doc.create_text(text.to_string());
                doc.append_child(parent, id);
            }
        }
        tl::Node::Comment(bytes) => {
            let raw = bytes.as_utf8_str();
            let inner = raw
                .strip_prefix("<!--")
                .and_then(|s| s.strip_suffix("-->"))
                .unwrap_or(&raw);
            let id = doc.create_comment(inner.to_string());
            doc.append_child(parent, id);
        }
    }
}

/// The original body of a raw-text element, looked up by its marker.
fn stashed_body(tag: &tl::HTMLTag, parser: &tl::Parser, bodies: &[String]) -> Option<String> {
    let marker: String = tag
        .children()
        .top()
        .iter()
        .filter_map(|child| match child.get(parser) {
            Some(tl::Node::Raw(bytes)) => Some(bytes.as_utf8_str().into_owned()),
            _ => None,
        })
        .collect();
    let index: usize = marker.trim().strip_prefix(RAW_MARKER)?.parse().ok()?;
    bodies.get(index).cloned()
}

// ============================================================================
// Raw-text bodies
// ============================================================================

/// Cut the body of every raw-text element out of `html`, leaving a numbered
/// marker in its place. Comments are skipped. An element with no closing
/// tag is left alone.
fn stash_raw_text(html: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(html.len());
    let mut bodies = Vec::new();
    let mut copied = 0;
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;
        let rest = &html[start..];
        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(html.len(), |end| start + end + 3);
            continue;
        }
        let Some(name) = raw_text_name(&rest[1..]) else {
            pos = start + 1;
            continue;
        };
        let Some(open_end) = open_tag_end(html, start + 1 + name.len()) else {
            break;
        };
        let body_start = open_end + 1;
        let Some(body_len) = closing_tag(&html[body_start..], name) else {
            pos = body_start;
            continue;
        };
        let body_end = body_start + body_len;

        out.push_str(&html[copied..body_start]);
        out.push_str(RAW_MARKER);
        out.push_str(&bodies.len().to_string());
        bodies.push(html[body_start..body_end].to_string());
        copied = body_end;
        pos = body_end;
    }
    out.push_str(&html[copied..]);
    (out, bodies)
}

/// The raw-text element name `s` opens with, if any (`s` follows the `<`).
fn raw_text_name(s: &str) -> Option<&'static str> {
    RAW_TEXT_ELEMENTS.iter().copied().find(|name| {
        s.get(..name.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(name))
            && s.as_bytes()
                .get(name.len())
                .is_some_and(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/')
    })
}

/// Index of the `>` closing the open tag, skipping quoted attribute values.
fn open_tag_end(html: &str, from: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut quote: Option<u8> = None;
    let mut after_eq = false;
    for (i, b) in bytes.iter().enumerate().skip(from) {
        match (quote, *b) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') if after_eq => quote = Some(*b),
            (None, b'>') => return Some(i),
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            after_eq = *b == b'=';
        }
    }
    None
}

/// Offset of `</name` (followed by whitespace, `>` or `/`) in `body`.
fn closing_tag(body: &str, name: &str) -> Option<usize> {
    let mut pos = 0;
    while let Some(offset) = body[pos..].find("</") {
        let at = pos + offset;
        if raw_text_name(&body[at + 2..]) == Some(name) {
            return Some(at);
        }
        pos = at + 2;
    }
    None
}

// ============================================================================
// Attributes
// ============================================================================

/// Attributes in source order, read from the tag's own source text.
///
/// Falls back to `tl`'s attribute map, sorted by name, when the source text
/// can't be matched to the tag.
fn attributes(tag: &tl::HTMLTag, name: &str) -> Vec<(String, Option<String>)> {
    let raw = tag.raw().as_utf8_str();
    if let Some(attrs) = source_attributes(&raw, name) {
        return attrs;
    }
    let mut attrs: Vec<(String, Option<String>)> = tag
        .attributes()
        .iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), value.map(|v| v.to_string())))
        .collect();
    attrs.sort_by(|a, b| a.0.cmp(&b.0));
    attrs
}

fn is_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/' || b == b'='
}

/// Tokenize the attributes of the open tag at the start of `raw`. Names are
/// lowercased, values kept as written; a repeated name keeps its first value.
fn source_attributes(raw: &str, name: &str) -> Option<Vec<(String, Option<String>)>> {
    let raw = raw.strip_prefix('<').unwrap_or(raw);
    let head = raw.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }

    let bytes = raw.as_bytes();
    let len = bytes.len();
    let mut i = name.len();
    let mut attrs: Vec<(String, Option<String>)> = Vec::new();
    loop {
        while i < len && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= len || bytes[i] == b'>' {
            break;
        }

        let key_start = i;
        while i < len && !is_name_end(bytes[i]) {
            i += 1;
        }
        let key = raw[key_start..i].to_ascii_lowercase();
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = if i < len && bytes[i] == b'=' {
            i += 1;
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&q @ (b'"' | b'\'')) => {
                    let start = i + 1;
                    let end = raw[start..].find(q as char).map_or(len, |e| start + e);
                    i = (end + 1).min(len);
                    Some(raw[start..end].to_string())
                }
                _ => {
                    let start = i;
                    while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    Some(raw[start..i].to_string())
                }
            }
        } else {
            None
        };

        if !key.is_empty() && !attrs.iter().any(|(k, _)| *k == key) {
            attrs.push((key, value));
        }
    }
    Some(attrs)
}

impl Document {
    /// Text content of the node's subtree, concatenated in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|d| match self.kind(d) {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}
