//! Rendering collaborators: front matter, template binding, markdown.
//!
//! Content files, layouts, and wrapper templates share one shape: an
//! optional TOML front matter block fenced by `+++` lines, followed by a
//! body that is a tera template.
//!
//! ```text
//! +++
//! title = "About"
//! layout = "article"
//! [styles]
//! sync = ["/styles/about.css"]
//! +++
//! # {{ page.title }}
//! ```
//!
//! Templates render with `Tera::one_off` (no autoescaping: bodies are HTML).
//! Markdown goes through `pulldown-cmark` with tables, footnotes,
//! strikethrough, and task lists enabled.

use crate::assets::{AssetDecl, PageAssets};
use crate::page::PageError;
use pulldown_cmark::{Options, Parser, html as md_html};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const FENCE: &str = "+++";

/// Metadata block at the top of a page, layout, or template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Wrapper template name (pages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Layout to splice this file's output into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    /// Navigation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub styles: AssetDecl,
    pub scripts: AssetDecl,
    /// Any other keys, available to templates as `page.<key>`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl FrontMatter {
    /// This file's assets with inline paths resolved against `dir`.
    pub fn assets(&self, dir: &Path) -> PageAssets {
        let mut assets = PageAssets {
            styles: self.styles.clone(),
            scripts: self.scripts.clone(),
        };
        assets.resolve_inline(dir);
        assets
    }
}

/// Split `+++` front matter from a body.
///
/// Without an opening fence the whole input is the body. An opening fence
/// without a closing one is an error.
pub fn split_front_matter(source: &str) -> Result<(FrontMatter, &str), PageError> {
    let Some(rest) = strip_fence_line(source) else {
        return Ok((FrontMatter::default(), source));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == FENCE {
            let meta = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let front: FrontMatter = toml::from_str(meta)
                .map_err(|e| PageError::FrontMatter(e.to_string()))?;
            return Ok((front, body));
        }
        offset += line.len();
    }
    Err(PageError::FrontMatter(
        "front matter opened with +++ but never closed".to_string(),
    ))
}

fn strip_fence_line(source: &str) -> Option<&str> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let (first, rest) = match source.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (source, ""),
    };
    (first.trim_end_matches('\r') == FENCE).then_some(rest)
}

/// Render a template body against a context.
///
/// The error message carries the full tera error chain; tera's top-level
/// message alone rarely says what went wrong.
pub fn render_template(source: &str, context: &tera::Context) -> Result<String, PageError> {
    tera::Tera::one_off(source, context, false).map_err(|err| {
        let mut message = err.to_string();
        let mut cause = std::error::Error::source(&err);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        PageError::Render(message)
    })
}

/// Markdown → HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}
