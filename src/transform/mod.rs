//! HTML post-processing engine.
//!
//! Rewrites one page's rendered markup for deferred loading and reserved
//! layout space. Four passes run in a fixed order, each over a node list
//! collected before it mutates anything:
//!
//! ```text
//! iframe  →  img  →  picture  →  video
//! ```
//!
//! The img pass needs to know whether an image sits inside a `picture`, and
//! the picture pass needs the img pass's resolved dimensions, so the order
//! is load-bearing.
//!
//! ## Lazy-loading convention
//!
//! Resource references move from `src` to `data-src`. A small activation
//! script (see [`crate::assets::ACTIVATION_SCRIPT`]) copies them back after
//! the window `load` event. [`TransformReport::lazy`] tells the page builder
//! whether that script is needed at all.
//!
//! ## Dimension resolution
//!
//! For `img` (and a `picture`'s first `img`):
//!
//! 1. explicit numeric `width` and `height` attributes (`"640"` or `"640px"`)
//! 2. the reference (`src`, or `data-src` once moved) through a
//!    [`DimensionProbe`]: static-root file header, or streamed remote header
//! 3. otherwise unresolved: the image is still lazy, its container unsized
//!
//! Iframes and videos are never probed; only their own attributes size them.

pub mod aspect;
mod iframe;
mod img;
mod video;

pub use iframe::rewrite_video_src;

use crate::dom::{self, Document, DomError, Element};
use crate::imaging::{DimensionProbe, Dimensions};

/// What the engine did to a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Elements whose `src` moved to `data-src`.
    pub lazy: usize,
    /// Aspect containers that reserve space.
    pub sized: usize,
    /// Images whose dimensions could not be determined.
    pub unresolved: usize,
}

/// Parse a `width`/`height` attribute value. Accepts a bare integer or a
/// `px` suffix; zero and anything else is `None`.
pub fn parse_dimension(value: &str) -> Option<u32> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value).trim();
    value.parse::<u32>().ok().filter(|v| *v > 0)
}

/// Both dimensions from the element's own attributes, or nothing.
pub fn explicit_dimensions(el: &Element) -> Option<Dimensions> {
    let width = parse_dimension(el.attr("width")?)?;
    let height = parse_dimension(el.attr("height")?)?;
    Some(Dimensions { width, height })
}

/// Run all passes over a parsed document.
pub async fn transform<P: DimensionProbe>(doc: &mut Document, probe: &P) -> TransformReport {
    let mut report = TransformReport::default();
    iframe::run(doc, &mut report);
    let resolved = img::run_img(doc, probe, &mut report).await;
    img::run_picture(doc, probe, &resolved, &mut report).await;
    video::run(doc, &mut report);
    report
}

/// Parse, transform, and re-serialize an HTML fragment.
pub async fn transform_html<P: DimensionProbe>(
    html: &str,
    probe: &P,
) -> Result<(String, TransformReport), DomError> {
    let mut doc = dom::parse(html)?;
    let report = transform(&mut doc, probe).await;
    Ok((doc.to_html(), report))
}
