//! Aspect-ratio containers.
//!
//! ```text
//! div.lazysite-aspect[.lazysite-aspect--sized]   style="max-width: {w}px;"
//! └── div.lazysite-aspect__inner                 style="padding-bottom: {h/w*100}%;"
//!     └── <the element>
//! ```
//!
//! Without known dimensions both wrappers are emitted bare and no space is
//! reserved.

use crate::dom::{Document, Element, NodeId};
use crate::imaging::Dimensions;

pub const CONTAINER_CLASS: &str = "lazysite-aspect";
pub const SIZED_CLASS: &str = "lazysite-aspect--sized";
pub const INNER_CLASS: &str = "lazysite-aspect__inner";
pub const WIDESCREEN_CLASS: &str = "lazysite-aspect--16x9";

/// `(height / width) * 100`, the inner wrapper's bottom padding.
pub fn padding_percent(dims: Dimensions) -> f64 {
    dims.height as f64 / dims.width as f64 * 100.0
}

/// Replace `target` with an aspect container that holds it.
///
/// Returns the outer wrapper's id.
pub fn wrap(
    doc: &mut Document,
    target: NodeId,
    dims: Option<Dimensions>,
    extra_classes: &[&str],
) -> NodeId {
    let mut outer = Element::new("div");
    outer.add_class(CONTAINER_CLASS);
    for class in extra_classes {
        outer.add_class(class);
    }
    let mut inner = Element::new("div");
    inner.add_class(INNER_CLASS);

    if let Some(dims) = dims.filter(|d| d.width > 0) {
        outer.add_class(SIZED_CLASS);
        outer.set_attr("style", format!("max-width: {}px;", dims.width));
        inner.set_attr(
            "style",
            format!("padding-bottom: {}%;", padding_percent(dims)),
        );
    }

    let outer = doc.create_element(outer);
    let inner = doc.create_element(inner);
    doc.append_child(outer, inner);
    doc.wrap(target, outer, inner);
    outer
}
