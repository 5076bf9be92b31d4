//! Local image references, read from the static root.

use super::probe::Dimensions;
use std::path::{Component, Path, PathBuf};

/// Map a site-relative reference (`/images/a.png?v=1#x`) to a file under
/// `static_root`.
///
/// Query and fragment are stripped. Returns `None` for empty references or
/// ones that try to climb out of the root with `..`.
pub fn resolve(static_root: &Path, src: &str) -> Option<PathBuf> {
    let path = src.split(['?', '#']).next().unwrap_or("");
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }

    let relative = Path::new(path);
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return None;
    }
    Some(static_root.join(relative))
}

/// Read pixel dimensions from the image header. Unreadable or missing files
/// are `None`.
pub fn dimensions(path: &Path) -> Option<Dimensions> {
    let (width, height) = image::image_dimensions(path).ok()?;
    Some(Dimensions { width, height })
}
