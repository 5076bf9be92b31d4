//! Shared test utilities for the lazysite test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let context = site_context(tmp.path());
//! let input = context.config.site.content_path.join("index.md");
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::SiteConfig;
use crate::nav::Navigation;
use crate::site;
use crate::theme::Theme;
use crate::types::{BuildConfig, BuildContext};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// The fixture site's build context, loaded the way `build` loads it.
pub fn site_context(root: &Path) -> BuildContext {
    site::prepare(root).unwrap_or_else(|e| panic!("fixture site failed to load: {e}"))
}

/// A context that touches nothing on disk, for pool and protocol tests.
pub fn dummy_context() -> BuildContext {
    BuildContext {
        config: BuildConfig {
            site: SiteConfig::default(),
            theme: Theme {
                root: PathBuf::from("theme"),
                default_template: "default".to_string(),
                elements: BTreeMap::new(),
            },
        },
        navigation: Navigation::default(),
    }
}

// =========================================================================
// Images
// =========================================================================

/// Write a blank `width`×`height` PNG, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    image::RgbImage::new(width, height).save(path).unwrap();
}
