//! Theme loading.
//!
//! A theme is a directory:
//!
//! ```text
//! theme/
//! ├── theme.toml            # manifest (optional, defaults below)
//! ├── templates/
//! │   └── default.html      # wrapper templates, selected by front matter `template`
//! ├── layouts/
//! │   └── article.html      # optional layout chain, selected by `layout`
//! └── elements/
//!     └── h1/inline.css     # files referenced by element assets
//! ```
//!
//! ```toml
//! default_template = "default"
//!
//! # Token assets: loaded on any page whose composed markup contains <h1>.
//! [elements.h1.styles]
//! inline = ["elements/h1/inline.css"]
//! sync = ["/styles/h1.css"]
//! async = ["/styles/h1-late.css"]
//! ```
//!
//! Inline paths in the manifest are resolved against the theme root.

use crate::assets::PageAssets;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILE: &str = "theme.toml";

#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("Unable to access theme {}: {source}", path.display())]
    Access {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid theme manifest: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Manifest {
    default_template: String,
    elements: BTreeMap<String, PageAssets>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            default_template: "default".to_string(),
            elements: BTreeMap::new(),
        }
    }
}

/// A loaded theme, ready to ship to workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub root: PathBuf,
    pub default_template: String,
    /// Token assets keyed by lowercase tag name.
    pub elements: BTreeMap<String, PageAssets>,
}

impl Theme {
    /// Load a theme directory. The directory must exist; `theme.toml` is
    /// optional.
    pub fn load(root: &Path) -> Result<Self, ThemeError> {
        fs::metadata(root).map_err(|source| ThemeError::Access {
            path: root.to_path_buf(),
            source,
        })?;

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let content =
                fs::read_to_string(&manifest_path).map_err(|source| ThemeError::Access {
                    path: manifest_path.clone(),
                    source,
                })?;
            toml::from_str::<Manifest>(&content)?
        } else {
            Manifest::default()
        };
        validate_name("template", &manifest.default_template)?;

        let elements = manifest
            .elements
            .into_iter()
            .map(|(tag, mut assets)| {
                assets.resolve_inline(root);
                (tag.to_ascii_lowercase(), assets)
            })
            .collect();

        Ok(Self {
            root: root.to_path_buf(),
            default_template: manifest.default_template,
            elements,
        })
    }

    /// Wrapper template file for `name` (or the default template).
    pub fn template_path(&self, name: Option<&str>) -> Result<PathBuf, ThemeError> {
        let name = name.unwrap_or(&self.default_template);
        validate_name("template", name)?;
        Ok(self.root.join("templates").join(format!("{name}.html")))
    }

    /// Layout file for `name`.
    pub fn layout_path(&self, name: &str) -> Result<PathBuf, ThemeError> {
        validate_name("layout", name)?;
        Ok(self.root.join("layouts").join(format!("{name}.html")))
    }
}

/// Template and layout names are relative paths inside the theme, without
/// extension, and may not climb out of it.
fn validate_name(kind: &'static str, name: &str) -> Result<(), ThemeError> {
    let invalid = name.trim().is_empty()
        || name.contains('\\')
        || Path::new(name)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if invalid {
        return Err(ThemeError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}
