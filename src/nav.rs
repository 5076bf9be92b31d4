//! Navigation tree.
//!
//! Described by a TOML file (default `content/navigation.toml`), with page
//! paths relative to that file:
//!
//! ```toml
//! [[pages]]
//! path = "index.md"
//!
//! [[pages]]
//! path = "guides/index.md"
//!
//!   [[pages.subnav]]
//!   path = "guides/setup.md"
//!
//!   [[pages.subnav]]
//!   path = "guides/drafts.md"
//!   hidden = true
//! ```
//!
//! Each node takes its `title` and `id` from the page's front matter. URLs
//! mirror the build output: `guides/setup.md` → `/guides/setup.html`, and
//! `guides/index.md` → `/guides/`.
//!
//! Hidden nodes are left out of `pages` and `children` but still indexed in
//! `ids`, so templates can link to them by id.

use crate::render::split_front_matter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("Unable to read {}: {source}", path.display())]
    Access {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid navigation file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid front matter in {}: {message}", path.display())]
    FrontMatter { path: PathBuf, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NavFile {
    #[serde(default)]
    pages: Vec<NavEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NavEntry {
    path: String,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    subnav: Vec<NavEntry>,
}

/// One page in the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavNode {
    pub title: Option<String>,
    pub url: String,
    /// Content-root-relative source path.
    pub path: PathBuf,
    pub hidden: bool,
    pub id: Option<String>,
    pub children: Vec<NavNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    /// Visible top-level nodes, in file order.
    pub pages: Vec<NavNode>,
    /// Every node with an `id`, hidden or not.
    pub ids: BTreeMap<String, NavNode>,
}

/// Site URL for a content-relative path.
pub fn page_url(relative: &Path, markdown_extension: &str) -> String {
    let rel = relative.to_string_lossy().replace('\\', "/");
    let index = format!("index.{markdown_extension}");
    if rel == index {
        return "/".to_string();
    }
    if let Some(dir) = rel.strip_suffix(&format!("/{index}")) {
        return format!("/{dir}/");
    }
    let suffix = format!(".{markdown_extension}");
    match rel.strip_suffix(&suffix) {
        Some(stem) => format!("/{stem}.html"),
        None => format!("/{rel}"),
    }
}

/// Load the navigation tree. A missing file is an empty navigation.
pub fn load(
    nav_file: &Path,
    content_root: &Path,
    markdown_extension: &str,
) -> Result<Navigation, NavError> {
    if !nav_file.exists() {
        tracing::warn!(
            path = %nav_file.display(),
            "navigation file not found, building without navigation"
        );
        return Ok(Navigation::default());
    }

    let content = fs::read_to_string(nav_file).map_err(|source| NavError::Access {
        path: nav_file.to_path_buf(),
        source,
    })?;
    let file: NavFile = toml::from_str(&content)?;
    let base = nav_file.parent().unwrap_or(Path::new("."));

    let builder = Builder {
        base,
        content_root,
        markdown_extension,
    };
    let mut ids = BTreeMap::new();
    let mut pages = Vec::new();
    for entry in &file.pages {
        let node = builder.node(entry, &mut ids)?;
        if !node.hidden {
            pages.push(node);
        }
    }
    Ok(Navigation { pages, ids })
}

struct Builder<'a> {
    base: &'a Path,
    content_root: &'a Path,
    markdown_extension: &'a str,
}

impl Builder<'_> {
    fn node(
        &self,
        entry: &NavEntry,
        ids: &mut BTreeMap<String, NavNode>,
    ) -> Result<NavNode, NavError> {
        let file = self.base.join(&entry.path);
        let source = fs::read_to_string(&file).map_err(|source| NavError::Access {
            path: file.clone(),
            source,
        })?;
        let (front, _) = split_front_matter(&source).map_err(|e| NavError::FrontMatter {
            path: file.clone(),
            message: e.to_string(),
        })?;

        let relative = file
            .strip_prefix(self.content_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(&entry.path));

        let mut children = Vec::new();
        for child in &entry.subnav {
            let child = self.node(child, ids)?;
            if !child.hidden {
                children.push(child);
            }
        }

        let node = NavNode {
            title: front.title,
            url: page_url(&relative, self.markdown_extension),
            path: relative,
            hidden: entry.hidden,
            id: front.id,
            children,
        };
        if let Some(id) = &node.id {
            ids.insert(id.clone(), node.clone());
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn page_url_mirrors_output_paths() {
        assert_eq!(page_url(Path::new("index.md"), "md"), "/");
        assert_eq!(page_url(Path::new("guides/index.md"), "md"), "/guides/");
        assert_eq!(page_url(Path::new("guides/setup.md"), "md"), "/guides/setup.html");
        assert_eq!(page_url(Path::new("notes.txt"), "md"), "/notes.txt");
        assert_eq!(page_url(Path::new("reindex.md"), "md"), "/reindex.html");
    }

    #[test]
    fn missing_file_is_empty_navigation() {
        let tmp = TempDir::new().unwrap();
        let nav = load(&tmp.path().join("navigation.toml"), tmp.path(), "md").unwrap();
        assert_eq!(nav, Navigation::default());
    }

    #[test]
    fn builds_tree_with_hidden_nodes_indexed() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "index.md", "+++\ntitle = \"Home\"\nid = \"home\"\n+++\n");
        write(root, "guides/index.md", "+++\ntitle = \"Guides\"\n+++\n");
        write(root, "guides/setup.md", "+++\ntitle = \"Setup\"\nid = \"setup\"\n+++\n");
        write(root, "guides/draft.md", "+++\ntitle = \"Draft\"\nid = \"draft\"\n+++\n");
        write(
            root,
            "navigation.toml",
            r#"
[[pages]]
path = "index.md"

[[pages]]
path = "guides/index.md"

  [[pages.subnav]]
  path = "guides/setup.md"

  [[pages.subnav]]
  path = "guides/draft.md"
  hidden = true
"#,
        );

        let nav = load(&root.join("navigation.toml"), root, "md").unwrap();

        let titles: Vec<_> = nav.pages.iter().map(|n| n.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("Home"), Some("Guides")]);
        assert_eq!(nav.pages[0].url, "/");
        assert_eq!(nav.pages[1].url, "/guides/");
        assert_eq!(nav.pages[1].children.len(), 1);
        assert_eq!(nav.pages[1].children[0].url, "/guides/setup.html");

        let draft = &nav.ids["draft"];
        assert!(draft.hidden);
        assert_eq!(draft.url, "/guides/draft.html");
        assert!(nav.ids.contains_key("home"));
        assert!(nav.ids.contains_key("setup"));
    }

    #[test]
    fn listed_page_must_exist() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "navigation.toml", "[[pages]]\npath = \"gone.md\"\n");
        let result = load(&tmp.path().join("navigation.toml"), tmp.path(), "md");
        assert!(matches!(result, Err(NavError::Access { .. })));
    }

    #[test]
    fn unknown_keys_rejected() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "navigation.toml", "[[pages]]\nhref = \"x.md\"\n");
        let result = load(&tmp.path().join("navigation.toml"), tmp.path(), "md");
        assert!(matches!(result, Err(NavError::Toml(_))));
    }
}
