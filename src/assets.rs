//! Asset aggregation: deduplicated styles and scripts for one page.
//!
//! Every page collects assets from four sources, merged in a fixed order:
//!
//! | # | Source | Declared in |
//! |---|--------|-------------|
//! | 1 | Wrapper template | `+++` front matter of `<theme>/templates/<name>.html` |
//! | 2 | Page, then each layout in chain order | page / layout front matter |
//! | 3 | Theme elements (token assets) | `theme.toml` `[elements.<tag>]`, only for tags present in the composed page, in tag-name order |
//! | 4 | Global | `site.toml` `[styles]` / `[scripts]` |
//!
//! Each declaration has three strategies:
//!
//! ```toml
//! [styles]
//! inline = ["elements/h1/inline.css"]  # file read now, embedded in <style>
//! sync = ["/styles/h1.css"]            # blocking <link>
//! async = ["/styles/h1-late.css"]      # appended after window load
//! ```
//!
//! Merge order is first-seen-wins. A key (inline file path, or href/src) is
//! added to at most one strategy of its kind, once, and keeps the position
//! of its first appearance. Inline paths are resolved against the declaring
//! file's directory when that file is loaded, so by the time they get here
//! they are absolute.

use maud::{Markup, PreEscaped, html};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Unable to read inline asset {}: {source}", path.display())]
    Access {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Copies every `data-src` back into `src` once the page has loaded.
pub const ACTIVATION_SCRIPT: &str = "\nwindow.addEventListener('load', function() {\n\
var lazy = document.querySelectorAll('[data-src]');\n\
for (var i = 0; i < lazy.length; i++) {\n\
lazy[i].setAttribute('src', lazy[i].getAttribute('data-src'));\n\
}\n\
var videos = document.querySelectorAll('video');\n\
for (var j = 0; j < videos.length; j++) {\n\
videos[j].load();\n\
}\n\
});\n";

/// Name of the global list the async stylesheet loader reads.
pub const ASYNC_STYLES_VAR: &str = "__lazysite_async_styles";

// ============================================================================
// Declarations
// ============================================================================

/// One asset kind's declarations, split by load strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetDecl {
    /// Files whose contents are embedded in the page.
    pub inline: Vec<String>,
    /// URLs referenced with blocking tags.
    pub sync: Vec<String>,
    /// URLs loaded after the page.
    #[serde(rename = "async")]
    pub deferred: Vec<String>,
}

impl AssetDecl {
    pub fn is_empty(&self) -> bool {
        self.inline.is_empty() && self.sync.is_empty() && self.deferred.is_empty()
    }

    /// Make relative inline paths absolute against `base`.
    pub fn resolve_inline(&mut self, base: &Path) {
        for path in &mut self.inline {
            if !Path::new(path.as_str()).is_absolute() {
                *path = base.join(path.as_str()).to_string_lossy().into_owned();
            }
        }
    }
}

/// Styles and scripts declared by one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageAssets {
    pub styles: AssetDecl,
    pub scripts: AssetDecl,
}

impl PageAssets {
    pub fn resolve_inline(&mut self, base: &Path) {
        self.styles.resolve_inline(base);
        self.scripts.resolve_inline(base);
    }
}

// ============================================================================
// Bundles
// ============================================================================

/// An inline asset: its source path and the content read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAsset {
    pub path: String,
    pub content: String,
}

/// Three disjoint, insertion-ordered sets for one asset kind.
#[derive(Debug, Clone, Default)]
pub struct AssetSet {
    pub inline: Vec<InlineAsset>,
    pub sync: Vec<String>,
    pub deferred: Vec<String>,
    seen: HashSet<String>,
}

impl AssetSet {
    /// Merge one declaration. Keys already present anywhere in the set are
    /// skipped; inline files are read only when first added.
    pub async fn add(&mut self, decl: &AssetDecl) -> Result<(), AssetError> {
        for path in &decl.inline {
            if self.seen.insert(path.clone()) {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| AssetError::Access {
                        path: PathBuf::from(path),
                        source,
                    })?;
                self.inline.push(InlineAsset {
                    path: path.clone(),
                    content,
                });
            }
        }
        for href in &decl.sync {
            if self.seen.insert(href.clone()) {
                self.sync.push(href.clone());
            }
        }
        for href in &decl.deferred {
            if self.seen.insert(href.clone()) {
                self.deferred.push(href.clone());
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inline.len() + self.sync.len() + self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Final styles and scripts for one page.
#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    pub styles: AssetSet,
    pub scripts: AssetSet,
}

impl AssetBundle {
    pub async fn add(&mut self, assets: &PageAssets) -> Result<(), AssetError> {
        self.styles.add(&assets.styles).await?;
        self.scripts.add(&assets.scripts).await
    }
}

/// Everything the aggregator merges, already in precedence order.
pub struct AssetSources<'a> {
    pub wrapper: &'a PageAssets,
    /// The page's own assets followed by each layout's, innermost first.
    pub page: &'a [PageAssets],
    pub elements: &'a BTreeMap<String, PageAssets>,
    /// Tag names present in the composed markup.
    pub tags: &'a BTreeSet<String>,
    pub global: &'a PageAssets,
}

/// Merge all sources into one deduplicated bundle.
pub async fn aggregate(sources: &AssetSources<'_>) -> Result<AssetBundle, AssetError> {
    let mut bundle = AssetBundle::default();
    bundle.add(sources.wrapper).await?;
    for assets in sources.page {
        bundle.add(assets).await?;
    }
    for (tag, assets) in sources.elements {
        if sources.tags.contains(tag) {
            bundle.add(assets).await?;
        }
    }
    bundle.add(sources.global).await?;
    Ok(bundle)
}

// ============================================================================
// Markup
// ============================================================================

/// Post-load loader that appends a stylesheet link per async style.
pub fn async_styles_loader(hrefs: &[String]) -> String {
    let list = serde_json::to_string(hrefs)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");
    format!(
        "\nwindow.addEventListener('load', function() {{\n\
var {var} = {list};\n\
for (var i = 0; i < {var}.length; i++) {{\n\
var link = document.createElement('link');\n\
link.rel = 'stylesheet';\n\
link.href = {var}[i];\n\
document.head.appendChild(link);\n\
}}\n\
}});\n",
        var = ASYNC_STYLES_VAR,
    )
}

impl AssetBundle {
    /// `<style>` blocks and blocking stylesheet links.
    pub fn head_markup(&self) -> Markup {
        html! {
            @for style in &self.styles.inline {
                style { (PreEscaped(&style.content)) }
            }
            @for href in &self.styles.sync {
                link rel="stylesheet" type="text/css" href=(href);
            }
        }
    }

    /// Scripts, the async stylesheet loader, and (for pages with lazy
    /// elements) the activation script.
    pub fn body_markup(&self, lazy: bool) -> Markup {
        html! {
            @for script in &self.scripts.inline {
                script { (PreEscaped(&script.content)) }
            }
            @for src in &self.scripts.sync {
                script src=(src) {}
            }
            @for src in &self.scripts.deferred {
                script src=(src) async defer {}
            }
            @if !self.styles.deferred.is_empty() {
                script { (PreEscaped(async_styles_loader(&self.styles.deferred))) }
            }
            @if lazy {
                script { (PreEscaped(ACTIVATION_SCRIPT)) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn decl(inline: &[&str], sync: &[&str], deferred: &[&str]) -> AssetDecl {
        let own = |v: &[&str]| -> Vec<String> { v.iter().map(|s| s.to_string()).collect() };
        AssetDecl {
            inline: own(inline),
            sync: own(sync),
            deferred: own(deferred),
        }
    }

    fn styles(d: AssetDecl) -> PageAssets {
        PageAssets {
            styles: d,
            scripts: AssetDecl::default(),
        }
    }

    fn tags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    #[test]
    fn decl_parses_async_key() {
        let assets: PageAssets = toml::from_str(
            r#"
[styles]
inline = ["a.css"]
async = ["/late.css"]
"#,
        )
        .unwrap();
        assert_eq!(assets.styles.inline, vec!["a.css"]);
        assert_eq!(assets.styles.deferred, vec!["/late.css"]);
        assert!(assets.scripts.is_empty());
    }

    #[test]
    fn decl_rejects_unknown_strategy() {
        let result: Result<PageAssets, _> = toml::from_str("[styles]\nlazy = [\"x\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn resolve_inline_keeps_absolute_paths() {
        let mut d = decl(&["rel/a.css", "/abs/b.css"], &["/sync.css"], &[]);
        d.resolve_inline(Path::new("/theme"));
        assert_eq!(d.inline, vec!["/theme/rel/a.css", "/abs/b.css"]);
        assert_eq!(d.sync, vec!["/sync.css"]);
    }

    // =========================================================================
    // Dedup and precedence
    // =========================================================================

    #[tokio::test]
    async fn shared_asset_from_two_tags_appears_once() {
        let tmp = TempDir::new().unwrap();
        let shared = tmp.path().join("shared.css");
        fs::write(&shared, ".shared{}").unwrap();
        let shared = shared.to_string_lossy().to_string();

        let mut elements = BTreeMap::new();
        elements.insert(
            "h1".to_string(),
            styles(decl(&[shared.as_str()], &["/s.css"], &["/a.css"])),
        );
        elements.insert(
            "h2".to_string(),
            styles(decl(&[shared.as_str()], &["/s.css"], &["/a.css"])),
        );

        let bundle = aggregate(&AssetSources {
            wrapper: &PageAssets::default(),
            page: &[],
            elements: &elements,
            tags: &tags(&["h1", "h2", "p"]),
            global: &PageAssets::default(),
        })
        .await
        .unwrap();

        assert_eq!(bundle.styles.inline.len(), 1);
        assert_eq!(bundle.styles.inline[0].content, ".shared{}");
        assert_eq!(bundle.styles.sync, vec!["/s.css"]);
        assert_eq!(bundle.styles.deferred, vec!["/a.css"]);
    }

    #[tokio::test]
    async fn element_assets_follow_tag_presence() {
        let mut elements = BTreeMap::new();
        elements.insert("h1".to_string(), styles(decl(&[], &["/h1.css"], &[])));
        elements.insert("table".to_string(), styles(decl(&[], &["/table.css"], &[])));

        async fn with_sources(
            elements: &BTreeMap<String, PageAssets>,
            present: &BTreeSet<String>,
        ) -> AssetBundle {
            aggregate(&AssetSources {
                wrapper: &PageAssets::default(),
                page: &[],
                elements,
                tags: present,
                global: &PageAssets::default(),
            })
            .await
            .unwrap()
        }

        let bundle = with_sources(&elements, &tags(&["h1"])).await;
        assert_eq!(bundle.styles.sync, vec!["/h1.css"]);

        let bundle = with_sources(&elements, &tags(&["table", "h1"])).await;
        assert_eq!(bundle.styles.sync, vec!["/h1.css", "/table.css"]);

        let bundle = with_sources(&elements, &tags(&["p"])).await;
        assert!(bundle.styles.is_empty());
    }

    #[tokio::test]
    async fn first_seen_wins_across_sources_and_strategies() {
        let wrapper = styles(decl(&[], &["/base.css"], &[]));
        let page = vec![
            styles(decl(&[], &["/page.css"], &["/base.css"])),
            styles(decl(&[], &["/layout.css", "/page.css"], &[])),
        ];
        let global = styles(decl(&[], &["/global.css"], &["/page.css", "/late.css"]));

        let bundle = aggregate(&AssetSources {
            wrapper: &wrapper,
            page: &page,
            elements: &BTreeMap::new(),
            tags: &BTreeSet::new(),
            global: &global,
        })
        .await
        .unwrap();

        assert_eq!(
            bundle.styles.sync,
            vec!["/base.css", "/page.css", "/layout.css", "/global.css"]
        );
        assert_eq!(bundle.styles.deferred, vec!["/late.css"]);
    }

    #[tokio::test]
    async fn missing_inline_file_is_access_error() {
        let mut set = AssetSet::default();
        let result = set
            .add(&decl(&["/definitely/not/here.css"], &[], &[]))
            .await;
        assert!(matches!(result, Err(AssetError::Access { .. })));
    }

    // =========================================================================
    // Markup
    // =========================================================================

    #[tokio::test]
    async fn head_markup_has_styles_then_links() {
        let tmp = TempDir::new().unwrap();
        let inline = tmp.path().join("i.css");
        fs::write(&inline, ".i{}").unwrap();
        let inline = inline.to_string_lossy().to_string();

        let mut bundle = AssetBundle::default();
        bundle
            .add(&styles(decl(&[inline.as_str()], &["/s.css"], &[])))
            .await
            .unwrap();

        assert_eq!(
            bundle.head_markup().into_string(),
            r#"<style>.i{}</style><link rel="stylesheet" type="text/css" href="/s.css">"#
        );
    }

    #[tokio::test]
    async fn body_markup_orders_scripts_and_loader() {
        let mut bundle = AssetBundle::default();
        bundle
            .add(&PageAssets {
                styles: decl(&[], &[], &["/late.css"]),
                scripts: decl(&[], &["/app.js"], &["/stats.js"]),
            })
            .await
            .unwrap();

        let body = bundle.body_markup(false).into_string();
        let app = body.find(r#"<script src="/app.js"></script>"#).unwrap();
        let stats = body
            .find(r#"<script src="/stats.js" async defer></script>"#)
            .unwrap();
        let loader = body.find(r#"var __lazysite_async_styles = ["/late.css"];"#).unwrap();
        assert!(app < stats && stats < loader);
        assert!(!body.contains("data-src"));

        assert!(bundle.body_markup(true).into_string().contains("[data-src]"));
    }

    #[test]
    fn empty_bundle_renders_nothing() {
        let bundle = AssetBundle::default();
        assert_eq!(bundle.head_markup().into_string(), "");
        assert_eq!(bundle.body_markup(false).into_string(), "");
    }

    #[test]
    fn loader_list_cannot_close_the_script() {
        let js = async_styles_loader(&["/x.css?</script>".to_string()]);
        assert!(!js.contains("</script>"));
        assert!(js.contains(r#"["/x.css?<\/script>"]"#));
    }
}
