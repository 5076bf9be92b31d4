//! Page build: one content file in, one HTML file out.
//!
//! ```text
//! read + split front matter
//!   → tera (page, navigation, site) → markdown
//!   → post-process (transform)
//!   → layout chain (each layout wraps `content`)
//!   → wrapper template, rendered twice:
//!       1. without assets, to discover which tags the composed page uses
//!       2. with `assets.head` / `assets.body` from the aggregator
//!   → write <output>/<relative path>.html
//! ```
//!
//! Every failure is a [`PageError`]; the worker turns it into an error
//! reply, so nothing here ever needs to exit the process.

use crate::assets::{self, AssetError, AssetSources, PageAssets};
use crate::dom::{self, DomError};
use crate::imaging::DimensionProbe;
use crate::nav::page_url;
use crate::render::{FrontMatter, markdown_to_html, render_template, split_front_matter};
use crate::theme::ThemeError;
use crate::transform;
use crate::types::{BuildContext, PageOutput};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Unable to read {}: {source}", path.display())]
    Access {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid front matter: {0}")]
    FrontMatter(String),
    #[error("Render error: {0}")]
    Render(String),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("{} is not inside the content root", path.display())]
    OutsideContent { path: PathBuf },
    #[error("Unable to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `page` binding visible to templates.
#[derive(Debug, Serialize)]
struct PageBinding<'a> {
    #[serde(flatten)]
    front: &'a FrontMatter,
    url: &'a str,
    path: &'a Path,
}

/// The `assets` binding visible to wrapper templates.
#[derive(Debug, Default, Serialize)]
struct AssetsBinding {
    head: String,
    body: String,
}

/// A template file: its front matter, body, and directory.
struct TemplateFile {
    front: FrontMatter,
    body: String,
    dir: PathBuf,
}

async fn read_source(path: &Path) -> Result<String, PageError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PageError::Access {
            path: path.to_path_buf(),
            source,
        })
}

async fn read_template(path: &Path) -> Result<TemplateFile, PageError> {
    let source = read_source(path).await?;
    let (front, body) = split_front_matter(&source)?;
    Ok(TemplateFile {
        body: body.to_string(),
        front,
        dir: parent_dir(path),
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Where a content file's HTML goes.
pub fn output_path_for(input: &Path, context: &BuildContext) -> Result<PathBuf, PageError> {
    let site = &context.config.site;
    let relative = input
        .strip_prefix(&site.content_path)
        .map_err(|_| PageError::OutsideContent {
            path: input.to_path_buf(),
        })?;
    Ok(site.output_path.join(relative).with_extension("html"))
}

/// Build one page and write it to the output root.
pub async fn build_page<P: DimensionProbe>(
    input: &Path,
    context: &BuildContext,
    probe: &P,
) -> Result<PageOutput, PageError> {
    let site = &context.config.site;
    let theme = &context.config.theme;
    let output_path = output_path_for(input, context)?;
    let relative = input
        .strip_prefix(&site.content_path)
        .unwrap_or(input)
        .to_path_buf();
    let url = page_url(&relative, &site.markdown_extension);

    // 1. Source and front matter
    let page = {
        let source = read_source(input).await?;
        let (front, body) = split_front_matter(&source)?;
        TemplateFile {
            body: body.to_string(),
            front,
            dir: parent_dir(input),
        }
    };

    let mut ctx = tera::Context::new();
    ctx.insert(
        "page",
        &PageBinding {
            front: &page.front,
            url: &url,
            path: &relative,
        },
    );
    ctx.insert("navigation", &context.navigation);
    ctx.insert("site", site);

    // 2. Template binding, then markdown
    let body = render_template(&page.body, &ctx)?;
    let html = markdown_to_html(&body);

    // 3. Post-process
    let mut doc = dom::parse(&html)?;
    let report = transform::transform(&mut doc, probe).await;
    let mut tags: BTreeSet<String> = doc.tag_names();
    let mut content = doc.to_html();
    tracing::debug!(
        page = %relative.display(),
        lazy = report.lazy,
        sized = report.sized,
        unresolved = report.unresolved,
        "post-processed"
    );

    // 4. Layout chain
    let mut page_assets: Vec<PageAssets> = vec![page.front.assets(&page.dir)];
    let mut seen_layouts = BTreeSet::new();
    let mut next_layout = page.front.layout.clone();
    while let Some(name) = next_layout {
        if !seen_layouts.insert(name.clone()) {
            return Err(PageError::Render(format!(
                "layout cycle through '{name}'"
            )));
        }
        let layout = read_template(&theme.layout_path(&name)?).await?;
        ctx.insert("content", &content);
        content = render_template(&layout.body, &ctx)?;
        page_assets.push(layout.front.assets(&layout.dir));
        next_layout = layout.front.layout;
    }

    // 5. Wrapper
    let wrapper_path = theme.template_path(page.front.template.as_deref())?;
    let wrapper = read_template(&wrapper_path).await?;
    let wrapper_assets = wrapper.front.assets(&wrapper.dir);

    // 6. Draft render for tag discovery, aggregate, final render
    ctx.insert("content", &content);
    ctx.insert("assets", &AssetsBinding::default());
    let draft = render_template(&wrapper.body, &ctx)?;
    tags.extend(dom::parse(&draft)?.tag_names());

    let global = site.global_assets();
    let bundle = assets::aggregate(&AssetSources {
        wrapper: &wrapper_assets,
        page: &page_assets,
        elements: &theme.elements,
        tags: &tags,
        global: &global,
    })
    .await?;
    ctx.insert(
        "assets",
        &AssetsBinding {
            head: bundle.head_markup().into_string(),
            body: bundle.body_markup(report.lazy > 0).into_string(),
        },
    );
    let final_html = render_template(&wrapper.body, &ctx)?;

    // 7. Write
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| PageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(&output_path, final_html)
        .await
        .map_err(|source| PageError::Io {
            path: output_path.clone(),
            source,
        })?;

    Ok(PageOutput {
        input_path: input.to_path_buf(),
        output_path,
    })
}
