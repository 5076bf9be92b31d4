//! Site configuration module.
//!
//! Handles loading, validating, and merging `site.toml`. Stock defaults are
//! the base layer; the user's file overrides any subset of them.
//!
//! ## Config File Location
//!
//! `--config` may point at the file itself or at a directory containing
//! `site.toml`. A directory without one builds with stock defaults. Every
//! relative path in the file is resolved against the directory the config
//! lives in:
//!
//! ```text
//! my-site/
//! ├── site.toml
//! ├── content/                 # content_path
//! │   ├── navigation.toml      # navigation_file
//! │   └── index.md
//! ├── static/                  # static_path, copied verbatim into the output
//! └── theme/                   # theme_path (see `theme` module)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_path = "content"
//! output_path = "build"
//! static_path = "static"
//! theme_path = "theme"
//! navigation_file = "content/navigation.toml"
//! markdown_extension = "md"
//! origin = ""                  # prefix for sitemap URLs
//!
//! [pool]
//! size = 10                    # concurrent page builds, must be > 0
//! isolation = "process"        # or "task"
//! job_timeout_secs = 60        # 0 waits forever
//!
//! [images]
//! remote_probe = true
//! probe_timeout_ms = 5000
//! max_probe_bytes = 262144
//!
//! [sitemap]
//! enable = true
//! path = "sitemap.xml"
//!
//! [styles]                     # global assets, see `assets`
//! inline = []
//! sync = []
//! async = []
//!
//! [scripts]
//! inline = []
//! sync = []
//! async = []
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::assets::{AssetDecl, PageAssets};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up inside a directory.
pub const CONFIG_FILE: &str = "site.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config {}: {source}", path.display())]
    Access {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `site.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. After [`load`] every path is absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Root scanned for content files.
    pub content_path: PathBuf,
    /// Where built pages are written.
    pub output_path: PathBuf,
    /// Copied verbatim into the output root after the build. Also the root
    /// local images are probed under.
    pub static_path: PathBuf,
    /// Theme directory containing `theme.toml`.
    pub theme_path: PathBuf,
    /// Navigation tree description. Optional on disk.
    pub navigation_file: PathBuf,
    /// Extension (without dot) identifying content files.
    pub markdown_extension: String,
    /// Absolute site origin used for sitemap URLs, e.g. `https://example.com`.
    pub origin: String,
    pub pool: PoolConfig,
    pub images: ImagesConfig,
    pub sitemap: SitemapConfig,
    /// Global styles for every page.
    pub styles: AssetDecl,
    /// Global scripts for every page.
    pub scripts: AssetDecl,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_path: PathBuf::from("content"),
            output_path: PathBuf::from("build"),
            static_path: PathBuf::from("static"),
            theme_path: PathBuf::from("theme"),
            navigation_file: PathBuf::from("content/navigation.toml"),
            markdown_extension: "md".to_string(),
            origin: String::new(),
            pool: PoolConfig::default(),
            images: ImagesConfig::default(),
            sitemap: SitemapConfig::default(),
            styles: Default::default(),
            scripts: Default::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.size == 0 {
            return Err(ConfigError::Validation(
                "pool.size must be greater than 0".into(),
            ));
        }
        if self.markdown_extension.is_empty() || self.markdown_extension.contains('.') {
            return Err(ConfigError::Validation(
                "markdown_extension must be a bare extension such as \"md\"".into(),
            ));
        }
        if self.markdown_extension == "html" {
            return Err(ConfigError::Validation(
                "markdown_extension cannot be \"html\"".into(),
            ));
        }
        if self.images.max_probe_bytes == 0 {
            return Err(ConfigError::Validation(
                "images.max_probe_bytes must be greater than 0".into(),
            ));
        }
        if self.sitemap.enable && self.sitemap.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sitemap.path must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Make every path absolute against `base`: the config file's directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.content_path,
            &mut self.output_path,
            &mut self.static_path,
            &mut self.theme_path,
            &mut self.navigation_file,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self.styles.resolve_inline(base);
        self.scripts.resolve_inline(base);
    }

    /// Global assets as one declaration source.
    pub fn global_assets(&self) -> PageAssets {
        PageAssets {
            styles: self.styles.clone(),
            scripts: self.scripts.clone(),
        }
    }
}

/// How each page build is isolated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    /// One OS process per page (`lazysite worker <page>`).
    #[default]
    Process,
    /// One tokio task per page inside the build process.
    Task,
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of page builds in flight.
    pub size: usize,
    pub isolation: Isolation,
    /// Seconds a job may run before it is recorded as a protocol error and
    /// its worker killed. `0` waits forever.
    pub job_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 10,
            isolation: Isolation::Process,
            job_timeout_secs: 60,
        }
    }
}

impl PoolConfig {
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}

/// Image dimension probing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Fetch headers of remote images to learn their dimensions.
    pub remote_probe: bool,
    /// Per-request timeout for remote probes.
    pub probe_timeout_ms: u64,
    /// Give up on a remote image after this many body bytes.
    pub max_probe_bytes: usize,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            remote_probe: true,
            probe_timeout_ms: 5000,
            max_probe_bytes: 256 * 1024,
        }
    }
}

/// Sitemap generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapConfig {
    pub enable: bool,
    /// Output path relative to the output root.
    pub path: String,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            enable: true,
            path: "sitemap.xml".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Where a `--config` argument points: the file to read (if any) and the
/// directory relative paths hang off.
pub fn locate(path: &Path) -> (Option<PathBuf>, PathBuf) {
    if path.is_dir() {
        let file = path.join(CONFIG_FILE);
        let file = file.exists().then_some(file);
        (file, path.to_path_buf())
    } else {
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (Some(path.to_path_buf()), base)
    }
}

/// Load a config file as a raw TOML value.
pub fn load_raw_config(file: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(file).map_err(|source| ConfigError::Access {
        path: file.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the site config from a file or a directory containing `site.toml`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// validates, and resolves paths against the config's directory.
pub fn load(path: &Path) -> Result<SiteConfig, ConfigError> {
    let (file, base) = locate(path);
    let overlay = file.as_deref().map(load_raw_config).transpose()?;
    let mut config = resolve_config(stock_defaults_value(), overlay)?;
    let base = std::path::absolute(&base).unwrap_or(base);
    config.resolve_paths(&base);
    Ok(config)
}

/// Returns a fully-commented stock `site.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# lazysite configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Relative paths are resolved against the directory this file lives in.
# Unknown keys will cause an error.

# Directory scanned (recursively) for content files.
content_path = "content"

# Where built pages are written.
output_path = "build"

# Copied verbatim into output_path after the pages are built.
# Local images referenced by pages are measured from here.
static_path = "static"

# Theme directory: theme.toml, templates/, layouts/, element assets.
theme_path = "theme"

# Navigation tree. Missing file means an empty navigation.
navigation_file = "content/navigation.toml"

# Extension (without the dot) of content files.
markdown_extension = "md"

# Site origin prepended to sitemap URLs, e.g. "https://example.com".
origin = ""

# ---------------------------------------------------------------------------
# Worker pool
# ---------------------------------------------------------------------------
[pool]
# Maximum page builds running at once. Must be greater than 0.
size = 10

# "process": one worker process per page (fault isolation).
# "task": one async task per page inside the build process (lower overhead).
isolation = "process"

# Seconds before a silent or stuck job is recorded as failed and its worker
# killed. 0 waits forever.
job_timeout_secs = 60

# ---------------------------------------------------------------------------
# Image dimension probing
# ---------------------------------------------------------------------------
[images]
# Fetch the first bytes of remote images to learn their dimensions.
remote_probe = true

# Per-request timeout for remote probes, in milliseconds.
probe_timeout_ms = 5000

# Stop reading a remote image after this many bytes.
max_probe_bytes = 262144

# ---------------------------------------------------------------------------
# Sitemap
# ---------------------------------------------------------------------------
[sitemap]
enable = true
# Relative to output_path.
path = "sitemap.xml"

# ---------------------------------------------------------------------------
# Global assets, added to every page after template, page and theme assets.
#   inline: files embedded into the page (paths relative to this file)
#   sync:   URLs loaded with blocking tags
#   async:  URLs loaded after the page has finished loading
# ---------------------------------------------------------------------------
[styles]
inline = []
sync = []
async = []

[scripts]
inline = []
sync = []
async = []
"##
}
