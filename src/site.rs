//! Whole-site build orchestration.
//!
//! ```text
//! prepare   site.toml → SiteConfig → Theme → Navigation → BuildContext
//! build     discover → WorkerPool → sitemap → static copy → BuildReport
//! ```
//!
//! A build where some pages fail still writes every page that succeeded,
//! the sitemap, and the static files, then returns
//! [`SiteError::PartialBuild`] carrying the full report.

use crate::config::{self, ConfigError, Isolation};
use crate::imaging::{ProbeError, SiteProbe};
use crate::nav::{self, NavError};
use crate::pool::{InProcessRunner, JobError, JobResults, PoolError, ProcessRunner, WorkerPool};
use crate::scan::{self, ScanError};
use crate::sitemap::{self, SitemapError};
use crate::theme::{Theme, ThemeError};
use crate::types::{BuildConfig, BuildContext};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Nav(#[from] NavError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Sitemap(#[from] SitemapError),
    #[error("Unable to copy static files from {}: {source}", path.display())]
    Static {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to locate the worker executable: {0}")]
    WorkerExe(std::io::Error),
    #[error("{} of {} pages failed to build", .0.failures().len(), .0.results.len())]
    PartialBuild(Box<BuildReport>),
}

/// Everything a finished build produced.
#[derive(Debug)]
pub struct BuildReport {
    pub results: JobResults,
    pub sitemap: Option<PathBuf>,
    pub static_files: usize,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn failures(&self) -> Vec<(&Path, &JobError)> {
        self.results
            .iter()
            .filter_map(|(job, outcome)| outcome.as_ref().err().map(|e| (job.as_path(), e)))
            .collect()
    }

    pub fn built(&self) -> usize {
        self.results.values().filter(|outcome| outcome.is_ok()).count()
    }
}

/// What `check` found: a loadable site and its jobs.
#[derive(Debug)]
pub struct CheckReport {
    pub context: BuildContext,
    pub jobs: Vec<PathBuf>,
}

/// Load configuration, theme, and navigation into a build context.
pub fn prepare(config_path: &Path) -> Result<BuildContext, SiteError> {
    let site = config::load(config_path)?;
    let theme = Theme::load(&site.theme_path)?;
    let navigation = nav::load(
        &site.navigation_file,
        &site.content_path,
        &site.markdown_extension,
    )?;
    tracing::debug!(
        content = %site.content_path.display(),
        output = %site.output_path.display(),
        theme = %theme.root.display(),
        "site prepared"
    );
    Ok(BuildContext {
        config: BuildConfig { site, theme },
        navigation,
    })
}

/// Everything `build` would do short of building.
pub fn check(config_path: &Path) -> Result<CheckReport, SiteError> {
    let context = prepare(config_path)?;
    let site = &context.config.site;
    let jobs = scan::discover(&site.content_path, &site.markdown_extension)?;
    WorkerPool::new(site.pool.size, jobs.clone())?;
    Ok(CheckReport { context, jobs })
}

/// Build every page, then the sitemap and static files.
pub async fn build(context: BuildContext) -> Result<BuildReport, SiteError> {
    let started = Instant::now();
    let site = context.config.site.clone();
    let jobs = scan::discover(&site.content_path, &site.markdown_extension)?;
    let pool = WorkerPool::new(site.pool.size, jobs.clone())?.with_job_timeout(site.pool.job_timeout());
    tracing::info!(
        pages = jobs.len(),
        pool = site.pool.size,
        isolation = ?site.pool.isolation,
        "building"
    );

    let context = Arc::new(context);
    let results = match site.pool.isolation {
        Isolation::Process => {
            let runner = ProcessRunner::current_exe().map_err(SiteError::WorkerExe)?;
            pool.start(Arc::new(runner), context).await
        }
        Isolation::Task => {
            let probe = SiteProbe::new(site.static_path.clone(), &site.images)?;
            pool.start(Arc::new(InProcessRunner::new(probe)), context).await
        }
    };

    let sitemap = if site.sitemap.enable {
        let path = site.output_path.join(&site.sitemap.path);
        let relative: Vec<PathBuf> = jobs
            .iter()
            .map(|job| scan::relative_to(job, &site.content_path).to_path_buf())
            .collect();
        sitemap::write(&path, &site.origin, &relative)?;
        Some(path)
    } else {
        None
    };

    let (from, to) = (site.static_path.clone(), site.output_path.clone());
    let static_files = tokio::task::spawn_blocking(move || copy_static(&from, &to))
        .await
        .map_err(|err| SiteError::Static {
            path: site.static_path.clone(),
            source: std::io::Error::other(err),
        })??;

    let report = BuildReport {
        results,
        sitemap,
        static_files,
        elapsed: started.elapsed(),
    };
    if report.failures().is_empty() {
        Ok(report)
    } else {
        Err(SiteError::PartialBuild(Box::new(report)))
    }
}

/// Copy the static root into the output root. A missing static root copies
/// nothing.
pub fn copy_static(from: &Path, to: &Path) -> Result<usize, SiteError> {
    if !from.is_dir() {
        tracing::debug!(path = %from.display(), "no static directory");
        return Ok(0);
    }
    let to_error = |source: std::io::Error| SiteError::Static {
        path: from.to_path_buf(),
        source,
    };

    let mut copied = 0;
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(|e| to_error(e.into()))?;
        let relative = scan::relative_to(entry.path(), from);
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(to_error)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(to_error)?;
            }
            fs::copy(entry.path(), &target).map_err(to_error)?;
            copied += 1;
        }
    }
    Ok(copied)
}
