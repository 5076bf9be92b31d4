//! Shared types passed between the pool and its workers.
//!
//! These types cross the process boundary as JSON (see [`crate::protocol`])
//! and must deserialize identically on both sides.

use crate::config::SiteConfig;
use crate::nav::Navigation;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolved configuration: site settings plus the loaded theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub site: SiteConfig,
    pub theme: Theme,
}

/// Everything a page build needs besides its own file. Computed once per
/// build and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildContext {
    pub config: BuildConfig,
    pub navigation: Navigation,
}

/// A successfully built page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOutput {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}
