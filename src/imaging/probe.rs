//! Dimension probe trait and the source-routing probe used in builds.
//!
//! The [`DimensionProbe`] trait is the seam between the HTML transform and
//! whatever can answer "how big is this image?". [`SiteProbe`] is the
//! production implementation: it classifies each `src` and hands it to the
//! local or remote reader.
//!
//! | `src` shape | Resolution |
//! |---|---|
//! | `data:...` | unresolved |
//! | `http://`, `https://`, `//host/...` | [`RemoteProbe`] (when enabled) |
//! | anything else | [`local::dimensions`] under the static root |

use super::local;
use super::remote::RemoteProbe;
use crate::config::ImagesConfig;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Width and height of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Anything that can resolve an image reference to its pixel dimensions.
///
/// Returning `None` means "unknown"; it never fails the page.
pub trait DimensionProbe: Send + Sync {
    fn probe(&self, src: &str) -> impl Future<Output = Option<Dimensions>> + Send;
}

/// Where an image reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Inline,
    Remote(String),
    Local(String),
}

/// Classify an image reference. Protocol-relative URLs are upgraded to https.
pub fn classify(src: &str) -> ImageSource {
    let src = src.trim();
    let lower = src.to_ascii_lowercase();
    if lower.starts_with("data:") {
        ImageSource::Inline
    } else if lower.starts_with("http://") || lower.starts_with("https://") {
        ImageSource::Remote(src.to_string())
    } else if let Some(rest) = src.strip_prefix("//") {
        ImageSource::Remote(format!("https://{rest}"))
    } else {
        ImageSource::Local(src.to_string())
    }
}

/// Probe that reads local files under the static root and, optionally,
/// streams remote headers.
pub struct SiteProbe {
    static_root: PathBuf,
    remote: Option<RemoteProbe>,
}

impl SiteProbe {
    pub fn new(static_root: PathBuf, images: &ImagesConfig) -> Result<Self, ProbeError> {
        let remote = if images.remote_probe {
            Some(RemoteProbe::new(images.probe_timeout_ms, images.max_probe_bytes)?)
        } else {
            None
        };
        Ok(Self {
            static_root,
            remote,
        })
    }

    /// A probe that never touches the network.
    pub fn local_only(static_root: PathBuf) -> Self {
        Self {
            static_root,
            remote: None,
        }
    }
}

impl DimensionProbe for SiteProbe {
    async fn probe(&self, src: &str) -> Option<Dimensions> {
        match classify(src) {
            ImageSource::Inline => None,
            ImageSource::Remote(url) => match &self.remote {
                Some(remote) => remote.dimensions(&url).await,
                None => None,
            },
            ImageSource::Local(path) => {
                let Some(file) = local::resolve(&self.static_root, &path) else {
                    return None;
                };
                tokio::task::spawn_blocking(move || local::dimensions(&file))
                    .await
                    .ok()
                    .flatten()
            }
        }
    }
}
