//! Image dimension probing.
//!
//! | Source | Crate / function |
//! |---|---|
//! | **Local file** | `image::image_dimensions` (header only) |
//! | **Remote URL** | `reqwest` streamed body + `image::ImageReader::into_dimensions` |
//! | **data: URI** | unresolved |
//!
//! The module is split into:
//! - **Probe**: [`DimensionProbe`] trait + [`SiteProbe`] router
//! - **Local**: static-root path resolution and header reads
//! - **Remote**: streamed header decode with timeout and byte cap

pub mod local;
pub mod probe;
pub mod remote;

pub use probe::{DimensionProbe, Dimensions, ImageSource, ProbeError, SiteProbe, classify};
pub use remote::RemoteProbe;
