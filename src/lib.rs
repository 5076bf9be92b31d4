//! # lazysite
//!
//! A static site generator that builds every content file in its own
//! worker and rewrites the resulting HTML so images, iframes, and videos
//! load lazily without shifting the layout.
//!
//! # Architecture: Pool of Isolated Page Builds
//!
//! ```text
//! site.toml ─→ prepare ─→ BuildContext (config, theme, navigation)
//!                              │
//! content/**/*.md ─→ discover ─┤
//!                              ▼
//!                        WorkerPool (≤ pool.size in flight)
//!                     ┌────────┼────────┐
//!                     ▼        ▼        ▼
//!                  worker   worker   worker      one per page
//!                     │
//!                     ├─ front matter → tera → markdown
//!                     ├─ transform (lazy loading, aspect boxes)
//!                     ├─ layouts → wrapper template
//!                     ├─ assets (only what the page's elements need)
//!                     └─ write build/<page>.html
//!                              │
//!                              ▼
//!                  results ─→ sitemap ─→ static copy
//! ```
//!
//! By default each page is built by a fresh `lazysite worker` process that
//! receives the build context as one JSON line on stdin and answers with
//! one JSON line on stdout. A page that crashes its worker costs that page
//! only. `pool.isolation = "task"` builds pages as tokio tasks instead.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`site`] | Orchestration: prepare, check, build, static copy |
//! | [`pool`] | Bounded worker pool, job runners, per-job outcomes |
//! | [`protocol`] | Run message and reply format between pool and worker |
//! | [`worker`] | Worker side: liveness window, one-shot job, reply |
//! | [`page`] | Page build: render, transform, layouts, wrapper, write |
//! | [`transform`] | HTML post-processing for lazy loading |
//! | [`dom`] | Arena DOM the transforms operate on |
//! | [`imaging`] | Image dimension probes (local files, remote headers) |
//! | [`assets`] | Style and script aggregation with deduplication |
//! | [`render`] | Front matter, tera templates, markdown |
//! | [`theme`] | Theme manifest, templates, layouts |
//! | [`nav`] | Navigation tree from `navigation.toml` |
//! | [`config`] | `site.toml` loading, merging, validation |
//! | [`scan`] | Content discovery |
//! | [`sitemap`] | `sitemap.xml` generation |
//! | [`types`] | Shared types that cross the process boundary |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Process Isolation by Default
//!
//! Templates and content are user input. A page whose template recurses
//! forever or whose image probe wedges a thread takes down one worker
//! process, which the pool records as a failed job, while every other page
//! still builds. Job timeouts (`pool.job_timeout_secs`) bound the damage in
//! time as well: the pool kills the worker and moves on.
//!
//! ## Asset Budget per Page
//!
//! Themes declare styles and scripts per HTML element. A page only carries
//! assets for tags that appear in its composed markup, so a page without a
//! table never loads table styles. Every asset appears at most once in the
//! final document no matter how many sources declare it.
//!
//! ## Layout Stability
//!
//! Lazy elements are wrapped in a box whose bottom padding reserves the
//! element's aspect ratio. Dimensions come from explicit `width`/`height`
//! attributes, local files under the static root, or the first bytes of a
//! remote image. Elements whose size can't be learned are still lazy and
//! boxed, but their box reserves no space.

pub mod assets;
pub mod config;
pub mod dom;
pub mod imaging;
pub mod nav;
pub mod output;
pub mod page;
pub mod pool;
pub mod protocol;
pub mod render;
pub mod scan;
pub mod site;
pub mod sitemap;
pub mod theme;
pub mod transform;
pub mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_helpers;
