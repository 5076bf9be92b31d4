//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Pages are listed by their position and source path relative to the
//! content root; outputs and errors follow as indented context lines. Paths
//! are always shown relative to the root they live under so the listing
//! reads the same wherever the site is checked out.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Site
//!     Config: /home/me/site/site.toml
//!     Theme: theme/ (2 element rules)
//!     Pool: 10 workers, process isolation
//!
//! Navigation
//!     001 Home → /
//!     002 A plain page → /page.html
//!         001 Nested page → /directory/nested-page.html
//!
//! Pages
//!     001 directory/nested-page.md
//!     002 index.md
//!     003 page.md
//! ```
//!
//! ## Build
//!
//! ```text
//! Pages
//!     001 directory/nested-page.md → directory/nested-page.html
//!     002 index.md → index.html
//!     003 page.md
//!         Error: Render error: ...
//!
//! Sitemap → sitemap.xml
//! Static: 4 files
//!
//! Built 2 of 3 pages in 412 ms
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::nav::NavNode;
use crate::scan::relative_to;
use crate::site::{BuildReport, CheckReport};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_relative(path: &Path, root: &Path) -> String {
    relative_to(path, root).to_string_lossy().replace('\\', "/")
}

fn nav_lines(nodes: &[NavNode], depth: usize, lines: &mut Vec<String>) {
    for (i, node) in nodes.iter().enumerate() {
        let title = node.title.as_deref().unwrap_or(&node.url);
        lines.push(format!(
            "{}{} {} → {}",
            indent(depth),
            format_index(i + 1),
            title,
            node.url
        ));
        nav_lines(&node.children, depth + 1, lines);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of `check`: where the site comes from and what would
/// be built.
pub fn format_check_output(report: &CheckReport, config_file: Option<&Path>) -> Vec<String> {
    let site = &report.context.config.site;
    let theme = &report.context.config.theme;
    let base = config_file.and_then(Path::parent).unwrap_or(Path::new(""));
    let mut lines = vec!["Site".to_string()];

    match config_file {
        Some(file) => lines.push(format!("    Config: {}", file.display())),
        None => lines.push("    Config: stock defaults".to_string()),
    }
    lines.push(format!(
        "    Theme: {}/ ({} element rules)",
        display_relative(&theme.root, base),
        theme.elements.len()
    ));
    lines.push(format!(
        "    Pool: {} workers, {} isolation",
        site.pool.size,
        match site.pool.isolation {
            crate::config::Isolation::Process => "process",
            crate::config::Isolation::Task => "task",
        }
    ));

    if !report.context.navigation.pages.is_empty() {
        lines.push(String::new());
        lines.push("Navigation".to_string());
        nav_lines(&report.context.navigation.pages, 1, &mut lines);
    }

    lines.push(String::new());
    lines.push("Pages".to_string());
    for (i, job) in report.jobs.iter().enumerate() {
        lines.push(format!(
            "    {} {}",
            format_index(i + 1),
            display_relative(job, &site.content_path)
        ));
    }
    lines
}

pub fn print_check_output(report: &CheckReport, config_file: Option<&Path>) {
    for line in format_check_output(report, config_file) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format a finished (or partially failed) build.
pub fn format_build_output(
    report: &BuildReport,
    content_root: &Path,
    output_root: &Path,
) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];

    for (i, (job, outcome)) in report.results.iter().enumerate() {
        let source = display_relative(job, content_root);
        match outcome {
            Ok(page) => lines.push(format!(
                "    {} {} → {}",
                format_index(i + 1),
                source,
                display_relative(&page.output_path, output_root)
            )),
            Err(err) => {
                lines.push(format!("    {} {}", format_index(i + 1), source));
                lines.push(format!("        Error: {}", err));
            }
        }
    }

    lines.push(String::new());
    if let Some(sitemap) = &report.sitemap {
        lines.push(format!("Sitemap → {}", display_relative(sitemap, output_root)));
    }
    lines.push(format!(
        "Static: {} file{}",
        report.static_files,
        if report.static_files == 1 { "" } else { "s" }
    ));

    lines.push(String::new());
    lines.push(format!(
        "Built {} of {} pages in {} ms",
        report.built(),
        report.results.len(),
        report.elapsed.as_millis()
    ));
    lines
}

pub fn print_build_output(report: &BuildReport, content_root: &Path, output_root: &Path) {
    for line in format_build_output(report, content_root, output_root) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::Navigation;
    use crate::pool::{JobError, JobResults};
    use crate::test_helpers::dummy_context;
    use crate::types::PageOutput;
    use std::path::PathBuf;
    use std::time::Duration;

    fn node(title: &str, url: &str, children: Vec<NavNode>) -> NavNode {
        NavNode {
            title: Some(title.to_string()),
            url: url.to_string(),
            path: PathBuf::from(url.trim_start_matches('/')),
            hidden: false,
            id: None,
            children,
        }
    }

    fn report() -> BuildReport {
        let mut results = JobResults::new();
        results.insert(
            PathBuf::from("/site/content/index.md"),
            Ok(PageOutput {
                input_path: PathBuf::from("/site/content/index.md"),
                output_path: PathBuf::from("/site/build/index.html"),
            }),
        );
        results.insert(
            PathBuf::from("/site/content/page.md"),
            Err(JobError::Page("Render error: boom".to_string())),
        );
        BuildReport {
            results,
            sitemap: Some(PathBuf::from("/site/build/sitemap.xml")),
            static_files: 1,
            elapsed: Duration::from_millis(42),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn index_is_zero_padded() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(120), "120");
    }

    #[test]
    fn nav_lines_indent_children() {
        let nodes = vec![
            node("Home", "/", vec![]),
            node("Guides", "/guides/", vec![node("Setup", "/guides/setup.html", vec![])]),
        ];
        let mut lines = Vec::new();
        nav_lines(&nodes, 1, &mut lines);
        assert_eq!(
            lines,
            vec![
                "    001 Home → /",
                "    002 Guides → /guides/",
                "        001 Setup → /guides/setup.html",
            ]
        );
    }

    // =========================================================================
    // Build output
    // =========================================================================

    #[test]
    fn build_output_lists_pages_and_errors() {
        let lines = format_build_output(
            &report(),
            Path::new("/site/content"),
            Path::new("/site/build"),
        );
        assert_eq!(
            lines,
            vec![
                "Pages",
                "    001 index.md → index.html",
                "    002 page.md",
                "        Error: Render error: boom",
                "",
                "Sitemap → sitemap.xml",
                "Static: 1 file",
                "",
                "Built 1 of 2 pages in 42 ms",
            ]
        );
    }

    #[test]
    fn build_output_without_sitemap() {
        let mut report = report();
        report.sitemap = None;
        report.static_files = 3;
        let lines = format_build_output(&report, Path::new("/site/content"), Path::new("/site/build"));
        assert!(!lines.iter().any(|l| l.starts_with("Sitemap")));
        assert!(lines.contains(&"Static: 3 files".to_string()));
    }

    // =========================================================================
    // Check output
    // =========================================================================

    #[test]
    fn check_output_shows_site_navigation_and_pages() {
        let mut context = dummy_context();
        context.config.site.content_path = PathBuf::from("/site/content");
        context.config.theme.root = PathBuf::from("/site/theme");
        context.navigation = Navigation {
            pages: vec![node("Home", "/", vec![])],
            ids: Default::default(),
        };
        let check = CheckReport {
            context,
            jobs: vec![
                PathBuf::from("/site/content/index.md"),
                PathBuf::from("/site/content/notes/a.md"),
            ],
        };

        let lines = format_check_output(&check, Some(Path::new("/site/site.toml")));
        assert_eq!(
            lines,
            vec![
                "Site",
                "    Config: /site/site.toml",
                "    Theme: theme/ (0 element rules)",
                "    Pool: 10 workers, process isolation",
                "",
                "Navigation",
                "    001 Home → /",
                "",
                "Pages",
                "    001 index.md",
                "    002 notes/a.md",
            ]
        );
    }

    #[test]
    fn check_output_without_config_file() {
        let check = CheckReport {
            context: dummy_context(),
            jobs: Vec::new(),
        };
        let lines = format_check_output(&check, None);
        assert_eq!(lines[1], "    Config: stock defaults");
        assert!(!lines.contains(&"Navigation".to_string()));
    }
}
