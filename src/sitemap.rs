//! Sitemap generation.
//!
//! One `<url>` per discovered content file, whether or not its build
//! succeeded. Locations are the output file paths under `origin`:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/directory/nested-page.html</loc>
//!   </url>
//! </urlset>
//! ```

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Error, Debug)]
#[error("Unable to write sitemap {}: {source}", path.display())]
pub struct SitemapError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Sitemap locations for `pages` (paths relative to the content root),
/// sorted.
pub fn locations(origin: &str, pages: &[PathBuf]) -> Vec<String> {
    let origin = origin.trim_end_matches('/');
    let mut locs: Vec<String> = pages
        .iter()
        .map(|page| {
            let rel = page.with_extension("html");
            let rel = rel.to_string_lossy().replace('\\', "/");
            format!("{origin}/{}", rel.trim_start_matches('/'))
        })
        .collect();
    locs.sort();
    locs.dedup();
    locs
}

pub fn to_xml(locations: &[String]) -> String {
    let mut xml = String::with_capacity(128 + locations.len() * 64);

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");
    for loc in locations {
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&escape_xml(loc));
        xml.push_str("</loc>\n  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Write the sitemap for `pages` to `path`.
pub fn write(path: &Path, origin: &str, pages: &[PathBuf]) -> Result<(), SitemapError> {
    let to_error = |source| SitemapError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    fs::write(path, to_xml(&locations(origin, pages))).map_err(to_error)?;
    tracing::debug!(path = %path.display(), urls = pages.len(), "sitemap written");
    Ok(())
}

fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pages(paths: &[&str]) -> Vec<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn locations_are_sorted_html_paths_under_origin() {
        let locs = locations(
            "https://example.com/",
            &pages(&["page.md", "directory/nested-page.md", "index.md"]),
        );
        assert_eq!(
            locs,
            vec![
                "https://example.com/directory/nested-page.html",
                "https://example.com/index.html",
                "https://example.com/page.html",
            ]
        );
    }

    #[test]
    fn empty_origin_gives_root_relative_locations() {
        assert_eq!(locations("", &pages(&["a.md"])), vec!["/a.html"]);
    }

    #[test]
    fn escape_xml_handles_all_specials() {
        assert_eq!(escape_xml("plain"), "plain");
        assert_eq!(
            escape_xml(r#"<a href="x">b & 'c'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;b &amp; &apos;c&apos;&lt;/a&gt;"
        );
    }

    #[test]
    fn empty_sitemap_is_valid_urlset() {
        let xml = to_xml(&[]);
        let lines: Vec<&str> = xml.lines().collect();
        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert_eq!(lines[1], format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        assert_eq!(lines[2], "</urlset>");
    }

    #[test]
    fn xml_escapes_locations() {
        let xml = to_xml(&["https://example.com/a&b.html".to_string()]);
        assert!(xml.contains("<loc>https://example.com/a&amp;b.html</loc>"));
        assert_eq!(xml.matches("<url>").count(), 1);
    }

    #[test]
    fn write_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("build/maps/sitemap.xml");

        write(&path, "https://example.com", &pages(&["index.md"])).unwrap();

        let xml = fs::read_to_string(&path).unwrap();
        assert!(xml.contains("<loc>https://example.com/index.html</loc>"));
    }
}
