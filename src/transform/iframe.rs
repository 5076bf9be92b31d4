//! Iframe pass: lazy `data-src`, video-host query rewrite, 16:9 container.

use super::{TransformReport, aspect, explicit_dimensions};
use crate::dom::Document;
use url::Url;

const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtube-nocookie.com"];
const VIDEO_QUERY: &str = "modestbranding=1&rel=0";

fn is_video_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    VIDEO_HOSTS
        .iter()
        .any(|known| host == *known || host.ends_with(&format!(".{known}")))
}

/// Rewrite the query of a video embed URL. `None` when the URL is not a
/// video embed (or cannot be parsed).
pub fn rewrite_video_src(src: &str) -> Option<String> {
    let protocol_relative = src.starts_with("//");
    let absolute = if protocol_relative {
        format!("https:{src}")
    } else {
        src.to_string()
    };

    let mut url = Url::parse(&absolute).ok()?;
    if !is_video_host(url.host_str()?) {
        return None;
    }
    url.set_query(Some(VIDEO_QUERY));

    let rewritten = url.to_string();
    if protocol_relative {
        Some(rewritten.trim_start_matches("https:").to_string())
    } else {
        Some(rewritten)
    }
}

pub(super) fn run(doc: &mut Document, report: &mut TransformReport) {
    for id in doc.elements_by_tag("iframe") {
        let Some(el) = doc.element_mut(id) else {
            continue;
        };

        if el.relocate_attr("src", "data-src") {
            report.lazy += 1;
        }
        el.set_attr("loading", "lazy");
        el.remove_attr("style");

        let mut widescreen = false;
        if let Some(rewritten) = el.attr("data-src").and_then(rewrite_video_src) {
            el.set_attr("data-src", rewritten);
            widescreen = true;
        }

        let dims = explicit_dimensions(el);
        if dims.is_some() {
            report.sized += 1;
        }
        let extra: &[&str] = if widescreen {
            &[aspect::WIDESCREEN_CLASS]
        } else {
            &[]
        };
        aspect::wrap(doc, id, dims, extra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_query_is_replaced() {
        assert_eq!(
            rewrite_video_src("https://www.youtube.com/embed/abc?autoplay=1&foo=bar").as_deref(),
            Some("https://www.youtube.com/embed/abc?modestbranding=1&rel=0")
        );
        assert_eq!(
            rewrite_video_src("//www.youtube-nocookie.com/embed/abc").as_deref(),
            Some("//www.youtube-nocookie.com/embed/abc?modestbranding=1&rel=0")
        );
    }

    #[test]
    fn other_hosts_are_left_alone() {
        assert_eq!(rewrite_video_src("https://player.vimeo.com/video/1"), None);
        assert_eq!(rewrite_video_src("https://notyoutube.com/embed/1"), None);
        assert_eq!(rewrite_video_src("/local/embed.html"), None);
    }
}
