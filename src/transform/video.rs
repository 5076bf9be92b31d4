//! Video pass. Sources go dormant; sizing comes only from the video's own
//! `width`/`height` attributes.

use super::{TransformReport, aspect, explicit_dimensions};
use crate::dom::Document;

pub(super) fn run(doc: &mut Document, report: &mut TransformReport) {
    for video in doc.elements_by_tag("video") {
        let mut targets = vec![video];
        targets.extend(doc.descendants(video));
        for id in targets {
            if let Some(el) = doc.element_mut(id)
                && el.relocate_attr("src", "data-src")
            {
                report.lazy += 1;
            }
        }

        let dims = doc.element(video).and_then(explicit_dimensions);
        if dims.is_some() {
            report.sized += 1;
        }
        aspect::wrap(doc, video, dims, &[]);
    }
}
