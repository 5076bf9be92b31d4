//! Img and picture passes.
//!
//! The img pass resolves every image's dimensions concurrently (one
//! `join_all` per page) and remembers the answers so the picture pass can
//! reuse them for its first descendant `img` instead of probing twice.

use super::{TransformReport, aspect, explicit_dimensions};
use crate::dom::{Document, NodeId};
use crate::imaging::{DimensionProbe, Dimensions};
use futures::future::join_all;
use std::collections::HashMap;

/// Resolved dimensions per `img` node, `None` when unresolved.
pub(super) type Resolved = HashMap<NodeId, Option<Dimensions>>;

struct Lookup {
    id: NodeId,
    explicit: Option<Dimensions>,
    src: Option<String>,
}

fn lookup_for(doc: &Document, id: NodeId) -> Option<Lookup> {
    let el = doc.element(id)?;
    Some(Lookup {
        id,
        explicit: explicit_dimensions(el),
        src: el
            .attr("src")
            .or_else(|| el.attr("data-src"))
            .map(str::to_string),
    })
}

async fn resolve_all<P: DimensionProbe>(lookups: &[Lookup], probe: &P) -> Vec<Option<Dimensions>> {
    join_all(lookups.iter().map(|lookup| async move {
        if lookup.explicit.is_some() {
            return lookup.explicit;
        }
        match &lookup.src {
            Some(src) => probe.probe(src).await.filter(|d| d.width > 0 && d.height > 0),
            None => None,
        }
    }))
    .await
}

fn write_dimensions(doc: &mut Document, id: NodeId, dims: Dimensions) {
    if let Some(el) = doc.element_mut(id) {
        el.set_attr("width", dims.width.to_string());
        el.set_attr("height", dims.height.to_string());
    }
}

pub(super) async fn run_img<P: DimensionProbe>(
    doc: &mut Document,
    probe: &P,
    report: &mut TransformReport,
) -> Resolved {
    let ids = doc.elements_by_tag("img");
    for id in &ids {
        if let Some(el) = doc.element_mut(*id) {
            if el.relocate_attr("src", "data-src") {
                report.lazy += 1;
            }
            el.set_attr("loading", "lazy");
        }
    }

    let lookups: Vec<Lookup> = ids.iter().filter_map(|id| lookup_for(doc, *id)).collect();
    let results = resolve_all(&lookups, probe).await;

    let mut resolved = Resolved::new();
    for (lookup, dims) in lookups.iter().zip(results) {
        match dims {
            Some(dims) => write_dimensions(doc, lookup.id, dims),
            None => report.unresolved += 1,
        }
        resolved.insert(lookup.id, dims);

        if !doc.has_ancestor(lookup.id, "picture") {
            if dims.is_some() {
                report.sized += 1;
            }
            aspect::wrap(doc, lookup.id, dims, &[]);
        }
    }
    resolved
}

pub(super) async fn run_picture<P: DimensionProbe>(
    doc: &mut Document,
    probe: &P,
    resolved: &Resolved,
    report: &mut TransformReport,
) {
    let pictures = doc.elements_by_tag("picture");

    let mut known: Vec<Option<Dimensions>> = Vec::with_capacity(pictures.len());
    let mut fresh_slots: Vec<usize> = Vec::new();
    let mut fresh: Vec<Lookup> = Vec::new();
    for (index, picture) in pictures.iter().enumerate() {
        let first_img = doc.first_descendant_by_tag(*picture, "img");
        match first_img.and_then(|img| resolved.get(&img).copied()) {
            Some(dims) => known.push(dims),
            None => {
                known.push(None);
                if let Some(lookup) = first_img.and_then(|img| lookup_for(doc, img)) {
                    fresh_slots.push(index);
                    fresh.push(lookup);
                }
            }
        }
    }

    let results = resolve_all(&fresh, probe).await;
    for (index, dims) in fresh_slots.into_iter().zip(results) {
        known[index] = dims;
    }

    for (picture, dims) in pictures.into_iter().zip(known) {
        if let Some(dims) = dims {
            write_dimensions(doc, picture, dims);
            report.sized += 1;
        }
        aspect::wrap(doc, picture, dims, &[]);
    }
}
