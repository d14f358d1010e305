// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Composition plans — the JSON description of an output document: which
// source pages and blanks it contains, in what order, with what rotation
// and annotations.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use redakt_compose::{SourceDecoder, import_source};
use redakt_core::error::{RedaktError, Result};
use redakt_core::types::Rotation;
use redakt_scene::object::SceneObject;
use redakt_scene::scene::Scene;
use redakt_scene::store::{Page, PageStore};

/// A whole output document.
///
/// ```json
/// {
///   "sources": ["report.pdf"],
///   "pages": [
///     { "source": 0, "page": 1, "rotate": 90 },
///     { "width": 612, "height": 792,
///       "objects": [ { "center": { "x": 306, "y": 396 },
///                      "size": { "w": 200, "h": 40 },
///                      "opacity": 1.0,
///                      "kind": { "type": "FilledRect",
///                                "fill": { "r": 0, "g": 0, "b": 0 } } } ] }
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ComposePlan {
    /// Raster upscale factor for page backgrounds.
    #[serde(default)]
    pub render_scale: Option<f32>,
    /// TrueType/OpenType font for text annotations.
    #[serde(default)]
    pub font: Option<PathBuf>,
    /// Source PDFs, referenced by index from page entries.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    pub pages: Vec<PagePlan>,
}

/// One page of the output, in output order.
#[derive(Debug, Deserialize)]
pub struct PagePlan {
    #[serde(flatten)]
    pub origin: PageOrigin,
    /// Clockwise rotation in degrees, composed onto the source page's own.
    #[serde(default)]
    pub rotate: u16,
    /// Annotations, back to front. Object ids may be omitted.
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PageOrigin {
    /// A page copied out of a listed source (`page` is 1-based).
    Source { source: usize, page: u32 },
    /// A fresh blank page. Dimensions are pixels, exported at one point
    /// per pixel.
    Blank { width: u32, height: u32 },
}

/// Realize a plan as a page store: import every listed source once, then
/// assemble the pages in plan order.
pub fn build_store<D: SourceDecoder + ?Sized>(
    plan: &ComposePlan,
    decoder: &mut D,
    render_scale: f32,
) -> Result<PageStore> {
    let mut imported: Vec<Vec<Page>> = Vec::with_capacity(plan.sources.len());
    for path in &plan.sources {
        let bytes = std::fs::read(path)?;
        let pages = import_source(decoder, bytes, render_scale)?;
        debug!(path = %path.display(), pages = pages.len(), "source imported");
        imported.push(pages);
    }

    let mut store = PageStore::new();
    for (index, entry) in plan.pages.iter().enumerate() {
        let mut page = match &entry.origin {
            PageOrigin::Source { source, page } => {
                let pages = imported.get(*source).ok_or_else(|| {
                    RedaktError::Decode(format!(
                        "plan page {}: source index {} out of range ({} sources listed)",
                        index,
                        source,
                        plan.sources.len()
                    ))
                })?;
                let template = page
                    .checked_sub(1)
                    .and_then(|i| pages.get(i as usize))
                    .ok_or_else(|| {
                        RedaktError::Decode(format!(
                            "plan page {}: source {} has no page {} ({} pages)",
                            index,
                            source,
                            page,
                            pages.len()
                        ))
                    })?;
                let origin = template.source.as_ref().ok_or_else(|| {
                    RedaktError::Decode(format!(
                        "plan page {}: imported page lost its source reference",
                        index
                    ))
                })?;
                // Fresh page id per plan entry, so the same source page can
                // appear more than once.
                Page::from_source(origin.bytes.clone(), origin.page_number, template.base.clone())
            }
            PageOrigin::Blank { width, height } => Page::blank(*width, *height),
        };

        page.rotation = Rotation::from_degrees(entry.rotate as i32).ok_or_else(|| {
            RedaktError::Decode(format!(
                "plan page {}: rotation {} is not a quarter-turn",
                index, entry.rotate
            ))
        })?;

        if !entry.objects.is_empty() {
            let mut scene = Scene::new();
            for object in &entry.objects {
                scene.add(object.clone());
            }
            page.scene = scene.to_document();
        }
        store.insert_pages(vec![page], None);
    }
    Ok(store)
}
