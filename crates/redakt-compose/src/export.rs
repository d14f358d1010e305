// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export compositor — flattens each stored page's annotations to a
// transparent overlay raster and places it, rotation-correctly, onto the
// corresponding page of the output document.
//
// The compositor reads the page store only, never the live editing surface:
// each overlay is rebuilt from the serialized scene against a static
// background of its own, mosaics re-baked against that background. Export
// never mutates the store; any failure aborts the whole export and no
// partial document is produced.

use tracing::{debug, info, instrument};

use redakt_core::error::{RedaktError, Result};
use redakt_core::geometry::effective_dimensions;
use redakt_core::types::Rotation;
use redakt_raster::mosaic::bake_object;
use redakt_raster::surface::{Renderer, is_fully_transparent};
use redakt_scene::scene::Scene;
use redakt_scene::store::{Page, PageStore};

use crate::source::DocumentWriter;

/// Where and how an overlay lands on its target page.
///
/// The overlay is rasterized in viewed (post-rotation) space while the
/// target page carries the rotation in metadata, so the draw call must
/// pre-rotate the overlay counterclockwise by the page rotation. The
/// translation compensates for the rotation pivot at the draw origin:
/// offsets are expressed against the page's width/height as reported
/// *before* the rotation visually swaps them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotate_ccw: u16,
}

pub(crate) fn placement_for(rotation: Rotation, page_w: f32, page_h: f32) -> Placement {
    let (x, y) = match rotation {
        Rotation::R0 => (0.0, 0.0),
        Rotation::R90 => (page_w, 0.0),
        Rotation::R180 => (page_w, page_h),
        Rotation::R270 => (0.0, page_h),
    };
    // Draw size follows the overlay's own axes: swapped page dimensions
    // for quarter turns, so the rotated overlay covers the page exactly.
    let (width, height) = if rotation.swaps_axes() {
        (page_h, page_w)
    } else {
        (page_w, page_h)
    };
    Placement {
        x,
        y,
        width,
        height,
        rotate_ccw: rotation.degrees(),
    }
}

/// Export every page of the store, in order, into one output document.
#[instrument(skip_all, fields(pages = store.len()))]
pub fn export_document<W: DocumentWriter>(
    store: &PageStore,
    renderer: &Renderer,
    mut writer: W,
) -> Result<Vec<u8>> {
    if store.is_empty() {
        return Err(RedaktError::Export("no pages to export".into()));
    }

    for (index, page) in store.iter().enumerate() {
        let target = match &page.source {
            Some(source) => writer.copy_page(&source.bytes, source.page_number)?,
            None => writer.blank_page(page.width as f32, page.height as f32)?,
        };

        // Rotations compose onto whatever the source page already carries.
        if page.rotation != Rotation::R0 {
            writer.compose_rotation(target, page.rotation.degrees())?;
        }

        let overlay = match render_overlay(renderer, page)? {
            Some(overlay) => overlay,
            None => {
                debug!(index, "page has no visible annotations, overlay skipped");
                continue;
            }
        };

        let (page_w, page_h) = writer.page_size(target)?;
        let placement = placement_for(page.rotation, page_w, page_h);
        writer.draw_image(
            target,
            &overlay,
            placement.x,
            placement.y,
            placement.width,
            placement.height,
            placement.rotate_ccw,
        )?;
        debug!(index, ?placement, "overlay embedded");
    }

    let bytes = writer.finish()?;
    info!(bytes = bytes.len(), "export complete");
    Ok(bytes)
}

/// Rebuild a page's annotation layer from its stored scene, independently
/// of any live surface.
///
/// Mosaics are re-baked against this static scene's own background; the
/// background itself is then discarded — the merged page already supplies
/// it — leaving a transparent-background raster of annotations only.
/// Returns `None` when there is nothing visible to embed.
fn render_overlay(renderer: &Renderer, page: &Page) -> Result<Option<image::RgbaImage>> {
    if page.scene.is_empty() {
        return Ok(None);
    }
    let (width, height) = effective_dimensions(page.width, page.height, page.rotation);
    let background = renderer.background(&page.base, page.rotation, width, height);

    let mut scene = Scene::from_document(&page.scene);
    for object_id in scene.mosaic_ids() {
        let baked = bake_object(renderer, &background, scene.objects(), object_id)?;
        if let Some(pixels) = baked {
            if let Some(object) = scene.object_mut(object_id) {
                object.set_baked(Some(pixels));
            }
        }
    }

    let overlay = renderer.compose(None, scene.objects(), None, width, height)?;
    if is_fully_transparent(&overlay) {
        return Ok(None);
    }
    Ok(Some(overlay))
}
