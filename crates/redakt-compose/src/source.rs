// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator seams — the source-document decoder and the document writer.
//
// The core depends only on these contracts, never on the collaborators'
// internals. Source bytes are shared (`Arc<[u8]>`) across every page that
// originates from the same upload so implementations can decode once and
// cache by buffer identity.

use std::sync::Arc;

use image::RgbaImage;
use tracing::{info, instrument};

use redakt_core::error::Result;
use redakt_scene::store::Page;

/// One rendered source page.
#[derive(Debug, Clone)]
pub struct DecodedPage {
    /// Page raster at the requested upscale factor.
    pub raster: RgbaImage,
    /// Native page width in document units (PDF points).
    pub native_width: f32,
    /// Native page height in document units.
    pub native_height: f32,
}

/// Turns uploaded document bytes into per-page raster images.
pub trait SourceDecoder {
    /// Number of pages in the document.
    fn page_count(&mut self, bytes: &Arc<[u8]>) -> Result<u32>;

    /// Render one page (1-based) at `scale` times its native size.
    fn render_page(&mut self, bytes: &Arc<[u8]>, page_number: u32, scale: f32)
    -> Result<DecodedPage>;
}

/// Assembles the output document: copied source pages and blanks, page
/// rotation, raster overlays, final serialization.
pub trait DocumentWriter {
    /// Handle to a page of the output document.
    type PageRef: Copy;

    /// Copy a page (1-based) out of a source document. Implementations must
    /// decode each distinct source at most once, keyed by buffer identity.
    fn copy_page(&mut self, bytes: &Arc<[u8]>, page_number: u32) -> Result<Self::PageRef>;

    /// Append a fresh blank page of `width` x `height` document units.
    fn blank_page(&mut self, width: f32, height: f32) -> Result<Self::PageRef>;

    /// The page's width/height in document units, ignoring its rotation.
    fn page_size(&self, page: Self::PageRef) -> Result<(f32, f32)>;

    /// Add `degrees` onto the page's existing rotation (rotations compose,
    /// they do not replace), wrapping mod 360.
    fn compose_rotation(&mut self, page: Self::PageRef, degrees: u16) -> Result<()>;

    /// Draw a raster onto the page: placed at `(x, y)` in the writer's
    /// coordinate space, scaled to `width` x `height` document units, and
    /// rotated counterclockwise by `rotate_ccw` degrees about `(x, y)`.
    #[allow(clippy::too_many_arguments)]
    fn draw_image(
        &mut self,
        page: Self::PageRef,
        raster: &RgbaImage,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rotate_ccw: u16,
    ) -> Result<()>;

    /// Serialize the assembled document to bytes.
    fn finish(self) -> Result<Vec<u8>>;
}

/// Decode one uploaded document into store pages, sharing the source bytes
/// across all of them.
///
/// A decode failure aborts this file's import only — the caller carries on
/// with its remaining files.
#[instrument(skip_all, fields(bytes_len = bytes.len(), scale))]
pub fn import_source<D: SourceDecoder + ?Sized>(
    decoder: &mut D,
    bytes: Vec<u8>,
    scale: f32,
) -> Result<Vec<Page>> {
    let shared: Arc<[u8]> = bytes.into();
    let count = decoder.page_count(&shared)?;
    let mut pages = Vec::with_capacity(count as usize);
    for page_number in 1..=count {
        let decoded = decoder.render_page(&shared, page_number, scale)?;
        pages.push(Page::from_source(shared.clone(), page_number, decoded.raster));
    }
    info!(pages = pages.len(), "source document imported");
    Ok(pages)
}
