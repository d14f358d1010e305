// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Media-box decoder — a lopdf-backed source decoder that reads page count
// and page geometry from the PDF page tree and renders each page as a
// blank white canvas at the requested scale.
//
// Content rasterization needs a full PDF interpreter and is supplied by
// the embedding application through the `SourceDecoder` seam; this
// implementation keeps the rest of the pipeline (import, sessions, export)
// fully functional with correct page geometry.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use lopdf::Document;
use tracing::debug;

use redakt_core::error::{RedaktError, Result};

use super::{media_box, page_object_id};
use crate::source::{DecodedPage, SourceDecoder};

#[derive(Default)]
pub struct MediaBoxDecoder {
    /// Parsed documents keyed by buffer identity, so shared source bytes
    /// are parsed once across page_count and every render_page call.
    documents: HashMap<usize, Document>,
}

impl MediaBoxDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn document(&mut self, bytes: &Arc<[u8]>) -> Result<&Document> {
        let key = Arc::as_ptr(bytes) as *const u8 as usize;
        let document = match self.documents.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let parsed = Document::load_mem(bytes).map_err(|err| {
                    RedaktError::Decode(format!("cannot parse source PDF: {}", err))
                })?;
                debug!(pages = parsed.get_pages().len(), "source document parsed");
                entry.insert(parsed)
            }
        };
        Ok(document)
    }
}

impl SourceDecoder for MediaBoxDecoder {
    fn page_count(&mut self, bytes: &Arc<[u8]>) -> Result<u32> {
        Ok(self.document(bytes)?.get_pages().len() as u32)
    }

    fn render_page(
        &mut self,
        bytes: &Arc<[u8]>,
        page_number: u32,
        scale: f32,
    ) -> Result<DecodedPage> {
        let document = self.document(bytes)?;
        let page_id =
            page_object_id(document, page_number).map_err(|err| match err {
                RedaktError::Pdf(message) => RedaktError::Decode(message),
                other => other,
            })?;
        let (_, _, native_width, native_height) = media_box(document, page_id)?;

        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let width = ((native_width * scale).round() as u32).max(1);
        let height = ((native_height * scale).round() as u32).max(1);
        Ok(DecodedPage {
            raster: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
            native_width,
            native_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_pdf;
    use crate::source::import_source;

    #[test]
    fn counts_pages_and_scales_geometry() {
        let mut decoder = MediaBoxDecoder::new();
        let bytes: Arc<[u8]> = test_pdf::single_source(3).into();
        assert_eq!(decoder.page_count(&bytes).unwrap(), 3);

        let page = decoder.render_page(&bytes, 2, 2.0).unwrap();
        assert_eq!((page.native_width, page.native_height), (612.0, 792.0));
        assert_eq!((page.raster.width(), page.raster.height()), (1224, 1584));
    }

    #[test]
    fn garbage_bytes_fail_with_decode_error() {
        let mut decoder = MediaBoxDecoder::new();
        let bytes: Arc<[u8]> = b"not a pdf".to_vec().into();
        assert!(matches!(
            decoder.page_count(&bytes),
            Err(RedaktError::Decode(_))
        ));
    }

    #[test]
    fn import_through_decoder_yields_store_pages() {
        let mut decoder = MediaBoxDecoder::new();
        let pages = import_source(&mut decoder, test_pdf::single_source(2), 1.0).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!((pages[0].width, pages[0].height), (612, 792));
        assert_eq!(pages[1].source.as_ref().unwrap().page_number, 2);
    }
}
