// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembler — the lopdf-backed document writer.
//
// Builds the output document page by page: source pages are deep-cloned out
// of their original files (each distinct source parsed once, cached by
// buffer identity), blanks are created fresh, and overlays are embedded as
// RGB image XObjects with a DeviceGray soft mask carrying the alpha channel.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument, warn};

use redakt_core::error::{RedaktError, Result};

use super::{inherited_attribute, media_box, page_object_id};
use crate::source::DocumentWriter;

pub struct PdfAssembler {
    document: Document,
    /// Root /Pages node of the output page tree.
    pages_id: ObjectId,
    /// Parsed source documents, keyed by the identity of their shared byte
    /// buffer so each upload is parsed at most once.
    sources: HashMap<usize, Document>,
    /// Pages whose original content has been fenced with a q/Q pair.
    fenced: HashSet<ObjectId>,
    image_count: u32,
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(Vec::new()),
                "Count" => 0,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        document.trailer.set("Root", Object::Reference(catalog_id));
        Self {
            document,
            pages_id,
            sources: HashMap::new(),
            fenced: HashSet::new(),
            image_count: 0,
        }
    }

    fn page_dictionary(&self, page: ObjectId) -> Result<&Dictionary> {
        self.document
            .get_dictionary(page)
            .map_err(|err| RedaktError::Pdf(format!("cannot read page {:?}: {}", page, err)))
    }

    /// Append a page reference to /Kids and bump /Count.
    fn append_kid(&mut self, page: ObjectId) -> Result<()> {
        let Ok(Object::Dictionary(pages)) = self.document.get_object_mut(self.pages_id) else {
            return Err(RedaktError::Pdf("page tree root is not a dictionary".into()));
        };
        if let Ok(Object::Array(kids)) = pages.get_mut(b"Kids") {
            kids.push(Object::Reference(page));
        }
        if let Ok(Object::Integer(count)) = pages.get_mut(b"Count") {
            *count += 1;
        }
        Ok(())
    }

    /// Register an image XObject under `name` in the page's resources.
    ///
    /// Resources (and the XObject table inside them) are pulled inline onto
    /// the page first. Cloned pages own their resource objects outright, so
    /// inlining never breaks sharing with another page.
    fn register_xobject(&mut self, page: ObjectId, name: &str, xobject: ObjectId) -> Result<()> {
        let mut resources = {
            let dict = self.page_dictionary(page)?;
            match dict.get(b"Resources") {
                Ok(Object::Dictionary(inline)) => inline.clone(),
                Ok(Object::Reference(id)) => match self.document.get_object(*id) {
                    Ok(Object::Dictionary(referenced)) => referenced.clone(),
                    _ => Dictionary::new(),
                },
                _ => Dictionary::new(),
            }
        };
        let mut xobjects = match resources.get(b"XObject") {
            Ok(Object::Dictionary(inline)) => inline.clone(),
            Ok(Object::Reference(id)) => match self.document.get_object(*id) {
                Ok(Object::Dictionary(referenced)) => referenced.clone(),
                _ => Dictionary::new(),
            },
            _ => Dictionary::new(),
        };
        xobjects.set(name, Object::Reference(xobject));
        resources.set("XObject", Object::Dictionary(xobjects));
        if let Ok(Object::Dictionary(dict)) = self.document.get_object_mut(page) {
            dict.set("Resources", Object::Dictionary(resources));
        }
        Ok(())
    }

    /// Append a content stream after the page's existing content.
    ///
    /// The first append on a page also fences the original content between
    /// a leading `q` stream and a `Q` at the head of the appended stream, so
    /// graphics state leaked by the original operators cannot skew the
    /// overlay placement.
    fn append_content(&mut self, page: ObjectId, ops: String) -> Result<()> {
        let first_append = self.fenced.insert(page);
        let front = if first_append {
            Some(self.document.add_object(Object::Stream(Stream::new(
                dictionary! {},
                b"q\n".to_vec(),
            ))))
        } else {
            None
        };
        let ops = if first_append { format!("Q\n{}", ops) } else { ops };
        let back = self
            .document
            .add_object(Object::Stream(Stream::new(dictionary! {}, ops.into_bytes())));

        // Normalize /Contents to an array regardless of its current shape.
        let existing: Vec<Object> = {
            let dict = self.page_dictionary(page)?;
            match dict.get(b"Contents") {
                Ok(Object::Array(items)) => items.clone(),
                Ok(Object::Reference(id)) => match self.document.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(other) => vec![other.clone()],
                Err(_) => Vec::new(),
            }
        };
        let mut contents = Vec::with_capacity(existing.len() + 2);
        if let Some(front) = front {
            contents.push(Object::Reference(front));
        }
        contents.extend(existing);
        contents.push(Object::Reference(back));
        if let Ok(Object::Dictionary(dict)) = self.document.get_object_mut(page) {
            dict.set("Contents", Object::Array(contents));
        }
        Ok(())
    }
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentWriter for PdfAssembler {
    type PageRef = ObjectId;

    #[instrument(skip_all, fields(page_number))]
    fn copy_page(&mut self, bytes: &Arc<[u8]>, page_number: u32) -> Result<ObjectId> {
        let key = Arc::as_ptr(bytes) as *const u8 as usize;
        let source = match self.sources.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let parsed = Document::load_mem(bytes).map_err(|err| {
                    RedaktError::Pdf(format!("cannot parse source PDF: {}", err))
                })?;
                debug!(pages = parsed.get_pages().len(), "source document parsed and cached");
                entry.insert(parsed)
            }
        };
        let page_id = page_object_id(source, page_number)?;
        let cloned = clone_page(source, &mut self.document, page_id)?;

        if let Ok(Object::Dictionary(dict)) = self.document.get_object_mut(cloned) {
            dict.set("Parent", Object::Reference(self.pages_id));
        }
        self.append_kid(cloned)?;
        debug!(?cloned, "source page cloned into output");
        Ok(cloned)
    }

    fn blank_page(&mut self, width: f32, height: f32) -> Result<ObjectId> {
        let content = self
            .document
            .add_object(Object::Stream(Stream::new(dictionary! {}, Vec::new())));
        let page = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => Object::Array(vec![
                0.into(),
                0.into(),
                Object::Real(width),
                Object::Real(height),
            ]),
            "Resources" => dictionary! {},
            "Contents" => Object::Reference(content),
        });
        self.append_kid(page)?;
        debug!(?page, width, height, "blank page appended");
        Ok(page)
    }

    fn page_size(&self, page: ObjectId) -> Result<(f32, f32)> {
        let (_, _, width, height) = media_box(&self.document, page)?;
        Ok((width, height))
    }

    fn compose_rotation(&mut self, page: ObjectId, degrees: u16) -> Result<()> {
        let existing = self
            .page_dictionary(page)?
            .get(b"Rotate")
            .ok()
            .and_then(|value| value.as_i64().ok())
            .unwrap_or(0);
        let merged = (existing + degrees as i64).rem_euclid(360);
        if let Ok(Object::Dictionary(dict)) = self.document.get_object_mut(page) {
            dict.set("Rotate", Object::Integer(merged));
        }
        debug!(existing, merged, "page rotation composed");
        Ok(())
    }

    fn draw_image(
        &mut self,
        page: ObjectId,
        raster: &RgbaImage,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rotate_ccw: u16,
    ) -> Result<()> {
        let (cos, sin): (i32, i32) = match rotate_ccw % 360 {
            0 => (1, 0),
            90 => (0, 1),
            180 => (-1, 0),
            270 => (0, -1),
            other => {
                return Err(RedaktError::Pdf(format!(
                    "image rotation must be a quarter-turn, got {}",
                    other
                )));
            }
        };

        let (px_w, px_h) = raster.dimensions();
        let mut rgb = Vec::with_capacity((px_w * px_h * 3) as usize);
        let mut alpha = Vec::with_capacity((px_w * px_h) as usize);
        for pixel in raster.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let smask = self.document.add_object(Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => px_w as i64,
                "Height" => px_h as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        )));
        let xobject = self.document.add_object(Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => px_w as i64,
                "Height" => px_h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => Object::Reference(smask),
            },
            rgb,
        )));

        let name = format!("RdkIm{}", self.image_count);
        self.image_count += 1;
        self.register_xobject(page, &name, xobject)?;

        // Placement is relative to the media box origin, which is not
        // always (0, 0).
        let (x0, y0, _, _) = media_box(&self.document, page)?;
        let (a, b) = (width * cos as f32, width * sin as f32);
        let (c, d) = (-height * sin as f32, height * cos as f32);
        let (tx, ty) = (x0 + x, y0 + y);
        let ops = format!("q\n{a} {b} {c} {d} {tx} {ty} cm\n/{name} Do\nQ\n");
        self.append_content(page, ops)?;

        debug!(name, px_w, px_h, rotate_ccw, "overlay image embedded");
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let pages = self.document.get_pages().len();
        self.document.compress();
        let mut bytes = Vec::new();
        self.document
            .save_to(&mut bytes)
            .map_err(|err| RedaktError::Pdf(format!("cannot serialize output: {}", err)))?;
        info!(pages, bytes = bytes.len(), "output document serialized");
        Ok(bytes)
    }
}

/// Clone a page object and everything it transitively references from
/// `source` into `target`, pinning attributes the page inherits from its
/// original page tree (the clone leaves its /Parent chain behind).
fn clone_page(source: &Document, target: &mut Document, page_id: ObjectId) -> Result<ObjectId> {
    let page_object = source
        .get_object(page_id)
        .map_err(|err| RedaktError::Pdf(format!("cannot read page object {:?}: {}", page_id, err)))?;
    let cloned_object = deep_clone_object(source, target, page_object)?;
    let cloned_id = target.add_object(cloned_object);

    for key in [&b"MediaBox"[..], b"Resources", b"Rotate", b"CropBox"] {
        let already_present = target
            .get_dictionary(cloned_id)
            .map(|dict| dict.has(key))
            .unwrap_or(false);
        if already_present {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page_id, key) {
            let pinned = deep_clone_object(source, target, value)?;
            if let Ok(Object::Dictionary(dict)) = target.get_object_mut(cloned_id) {
                dict.set(key, pinned);
            }
        }
    }
    Ok(cloned_id)
}

/// Deep-clone a single lopdf object, recursively resolving references.
/// /Parent is deliberately skipped; the caller patches it.
fn deep_clone_object(source: &Document, target: &mut Document, object: &Object) -> Result<Object> {
    match object {
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned = deep_clone_object(source, target, value)?;
                new_dict.set(key.clone(), cloned);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(items) => {
            let mut new_items = Vec::with_capacity(items.len());
            for item in items {
                new_items.push(deep_clone_object(source, target, item)?);
            }
            Ok(Object::Array(new_items))
        }
        Object::Reference(ref_id) => match source.get_object(*ref_id) {
            Ok(referenced) => {
                let cloned = deep_clone_object(source, target, referenced)?;
                let new_id = target.add_object(cloned);
                Ok(Object::Reference(new_id))
            }
            Err(err) => {
                warn!(?ref_id, %err, "cannot resolve reference, using Null");
                Ok(Object::Null)
            }
        },
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned = deep_clone_object(source, target, value)?;
                new_dict.set(key.clone(), cloned);
            }
            Ok(Object::Stream(Stream::new(new_dict, stream.content.clone())))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_pdf;
    use image::Rgba;

    fn reload(bytes: &[u8]) -> Document {
        Document::load_mem(bytes).expect("output parses")
    }

    #[test]
    fn blank_pages_round_trip_with_their_size() {
        let mut assembler = PdfAssembler::new();
        let page = assembler.blank_page(612.0, 792.0).unwrap();
        assert_eq!(assembler.page_size(page).unwrap(), (612.0, 792.0));

        let doc = reload(&assembler.finish().unwrap());
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn copied_pages_keep_inherited_media_box() {
        let bytes: Arc<[u8]> = test_pdf::single_source(2).into();
        let mut assembler = PdfAssembler::new();
        // Copy in reverse to prove output order follows the calls.
        let second = assembler.copy_page(&bytes, 2).unwrap();
        let first = assembler.copy_page(&bytes, 1).unwrap();
        // Inherited MediaBox is pinned onto the clone itself.
        assert_eq!(assembler.page_size(second).unwrap(), (612.0, 792.0));
        assert_eq!(assembler.page_size(first).unwrap(), (612.0, 792.0));
        assert_eq!(assembler.sources.len(), 1);

        let doc = reload(&assembler.finish().unwrap());
        assert_eq!(doc.get_pages().len(), 2);
        for (_, page_id) in doc.get_pages() {
            assert!(doc.get_dictionary(page_id).unwrap().has(b"MediaBox"));
        }
    }

    #[test]
    fn rotation_composes_onto_existing_value() {
        let mut assembler = PdfAssembler::new();
        let page = assembler.blank_page(100.0, 200.0).unwrap();
        assembler.compose_rotation(page, 90).unwrap();
        assembler.compose_rotation(page, 90).unwrap();

        let doc = reload(&assembler.finish().unwrap());
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let rotate = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Rotate")
            .unwrap()
            .as_i64()
            .unwrap();
        assert_eq!(rotate, 180);
    }

    #[test]
    fn drawn_image_lands_in_resources_and_contents() {
        let mut assembler = PdfAssembler::new();
        let page = assembler.blank_page(200.0, 100.0).unwrap();
        let raster = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128]));
        assembler
            .draw_image(page, &raster, 0.0, 0.0, 200.0, 100.0, 0)
            .unwrap();

        let doc = reload(&assembler.finish().unwrap());
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let dict = doc.get_dictionary(page_id).unwrap();

        let Ok(Object::Dictionary(resources)) = dict.get(b"Resources") else {
            panic!("resources not inline");
        };
        let Ok(Object::Dictionary(xobjects)) = resources.get(b"XObject") else {
            panic!("no XObject table");
        };
        assert!(xobjects.has(b"RdkIm0"));
        let Ok(Object::Reference(image_id)) = xobjects.get(b"RdkIm0") else {
            panic!("image is not a reference");
        };
        let image = doc.get_object(*image_id).unwrap();
        let Object::Stream(stream) = image else {
            panic!("image is not a stream");
        };
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert!(stream.dict.has(b"SMask"));

        // Fence stream + original blank content + overlay ops.
        let Ok(Object::Array(contents)) = dict.get(b"Contents") else {
            panic!("contents not an array");
        };
        assert_eq!(contents.len(), 3);
    }

    #[test]
    fn non_quarter_turn_image_rotation_is_rejected() {
        let mut assembler = PdfAssembler::new();
        let page = assembler.blank_page(100.0, 100.0).unwrap();
        let raster = RgbaImage::new(2, 2);
        let result = assembler.draw_image(page, &raster, 0.0, 0.0, 10.0, 10.0, 45);
        assert!(matches!(result, Err(RedaktError::Pdf(_))));
    }

    #[test]
    fn corrupt_source_bytes_are_a_pdf_error() {
        let bytes: Arc<[u8]> = vec![0u8; 16].into();
        let mut assembler = PdfAssembler::new();
        assert!(matches!(
            assembler.copy_page(&bytes, 1),
            Err(RedaktError::Pdf(_))
        ));
    }

    #[test]
    fn second_image_on_a_page_reuses_the_fence() {
        let mut assembler = PdfAssembler::new();
        let page = assembler.blank_page(100.0, 100.0).unwrap();
        let raster = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        assembler.draw_image(page, &raster, 0.0, 0.0, 50.0, 50.0, 0).unwrap();
        assembler.draw_image(page, &raster, 50.0, 0.0, 50.0, 50.0, 0).unwrap();

        let doc = reload(&assembler.finish().unwrap());
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let dict = doc.get_dictionary(page_id).unwrap();
        let Ok(Object::Array(contents)) = dict.get(b"Contents") else {
            panic!("contents not an array");
        };
        // One fence, one original stream, two overlay streams.
        assert_eq!(contents.len(), 4);
    }
}
