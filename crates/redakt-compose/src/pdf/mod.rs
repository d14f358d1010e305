// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lopdf-backed implementations of the collaborator seams, plus shared
// page-tree helpers.

use lopdf::{Document, Object, ObjectId};

use redakt_core::error::{RedaktError, Result};

pub mod assembler;
pub mod decoder;

/// /Parent chains are short in practice; the walk is bounded to survive a
/// malformed circular tree.
const MAX_PARENT_DEPTH: usize = 32;

/// Numeric value of a PDF object, accepting both integer and real.
pub(crate) fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

/// Resolve a page attribute that may be inherited from an ancestor /Pages
/// node, walking the /Parent chain.
pub(crate) fn inherited_attribute<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_PARENT_DEPTH {
        let dict = document.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            // The attribute itself may sit behind a reference.
            return match value {
                Object::Reference(id) => document.get_object(*id).ok(),
                direct => Some(direct),
            };
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// A page's media box as `(x0, y0, width, height)`, resolving inheritance.
pub(crate) fn media_box(document: &Document, page_id: ObjectId) -> Result<(f32, f32, f32, f32)> {
    let object = inherited_attribute(document, page_id, b"MediaBox")
        .ok_or_else(|| RedaktError::Pdf(format!("page {:?} has no /MediaBox", page_id)))?;
    let Object::Array(values) = object else {
        return Err(RedaktError::Pdf("/MediaBox is not an array".into()));
    };
    let numbers: Vec<f32> = values.iter().filter_map(as_number).collect();
    if numbers.len() != 4 {
        return Err(RedaktError::Pdf(format!(
            "/MediaBox has {} numeric entries, expected 4",
            numbers.len()
        )));
    }
    let (x0, y0) = (numbers[0].min(numbers[2]), numbers[1].min(numbers[3]));
    let (x1, y1) = (numbers[0].max(numbers[2]), numbers[1].max(numbers[3]));
    Ok((x0, y0, x1 - x0, y1 - y0))
}

/// Object id of a 1-based page number.
pub(crate) fn page_object_id(document: &Document, page_number: u32) -> Result<ObjectId> {
    let pages = document.get_pages();
    pages.get(&page_number).copied().ok_or_else(|| {
        RedaktError::Pdf(format!(
            "page {} out of range (document has {} pages)",
            page_number,
            pages.len()
        ))
    })
}

#[cfg(test)]
pub(crate) mod test_pdf {
    use lopdf::{Document, Object, Stream, dictionary};

    /// Minimal well-formed PDF with `count` letter-sized pages, for tests.
    pub fn single_source(count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for _ in 0..count {
            let content = doc.add_object(Object::Stream(Stream::new(
                dictionary! {},
                b"0.5 g 10 10 100 100 re f".to_vec(),
            )));
            let page = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "Resources" => dictionary! {},
                "Contents" => Object::Reference(content),
            });
            kids.push(Object::Reference(page));
        }
        // MediaBox is inherited from the page tree root on purpose.
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(kids),
                "Count" => count as i64,
                "MediaBox" => Object::Array(vec![
                    0.into(), 0.into(), 612.into(), 792.into(),
                ]),
            }),
        );
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog));
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("test PDF serializes");
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document;

    #[test]
    fn media_box_resolves_inherited_value() {
        let bytes = test_pdf::single_source(1);
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = page_object_id(&doc, 1).unwrap();
        let (x0, y0, w, h) = media_box(&doc, page_id).unwrap();
        assert_eq!((x0, y0), (0.0, 0.0));
        assert_eq!((w, h), (612.0, 792.0));
    }

    #[test]
    fn page_lookup_rejects_out_of_range() {
        let bytes = test_pdf::single_source(2);
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(page_object_id(&doc, 2).is_ok());
        assert!(matches!(page_object_id(&doc, 3), Err(RedaktError::Pdf(_))));
        assert!(matches!(page_object_id(&doc, 0), Err(RedaktError::Pdf(_))));
    }
}
