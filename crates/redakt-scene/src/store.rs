// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page store — the ordered list of pages making up the working document.
//
// Each page carries its base raster (background + thumbnail source), its
// serialized scene, pixel dimensions in unrotated space, and its rotation.
// Page ids are globally unique and stable across reorder and rotation.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use redakt_core::types::{PageId, Rotation, RotationStep};
use tracing::debug;

use crate::scene::SceneDocument;

/// Reference into an uploaded source document. The raw bytes are shared
/// across every page originating from the same upload so the source is
/// decoded once.
#[derive(Debug, Clone)]
pub struct SourceRef {
    pub bytes: Arc<[u8]>,
    /// 1-based page number within the source document.
    pub page_number: u32,
}

/// One unit of the output document.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: PageId,
    /// `None` for blank pages.
    pub source: Option<SourceRef>,
    /// Rendered background raster in unrotated space.
    pub base: RgbaImage,
    /// The page's annotations, serialized. Empty for a fresh page.
    pub scene: SceneDocument,
    /// Pixel width in unrotated space.
    pub width: u32,
    /// Pixel height in unrotated space.
    pub height: u32,
    pub rotation: Rotation,
}

impl Page {
    /// Page backed by a rendered source-document page.
    pub fn from_source(bytes: Arc<[u8]>, page_number: u32, base: RgbaImage) -> Self {
        let (width, height) = (base.width(), base.height());
        Self {
            id: PageId::new(),
            source: Some(SourceRef { bytes, page_number }),
            base,
            scene: SceneDocument::default(),
            width,
            height,
            rotation: Rotation::R0,
        }
    }

    /// Blank white page of the given pixel dimensions.
    pub fn blank(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            id: PageId::new(),
            source: None,
            base: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
            scene: SceneDocument::default(),
            width,
            height,
            rotation: Rotation::R0,
        }
    }
}

/// Ordered, user-controlled page list. The only resource read and written
/// across page switches; all mutation funnels through these methods.
#[derive(Debug, Default)]
pub struct PageStore {
    pages: Vec<Page>,
    /// Number of scene writes that actually changed stored data.
    scene_writes: u64,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Access ---------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn page_at(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn index_of(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    pub fn scene_writes(&self) -> u64 {
        self.scene_writes
    }

    // -- Mutation -------------------------------------------------------------

    /// Insert pages at `index` (`None` appends). Returns the ids inserted,
    /// in order.
    pub fn insert_pages(&mut self, pages: Vec<Page>, index: Option<usize>) -> Vec<PageId> {
        let ids: Vec<PageId> = pages.iter().map(|p| p.id).collect();
        let at = index.unwrap_or(self.pages.len()).min(self.pages.len());
        for (offset, page) in pages.into_iter().enumerate() {
            self.pages.insert(at + offset, page);
        }
        debug!(inserted = ids.len(), at, total = self.pages.len(), "pages inserted");
        ids
    }

    /// Remove a page. Its scene and base raster go with it.
    pub fn remove_page(&mut self, id: PageId) -> Option<Page> {
        let index = self.index_of(id)?;
        let page = self.pages.remove(index);
        debug!(%id, index, total = self.pages.len(), "page removed");
        Some(page)
    }

    /// Move the page at `from` to `to`. Out-of-range indices are rejected.
    pub fn reorder_page(&mut self, from: usize, to: usize) -> bool {
        if from >= self.pages.len() || to >= self.pages.len() || from == to {
            return false;
        }
        let page = self.pages.remove(from);
        self.pages.insert(to, page);
        true
    }

    /// Compose a quarter-turn step onto a page's rotation. The stored scene
    /// is untouched; rotation is reapplied live on load.
    pub fn set_rotation(&mut self, id: PageId, step: RotationStep) -> Option<Rotation> {
        let index = self.index_of(id)?;
        let page = &mut self.pages[index];
        page.rotation = page.rotation.stepped(step);
        debug!(%id, rotation = page.rotation.degrees(), "page rotation set");
        Some(page.rotation)
    }

    /// Write a page's scene. No-op (and uncounted) when the content is
    /// structurally unchanged, avoiding redundant writes. Returns whether
    /// anything was written.
    pub fn update_scene(&mut self, id: PageId, scene: SceneDocument) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if self.pages[index].scene == scene {
            return false;
        }
        self.pages[index].scene = scene;
        self.scene_writes += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectKind, SceneObject};
    use crate::scene::Scene;
    use redakt_core::types::{Color, Point, Size};

    fn three_pages() -> (PageStore, Vec<PageId>) {
        let mut store = PageStore::new();
        let ids = store.insert_pages(
            vec![Page::blank(100, 200), Page::blank(100, 200), Page::blank(100, 200)],
            None,
        );
        (store, ids)
    }

    /// Moving A to index 2 in [A,B,C] yields [B,C,A].
    #[test]
    fn reorder_moves_first_to_last() {
        let (mut store, ids) = three_pages();
        assert!(store.reorder_page(0, 2));
        let order: Vec<_> = store.iter().map(|p| p.id).collect();
        assert_eq!(order, vec![ids[1], ids[2], ids[0]]);
    }

    #[test]
    fn reorder_rejects_out_of_range() {
        let (mut store, _) = three_pages();
        assert!(!store.reorder_page(0, 3));
        assert!(!store.reorder_page(5, 0));
        assert!(!store.reorder_page(1, 1));
    }

    #[test]
    fn ids_stable_across_reorder_and_rotate() {
        let (mut store, ids) = three_pages();
        store.reorder_page(2, 0);
        store.set_rotation(ids[1], RotationStep::Clockwise);
        for id in &ids {
            assert!(store.page(*id).is_some());
        }
    }

    #[test]
    fn rotation_composes_mod_360() {
        let (mut store, ids) = three_pages();
        assert_eq!(
            store.set_rotation(ids[0], RotationStep::Clockwise),
            Some(Rotation::R90)
        );
        assert_eq!(
            store.set_rotation(ids[0], RotationStep::Clockwise),
            Some(Rotation::R180)
        );
        assert_eq!(
            store.set_rotation(ids[0], RotationStep::CounterClockwise),
            Some(Rotation::R90)
        );
        assert_eq!(store.set_rotation(PageId::new(), RotationStep::Clockwise), None);
    }

    #[test]
    fn update_scene_skips_unchanged_content() {
        let (mut store, ids) = three_pages();
        let mut scene = Scene::new();
        scene.add(SceneObject::new(
            Point::new(10.0, 10.0),
            Size::new(20.0, 20.0),
            1.0,
            ObjectKind::FilledRect { fill: Color::BLACK },
        ));
        let doc = scene.to_document();

        assert!(store.update_scene(ids[0], doc.clone()));
        assert_eq!(store.scene_writes(), 1);

        // Structurally identical — nothing written.
        assert!(!store.update_scene(ids[0], doc.clone()));
        assert_eq!(store.scene_writes(), 1);

        assert!(!store.update_scene(PageId::new(), doc));
    }

    #[test]
    fn insert_at_index_and_remove() {
        let (mut store, ids) = three_pages();
        let inserted = store.insert_pages(vec![Page::blank(50, 50)], Some(1));
        assert_eq!(store.index_of(inserted[0]), Some(1));
        assert_eq!(store.index_of(ids[1]), Some(2));

        let removed = store.remove_page(inserted[0]).unwrap();
        assert_eq!(removed.id, inserted[0]);
        assert_eq!(store.len(), 3);
        assert!(store.remove_page(inserted[0]).is_none());
    }

    #[test]
    fn blank_pages_have_white_base() {
        let page = Page::blank(10, 10);
        assert_eq!(page.base.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
        assert!(page.source.is_none());
        assert!(page.scene.is_empty());
    }
}
