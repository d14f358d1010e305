// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canvas session controller — binds one page's scene to the single live
// editing surface and mediates every page switch.
//
// The surface is a checked-out copy: checkout (load) and checkin (scene
// snapshot into the page store) are the only mutation paths, driven by an
// explicit Idle/Loading/Ready state machine. Snapshots are suppressed while
// a load is in flight so a partially-loaded scene can never clobber stored
// data. Mosaic re-bakes go through a pending queue that is drained only
// once the background raster is in place, with a stale-write guard on the
// page and object ids.

use tracing::{debug, info, instrument};

use redakt_core::error::{RedaktError, Result};
use redakt_core::geometry::effective_dimensions;
use redakt_core::types::{
    MOSAIC_BLOCK_RANGE, PageId, Point, RotationStep, Size, ToolProperties,
};
use redakt_core::SessionConfig;
use redakt_raster::mosaic::bake_object;
use redakt_raster::surface::Renderer;
use redakt_scene::object::{ObjectId, ObjectKind, SceneObject, Style, TEXT_FONT_SCALE};
use redakt_scene::scene::{Scene, ZMove};
use redakt_scene::store::{Page, PageStore};

use crate::source::{SourceDecoder, import_source};

/// States of the single editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No page checked out.
    Idle,
    /// A page switch is in flight; edits and snapshots are suppressed.
    Loading,
    /// A page is checked out and accepting edits.
    Ready,
}

/// Tool used to create a new object from the current tool properties.
#[derive(Debug, Clone)]
pub enum ToolShape {
    FilledRect,
    OutlinedRect,
    Arrow,
    Text(String),
    Image(Vec<u8>),
    Mosaic,
}

/// A deferred mosaic bake. Carries enough identity to detect staleness:
/// the page may have been switched or removed, the object deleted.
#[derive(Debug, Clone, Copy)]
struct PendingBake {
    page_id: PageId,
    object_id: ObjectId,
}

/// The live editing surface: one page's scene as drawable state.
#[derive(Debug)]
struct LiveSurface {
    page_id: PageId,
    width: u32,
    height: u32,
    background: image::RgbaImage,
    scene: Scene,
}

/// One editing session: the page store plus the single live surface.
#[derive(Debug)]
pub struct CanvasSession {
    config: SessionConfig,
    renderer: Renderer,
    store: PageStore,
    state: SessionState,
    active_index: Option<usize>,
    surface: Option<LiveSurface>,
    props: ToolProperties,
    pending_bakes: Vec<PendingBake>,
}

impl CanvasSession {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let renderer = Renderer::from_config(&config)?;
        Ok(Self::with_renderer(config, renderer))
    }

    pub fn with_renderer(config: SessionConfig, renderer: Renderer) -> Self {
        Self {
            config,
            renderer,
            store: PageStore::new(),
            state: SessionState::Idle,
            active_index: None,
            surface: None,
            props: ToolProperties::default(),
            pending_bakes: Vec::new(),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn store(&self) -> &PageStore {
        &self.store
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn properties(&self) -> ToolProperties {
        self.props
    }

    /// The live scene, when a page is checked out.
    pub fn scene(&self) -> Option<&Scene> {
        self.surface.as_ref().map(|s| &s.scene)
    }

    /// Live surface dimensions (effective, rotation applied).
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.surface.as_ref().map(|s| (s.width, s.height))
    }

    // -- Page management ------------------------------------------------------

    /// Import one uploaded document; its pages are appended. The first page
    /// ever added becomes active.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn import_document<D: SourceDecoder + ?Sized>(
        &mut self,
        decoder: &mut D,
        bytes: Vec<u8>,
    ) -> Result<Vec<PageId>> {
        let pages = import_source(decoder, bytes, self.config.render_scale)?;
        let ids = self.store.insert_pages(pages, None);
        self.activate_first_if_idle()?;
        Ok(ids)
    }

    /// Append a blank page of the given pixel dimensions.
    pub fn add_blank_page(&mut self, width: u32, height: u32) -> Result<PageId> {
        let ids = self.store.insert_pages(vec![Page::blank(width, height)], None);
        self.activate_first_if_idle()?;
        Ok(ids[0])
    }

    fn activate_first_if_idle(&mut self) -> Result<()> {
        if self.active_index.is_none() && !self.store.is_empty() {
            self.load_page(0)?;
        }
        Ok(())
    }

    /// Switch the active page. The outgoing page's scene is snapshotted
    /// first; the incoming page's scene is rebuilt on the surface and its
    /// mosaic regions re-baked once the background is in place.
    pub fn activate_page(&mut self, index: usize) -> Result<()> {
        if self.active_index == Some(index) && self.state == SessionState::Ready {
            return Ok(());
        }
        self.load_page(index)
    }

    /// Remove a page. When the active page goes away, the nearest remaining
    /// page is activated (or the session returns to Idle).
    pub fn remove_page(&mut self, id: PageId) -> Result<()> {
        let Some(removed_index) = self.store.index_of(id) else {
            return Ok(());
        };
        let was_active = self.active_index == Some(removed_index);
        self.store.remove_page(id);

        if self.store.is_empty() {
            self.state = SessionState::Idle;
            self.active_index = None;
            self.surface = None;
            return Ok(());
        }
        match self.active_index {
            Some(active) if was_active => {
                // Surface still shows the dead page; drop it without a
                // flush (update_scene would be a stale write anyway).
                self.surface = None;
                self.state = SessionState::Idle;
                self.active_index = None;
                self.load_page(active.min(self.store.len() - 1))?;
            }
            Some(active) if removed_index < active => {
                self.active_index = Some(active - 1);
            }
            _ => {}
        }
        Ok(())
    }

    /// Move a page within the document. The active index follows the page
    /// it pointed at.
    pub fn reorder_page(&mut self, from: usize, to: usize) -> bool {
        let active_id = self
            .active_index
            .and_then(|index| self.store.page_at(index))
            .map(|p| p.id);
        if !self.store.reorder_page(from, to) {
            return false;
        }
        if let Some(id) = active_id {
            self.active_index = self.store.index_of(id);
        }
        true
    }

    /// Rotate a page by a quarter turn. The stored scene is untouched; when
    /// the page is active, the surface reloads so the rotation applies live.
    pub fn rotate_page(&mut self, id: PageId, step: RotationStep) -> Result<()> {
        if self.store.set_rotation(id, step).is_none() {
            return Ok(());
        }
        let is_active = self
            .active_index
            .and_then(|index| self.store.page_at(index))
            .map(|p| p.id == id)
            .unwrap_or(false);
        if is_active {
            let index = self.active_index.unwrap_or(0);
            self.snapshot();
            self.load_page(index)?;
        }
        Ok(())
    }

    // -- Checkout / checkin ---------------------------------------------------

    #[instrument(skip(self), fields(index))]
    fn load_page(&mut self, index: usize) -> Result<()> {
        // Checkin the outgoing page. Guarded: while Loading this is a no-op,
        // so a half-built scene can never overwrite stored data.
        self.snapshot();

        self.state = SessionState::Loading;
        let Some(page) = self.store.page_at(index) else {
            self.state = SessionState::Idle;
            return Err(RedaktError::Session(format!(
                "page index {} out of range ({} pages)",
                index,
                self.store.len()
            )));
        };

        let (width, height) = effective_dimensions(page.width, page.height, page.rotation);
        let background = self
            .renderer
            .background(&page.base, page.rotation, width, height);
        let scene = Scene::from_document(&page.scene);
        let page_id = page.id;

        // Baked pixels are never persisted: every mosaic that came back
        // from the store needs a fresh bake.
        let mosaics = scene.mosaic_ids();
        self.surface = Some(LiveSurface {
            page_id,
            width,
            height,
            background,
            scene,
        });
        self.active_index = Some(index);
        for object_id in mosaics {
            self.schedule_bake(page_id, object_id);
        }

        // The background render above is synchronous, so the surface is
        // ready the moment it exists; the queue drains against it now
        // rather than after an arbitrary settle delay.
        self.state = SessionState::Ready;
        self.drain_pending_bakes()?;

        info!(%page_id, index, width, height, "page checked out");
        Ok(())
    }

    /// Snapshot the live scene into the page store. Suppressed unless the
    /// surface is Ready; redundant writes are absorbed by the store's
    /// structural-equality check.
    pub fn snapshot(&mut self) {
        if self.state != SessionState::Ready {
            return;
        }
        if let Some(surface) = &self.surface {
            let written = self
                .store
                .update_scene(surface.page_id, surface.scene.to_document());
            debug!(page = %surface.page_id, written, "scene snapshot");
        }
    }

    // -- Mosaic bake scheduling -----------------------------------------------

    /// Queue a bake, superseding any in-flight request for the same object.
    fn schedule_bake(&mut self, page_id: PageId, object_id: ObjectId) {
        self.pending_bakes.retain(|b| b.object_id != object_id);
        self.pending_bakes.push(PendingBake { page_id, object_id });
    }

    fn drain_pending_bakes(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_bakes);
        for bake in pending {
            let Some(surface) = self.surface.as_ref() else {
                debug!(object = %bake.object_id, "bake dropped, no surface");
                continue;
            };
            // Stale-write guard: the page may have been switched out or
            // removed, the object deleted, between schedule and drain.
            if surface.page_id != bake.page_id {
                debug!(object = %bake.object_id, "bake dropped, page no longer active");
                continue;
            }
            if surface.scene.object(bake.object_id).is_none() {
                debug!(object = %bake.object_id, "bake dropped, object gone");
                continue;
            }
            let baked = bake_object(
                &self.renderer,
                &surface.background,
                surface.scene.objects(),
                bake.object_id,
            )?;
            if let Some(pixels) = baked {
                if let Some(surface) = self.surface.as_mut() {
                    if let Some(object) = surface.scene.object_mut(bake.object_id) {
                        object.set_baked(Some(pixels));
                    }
                }
            }
        }
        Ok(())
    }

    // -- Editing (Ready state only) -------------------------------------------

    fn ready_surface_mut(&mut self) -> Result<&mut LiveSurface> {
        if self.state != SessionState::Ready {
            return Err(RedaktError::Session(
                "no page is checked out for editing".into(),
            ));
        }
        self.surface
            .as_mut()
            .ok_or_else(|| RedaktError::Session("editing surface missing".into()))
    }

    /// Create an object from the current tool properties, centered at
    /// `center`, and add it at the top of the z-stack.
    pub fn add_object(&mut self, shape: ToolShape, center: Point, size: Size) -> Result<ObjectId> {
        let props = self.props.clamped();
        let kind = match shape {
            ToolShape::FilledRect => ObjectKind::FilledRect { fill: props.color },
            ToolShape::OutlinedRect => ObjectKind::OutlinedRect {
                stroke: props.color,
                stroke_width: props.size,
            },
            ToolShape::Arrow => ObjectKind::Arrow {
                stroke: props.color,
                stroke_width: props.size,
            },
            ToolShape::Text(content) => ObjectKind::Text {
                content,
                fill: props.color,
                font_size: props.size * TEXT_FONT_SCALE,
            },
            ToolShape::Image(data) => ObjectKind::Image { data },
            ToolShape::Mosaic => ObjectKind::Mosaic {
                block_size: (props.size.round() as i64)
                    .clamp(
                        *MOSAIC_BLOCK_RANGE.start() as i64,
                        *MOSAIC_BLOCK_RANGE.end() as i64,
                    ) as u32,
                baked: None,
            },
        };
        let object = SceneObject::new(center, size, props.opacity, kind);
        let is_mosaic = object.is_mosaic();

        let surface = self.ready_surface_mut()?;
        let page_id = surface.page_id;
        let id = surface.scene.add(object);
        if is_mosaic {
            self.schedule_bake(page_id, id);
            self.drain_pending_bakes()?;
        }
        self.snapshot();
        Ok(id)
    }

    /// End of a move/resize gesture: commit new bounds, re-bake if needed.
    pub fn set_object_bounds(&mut self, id: ObjectId, center: Point, size: Size) -> Result<()> {
        let surface = self.ready_surface_mut()?;
        let page_id = surface.page_id;
        let Some(object) = surface.scene.object_mut(id) else {
            return Ok(());
        };
        object.set_bounds(center, size);
        if object.is_mosaic() {
            self.schedule_bake(page_id, id);
            self.drain_pending_bakes()?;
        }
        self.snapshot();
        Ok(())
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Result<()> {
        let surface = self.ready_surface_mut()?;
        if surface.scene.remove(id).is_some() {
            // Any queued bake for this object is now stale.
            self.pending_bakes.retain(|b| b.object_id != id);
            self.snapshot();
        }
        Ok(())
    }

    pub fn reorder_object(&mut self, id: ObjectId, direction: ZMove) -> Result<()> {
        let surface = self.ready_surface_mut()?;
        if surface.scene.reorder(id, direction) {
            self.snapshot();
        }
        Ok(())
    }

    /// Replace the selection and pull the tool panel's properties from the
    /// first selected object.
    pub fn select_objects(&mut self, ids: &[ObjectId]) -> Result<()> {
        let props = self.props;
        let surface = self.ready_surface_mut()?;
        surface.scene.select(ids);
        if let Some(first) = surface.scene.selected_first() {
            self.props = first.tool_properties(props);
        }
        Ok(())
    }

    /// Push a style edit onto the whole selection. All selected objects are
    /// mutated before the single snapshot, so a multi-select edit produces
    /// exactly one stored write. The edited value also becomes the
    /// last-used tool property.
    pub fn apply_style(&mut self, style: Style) -> Result<()> {
        match style {
            Style::Color(color) => self.props.color = color,
            Style::Opacity(opacity) => self.props.opacity = opacity,
            Style::Size(size) => self.props.size = size,
        }
        let surface = self.ready_surface_mut()?;
        let page_id = surface.page_id;
        let invalidated = surface.scene.apply_style(style);
        for object_id in invalidated {
            self.schedule_bake(page_id, object_id);
        }
        self.drain_pending_bakes()?;
        self.snapshot();
        Ok(())
    }

    /// Render the current surface (background plus scene) — the editing
    /// view of the active page.
    pub fn render_surface(&self) -> Result<Option<image::RgbaImage>> {
        let Some(surface) = &self.surface else {
            return Ok(None);
        };
        let composed = self.renderer.compose(
            Some(&surface.background),
            surface.scene.objects(),
            None,
            surface.width,
            surface.height,
        )?;
        Ok(Some(composed))
    }
}
