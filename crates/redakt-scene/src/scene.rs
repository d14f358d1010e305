// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The live scene bound to the editing surface, and the serialized scene
// document stored per page.
//
// Z-order is sequence order: index 0 is the back of the stack. The scene
// document round-trips exactly (object order, variant, every persisted
// field); mosaic regions come back marked as needing a re-bake because
// their pixels are never part of the document.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::object::{ObjectId, SceneObject, Style};

/// Direction of a z-order move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZMove {
    /// To the top of the stack.
    Front,
    /// To the bottom of the stack.
    Back,
    /// One step up.
    Forward,
    /// One step down.
    Backward,
}

/// The persisted form of a scene: an ordered list of tagged object records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneDocument {
    objects: Vec<SceneObject>,
}

impl SceneDocument {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }
}

/// Ordered annotation objects plus the current selection. Exactly one scene
/// is ever live (checked out onto the editing surface); all others exist
/// only as [`SceneDocument`]s in the page store.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    selection: Vec<ObjectId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Object access --------------------------------------------------------

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in z-order, back to front.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    /// Ids of every mosaic region, in z-order.
    pub fn mosaic_ids(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| o.is_mosaic())
            .map(|o| o.id)
            .collect()
    }

    // -- Mutation -------------------------------------------------------------

    /// Append an object at the top of the z-stack and select it.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id;
        self.objects.push(object);
        self.selection = vec![id];
        id
    }

    /// Remove an object (and drop it from the selection).
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.index_of(id)?;
        self.selection.retain(|s| *s != id);
        Some(self.objects.remove(index))
    }

    /// Move an object within the z-stack, clamped to the stack bounds.
    /// Returns true when the order actually changed.
    pub fn reorder(&mut self, id: ObjectId, direction: ZMove) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let top = self.objects.len() - 1;
        let target = match direction {
            ZMove::Front => top,
            ZMove::Back => 0,
            ZMove::Forward => (index + 1).min(top),
            ZMove::Backward => index.saturating_sub(1),
        };
        if target == index {
            return false;
        }
        let object = self.objects.remove(index);
        self.objects.insert(target, object);
        true
    }

    /// Apply one style edit to every selected object before the caller does
    /// any re-render or persist, so a multi-select edit yields one snapshot.
    /// Returns the ids of mosaic regions whose bake was invalidated.
    pub fn apply_style(&mut self, style: Style) -> Vec<ObjectId> {
        let selection = self.selection.clone();
        let mut invalidated = Vec::new();
        for id in selection {
            if let Some(object) = self.object_mut(id) {
                if object.apply_style(style) {
                    invalidated.push(id);
                }
            }
        }
        debug!(
            selected = self.selection.len(),
            invalidated = invalidated.len(),
            ?style,
            "style applied to selection"
        );
        invalidated
    }

    // -- Selection ------------------------------------------------------------

    /// Replace the selection; unknown ids are dropped.
    pub fn select(&mut self, ids: &[ObjectId]) {
        self.selection = ids
            .iter()
            .copied()
            .filter(|id| self.index_of(*id).is_some())
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    /// First object of the selection — authoritative for the tool panel.
    pub fn selected_first(&self) -> Option<&SceneObject> {
        self.selection.first().and_then(|id| self.object(*id))
    }

    // -- Serialization --------------------------------------------------------

    /// Serialize to a scene document: ordered records with derived pixel
    /// state (baked mosaics) stripped.
    pub fn to_document(&self) -> SceneDocument {
        SceneDocument {
            objects: self.objects.iter().map(|o| o.to_record()).collect(),
        }
    }

    /// Reconstruct a live scene from a document. Every mosaic region comes
    /// back unbaked and must be re-baked before it is visually correct.
    pub fn from_document(document: &SceneDocument) -> Self {
        Self {
            objects: document.objects.iter().map(|o| o.to_record()).collect(),
            selection: Vec::new(),
        }
    }
}
