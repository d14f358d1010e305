// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// redakt-scene — The annotation data model: typed scene objects with z-order,
// the serializable scene document, and the ordered page store.
//
// A Scene is live drawable state bound to the single editing surface; every
// other page's annotations exist only as a SceneDocument inside the PageStore.

pub mod object;
pub mod scene;
pub mod store;

pub use object::{ObjectId, ObjectKind, SceneObject, Style, TEXT_FONT_SCALE};
pub use scene::{Scene, SceneDocument, ZMove};
pub use store::{Page, PageStore, SourceRef};
