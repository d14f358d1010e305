// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// redakt-raster — Rasterization of scenes (backgrounds, shapes, text,
// images) and the mosaic pixelation engine.

pub mod mosaic;
pub mod surface;

pub use mosaic::{bake_object, pixelate};
pub use surface::Renderer;
