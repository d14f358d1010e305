// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for one editing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upscale factor applied when a source page is rendered to a base
    /// raster (2.0 means a 612x792pt page becomes a 1224x1584px raster).
    pub render_scale: f32,
    /// TrueType/OpenType font used to rasterize text objects. When unset,
    /// text objects keep their data but render no glyphs.
    pub font_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            font_path: None,
        }
    }
}
