// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types shared across the Redakt crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a page. Stable across reorder and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quarter-turn page rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

/// A single rotation step applied by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    /// +90 degrees.
    Clockwise,
    /// -90 degrees.
    CounterClockwise,
}

impl Rotation {
    /// Rotation angle in degrees.
    pub fn degrees(self) -> u16 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }

    /// Build from an angle in degrees; any multiple of 90 is accepted.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::R0),
            90 => Some(Self::R90),
            180 => Some(Self::R180),
            270 => Some(Self::R270),
            _ => None,
        }
    }

    /// Whether this rotation swaps the page's width and height on screen.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::R90 | Self::R270)
    }

    /// Compose a user rotation step onto this rotation, wrapping mod 360.
    pub fn stepped(self, step: RotationStep) -> Self {
        let delta = match step {
            RotationStep::Clockwise => 90,
            RotationStep::CounterClockwise => -90,
        };
        // Always lands on a quarter turn, so unwrapping via from_degrees
        // cannot fail; keep it explicit anyway.
        Self::from_degrees(self.degrees() as i32 + delta).unwrap_or(self)
    }
}

/// sRGB color used for fills, strokes, and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const RED: Color = Color { r: 224, g: 32, b: 32 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A point in page space (pixels, origin top-left).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

impl Size {
    pub fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }
}

/// Valid range for object opacity.
pub const OPACITY_RANGE: std::ops::RangeInclusive<f32> = 0.1..=1.0;

/// Valid range for mosaic block size.
pub const MOSAIC_BLOCK_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

/// The last-used tool style, applied to newly created objects and pushed
/// onto the current selection when edited. Explicitly passed around rather
/// than held as process-wide state; not part of persisted page data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolProperties {
    pub color: Color,
    pub opacity: f32,
    /// Logical size: stroke width for stroked shapes, quarter of the stored
    /// font size for text, block size for mosaic regions.
    pub size: f32,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            color: Color::RED,
            opacity: 1.0,
            size: 4.0,
        }
    }
}

impl ToolProperties {
    /// Clamp fields into their valid ranges.
    pub fn clamped(mut self) -> Self {
        self.opacity = self
            .opacity
            .clamp(*OPACITY_RANGE.start(), *OPACITY_RANGE.end());
        self.size = self.size.max(1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_steps_wrap_in_both_directions() {
        assert_eq!(Rotation::R270.stepped(RotationStep::Clockwise), Rotation::R0);
        assert_eq!(
            Rotation::R0.stepped(RotationStep::CounterClockwise),
            Rotation::R270
        );
        assert_eq!(Rotation::R90.stepped(RotationStep::Clockwise), Rotation::R180);
    }

    #[test]
    fn rotation_from_degrees_normalises() {
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::R90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::R270));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn page_ids_are_unique() {
        assert_ne!(PageId::new(), PageId::new());
    }

    #[test]
    fn tool_properties_clamp_into_range() {
        let props = ToolProperties {
            color: Color::BLACK,
            opacity: 0.0,
            size: 0.2,
        }
        .clamped();
        assert_eq!(props.opacity, 0.1);
        assert_eq!(props.size, 1.0);
    }
}
