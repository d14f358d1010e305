// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry utilities — rotation-aware dimension swap, bounding-rect math,
// and scale-to-fit / scale-to-cover helpers.
//
// Both the live editing surface and the export compositor size themselves
// through `effective_dimensions`, so the two always agree on a rotated
// page's dimensions.

use crate::types::{Point, Rotation, Size};

/// Scale used when the fit computation degenerates (zero or non-finite
/// content dimensions).
pub const FALLBACK_FIT_SCALE: f32 = 1.0;

/// Dimensions of a `width` x `height` page as displayed under `rotation`:
/// swapped for quarter turns, unchanged otherwise.
pub fn effective_dimensions(width: u32, height: u32, rotation: Rotation) -> (u32, u32) {
    if rotation.swaps_axes() {
        (height, width)
    } else {
        (width, height)
    }
}

/// Largest scale at which `content` fits entirely inside `bound`, capped at
/// `max_scale`. Falls back to [`FALLBACK_FIT_SCALE`] when the result would
/// be non-finite or non-positive.
pub fn fit_scale(content: Size, bound: Size, max_scale: f32) -> f32 {
    let scale = (bound.w / content.w).min(bound.h / content.h).min(max_scale);
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        FALLBACK_FIT_SCALE
    }
}

/// Smallest scale at which `content` fully covers `bound` (overflow is
/// expected to be clipped by the caller). Same degenerate fallback as
/// [`fit_scale`].
pub fn cover_scale(content: Size, bound: Size) -> f32 {
    let scale = (bound.w / content.w).max(bound.h / content.h);
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        FALLBACK_FIT_SCALE
    }
}

/// Axis-aligned rectangle in page space, integer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl PixelRect {
    /// Bounding rectangle of an object described by its center and size.
    pub fn from_center(center: Point, size: Size) -> Self {
        let w = size.w.round() as i64;
        let h = size.h.round() as i64;
        Self {
            x: (center.x - size.w / 2.0).round() as i64,
            y: (center.y - size.h / 2.0).round() as i64,
            w,
            h,
        }
    }

    /// Intersect with a surface of `width` x `height` pixels anchored at the
    /// origin. Returns `None` when nothing remains.
    pub fn clamped_to(self, width: u32, height: u32) -> Option<Self> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + self.w).min(width as i64);
        let y1 = (self.y + self.h).min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The swap law: dimensions swap iff the rotation is a quarter turn.
    #[test]
    fn effective_dimensions_swaps_only_quarter_turns() {
        assert_eq!(effective_dimensions(800, 600, Rotation::R0), (800, 600));
        assert_eq!(effective_dimensions(800, 600, Rotation::R90), (600, 800));
        assert_eq!(effective_dimensions(800, 600, Rotation::R180), (800, 600));
        assert_eq!(effective_dimensions(800, 600, Rotation::R270), (600, 800));
    }

    #[test]
    fn fit_scale_picks_limiting_axis_and_cap() {
        let content = Size::new(100.0, 50.0);
        assert_eq!(fit_scale(content, Size::new(200.0, 200.0), 10.0), 2.0);
        assert_eq!(fit_scale(content, Size::new(200.0, 200.0), 1.5), 1.5);
        assert_eq!(fit_scale(content, Size::new(50.0, 100.0), 10.0), 0.5);
    }

    /// Degenerate content produces the fixed fallback, never NaN/inf.
    #[test]
    fn fit_scale_degenerate_content_falls_back() {
        let bound = Size::new(100.0, 100.0);
        assert_eq!(fit_scale(Size::new(0.0, 50.0), bound, 4.0), FALLBACK_FIT_SCALE);
        assert_eq!(fit_scale(Size::new(-10.0, 50.0), bound, 4.0), FALLBACK_FIT_SCALE);
    }

    #[test]
    fn cover_scale_picks_larger_ratio() {
        let content = Size::new(100.0, 50.0);
        assert_eq!(cover_scale(content, Size::new(200.0, 200.0)), 4.0);
        assert_eq!(cover_scale(Size::new(0.0, 0.0), content), FALLBACK_FIT_SCALE);
    }

    #[test]
    fn pixel_rect_from_center() {
        let rect = PixelRect::from_center(Point::new(100.0, 100.0), Size::new(200.0, 120.0));
        assert_eq!(rect, PixelRect { x: 0, y: 40, w: 200, h: 120 });
    }

    #[test]
    fn pixel_rect_clamps_to_surface() {
        let rect = PixelRect { x: -10, y: 5, w: 50, h: 50 };
        let clamped = rect.clamped_to(30, 30).unwrap();
        assert_eq!(clamped, PixelRect { x: 0, y: 5, w: 30, h: 25 });

        let outside = PixelRect { x: 100, y: 100, w: 10, h: 10 };
        assert!(outside.clamped_to(30, 30).is_none());
    }
}
