// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scene objects — the tagged annotation primitives and their per-variant
// style semantics.

use image::RgbaImage;
use redakt_core::types::{Color, MOSAIC_BLOCK_RANGE, OPACITY_RANGE, Point, Size, ToolProperties};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored font size is this multiple of the logical tool "size" value.
pub const TEXT_FONT_SCALE: f32 = 4.0;

/// Unique identifier for a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The annotation variant an object carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectKind {
    /// Solid rectangle.
    FilledRect { fill: Color },
    /// Rectangle outline with no fill.
    OutlinedRect { stroke: Color, stroke_width: f32 },
    /// Arrow from the bounding box's top-left to its bottom-right corner.
    Arrow { stroke: Color, stroke_width: f32 },
    /// Text run.
    Text {
        content: String,
        fill: Color,
        font_size: f32,
    },
    /// Inserted raster image, persisted as encoded PNG bytes.
    Image { data: Vec<u8> },
    /// Mosaic redaction region. The visible pixels are always derived from
    /// whatever lies under the region at bake time; only the descriptor
    /// (position, size, block size) is ever persisted. `baked` starts out
    /// absent — the transparent "not yet baked" marker.
    Mosaic {
        block_size: u32,
        #[serde(skip)]
        baked: Option<RgbaImage>,
    },
}

// Equality ignores baked mosaic pixels: they are a derived artifact, and the
// store's "unchanged scene" check must not be defeated by bake output.
impl PartialEq for ObjectKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::FilledRect { fill: a }, Self::FilledRect { fill: b }) => a == b,
            (
                Self::OutlinedRect {
                    stroke: a,
                    stroke_width: aw,
                },
                Self::OutlinedRect {
                    stroke: b,
                    stroke_width: bw,
                },
            ) => a == b && aw == bw,
            (
                Self::Arrow {
                    stroke: a,
                    stroke_width: aw,
                },
                Self::Arrow {
                    stroke: b,
                    stroke_width: bw,
                },
            ) => a == b && aw == bw,
            (
                Self::Text {
                    content: ac,
                    fill: af,
                    font_size: asz,
                },
                Self::Text {
                    content: bc,
                    fill: bf,
                    font_size: bsz,
                },
            ) => ac == bc && af == bf && asz == bsz,
            (Self::Image { data: a }, Self::Image { data: b }) => a == b,
            (Self::Mosaic { block_size: a, .. }, Self::Mosaic { block_size: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// A style edit pushed onto an object or selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Style {
    Color(Color),
    Opacity(f32),
    Size(f32),
}

/// One annotation primitive: position (center, page space), size, opacity,
/// and the variant payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    #[serde(default)]
    pub id: ObjectId,
    pub center: Point,
    pub size: Size,
    pub opacity: f32,
    pub kind: ObjectKind,
}

impl SceneObject {
    pub fn new(center: Point, size: Size, opacity: f32, kind: ObjectKind) -> Self {
        Self {
            id: ObjectId::new(),
            center,
            size,
            opacity: opacity.clamp(*OPACITY_RANGE.start(), *OPACITY_RANGE.end()),
            kind,
        }
    }

    /// Apply one style edit with the per-variant semantics:
    /// color targets the fill where one exists, otherwise the stroke; size
    /// means stroke width, logical font scale, or mosaic block size
    /// depending on the variant. Returns true when the edit invalidates a
    /// mosaic bake.
    pub fn apply_style(&mut self, style: Style) -> bool {
        match style {
            Style::Color(color) => match &mut self.kind {
                ObjectKind::FilledRect { fill } => *fill = color,
                ObjectKind::OutlinedRect { stroke, .. } => *stroke = color,
                ObjectKind::Arrow { stroke, .. } => *stroke = color,
                ObjectKind::Text { fill, .. } => *fill = color,
                // Images and mosaic regions have no fill or stroke to tint.
                ObjectKind::Image { .. } | ObjectKind::Mosaic { .. } => {}
            },
            Style::Opacity(value) => {
                self.opacity = value.clamp(*OPACITY_RANGE.start(), *OPACITY_RANGE.end());
            }
            Style::Size(value) => match &mut self.kind {
                ObjectKind::OutlinedRect { stroke_width, .. }
                | ObjectKind::Arrow { stroke_width, .. } => {
                    *stroke_width = value.max(1.0);
                }
                ObjectKind::Text { font_size, .. } => {
                    *font_size = value.max(1.0) * TEXT_FONT_SCALE;
                }
                ObjectKind::Mosaic { block_size, baked } => {
                    *block_size = (value.round() as i64)
                        .clamp(*MOSAIC_BLOCK_RANGE.start() as i64, *MOSAIC_BLOCK_RANGE.end() as i64)
                        as u32;
                    *baked = None;
                    return true;
                }
                ObjectKind::FilledRect { .. } | ObjectKind::Image { .. } => {}
            },
        }
        false
    }

    /// Tool-panel view of this object's current style; fields the variant
    /// does not carry fall back to the panel's previous values.
    pub fn tool_properties(&self, previous: ToolProperties) -> ToolProperties {
        let color = match &self.kind {
            ObjectKind::FilledRect { fill } => Some(*fill),
            ObjectKind::OutlinedRect { stroke, .. } | ObjectKind::Arrow { stroke, .. } => {
                Some(*stroke)
            }
            ObjectKind::Text { fill, .. } => Some(*fill),
            ObjectKind::Image { .. } | ObjectKind::Mosaic { .. } => None,
        };
        let size = match &self.kind {
            ObjectKind::OutlinedRect { stroke_width, .. }
            | ObjectKind::Arrow { stroke_width, .. } => Some(*stroke_width),
            ObjectKind::Text { font_size, .. } => Some(*font_size / TEXT_FONT_SCALE),
            ObjectKind::Mosaic { block_size, .. } => Some(*block_size as f32),
            ObjectKind::FilledRect { .. } | ObjectKind::Image { .. } => None,
        };
        ToolProperties {
            color: color.unwrap_or(previous.color),
            opacity: self.opacity,
            size: size.unwrap_or(previous.size),
        }
    }

    /// Whether this object is a mosaic region awaiting a bake.
    pub fn needs_bake(&self) -> bool {
        matches!(self.kind, ObjectKind::Mosaic { baked: None, .. })
    }

    /// Whether this object is a mosaic region at all.
    pub fn is_mosaic(&self) -> bool {
        matches!(self.kind, ObjectKind::Mosaic { .. })
    }

    /// Store bake output on a mosaic region; no-op for other variants.
    pub fn set_baked(&mut self, pixels: Option<RgbaImage>) {
        if let ObjectKind::Mosaic { baked, .. } = &mut self.kind {
            *baked = pixels;
        }
    }

    /// Move/resize the object and drop any now-stale bake output.
    pub fn set_bounds(&mut self, center: Point, size: Size) {
        self.center = center;
        self.size = size;
        if self.is_mosaic() {
            self.set_baked(None);
        }
    }

    /// Copy of this object with derived pixel state stripped, suitable for
    /// a scene document.
    pub(crate) fn to_record(&self) -> SceneObject {
        let mut record = self.clone();
        record.set_baked(None);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mosaic(block_size: u32) -> SceneObject {
        SceneObject::new(
            Point::new(50.0, 50.0),
            Size::new(40.0, 40.0),
            1.0,
            ObjectKind::Mosaic {
                block_size,
                baked: None,
            },
        )
    }

    #[test]
    fn color_targets_fill_or_stroke_per_variant() {
        let mut rect = SceneObject::new(
            Point::default(),
            Size::new(10.0, 10.0),
            1.0,
            ObjectKind::FilledRect { fill: Color::BLACK },
        );
        rect.apply_style(Style::Color(Color::RED));
        assert_eq!(rect.kind, ObjectKind::FilledRect { fill: Color::RED });

        let mut outline = SceneObject::new(
            Point::default(),
            Size::new(10.0, 10.0),
            1.0,
            ObjectKind::OutlinedRect {
                stroke: Color::BLACK,
                stroke_width: 2.0,
            },
        );
        outline.apply_style(Style::Color(Color::WHITE));
        assert!(
            matches!(outline.kind, ObjectKind::OutlinedRect { stroke, .. } if stroke == Color::WHITE)
        );

        // Mosaic regions have nothing to tint.
        let mut region = mosaic(10);
        region.apply_style(Style::Color(Color::WHITE));
        assert_eq!(region.kind, ObjectKind::Mosaic { block_size: 10, baked: None });
    }

    #[test]
    fn opacity_clamps_into_valid_range() {
        let mut region = mosaic(10);
        region.apply_style(Style::Opacity(0.01));
        assert_eq!(region.opacity, 0.1);
        region.apply_style(Style::Opacity(5.0));
        assert_eq!(region.opacity, 1.0);
    }

    /// Text stores four times the logical size value.
    #[test]
    fn size_scales_text_font_by_four() {
        let mut text = SceneObject::new(
            Point::default(),
            Size::new(100.0, 20.0),
            1.0,
            ObjectKind::Text {
                content: "draft".into(),
                fill: Color::BLACK,
                font_size: 16.0,
            },
        );
        assert!(!text.apply_style(Style::Size(6.0)));
        assert!(matches!(text.kind, ObjectKind::Text { font_size, .. } if font_size == 24.0));
    }

    #[test]
    fn size_on_mosaic_clamps_block_and_invalidates_bake() {
        let mut region = mosaic(10);
        region.set_baked(Some(RgbaImage::new(4, 4)));
        assert!(region.apply_style(Style::Size(500.0)));
        match &region.kind {
            ObjectKind::Mosaic { block_size, baked } => {
                assert_eq!(*block_size, 100);
                assert!(baked.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn moving_a_mosaic_drops_its_bake() {
        let mut region = mosaic(10);
        region.set_baked(Some(RgbaImage::new(4, 4)));
        assert!(!region.needs_bake());
        region.set_bounds(Point::new(10.0, 10.0), Size::new(40.0, 40.0));
        assert!(region.needs_bake());
    }

    /// Baked pixels never participate in structural equality.
    #[test]
    fn equality_ignores_baked_pixels() {
        let mut a = mosaic(10);
        let mut b = a.clone();
        b.set_baked(Some(RgbaImage::new(8, 8)));
        a.set_baked(None);
        assert_eq!(a, b);
    }
}
