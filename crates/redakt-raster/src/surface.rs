// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scene rasterization — rotated cover-fit backgrounds and per-object
// drawing onto RGBA canvases using the `image` and `imageproc` crates.
//
// Every capture happens at 1:1 pixel scale in absolute page coordinates;
// there is no device-pixel-ratio anywhere in this pipeline, so editing-time
// and export-time rasters cannot drift apart.

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage, imageops};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_polygon_mut, draw_text_mut};
use imageproc::point::Point as PolyPoint;
use imageproc::rect::Rect;
use tracing::{debug, warn};

use redakt_core::error::{RedaktError, Result};
use redakt_core::geometry::{PixelRect, cover_scale};
use redakt_core::types::{Color, Rotation, Size};
use redakt_core::SessionConfig;
use redakt_scene::object::{ObjectId, ObjectKind, SceneObject};

/// Rasterizes backgrounds and scene objects. Holds the optional text font;
/// everything else is stateless.
#[derive(Debug, Clone)]
pub struct Renderer {
    font: Option<FontArc>,
}

impl Renderer {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Build a renderer from session config, loading the text font if one
    /// is configured.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let font = match &config.font_path {
            Some(path) => {
                let bytes = std::fs::read(path)?;
                let font = FontArc::try_from_vec(bytes).map_err(|err| {
                    RedaktError::Font(format!("cannot parse {}: {}", path.display(), err))
                })?;
                Some(font)
            }
            None => None,
        };
        Ok(Self { font })
    }

    // -- Background -----------------------------------------------------------

    /// Base raster rotated by the page rotation and scaled to fully cover an
    /// `out_w` x `out_h` surface. Cover-fit: the smaller axis dictates the
    /// scale and overflow past the right/bottom edge is cropped.
    pub fn background(
        &self,
        base: &RgbaImage,
        rotation: Rotation,
        out_w: u32,
        out_h: u32,
    ) -> RgbaImage {
        let rotated = match rotation {
            Rotation::R0 => base.clone(),
            Rotation::R90 => imageops::rotate90(base),
            Rotation::R180 => imageops::rotate180(base),
            Rotation::R270 => imageops::rotate270(base),
        };
        let scale = cover_scale(
            Size::new(rotated.width() as f32, rotated.height() as f32),
            Size::new(out_w as f32, out_h as f32),
        );
        let scaled_w = ((rotated.width() as f32 * scale).ceil() as u32).max(out_w);
        let scaled_h = ((rotated.height() as f32 * scale).ceil() as u32).max(out_h);
        let scaled = imageops::resize(&rotated, scaled_w, scaled_h, imageops::FilterType::Triangle);
        imageops::crop_imm(&scaled, 0, 0, out_w, out_h).to_image()
    }

    // -- Scene compositing ----------------------------------------------------

    /// Composite a scene onto a fresh `out_w` x `out_h` canvas.
    ///
    /// `background = None` yields a transparent canvas holding only the
    /// annotation layer. `skip` hides one object (the mosaic isolate step).
    /// Objects are drawn back to front in sequence order.
    pub fn compose(
        &self,
        background: Option<&RgbaImage>,
        objects: &[SceneObject],
        skip: Option<ObjectId>,
        out_w: u32,
        out_h: u32,
    ) -> Result<RgbaImage> {
        let mut canvas = match background {
            Some(base) => base.clone(),
            None => RgbaImage::new(out_w, out_h),
        };
        for object in objects {
            if Some(object.id) == skip {
                continue;
            }
            self.draw_object(&mut canvas, object)?;
        }
        Ok(canvas)
    }

    /// Draw one object onto the canvas, honoring its opacity.
    fn draw_object(&self, canvas: &mut RgbaImage, object: &SceneObject) -> Result<()> {
        let Some(rect) =
            PixelRect::from_center(object.center, object.size).clamped_to(canvas.width(), canvas.height())
        else {
            // Entirely off-surface or degenerate: nothing to draw.
            return Ok(());
        };

        // Each object renders onto its own transparent layer which is then
        // source-over blended with the object opacity. imageproc primitives
        // draw fully opaque, so opacity has to be applied at blend time.
        let mut layer = RgbaImage::new(canvas.width(), canvas.height());
        match &object.kind {
            ObjectKind::FilledRect { fill } => {
                draw_filled_rect_mut(&mut layer, to_imageproc_rect(rect), opaque(*fill));
            }
            ObjectKind::OutlinedRect {
                stroke,
                stroke_width,
            } => {
                draw_outline(&mut layer, rect, *stroke, *stroke_width);
            }
            ObjectKind::Arrow {
                stroke,
                stroke_width,
            } => {
                draw_arrow(&mut layer, rect, *stroke, *stroke_width);
            }
            ObjectKind::Text {
                content,
                fill,
                font_size,
            } => match &self.font {
                Some(font) => {
                    draw_text_mut(
                        &mut layer,
                        opaque(*fill),
                        rect.x as i32,
                        rect.y as i32,
                        PxScale::from(*font_size),
                        font,
                        content,
                    );
                }
                None => {
                    warn!(object = %object.id, "no font configured, skipping text glyphs");
                }
            },
            ObjectKind::Image { data } => {
                let decoded = image::load_from_memory(data)
                    .map_err(|err| RedaktError::Image(format!("scene image decode: {}", err)))?
                    .to_rgba8();
                let resized = imageops::resize(
                    &decoded,
                    rect.w.max(1) as u32,
                    rect.h.max(1) as u32,
                    imageops::FilterType::Triangle,
                );
                imageops::overlay(&mut layer, &resized, rect.x, rect.y);
            }
            ObjectKind::Mosaic { baked, .. } => match baked {
                Some(pixels) => {
                    imageops::overlay(&mut layer, pixels, rect.x, rect.y);
                }
                // Unbaked regions stay transparent; the selection outline
                // shown while editing is UI chrome, not content.
                None => {
                    debug!(object = %object.id, "mosaic not yet baked, drawing nothing");
                }
            },
        }
        blend_over(canvas, &layer, object.opacity);
        Ok(())
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }
}

fn opaque(color: Color) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 255])
}

fn to_imageproc_rect(rect: PixelRect) -> Rect {
    Rect::at(rect.x as i32, rect.y as i32).of_size(rect.w as u32, rect.h as u32)
}

/// Hollow rectangle with stroke width: concentric 1px rectangles inset one
/// pixel at a time until the stroke is filled or the rect collapses.
fn draw_outline(layer: &mut RgbaImage, rect: PixelRect, stroke: Color, stroke_width: f32) {
    let steps = (stroke_width.round() as i64).max(1);
    for inset in 0..steps {
        let w = rect.w - 2 * inset;
        let h = rect.h - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        draw_hollow_rect_mut(
            layer,
            Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32).of_size(w as u32, h as u32),
            opaque(stroke),
        );
    }
}

/// Arrow from the bounding box's top-left to its bottom-right corner: a
/// quadrilateral shaft plus a triangular head.
fn draw_arrow(layer: &mut RgbaImage, rect: PixelRect, stroke: Color, stroke_width: f32) {
    let (x0, y0) = (rect.x as f32, rect.y as f32);
    let (x1, y1) = ((rect.x + rect.w) as f32, (rect.y + rect.h) as f32);
    let (dx, dy) = (x1 - x0, y1 - y0);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1.0 {
        return;
    }
    let (ux, uy) = (dx / len, dy / len);
    let (px, py) = (-uy, ux);

    let width = stroke_width.max(1.0);
    let head_len = (width * 4.0).min(len * 0.5);
    let head_half = width * 2.0;

    // Shaft stops where the head begins.
    let (bx, by) = (x1 - ux * head_len, y1 - uy * head_len);
    let half = width / 2.0;
    fill_polygon(
        layer,
        &[
            (x0 + px * half, y0 + py * half),
            (bx + px * half, by + py * half),
            (bx - px * half, by - py * half),
            (x0 - px * half, y0 - py * half),
        ],
        opaque(stroke),
    );
    fill_polygon(
        layer,
        &[
            (x1, y1),
            (bx + px * head_half, by + py * head_half),
            (bx - px * head_half, by - py * head_half),
        ],
        opaque(stroke),
    );
}

/// Filled polygon with the guards imageproc requires: consecutive duplicate
/// vertices removed, open ring, at least three distinct points.
fn fill_polygon(layer: &mut RgbaImage, points: &[(f32, f32)], color: Rgba<u8>) {
    let mut vertices: Vec<PolyPoint<i32>> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        let vertex = PolyPoint::new(x.round() as i32, y.round() as i32);
        if vertices.last() != Some(&vertex) {
            vertices.push(vertex);
        }
    }
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    if vertices.len() < 3 {
        return;
    }
    draw_polygon_mut(layer, &vertices, color);
}

/// Source-over blend of `layer` onto `canvas` with an extra opacity factor.
fn blend_over(canvas: &mut RgbaImage, layer: &RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        let sa = (src.0[3] as f32 / 255.0) * opacity;
        if sa <= 0.0 {
            continue;
        }
        let da = dst.0[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            continue;
        }
        for channel in 0..3 {
            let sc = src.0[channel] as f32;
            let dc = dst.0[channel] as f32;
            dst.0[channel] = (((sc * sa) + dc * da * (1.0 - sa)) / out_a).round() as u8;
        }
        dst.0[3] = (out_a * 255.0).round() as u8;
    }
}

/// Whether a raster contains any visible pixel at all.
pub fn is_fully_transparent(raster: &RgbaImage) -> bool {
    raster.pixels().all(|p| p.0[3] == 0)
}
