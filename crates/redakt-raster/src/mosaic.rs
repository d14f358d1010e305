// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mosaic engine — isolate, downsample, upsample.
//
// A mosaic region's pixels are always derived from whatever lies under it
// at bake time: the capture hides the region itself, the downsample uses
// area-averaging (this produces the averaged block color), and the upsample
// is strictly nearest-neighbor (this produces the visible square blocks).

use image::{RgbaImage, imageops};
use tracing::debug;

use redakt_core::error::Result;
use redakt_core::geometry::PixelRect;
use redakt_core::types::MOSAIC_BLOCK_RANGE;
use redakt_scene::object::{ObjectId, SceneObject};

use crate::surface::Renderer;

/// Pixelate a captured rectangle: area-average down to one pixel per block,
/// then scale back up with nearest-neighbor only.
pub fn pixelate(capture: &RgbaImage, block_size: u32) -> RgbaImage {
    let block = block_size.max(*MOSAIC_BLOCK_RANGE.start());
    let (w, h) = (capture.width(), capture.height());
    let small_w = (w / block).max(1);
    let small_h = (h / block).max(1);
    let small = imageops::resize(capture, small_w, small_h, imageops::FilterType::Triangle);
    imageops::resize(&small, w, h, imageops::FilterType::Nearest)
}

/// Bake one mosaic region against a static scene: composite the background
/// plus every *other* object, capture the region's clamped bounding rect at
/// 1:1 scale, and pixelate it.
///
/// Returns `Ok(None)` when the object is missing, is not a mosaic, or its
/// bounding rect degenerates to zero area on this surface — all cases where
/// the bake is a silent no-op.
pub fn bake_object(
    renderer: &Renderer,
    background: &RgbaImage,
    objects: &[SceneObject],
    target: ObjectId,
) -> Result<Option<RgbaImage>> {
    let Some(object) = objects.iter().find(|o| o.id == target) else {
        return Ok(None);
    };
    let block_size = match &object.kind {
        redakt_scene::object::ObjectKind::Mosaic { block_size, .. } => *block_size,
        _ => return Ok(None),
    };
    let (surface_w, surface_h) = (background.width(), background.height());
    let Some(rect) =
        PixelRect::from_center(object.center, object.size).clamped_to(surface_w, surface_h)
    else {
        debug!(object = %target, "mosaic bounding rect degenerate, bake skipped");
        return Ok(None);
    };

    // Isolate: the region itself is hidden, everything else is composited.
    let composite = renderer.compose(Some(background), objects, Some(target), surface_w, surface_h)?;
    let capture = imageops::crop_imm(
        &composite,
        rect.x as u32,
        rect.y as u32,
        rect.w as u32,
        rect.h as u32,
    )
    .to_image();

    debug!(
        object = %target,
        w = rect.w,
        h = rect.h,
        block_size,
        "mosaic baked"
    );
    Ok(Some(pixelate(&capture, block_size)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use redakt_core::types::{Color, Point, Size};
    use redakt_scene::object::ObjectKind;
    use std::collections::HashSet;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 17, 255])
        })
    }

    fn distinct_colors(img: &RgbaImage) -> usize {
        img.pixels().map(|p| p.0).collect::<HashSet<_>>().len()
    }

    fn mosaic_at(center: Point, size: Size, block_size: u32) -> SceneObject {
        SceneObject::new(
            center,
            size,
            1.0,
            ObjectKind::Mosaic {
                block_size,
                baked: None,
            },
        )
    }

    /// Block-count bound: a w x h region at block size b never yields more
    /// than ceil(w/b) * ceil(h/b) distinct flat colors.
    #[test]
    fn pixelate_respects_block_count_bound() {
        let capture = gradient(200, 120);
        let baked = pixelate(&capture, 10);
        assert_eq!((baked.width(), baked.height()), (200, 120));
        assert!(distinct_colors(&baked) <= 20 * 12);
    }

    #[test]
    fn pixelate_block_one_is_identity_sized() {
        let capture = gradient(16, 16);
        let baked = pixelate(&capture, 1);
        assert_eq!((baked.width(), baked.height()), (16, 16));
    }

    #[test]
    fn pixelate_block_larger_than_region_gives_one_block() {
        let capture = gradient(8, 8);
        let baked = pixelate(&capture, 50);
        assert_eq!(distinct_colors(&baked), 1);
    }

    /// Upsample is nearest-neighbor: each block is perfectly flat.
    #[test]
    fn blocks_are_flat_color() {
        let capture = gradient(40, 40);
        let baked = pixelate(&capture, 10);
        for (block_x, block_y) in [(0u32, 0u32), (1, 2), (3, 3)] {
            let anchor = *baked.get_pixel(block_x * 10, block_y * 10);
            for dx in 0..10 {
                for dy in 0..10 {
                    assert_eq!(*baked.get_pixel(block_x * 10 + dx, block_y * 10 + dy), anchor);
                }
            }
        }
    }

    /// Re-baking an unchanged region yields pixel-identical output.
    #[test]
    fn bake_is_idempotent_on_unchanged_region() {
        let renderer = Renderer::new(None);
        let background = gradient(120, 120);
        let mut objects = vec![
            SceneObject::new(
                Point::new(40.0, 40.0),
                Size::new(30.0, 30.0),
                1.0,
                ObjectKind::FilledRect { fill: Color::RED },
            ),
            mosaic_at(Point::new(50.0, 50.0), Size::new(60.0, 40.0), 8),
        ];
        let target = objects[1].id;

        let first = bake_object(&renderer, &background, &objects, target)
            .unwrap()
            .unwrap();
        objects[1].set_baked(Some(first.clone()));

        // The region's own baked pixels are hidden during capture, so the
        // second bake sees the identical composite.
        let second = bake_object(&renderer, &background, &objects, target)
            .unwrap()
            .unwrap();
        assert_eq!(first, second);
    }

    /// A 200x120 region at block size 10 yields at most 20x12 blocks.
    #[test]
    fn scenario_region_200_by_120_block_10() {
        let renderer = Renderer::new(None);
        let background = gradient(400, 400);
        let objects = vec![mosaic_at(Point::new(200.0, 160.0), Size::new(200.0, 120.0), 10)];
        let baked = bake_object(&renderer, &background, &objects, objects[0].id)
            .unwrap()
            .unwrap();
        assert_eq!((baked.width(), baked.height()), (200, 120));
        assert!(distinct_colors(&baked) <= 20 * 12);
    }

    #[test]
    fn degenerate_rect_is_a_no_op() {
        let renderer = Renderer::new(None);
        let background = gradient(50, 50);
        // Fully off-surface.
        let objects = vec![mosaic_at(Point::new(500.0, 500.0), Size::new(20.0, 20.0), 5)];
        assert!(
            bake_object(&renderer, &background, &objects, objects[0].id)
                .unwrap()
                .is_none()
        );
        // Zero-size.
        let objects = vec![mosaic_at(Point::new(25.0, 25.0), Size::new(0.0, 10.0), 5)];
        assert!(
            bake_object(&renderer, &background, &objects, objects[0].id)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn missing_or_non_mosaic_target_is_a_no_op() {
        let renderer = Renderer::new(None);
        let background = gradient(50, 50);
        let rect = SceneObject::new(
            Point::new(25.0, 25.0),
            Size::new(20.0, 20.0),
            1.0,
            ObjectKind::FilledRect { fill: Color::BLACK },
        );
        let id = rect.id;
        let objects = vec![rect];
        assert!(bake_object(&renderer, &background, &objects, id).unwrap().is_none());
        assert!(
            bake_object(&renderer, &background, &objects, ObjectId::new())
                .unwrap()
                .is_none()
        );
    }

    /// The capture sees objects under the region: a red rectangle below the
    /// mosaic shows up in the averaged blocks.
    #[test]
    fn capture_includes_objects_beneath() {
        let renderer = Renderer::new(None);
        let background = RgbaImage::from_pixel(60, 60, Rgba([255, 255, 255, 255]));
        let objects = vec![
            SceneObject::new(
                Point::new(30.0, 30.0),
                Size::new(60.0, 60.0),
                1.0,
                ObjectKind::FilledRect { fill: Color::new(200, 0, 0) },
            ),
            mosaic_at(Point::new(30.0, 30.0), Size::new(20.0, 20.0), 20),
        ];
        let baked = bake_object(&renderer, &background, &objects, objects[1].id)
            .unwrap()
            .unwrap();
        let pixel = baked.get_pixel(10, 10);
        assert!(pixel.0[0] > 150 && pixel.0[1] < 60, "got {:?}", pixel);
    }
}
