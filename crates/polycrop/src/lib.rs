//! polycrop: polygon crop transformation for image pipelines (sans-IO).
//!
//! Crops a source image to a regular polygon (configurable side count,
//! rotation, and corner rounding), producing a square, alpha-enabled
//! buffer with the source cover-scaled into the polygon region and fully
//! transparent everywhere else:
//! mask radius -> clip path -> cover placement -> masked composite.
//!
//! This crate has **no I/O dependencies** — it operates on in-memory
//! pixel buffers and returns structured data. Decoding, network fetch,
//! caching, and display belong to the hosting pipeline, which drives the
//! transformation through [`PolygonCrop::transform`] and the
//! [`BufferPool`] collaborator.
//!
//! ```
//! use polycrop::{CropParams, Dimensions, PixelBuffer, PixelFormat, PolygonCrop, RecyclingPool};
//!
//! let pool = RecyclingPool::new();
//! let source = PixelBuffer::new(PixelFormat::Rgba8, 400, 200);
//! let cropper = PolygonCrop::new(CropParams {
//!     sides: 6,
//!     rotation: 15,
//!     corner_radius: 4,
//! });
//! let result = cropper.transform(
//!     &pool,
//!     &source,
//!     Dimensions {
//!         width: 300,
//!         height: 300,
//!     },
//! )?;
//! assert_eq!(result.width(), 300);
//! assert_eq!(result.height(), 300);
//! # Ok::<(), polycrop::CropError>(())
//! ```

use std::sync::Arc;

pub mod composite;
pub mod guard;
pub mod identity;
pub mod layout;
pub mod path;
pub mod pool;
pub mod types;

pub use composite::alpha_safe_format;
pub use guard::{DrawGuard, DrawPermit, SERIALIZED_DRAWING_MODELS, requires_serialized_drawing};
pub use identity::{IDENTITY, VERSION, cache_digest, cache_key};
pub use pool::{BufferPool, PoolError, RecyclingPool};
pub use types::{CropError, CropParams, Dimensions, PixelBuffer, PixelFormat};

/// The polygon crop transformation.
///
/// Stateless and pure given its parameters, a source, and a target size:
/// two calls with the same inputs produce bit-identical buffers. Safe to
/// share across worker threads: only the drawing step is serialized, and
/// only when the injected [`DrawGuard`] requires it.
#[derive(Debug)]
pub struct PolygonCrop {
    params: CropParams,
    guard: Arc<DrawGuard>,
}

impl PolygonCrop {
    /// Create a transformation with a lockless drawing guard.
    #[must_use]
    pub fn new(params: CropParams) -> Self {
        Self::with_guard(params, Arc::new(DrawGuard::default()))
    }

    /// Create a transformation with an injected drawing guard, usually a
    /// process-wide `Arc` resolved once via [`DrawGuard::for_device`].
    #[must_use]
    pub const fn with_guard(params: CropParams, guard: Arc<DrawGuard>) -> Self {
        Self { params, guard }
    }

    /// The parameter triple.
    #[must_use]
    pub const fn params(&self) -> CropParams {
        self.params
    }

    /// Deterministic cache key for this parameter triple. See
    /// [`identity::cache_key`].
    #[must_use]
    pub fn cache_key(&self) -> String {
        identity::cache_key(&self.params)
    }

    /// Compact digest of the cache key. See [`identity::cache_digest`].
    #[must_use]
    pub fn cache_digest(&self) -> u64 {
        identity::cache_digest(&self.params)
    }

    /// Crop `source` to the polygon on a `min(width, height)` square
    /// canvas.
    ///
    /// The result buffer is borrowed from `pool` and owned by the caller;
    /// every intermediate the transformation borrows goes back to the
    /// pool before this returns. The source is only read.
    ///
    /// # Errors
    ///
    /// Returns [`CropError::InvalidDimensions`] when the target width or
    /// height is zero, and propagates [`CropError::Allocation`] /
    /// [`CropError::MaskAllocation`] from the pool and the rasterizer.
    #[allow(clippy::cast_precision_loss)]
    pub fn transform(
        &self,
        pool: &dyn BufferPool,
        source: &PixelBuffer,
        target: Dimensions,
    ) -> Result<PixelBuffer, CropError> {
        if target.width == 0 || target.height == 0 {
            return Err(CropError::InvalidDimensions {
                width: target.width,
                height: target.height,
            });
        }

        let dest_min_edge = target.min_edge();
        let placement = layout::cover_placement(source.dimensions(), dest_min_edge);
        let radius = layout::mask_radius(dest_min_edge, self.params.rotation);

        let center = dest_min_edge as f32 / 2.0;
        let clip = path::polygon_path(radius, center, center, &self.params);

        composite::render(
            pool,
            source,
            dest_min_edge,
            &placement,
            clip.as_ref(),
            &self.guard,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(sides: u32, rotation: i32, corner_radius: u32) -> CropParams {
        CropParams {
            sides,
            rotation,
            corner_radius,
        }
    }

    fn square(edge: u32) -> Dimensions {
        Dimensions {
            width: edge,
            height: edge,
        }
    }

    fn solid_source(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::Rgba8(types::RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([180, 90, 45, 255]),
        ))
    }

    /// Left half red, right half blue — makes the placement visible.
    fn two_tone_source(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::Rgba8(types::RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        }))
    }

    fn alpha_at(buffer: &PixelBuffer, x: u32, y: u32) -> u8 {
        match buffer {
            PixelBuffer::Rgba8(img) => img.get_pixel(x, y).0[3],
            PixelBuffer::Rgb8(_) | PixelBuffer::RgbaF32(_) => unreachable!(),
        }
    }

    #[test]
    fn result_is_square_and_alpha_enabled() {
        let pool = RecyclingPool::new();
        let source = solid_source(400, 200);
        for (sides, rotation, corner_radius) in
            [(3, 0, 0), (4, 45, 0), (5, -30, 10), (6, 400, 3), (12, 180, 0)]
        {
            let cropper = PolygonCrop::new(params(sides, rotation, corner_radius));
            let result = cropper
                .transform(
                    &pool,
                    &source,
                    Dimensions {
                        width: 300,
                        height: 240,
                    },
                )
                .unwrap();
            assert_eq!(result.width(), 240, "sides {sides}");
            assert_eq!(result.height(), 240, "sides {sides}");
            assert!(result.format().has_alpha(), "sides {sides}");
            pool.release(result);
        }
    }

    #[test]
    fn zero_target_dimension_fails_fast() {
        let pool = RecyclingPool::new();
        let source = solid_source(10, 10);
        let cropper = PolygonCrop::new(CropParams::default());

        for (w, h) in [(0, 300), (300, 0), (0, 0)] {
            let result = cropper.transform(&pool, &source, Dimensions { width: w, height: h });
            assert!(
                matches!(
                    result,
                    Err(CropError::InvalidDimensions { width, height }) if width == w && height == h
                ),
                "{w}x{h}"
            );
        }
        assert_eq!(pool.live_bytes(), 0);
    }

    #[test]
    fn diamond_scenario_matches_the_geometry() {
        // 400x200 source onto a 300x300 target, sides = 4, no rotation:
        // mask radius 300 / (2 cos 0) = 150: a diamond whose vertices
        // touch the canvas edge midpoints.
        let pool = RecyclingPool::new();
        let source = two_tone_source(400, 200);
        let cropper = PolygonCrop::new(params(4, 0, 0));
        let result = cropper.transform(&pool, &source, square(300)).unwrap();

        assert_eq!(result.width(), 300);
        assert_eq!(result.height(), 300);

        // Canvas corners are far outside the diamond.
        for (x, y) in [(3, 3), (296, 3), (3, 296), (296, 296)] {
            assert_eq!(alpha_at(&result, x, y), 0, "({x}, {y})");
        }
        // Points well inside the diamond are opaque.
        for (x, y) in [(150, 150), (150, 40), (40, 150), (150, 260)] {
            assert_eq!(alpha_at(&result, x, y), 255, "({x}, {y})");
        }

        // Cover placement centers the 1.5x-scaled source: the seam between
        // the source halves lands on the vertical canvas center line.
        let PixelBuffer::Rgba8(img) = &result else {
            unreachable!()
        };
        assert_eq!(img.get_pixel(100, 150).0, [255, 0, 0, 255], "left is red");
        assert_eq!(img.get_pixel(200, 150).0, [0, 0, 255, 255], "right is blue");
    }

    #[test]
    fn full_turn_mask_matches_no_rotation() {
        let pool = RecyclingPool::new();
        let source = solid_source(120, 120);

        let zero = PolygonCrop::new(params(5, 0, 0))
            .transform(&pool, &source, square(120))
            .unwrap();
        let full = PolygonCrop::new(params(5, 360, 0))
            .transform(&pool, &source, square(120))
            .unwrap();

        let (PixelBuffer::Rgba8(a), PixelBuffer::Rgba8(b)) = (&zero, &full) else {
            unreachable!()
        };
        for (pa, pb) in a.pixels().zip(b.pixels()) {
            let diff = pa.0[3].abs_diff(pb.0[3]);
            assert!(diff <= 1, "alpha differs by {diff}");
        }
    }

    #[test]
    fn quarter_turn_triangle_is_clamped_not_crashed() {
        // cos(90°) collapses the mask-radius divisor; the clamp keeps the
        // radius finite and the call well-defined.
        let pool = RecyclingPool::new();
        let source = solid_source(300, 300);
        let cropper = PolygonCrop::new(params(3, 90, 0));

        let result = cropper.transform(&pool, &source, square(300)).unwrap();
        assert_eq!(result.width(), 300);
        assert!(result.format().has_alpha());

        // Deterministic: a second run reproduces the same pixels.
        let again = cropper.transform(&pool, &source, square(300)).unwrap();
        assert_eq!(result, again);
    }

    #[test]
    fn degenerate_side_counts_produce_transparent_results() {
        let pool = RecyclingPool::new();
        let source = solid_source(60, 60);
        for sides in [0, 1, 2] {
            let cropper = PolygonCrop::new(params(sides, 30, 5));
            let result = cropper.transform(&pool, &source, square(60)).unwrap();
            let PixelBuffer::Rgba8(img) = &result else {
                unreachable!()
            };
            assert!(
                img.pixels().all(|p| p.0[3] == 0),
                "sides {sides} must mask everything out"
            );
            pool.release(result);
        }
    }

    #[test]
    fn rounded_corners_trim_the_vertices() {
        let pool = RecyclingPool::new();
        let source = solid_source(300, 300);

        let sharp = PolygonCrop::new(params(4, 0, 0))
            .transform(&pool, &source, square(300))
            .unwrap();
        let rounded = PolygonCrop::new(params(4, 0, 40))
            .transform(&pool, &source, square(300))
            .unwrap();

        // Just inside the diamond's right vertex: opaque when sharp,
        // shaved off by the corner rounding.
        assert_eq!(alpha_at(&sharp, 297, 150), 255);
        assert_eq!(alpha_at(&rounded, 297, 150), 0);
        // The center is untouched by rounding.
        assert_eq!(alpha_at(&rounded, 150, 150), 255);
    }

    #[test]
    fn transform_is_idempotent_across_pool_reuse() {
        let pool = RecyclingPool::new();
        let source = solid_source(200, 100);
        let cropper = PolygonCrop::new(params(6, 30, 8));

        let first = cropper.transform(&pool, &source, square(150)).unwrap();
        // Recycle the first result so the second call reuses its buffer.
        let snapshot = first.clone();
        pool.release(first);
        let second = cropper.transform(&pool, &source, square(150)).unwrap();
        assert_eq!(snapshot, second);
    }

    #[test]
    fn guard_variant_does_not_change_pixels() {
        let pool = RecyclingPool::new();
        let source = solid_source(100, 100);
        let p = params(5, 72, 6);

        let lockless = PolygonCrop::new(p)
            .transform(&pool, &source, square(100))
            .unwrap();
        let serialized = PolygonCrop::with_guard(p, Arc::new(DrawGuard::new(true)))
            .transform(&pool, &source, square(100))
            .unwrap();
        assert_eq!(lockless, serialized);
    }

    #[test]
    fn concurrent_transforms_agree() {
        let pool = Arc::new(RecyclingPool::new());
        let source = Arc::new(solid_source(128, 64));
        let cropper = Arc::new(PolygonCrop::with_guard(
            params(4, 15, 3),
            Arc::new(DrawGuard::for_device("XT1085")),
        ));

        let reference = cropper.transform(pool.as_ref(), &source, square(96)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let source = Arc::clone(&source);
                let cropper = Arc::clone(&cropper);
                std::thread::spawn(move || {
                    cropper.transform(pool.as_ref(), &source, square(96)).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), reference);
        }
    }

    #[test]
    fn cache_key_round_trips_through_the_type() {
        let cropper = PolygonCrop::new(params(7, 10, 2));
        assert_eq!(cropper.cache_key(), identity::cache_key(&params(7, 10, 2)));
        assert_eq!(
            cropper.cache_digest(),
            identity::cache_digest(&params(7, 10, 2)),
        );
        assert_ne!(
            cropper.cache_key(),
            PolygonCrop::new(params(7, 10, 3)).cache_key(),
        );
    }
}
