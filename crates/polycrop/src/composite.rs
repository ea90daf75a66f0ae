//! Masked compositing.
//!
//! Produces the final buffer: the polygon path is rasterized into an
//! anti-aliased coverage mask, and every result pixel is the source
//! (bilinearly sampled through the inverse of the cover placement) with
//! its alpha multiplied by the mask coverage. Outside the polygon the
//! coverage is zero and the pixel stays fully transparent; the output
//! opacity is always the intersection of source opacity and mask shape.

use image::Rgba;
use tiny_skia::{FillRule, Mask, Path, Transform};

use crate::guard::DrawGuard;
use crate::layout::Placement;
use crate::pool::BufferPool;
use crate::types::{CropError, PixelBuffer, PixelFormat};

/// Resolve the pixel format used for alpha-aware compositing.
///
/// A high-precision float source keeps its precision; everything else,
/// including sources with no alpha channel at all, resolves to standard
/// 8-bit RGBA. Sources not already in the resolved format are copied into
/// a pooled buffer before compositing; the caller's buffer is never
/// touched.
#[must_use]
pub const fn alpha_safe_format(source: PixelFormat) -> PixelFormat {
    match source {
        PixelFormat::RgbaF32 => PixelFormat::RgbaF32,
        PixelFormat::Rgb8 | PixelFormat::Rgba8 => PixelFormat::Rgba8,
    }
}

/// Run the masked composite and return the pooled result buffer.
///
/// The caller owns the returned buffer. Any temporary alpha-safe copy of
/// the source is released back to the pool before returning; on error the
/// result buffer is released too, so the pool's accounts always balance.
///
/// `path` of `None` means the clip path was degenerate beyond
/// rasterization; the mask stays empty and the result is fully
/// transparent.
///
/// # Errors
///
/// Propagates pool allocation failures and mask-allocation refusal.
pub(crate) fn render(
    pool: &dyn BufferPool,
    source: &PixelBuffer,
    dest_min_edge: u32,
    placement: &Placement,
    path: Option<&Path>,
    guard: &DrawGuard,
) -> Result<PixelBuffer, CropError> {
    let format = alpha_safe_format(source.format());

    // Alpha is required for this transformation.
    let converted = if source.format() == format {
        None
    } else {
        let mut safe = pool.acquire(source.width(), source.height(), format)?;
        convert_into(source, &mut safe);
        Some(safe)
    };
    let mut result = match pool.acquire(dest_min_edge, dest_min_edge, format) {
        Ok(buffer) => buffer,
        Err(err) => {
            if let Some(buffer) = converted {
                pool.release(buffer);
            }
            return Err(err.into());
        }
    };
    let safe_source = converted.as_ref().unwrap_or(source);

    let rasterized = {
        let _permit = guard.acquire();
        coverage_mask(dest_min_edge, path).map(|mask| {
            composite_into(&mut result, safe_source, placement, &mask);
        })
    };

    // The conversion copy is ours to return, exactly once. The caller's
    // source is never released.
    if let Some(buffer) = converted {
        pool.release(buffer);
    }

    match rasterized {
        Ok(()) => Ok(result),
        Err(err) => {
            pool.release(result);
            Err(err)
        }
    }
}

/// Rasterize the clip path into an anti-aliased coverage mask.
fn coverage_mask(size: u32, path: Option<&Path>) -> Result<Mask, CropError> {
    let mut mask = Mask::new(size, size).ok_or(CropError::MaskAllocation { size })?;
    if let Some(path) = path {
        mask.fill_path(path, FillRule::Winding, true, Transform::identity());
    }
    Ok(mask)
}

/// Copy `source` into `dest` pixel by pixel, resolving format
/// differences. Buffers must have equal dimensions. Sources without an
/// alpha channel become fully opaque.
pub(crate) fn convert_into(source: &PixelBuffer, dest: &mut PixelBuffer) {
    match dest {
        PixelBuffer::Rgb8(img) => {
            for (x, y, pixel) in img.enumerate_pixels_mut() {
                let [r, g, b, _] = pixel_at(source, x, y);
                *pixel = image::Rgb([to_u8(r), to_u8(g), to_u8(b)]);
            }
        }
        PixelBuffer::Rgba8(img) => {
            for (x, y, pixel) in img.enumerate_pixels_mut() {
                let [r, g, b, a] = pixel_at(source, x, y);
                *pixel = Rgba([to_u8(r), to_u8(g), to_u8(b), to_u8(a)]);
            }
        }
        PixelBuffer::RgbaF32(img) => {
            for (x, y, pixel) in img.enumerate_pixels_mut() {
                *pixel = Rgba(pixel_at(source, x, y));
            }
        }
    }
}

/// Write the masked composite into `dest`.
fn composite_into(dest: &mut PixelBuffer, source: &PixelBuffer, placement: &Placement, mask: &Mask) {
    let coverage = mask.data();
    match dest {
        PixelBuffer::Rgba8(img) => {
            let width = img.width() as usize;
            for (x, y, pixel) in img.enumerate_pixels_mut() {
                let c = coverage[y as usize * width + x as usize];
                *pixel = if c == 0 {
                    Rgba([0, 0, 0, 0])
                } else {
                    let [r, g, b, a] = sample_bilinear(
                        source,
                        source_coord(x, placement.left, placement.scale),
                        source_coord(y, placement.top, placement.scale),
                    );
                    let alpha = a * f32::from(c) / 255.0;
                    Rgba([to_u8(r), to_u8(g), to_u8(b), to_u8(alpha)])
                };
            }
        }
        PixelBuffer::RgbaF32(img) => {
            let width = img.width() as usize;
            for (x, y, pixel) in img.enumerate_pixels_mut() {
                let c = coverage[y as usize * width + x as usize];
                *pixel = if c == 0 {
                    Rgba([0.0, 0.0, 0.0, 0.0])
                } else {
                    let [r, g, b, a] = sample_bilinear(
                        source,
                        source_coord(x, placement.left, placement.scale),
                        source_coord(y, placement.top, placement.scale),
                    );
                    Rgba([r, g, b, a * f32::from(c) / 255.0])
                };
            }
        }
        // The compositor only ever receives alpha-safe destinations.
        PixelBuffer::Rgb8(_) => {}
    }
}

/// Map a destination pixel index to the source coordinate under the
/// inverse of the cover placement, sampling at the pixel center.
#[allow(clippy::cast_precision_loss)]
fn source_coord(dest: u32, offset: f32, scale: f32) -> f32 {
    (dest as f32 + 0.5 - offset) / scale - 0.5
}

/// Bilinearly sample `source` at a fractional coordinate, clamping at the
/// edges. Components are straight-alpha RGBA in `0.0..=1.0` (f32 sources
/// are passed through unscaled).
fn sample_bilinear(source: &PixelBuffer, x: f32, y: f32) -> [f32; 4] {
    let width = source.width();
    let height = source.height();
    if width == 0 || height == 0 {
        return [0.0; 4];
    }

    let fx = x - x.floor();
    let fy = y - y.floor();
    let x0 = clamp_index(x.floor(), width);
    let x1 = clamp_index(x.floor() + 1.0, width);
    let y0 = clamp_index(y.floor(), height);
    let y1 = clamp_index(y.floor() + 1.0, height);

    let p00 = pixel_at(source, x0, y0);
    let p10 = pixel_at(source, x1, y0);
    let p01 = pixel_at(source, x0, y1);
    let p11 = pixel_at(source, x1, y1);

    let mut out = [0.0; 4];
    for (i, slot) in out.iter_mut().enumerate() {
        let top = p00[i].mul_add(1.0 - fx, p10[i] * fx);
        let bottom = p01[i].mul_add(1.0 - fx, p11[i] * fx);
        *slot = top.mul_add(1.0 - fy, bottom * fy);
    }
    out
}

/// Clamp a floating pixel index into `0..len`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_index(value: f32, len: u32) -> u32 {
    if value <= 0.0 {
        0
    } else {
        (value as u32).min(len - 1)
    }
}

/// Read one pixel as straight-alpha RGBA components.
fn pixel_at(source: &PixelBuffer, x: u32, y: u32) -> [f32; 4] {
    match source {
        PixelBuffer::Rgb8(img) => {
            let [r, g, b] = img.get_pixel(x, y).0;
            [
                f32::from(r) / 255.0,
                f32::from(g) / 255.0,
                f32::from(b) / 255.0,
                1.0,
            ]
        }
        PixelBuffer::Rgba8(img) => {
            let [r, g, b, a] = img.get_pixel(x, y).0;
            [
                f32::from(r) / 255.0,
                f32::from(g) / 255.0,
                f32::from(b) / 255.0,
                f32::from(a) / 255.0,
            ]
        }
        PixelBuffer::RgbaF32(img) => img.get_pixel(x, y).0,
    }
}

/// Quantize a unit-range component to a byte.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
