//! Shared types for the polygon crop transformation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pool::PoolError;

/// Re-export the `image` buffer types backing [`PixelBuffer`] so
/// downstream crates can construct sources without depending on
/// `image` directly.
pub use image::{RgbImage, Rgba32FImage, RgbaImage};

/// Pixel storage format of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGB, no alpha channel.
    Rgb8,
    /// 8-bit RGBA, straight (non-premultiplied) alpha.
    Rgba8,
    /// 32-bit floating point RGBA, straight alpha.
    RgbaF32,
}

impl PixelFormat {
    /// Whether buffers in this format carry per-pixel transparency.
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba8 | Self::RgbaF32)
    }

    /// Storage size of a single pixel in bytes.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
            Self::RgbaF32 => 16,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb8 => f.write_str("Rgb8"),
            Self::Rgba8 => f.write_str("Rgba8"),
            Self::RgbaF32 => f.write_str("RgbaF32"),
        }
    }
}

/// A pixel buffer tagged with its storage format.
///
/// Sources handed to [`PolygonCrop::transform`](crate::PolygonCrop::transform)
/// are read-only from the transformation's point of view: when a format
/// conversion is required, the converted copy lives in a buffer borrowed
/// from the pool and the original is left untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    /// See [`PixelFormat::Rgb8`].
    Rgb8(RgbImage),
    /// See [`PixelFormat::Rgba8`].
    Rgba8(RgbaImage),
    /// See [`PixelFormat::RgbaF32`].
    RgbaF32(Rgba32FImage),
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer in the given format.
    #[must_use]
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        match format {
            PixelFormat::Rgb8 => Self::Rgb8(RgbImage::new(width, height)),
            PixelFormat::Rgba8 => Self::Rgba8(RgbaImage::new(width, height)),
            PixelFormat::RgbaF32 => Self::RgbaF32(Rgba32FImage::new(width, height)),
        }
    }

    /// The storage format of this buffer.
    #[must_use]
    pub const fn format(&self) -> PixelFormat {
        match self {
            Self::Rgb8(_) => PixelFormat::Rgb8,
            Self::Rgba8(_) => PixelFormat::Rgba8,
            Self::RgbaF32(_) => PixelFormat::RgbaF32,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Rgb8(img) => img.width(),
            Self::Rgba8(img) => img.width(),
            Self::RgbaF32(img) => img.width(),
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Rgb8(img) => img.height(),
            Self::Rgba8(img) => img.height(),
            Self::RgbaF32(img) => img.height(),
        }
    }

    /// Width and height as a [`Dimensions`].
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Storage size of the pixel data in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.width() as usize * self.height() as usize * self.format().bytes_per_pixel()
    }

    /// Overwrite every pixel with zeroes (transparent black).
    pub(crate) fn wipe(&mut self) {
        match self {
            Self::Rgb8(img) => img.fill(0),
            Self::Rgba8(img) => img.fill(0),
            Self::RgbaF32(img) => img.fill(0.0),
        }
    }
}

/// Target canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// The shorter of the two edges: the side length of the square
    /// result canvas.
    #[must_use]
    pub const fn min_edge(self) -> u32 {
        if self.width < self.height {
            self.width
        } else {
            self.height
        }
    }
}

/// Parameters of the polygon crop.
///
/// All three values participate in the cache key (see
/// [`identity`](crate::identity)); two calls with equal parameters are
/// interchangeable from a caching layer's point of view.
///
/// `sides` below 3 is tolerated: the clip path degenerates to a line or a
/// point, the mask covers nothing, and the result is fully transparent.
/// Degenerate output, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropParams {
    /// Number of polygon sides.
    pub sides: u32,
    /// Clockwise rotation of the polygon in degrees. Any value is
    /// accepted, including negative angles and angles beyond 360.
    pub rotation: i32,
    /// Corner rounding radius in pixels. `0` keeps sharp corners.
    pub corner_radius: u32,
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            sides: 3,
            rotation: 0,
            corner_radius: 0,
        }
    }
}

/// Errors produced by the transformation.
#[derive(Debug, thiserror::Error)]
pub enum CropError {
    /// Target width or height was zero. The transformation fails fast
    /// instead of inventing a canvas size.
    #[error("target dimensions {width}x{height} must be positive")]
    InvalidDimensions {
        /// Requested target width.
        width: u32,
        /// Requested target height.
        height: u32,
    },

    /// The rasterizer refused to allocate the coverage mask.
    #[error("coverage mask allocation failed for a {size}x{size} canvas")]
    MaskAllocation {
        /// Side length of the square mask.
        size: u32,
    },

    /// A buffer-pool allocation failed.
    #[error(transparent)]
    Allocation(#[from] PoolError),
}
