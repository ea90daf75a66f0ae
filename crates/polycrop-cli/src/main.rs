//! Apply the polygon crop transformation to an image file.
//!
//! Command-line counterpart of a slider-driven demo app: decode an image,
//! crop it to a regular polygon with the given side count, rotation, and
//! corner rounding, and write the result as a PNG with transparency.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use image::DynamicImage;
use polycrop::{CropParams, Dimensions, PixelBuffer, PolygonCrop, RecyclingPool};

/// Crop an image to a regular polygon and save it as a PNG.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input image path (PNG or JPEG).
    input: PathBuf,

    /// Output image path (PNG recommended; the result carries alpha).
    #[arg(short, long)]
    output: PathBuf,

    /// Number of polygon sides.
    #[arg(long, default_value_t = 3)]
    sides: u32,

    /// Clockwise rotation of the polygon in degrees.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    rotation: i32,

    /// Corner rounding radius in pixels (0 keeps sharp corners).
    #[arg(long, default_value_t = 0)]
    corner_radius: u32,

    /// Target canvas as "WIDTHxHEIGHT". The result is a square with the
    /// smaller of the two edges.
    #[arg(long, value_name = "WxH", default_value = "512x512")]
    target: String,
}

/// Parse `--target "WIDTHxHEIGHT"` into dimensions.
fn parse_target(spec: &str) -> Result<Dimensions, String> {
    let (w_str, h_str) = spec
        .split_once('x')
        .ok_or_else(|| format!("target must be 'WIDTHxHEIGHT', got: '{spec}'"))?;

    let width: u32 = w_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid target width '{w_str}': {e}"))?;
    let height: u32 = h_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid target height '{h_str}': {e}"))?;

    Ok(Dimensions { width, height })
}

/// Wrap a decoded image in the matching pixel buffer, converting color
/// models the transformation does not model to 8-bit RGBA.
fn to_pixel_buffer(image: DynamicImage) -> PixelBuffer {
    match image {
        DynamicImage::ImageRgb8(img) => PixelBuffer::Rgb8(img),
        DynamicImage::ImageRgba8(img) => PixelBuffer::Rgba8(img),
        DynamicImage::ImageRgba32F(img) => PixelBuffer::RgbaF32(img),
        other => PixelBuffer::Rgba8(other.into_rgba8()),
    }
}

/// Unwrap the result buffer into an encodable image.
fn to_dynamic(buffer: PixelBuffer) -> DynamicImage {
    match buffer {
        PixelBuffer::Rgb8(img) => DynamicImage::ImageRgb8(img),
        PixelBuffer::Rgba8(img) => DynamicImage::ImageRgba8(img),
        PixelBuffer::RgbaF32(img) => DynamicImage::ImageRgba32F(img),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let target = parse_target(&args.target).map_err(|e| format!("--target: {e}"))?;
    let params = CropParams {
        sides: args.sides,
        rotation: args.rotation,
        corner_radius: args.corner_radius,
    };

    eprintln!("Reading image from {}", args.input.display());
    let source = to_pixel_buffer(image::open(&args.input)?);
    eprintln!(
        "Source: {}x{} {}, target: {}x{}",
        source.width(),
        source.height(),
        source.format(),
        target.width,
        target.height,
    );

    let pool = RecyclingPool::new();
    let cropper = PolygonCrop::new(params);
    eprintln!("Cache key: {}", cropper.cache_key());

    eprintln!(
        "Cropping to a {}-sided polygon (rotation {}°, corner radius {})...",
        params.sides, params.rotation, params.corner_radius,
    );
    let started = Instant::now();
    let result = cropper.transform(&pool, &source, target)?;
    eprintln!(
        "Transformed to {}x{} {} in {:.1?}",
        result.width(),
        result.height(),
        result.format(),
        started.elapsed(),
    );

    eprintln!("Saving to {}", args.output.display());
    // PNG encodes 8-bit RGBA; float results are quantized on the way out.
    to_dynamic(result).into_rgba8().save(&args.output)?;

    eprintln!("Done.");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn target_spec_parses() {
        let dims = parse_target("300x240").unwrap();
        assert_eq!(
            dims,
            Dimensions {
                width: 300,
                height: 240
            }
        );
    }

    #[test]
    fn target_spec_tolerates_spaces() {
        assert!(parse_target("300 x 240").is_ok());
    }

    #[test]
    fn malformed_target_specs_are_rejected() {
        for spec in ["300", "x", "300x", "ax b", ""] {
            assert!(parse_target(spec).is_err(), "{spec:?}");
        }
    }

    #[test]
    fn gray_images_become_rgba() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(4, 4));
        let buffer = to_pixel_buffer(gray);
        assert_eq!(buffer.format(), polycrop::PixelFormat::Rgba8);
    }
}
