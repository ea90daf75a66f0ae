//! Cover-scale placement and mask radius.
//!
//! Two independent pieces of geometry feed the compositor: the affine
//! mapping that scales the source onto the square result canvas, and the
//! radius of the circle the polygon is inscribed in. Neither depends on
//! the other.

use crate::types::Dimensions;

/// Divisor floor for the mask-radius formula.
///
/// The radius divides by `2·cos(rotation)`, which collapses to zero as the
/// rotation approaches 90° or 270°. Divisors with `|cos| < COS_EPSILON`
/// are clamped to `±COS_EPSILON`, capping the radius magnitude at 500×
/// the canvas edge while keeping the formula exact everywhere else.
pub const COS_EPSILON: f64 = 1e-3;

/// Placement of the cover-scaled source on the square result canvas.
///
/// Produced by [`cover_placement`]; all fields are in result-canvas
/// pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Horizontal offset of the scaled source's left edge. Non-positive
    /// when the source overflows horizontally.
    pub left: f32,
    /// Vertical offset of the scaled source's top edge. Non-positive
    /// when the source overflows vertically.
    pub top: f32,
    /// Scaled source width; at least the canvas edge.
    pub width: f32,
    /// Scaled source height; at least the canvas edge.
    pub height: f32,
    /// The uniform scale factor applied to the source.
    pub scale: f32,
}

/// Compute the cover-scale placement of `source` on a square canvas of
/// side `dest_min_edge`.
///
/// The scale is the larger of the two per-axis ratios, so the scaled
/// source covers the whole canvas and overflows symmetrically on its
/// longer axis. The placement centers the scaled source: `left` and
/// `top` are half the (non-positive) overflow on each axis.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cover_placement(source: Dimensions, dest_min_edge: u32) -> Placement {
    let dest = dest_min_edge as f32;
    let scale_x = dest / source.width as f32;
    let scale_y = dest / source.height as f32;
    let scale = scale_x.max(scale_y);

    let width = scale * source.width as f32;
    let height = scale * source.height as f32;

    Placement {
        left: (dest - width) / 2.0,
        top: (dest - height) / 2.0,
        width,
        height,
        scale,
    }
}

/// Compute the polygon's inscribing-circle radius for a square canvas of
/// side `dest_min_edge` under the given rotation.
///
/// The radius is `dest_min_edge / (2·cos(rotation))` — rotation-compensated
/// so the polygon's bounding behavior stays visually consistent as the
/// rotation changes. The divisor is floored at [`COS_EPSILON`] (preserving
/// its sign), so the result is finite and deterministic for every
/// rotation, including the degenerate 90° and 270° angles. For rotations
/// between 90° and 270° the cosine, and therefore the radius, is negative;
/// the vertex formulas mirror the polygon through its center, which is a
/// point-symmetric (and for even side counts identical) shape.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn mask_radius(dest_min_edge: u32, rotation: i32) -> f32 {
    let cos = f64::from(rotation).to_radians().cos();
    let divisor = if cos.abs() < COS_EPSILON {
        COS_EPSILON.copysign(cos)
    } else {
        cos
    };
    (f64::from(dest_min_edge) / (2.0 * divisor)) as f32
}
