//! Polygon clip-path construction.
//!
//! Builds the closed path the compositor fills as its coverage mask: a
//! regular polygon inscribed in a circle of the given radius, centered on
//! the result canvas, rotated about that center, with optional
//! constant-radius corner rounding.
//!
//! Side counts below 3 are not rejected: the path degenerates to a point
//! or a zero-area line, which rasterizes to an empty mask.

use tiny_skia::{Path, PathBuilder, Transform};

use crate::types::CropParams;

/// Build the polygon clip path.
///
/// Vertex 0 sits at angle 0 (`x = cx + r·sin θ`, `y = cy + r·cos θ`),
/// subsequent vertices at multiples of `2π / sides`, connected by straight
/// edges and closed. The finished path is rotated by `params.rotation`
/// degrees about the center. When `params.corner_radius` is positive and
/// the polygon has at least 3 vertices, each sharp join is replaced by a
/// quadratic curve whose tangent points sit `min(radius, half-edge)` along
/// the adjoining edges.
///
/// Returns `None` when the path is degenerate beyond what the rasterizer
/// can represent (no vertices); the caller treats that as an empty mask.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn polygon_path(
    radius: f32,
    center_x: f32,
    center_y: f32,
    params: &CropParams,
) -> Option<Path> {
    if params.sides == 0 {
        return None;
    }

    let cx = f64::from(center_x);
    let cy = f64::from(center_y);
    let r = f64::from(radius);
    let step = 2.0 * std::f64::consts::PI / f64::from(params.sides);

    let vertices: Vec<(f64, f64)> = (0..params.sides)
        .map(|i| {
            let angle = step * f64::from(i);
            (cx + r * angle.sin(), cy + r * angle.cos())
        })
        .collect();

    let path = if params.corner_radius > 0 && vertices.len() >= 3 {
        rounded(&vertices, f64::from(params.corner_radius))?
    } else {
        sharp(&vertices)?
    };

    path.transform(Transform::from_rotate_at(
        params.rotation as f32,
        center_x,
        center_y,
    ))
}

/// Connect the vertices with straight edges and close.
#[allow(clippy::cast_possible_truncation)]
fn sharp(vertices: &[(f64, f64)]) -> Option<Path> {
    let mut pb = PathBuilder::new();
    let (first, rest) = vertices.split_first()?;
    pb.move_to(first.0 as f32, first.1 as f32);
    for &(x, y) in rest {
        pb.line_to(x as f32, y as f32);
    }
    pb.close();
    pb.finish()
}

/// Connect the vertices with straight edges whose sharp joins are replaced
/// by quadratic curves through the original corner points.
#[allow(clippy::cast_possible_truncation)]
fn rounded(vertices: &[(f64, f64)], corner_radius: f64) -> Option<Path> {
    let mut pb = PathBuilder::new();
    let n = vertices.len();
    for i in 0..n {
        let prev = vertices[(i + n - 1) % n];
        let curr = vertices[i];
        let next = vertices[(i + 1) % n];

        let entry = along(curr, prev, corner_radius);
        let exit = along(curr, next, corner_radius);

        if i == 0 {
            pb.move_to(entry.0 as f32, entry.1 as f32);
        } else {
            pb.line_to(entry.0 as f32, entry.1 as f32);
        }
        pb.quad_to(curr.0 as f32, curr.1 as f32, exit.0 as f32, exit.1 as f32);
    }
    pb.close();
    pb.finish()
}

/// The point `min(distance, half the segment length)` along the segment
/// from `from` towards `to`. Zero-length segments return `from` unchanged.
fn along(from: (f64, f64), to: (f64, f64), distance: f64) -> (f64, f64) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let len = dx.hypot(dy);
    if len < f64::EPSILON {
        return from;
    }
    let d = distance.min(len / 2.0);
    (from.0 + dx / len * d, from.1 + dy / len * d)
}
