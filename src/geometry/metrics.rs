//! Small fixed-size vector helpers for dual-mesh geometry.
//!
//! Coordinates, normals and gradients are stored as `[f64; 3]`; in 2D the
//! third component is kept at zero so every helper works unchanged.

/// Point coordinate, face normal or gradient.
pub type Vec3 = [f64; 3];

const EPS: f64 = 1e-14;

#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// Euclidean distance between two coordinates.
#[inline]
pub fn distance(a: Vec3, b: Vec3) -> f64 {
    norm(sub(b, a))
}

#[inline]
pub fn negate(a: Vec3) -> Vec3 {
    [-a[0], -a[1], -a[2]]
}

/// Offsets from each edge endpoint to the edge midpoint:
/// `(½(x_j − x_i), ½(x_i − x_j))`.
#[inline]
pub fn midpoint_offsets(x_i: Vec3, x_j: Vec3) -> (Vec3, Vec3) {
    (scale(sub(x_j, x_i), 0.5), scale(sub(x_i, x_j), 0.5))
}

/// Solve the symmetric `dim × dim` system `mat · x = rhs` stored in the
/// leading block of a 3×3 matrix.
///
/// Returns `None` when the block is singular.
pub fn solve_small(mat: [[f64; 3]; 3], rhs: Vec3, dim: usize) -> Option<Vec3> {
    match dim {
        1 => {
            if mat[0][0].abs() <= EPS {
                return None;
            }
            Some([rhs[0] / mat[0][0], 0.0, 0.0])
        }
        2 => {
            let det = mat[0][0] * mat[1][1] - mat[0][1] * mat[1][0];
            if det.abs() <= EPS {
                return None;
            }
            let inv_det = 1.0 / det;
            Some([
                (mat[1][1] * rhs[0] - mat[0][1] * rhs[1]) * inv_det,
                (mat[0][0] * rhs[1] - mat[1][0] * rhs[0]) * inv_det,
                0.0,
            ])
        }
        3 => {
            let inv = invert_3x3(mat)?;
            let mut out = [0.0; 3];
            for (row, value) in inv.iter().zip(out.iter_mut()) {
                *value = dot(*row, rhs);
            }
            Some(out)
        }
        _ => None,
    }
}

fn invert_3x3(m: [[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() <= EPS {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}
