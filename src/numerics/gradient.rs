//! Temperature gradient reconstruction at mesh points.
//!
//! Gradients are computed for owned points only; ghost entries are filled
//! by a subsequent [`HaloPayload::Gradient`](crate::algs::halo::HaloPayload)
//! exchange.

use crate::geometry::metrics::{Vec3, add, dot, scale, solve_small, sub};
use crate::topology::mesh::DualMesh;

/// Green-Gauss: `∇T_i = (1/V_i) Σ_faces T_face · n_out`.
///
/// Interior faces use the arithmetic mean of the endpoint values, boundary
/// faces the point value.
pub fn green_gauss(mesh: &DualMesh, solution: &[f64], gradient: &mut [Vec3]) {
    gradient.fill([0.0; 3]);

    for edge in mesh.edges() {
        let (i, j) = (edge.tail(), edge.head());
        let flux = scale(edge.normal, 0.5 * (solution[i.index()] + solution[j.index()]));
        if mesh.is_domain(i) {
            gradient[i.index()] = add(gradient[i.index()], flux);
        }
        if mesh.is_domain(j) {
            gradient[j.index()] = sub(gradient[j.index()], flux);
        }
    }

    for marker in mesh.markers() {
        for vertex in marker.vertices() {
            let p = vertex.point;
            if mesh.is_domain(p) {
                // vertex normals point inwards
                let flux = scale(vertex.normal, solution[p.index()]);
                gradient[p.index()] = sub(gradient[p.index()], flux);
            }
        }
    }

    for p in mesh.point_ids().filter(|&p| mesh.is_domain(p)) {
        let volume = mesh.volume(p);
        if volume > 0.0 {
            gradient[p.index()] = scale(gradient[p.index()], 1.0 / volume);
        }
    }
}

/// Inverse-distance-squared weighted least squares over edge neighbours.
///
/// Points whose neighbourhood does not span the mesh dimension get a zero
/// gradient.
pub fn weighted_least_squares(mesh: &DualMesh, solution: &[f64], gradient: &mut [Vec3]) {
    let dim = mesh.dim();
    let neighbors = mesh.neighbors();

    for p in mesh.point_ids() {
        if !mesh.is_domain(p) {
            continue;
        }
        let x_p = mesh.coord(p);
        let t_p = solution[p.index()];
        let mut normal_matrix = [[0.0; 3]; 3];
        let mut rhs = [0.0; 3];

        for &q in &neighbors[p.index()] {
            let d = sub(mesh.coord(q), x_p);
            let dist2 = dot(d, d);
            if dist2 == 0.0 {
                continue;
            }
            let w = 1.0 / dist2;
            let dt = solution[q.index()] - t_p;
            for a in 0..dim {
                rhs[a] += w * d[a] * dt;
                for b in 0..dim {
                    normal_matrix[a][b] += w * d[a] * d[b];
                }
            }
        }

        gradient[p.index()] = solve_small(normal_matrix, rhs, dim).unwrap_or([0.0; 3]);
    }
}
