#![allow(dead_code)]
use mesh_heat::prelude::*;
use mesh_heat::solver::IterationReport;

pub fn pid(i: usize) -> PointId {
    PointId::new(i)
}

/// Control volume of point `k` in an `n`-point chain.
pub fn chain_volume(k: usize, n: usize, h: f64, area: f64) -> f64 {
    if k == 0 || k == n - 1 { 0.5 * h * area } else { h * area }
}

/// Straight chain of `n` points spaced `h` along x, faces of area `area`,
/// without markers.
pub fn chain_builder(n: usize, h: f64, area: f64) -> MeshBuilder {
    let mut b = MeshBuilder::new(2);
    let ids: Vec<_> = (0..n)
        .map(|k| b.point([k as f64 * h, 0.0, 0.0], chain_volume(k, n, h, area)))
        .collect();
    for w in ids.windows(2) {
        b.edge(w[0], w[1], [area, 0.0, 0.0]);
    }
    b
}

/// Chain with a `left` marker on the first point and a `right` marker on
/// the last one.
pub fn chain(n: usize, h: f64, area: f64) -> DualMesh {
    let mut b = chain_builder(n, h, area);
    b.marker(
        "left",
        vec![BoundaryVertex {
            point: pid(0),
            normal: [area, 0.0, 0.0],
            normal_neighbor: pid(1),
        }],
    );
    b.marker(
        "right",
        vec![BoundaryVertex {
            point: pid(n - 1),
            normal: [-area, 0.0, 0.0],
            normal_neighbor: pid(n - 2),
        }],
    );
    b.build().unwrap()
}

/// Solid conduction config with the given `left` and `right` conditions.
pub fn conduction_config(left: BoundaryKind, right: BoundaryKind) -> HeatConfig {
    let mut config = HeatConfig::default();
    config.markers = vec![
        MarkerConfig::new("left", left),
        MarkerConfig::new("right", right),
    ];
    config
}

/// Iterate until the global RMS residual drops below `tol`.
pub fn run_until<C: Communicator>(
    solver: &mut HeatSolver,
    mesh: &DualMesh,
    flow: Option<&FlowField>,
    comm: &C,
    max_iter: usize,
    tol: f64,
) -> IterationReport {
    let mut report = solver.iterate(mesh, flow, comm).unwrap();
    for _ in 1..max_iter {
        if report.residual.rms < tol {
            break;
        }
        report = solver.iterate(mesh, flow, comm).unwrap();
    }
    report
}

pub fn assert_close(got: &[f64], want: &[f64], tol: f64) {
    assert_eq!(got.len(), want.len());
    for (k, (g, w)) in got.iter().zip(want).enumerate() {
        assert!((g - w).abs() <= tol, "entry {k}: got {g}, want {w}\n got={got:?}\nwant={want:?}");
    }
}
