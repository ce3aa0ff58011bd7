mod util;
use std::thread;

use mesh_heat::prelude::*;
use util::*;

const H: f64 = 0.25;
const AREA: f64 = 1.0;

/// Global points 0..4 split as {0, 1 | ghost 2} on rank 0 and
/// {ghost 1 | 2, 3} on rank 1.
fn partition(rank: usize) -> DualMesh {
    let vol = |g: usize| chain_volume(g, 4, H, AREA);
    let x = |g: usize| [g as f64 * H, 0.0, 0.0];
    let mut b = MeshBuilder::new(2);
    if rank == 0 {
        let g0 = b.point_with(x(0), vol(0), 0, true);
        let g1 = b.point_with(x(1), vol(1), 1, true);
        let g2 = b.point_with(x(2), vol(2), 2, false);
        b.edge(g0, g1, [AREA, 0.0, 0.0]);
        b.edge(g1, g2, [AREA, 0.0, 0.0]);
        b.marker(
            "left",
            vec![BoundaryVertex {
                point: g0,
                normal: [AREA, 0.0, 0.0],
                normal_neighbor: g1,
            }],
        );
        b.halo_link(1, vec![g1], vec![g2]);
    } else {
        let g1 = b.point_with(x(1), vol(1), 1, false);
        let g2 = b.point_with(x(2), vol(2), 2, true);
        let g3 = b.point_with(x(3), vol(3), 3, true);
        b.edge(g1, g2, [AREA, 0.0, 0.0]);
        b.edge(g2, g3, [AREA, 0.0, 0.0]);
        b.marker(
            "right",
            vec![BoundaryVertex {
                point: g3,
                normal: [-AREA, 0.0, 0.0],
                normal_neighbor: g2,
            }],
        );
        b.halo_link(0, vec![g2], vec![g1]);
    }
    b.global_domain_points(4);
    b.build().unwrap()
}

fn config() -> HeatConfig {
    let mut config = conduction_config(
        BoundaryKind::Isothermal { temperature: 0.0 },
        BoundaryKind::HeatFlux { flux: 2.0 },
    );
    config.cfl = 20.0;
    config
}

fn global_indices(mesh: &DualMesh) -> Vec<usize> {
    mesh.points().iter().map(|p| p.global_index).collect()
}

/// Domain values of both partitions, written into a global vector.
fn gather(parts: &[(DualMesh, Vec<f64>)]) -> Vec<f64> {
    let mut out = vec![f64::NAN; 4];
    for (mesh, values) in parts {
        for (p, v) in mesh.points().iter().zip(values) {
            if p.domain {
                out[p.global_index] = *v;
            }
        }
    }
    out
}

#[test]
fn partitioned_residual_matches_serial() {
    let initial = |g: usize| 1.0 + (g as f64 * H).powi(2);

    let serial_mesh = chain(4, H, AREA);
    let mut serial =
        HeatSolver::with_solution(&serial_mesh, config(), (0..4).map(initial).collect()).unwrap();
    serial.compute_residual(&serial_mesh, None, &NoComm).unwrap();

    let parts: Vec<(DualMesh, Vec<f64>)> = thread::scope(|s| {
        let handles: Vec<_> = RayonComm::world(2)
            .into_iter()
            .map(|comm| {
                s.spawn(move || {
                    let mesh = partition(comm.rank());
                    // ghosts start from garbage and must be refreshed
                    let t0 = mesh
                        .points()
                        .iter()
                        .map(|p| if p.domain { initial(p.global_index) } else { 99.0 })
                        .collect();
                    let mut solver = HeatSolver::with_solution(&mesh, config(), t0).unwrap();
                    solver.compute_residual(&mesh, None, &comm).unwrap();
                    assert_eq!(
                        solver.field().solution,
                        global_indices(&mesh)
                            .into_iter()
                            .map(initial)
                            .collect::<Vec<_>>()
                    );
                    let residual = solver.residual().to_vec();
                    (mesh, residual)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_close(&gather(&parts), serial.residual(), 1e-12);
}

#[test]
fn partitioned_run_converges_to_serial_solution() {
    let serial_mesh = chain(4, H, AREA);
    let mut serial = HeatSolver::new(&serial_mesh, config()).unwrap();
    run_until(&mut serial, &serial_mesh, None, &NoComm, 500, 1e-11);

    let parts: Vec<(DualMesh, Vec<f64>)> = thread::scope(|s| {
        let handles: Vec<_> = RayonComm::world(2)
            .into_iter()
            .map(|comm| {
                s.spawn(move || {
                    let mesh = partition(comm.rank());
                    let mut solver = HeatSolver::new(&mesh, config()).unwrap();
                    let report = run_until(&mut solver, &mesh, None, &comm, 2000, 1e-11);
                    assert!(report.residual.rms < 1e-11);
                    assert_eq!(report.heat_flux.total, 0.0);
                    let solution = solver.field().solution.clone();
                    (mesh, solution)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_close(&gather(&parts), &serial.field().solution, 1e-8);
}
