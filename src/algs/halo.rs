//! Halo exchange: refresh ghost-point values from their owning partitions.
//!
//! Each [`HaloLink`](crate::topology::mesh::HaloLink) pairs an ordered send
//! list on this rank with the matching ordered receive list on the peer.
//! Values are packed in send order, cast to bytes with `bytemuck`, exchanged
//! with non-blocking point-to-point messages and unpacked in receive order.
//! A link whose peer is this rank is a plain local copy.

use bytemuck::{Pod, cast_slice};

use crate::algs::communicator::{Communicator, Wait};
use crate::data::field::HeatField;
use crate::heat_error::HeatError;
use crate::topology::mesh::DualMesh;

const HALO_TAG_BASE: u16 = 100;

/// Which per-point quantity a halo exchange carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HaloPayload {
    Solution,
    SolutionOld,
    /// Temperature gradient, three components per point.
    Gradient,
}

impl HaloPayload {
    fn tag(self) -> u16 {
        HALO_TAG_BASE
            + match self {
                Self::Solution => 0,
                Self::SolutionOld => 1,
                Self::Gradient => 2,
            }
    }
}

/// Exchange one payload of `field` across every halo link of `mesh`.
pub fn exchange_field<C>(
    mesh: &DualMesh,
    field: &mut HeatField,
    payload: HaloPayload,
    comm: &C,
) -> Result<(), HeatError>
where
    C: Communicator,
{
    let tag = payload.tag();
    match payload {
        HaloPayload::Solution => exchange_values(mesh, &mut field.solution, tag, comm),
        HaloPayload::SolutionOld => exchange_values(mesh, &mut field.solution_old, tag, comm),
        HaloPayload::Gradient => exchange_values(mesh, &mut field.gradient, tag, comm),
    }
}

/// Exchange an arbitrary `Pod` per-point array across every halo link.
pub fn exchange_values<T, C>(
    mesh: &DualMesh,
    values: &mut [T],
    tag: u16,
    comm: &C,
) -> Result<(), HeatError>
where
    T: Pod,
    C: Communicator,
{
    let me = comm.rank();
    let item = std::mem::size_of::<T>();

    // Same-rank links first: no messages involved.
    let local: Vec<_> = mesh.halo_links().iter().filter(|l| l.peer == me).collect();
    if let Some(link) = local.iter().find(|l| l.send.len() != l.recv.len()) {
        return Err(HeatError::HaloSizeMismatch {
            neighbor: me,
            expected: link.recv.len() * item,
            got: link.send.len() * item,
        });
    }
    for link in local {
        let staged: Vec<T> = link.send.iter().map(|p| values[p.index()]).collect();
        for (dst, value) in link.recv.iter().zip(staged) {
            values[dst.index()] = value;
        }
    }

    let remote: Vec<_> = mesh
        .halo_links()
        .iter()
        .filter(|l| l.peer != me)
        .collect();

    let mut pending = Vec::with_capacity(remote.len());
    for link in &remote {
        let mut buffer = vec![0u8; link.recv.len() * item];
        let handle = comm.irecv(link.peer, tag, &mut buffer);
        pending.push((*link, handle, buffer.len()));
    }

    let mut sends = Vec::with_capacity(remote.len());
    for link in &remote {
        let scratch: Vec<T> = link.send.iter().map(|p| values[p.index()]).collect();
        sends.push(comm.isend(link.peer, tag, cast_slice(&scratch)));
    }

    let received = pending
        .into_iter()
        .try_for_each(|(link, handle, expected)| -> Result<(), HeatError> {
            let raw = handle.wait().ok_or_else(|| HeatError::CommError {
                neighbor: link.peer,
                reason: format!("halo receive (tag {tag}) did not complete"),
            })?;
            if raw.len() != expected {
                return Err(HeatError::HaloSizeMismatch {
                    neighbor: link.peer,
                    expected,
                    got: raw.len(),
                });
            }
            for (dst, chunk) in link.recv.iter().zip(raw.chunks_exact(item)) {
                values[dst.index()] = bytemuck::pod_read_unaligned(chunk);
            }
            Ok(())
        });
    // posted sends must complete even when a receive failed
    for send in sends {
        let _ = send.wait();
    }
    received
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::algs::communicator::{NoComm, RayonComm};
    use crate::topology::mesh::MeshBuilder;
    use crate::topology::point::PointId;

    fn pair_mesh(owned_global: usize, ghost_global: usize, peer: usize) -> DualMesh {
        let mut b = MeshBuilder::new(2);
        let own = b.point_with([owned_global as f64, 0.0, 0.0], 1.0, owned_global, true);
        let ghost = b.point_with([ghost_global as f64, 0.0, 0.0], 1.0, ghost_global, false);
        b.edge(own, ghost, [1.0, 0.0, 0.0]);
        b.halo_link(peer, vec![own], vec![ghost]);
        b.global_domain_points(2);
        b.build().unwrap()
    }

    #[test]
    fn same_rank_link_is_a_local_copy() {
        let mut b = MeshBuilder::new(2);
        let a = b.point([0.0; 3], 1.0);
        let g = b.point_with([1.0, 0.0, 0.0], 1.0, 0, false);
        b.halo_link(0, vec![a], vec![g]);
        let mesh = b.build().unwrap();

        let mut field = HeatField::from_solution(vec![7.0, 0.0]);
        field.gradient[0] = [1.0, 2.0, 3.0];
        exchange_field(&mesh, &mut field, HaloPayload::Solution, &NoComm).unwrap();
        exchange_field(&mesh, &mut field, HaloPayload::Gradient, &NoComm).unwrap();
        assert_eq!(field.solution[1], 7.0);
        assert_eq!(field.gradient[1], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn two_ranks_swap_owned_values() {
        let world = RayonComm::world(2);
        let meshes = [pair_mesh(0, 1, 1), pair_mesh(1, 0, 0)];
        let fields: Vec<HeatField> = std::thread::scope(|s| {
            let handles: Vec<_> = world
                .iter()
                .zip(&meshes)
                .map(|(comm, mesh)| {
                    s.spawn(move || {
                        let own = 10.0 * (comm.rank() as f64 + 1.0);
                        let mut field = HeatField::from_solution(vec![own, -1.0]);
                        field.gradient[0] = [own, own, 0.0];
                        exchange_field(mesh, &mut field, HaloPayload::Solution, comm).unwrap();
                        exchange_field(mesh, &mut field, HaloPayload::Gradient, comm).unwrap();
                        field
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(fields[0].solution, vec![10.0, 20.0]);
        assert_eq!(fields[1].solution, vec![20.0, 10.0]);
        assert_eq!(fields[0].gradient[1], [20.0, 20.0, 0.0]);
        assert_eq!(fields[1].gradient[1], [10.0, 10.0, 0.0]);
    }

    #[test]
    fn short_buffer_is_reported() {
        let world = RayonComm::world(2);
        let mesh = pair_mesh(0, 1, 1);
        // Rank 1 sends half an f64 on the solution tag.
        world[1].isend(0, HaloPayload::Solution.tag(), &[0u8; 4]);
        let mut field = HeatField::uniform(2, 0.0);
        let err = exchange_field(&mesh, &mut field, HaloPayload::Solution, &world[0]);
        assert_eq!(
            err,
            Err(HeatError::HaloSizeMismatch {
                neighbor: 1,
                expected: 8,
                got: 4
            })
        );
    }

    #[test]
    fn same_rank_link_with_uneven_lists_is_rejected() {
        let mut b = MeshBuilder::new(2);
        let a = b.point([0.0; 3], 1.0);
        let c = b.point([1.0, 0.0, 0.0], 1.0);
        let g = b.point_with([2.0, 0.0, 0.0], 1.0, 0, false);
        b.halo_link(0, vec![a, c], vec![g]);
        let mesh = b.build().unwrap();

        let mut field = HeatField::from_solution(vec![1.0, 2.0, -1.0]);
        let err = exchange_field(&mesh, &mut field, HaloPayload::Solution, &NoComm);
        assert_eq!(
            err,
            Err(HeatError::HaloSizeMismatch {
                neighbor: 0,
                expected: 8,
                got: 16
            })
        );
        assert_eq!(field.solution[2], -1.0);
    }

    /// Rank 0 of a world whose receives never complete; counts send waits.
    struct DeafComm(Arc<AtomicUsize>);

    struct CountedSend(Arc<AtomicUsize>);

    impl Wait for CountedSend {
        fn wait(self) -> Option<Vec<u8>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    impl Communicator for DeafComm {
        type SendHandle = CountedSend;
        type RecvHandle = ();

        fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) -> CountedSend {
            CountedSend(Arc::clone(&self.0))
        }
        fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

        fn rank(&self) -> usize {
            0
        }
        fn size(&self) -> usize {
            2
        }
    }

    #[test]
    fn sends_complete_when_a_receive_fails() {
        let waited = Arc::new(AtomicUsize::new(0));
        let comm = DeafComm(Arc::clone(&waited));
        let mesh = pair_mesh(0, 1, 1);
        let mut field = HeatField::uniform(2, 0.0);
        let err = exchange_field(&mesh, &mut field, HaloPayload::Solution, &comm);
        assert!(matches!(err, Err(HeatError::CommError { neighbor: 1, .. })));
        assert_eq!(waited.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_peer_is_a_comm_error() {
        let comm = RayonComm::world(2)
            .remove(0)
            .with_timeout(std::time::Duration::from_millis(20));
        let mesh = pair_mesh(0, 1, 1);
        let mut field = HeatField::uniform(2, 0.0);
        let err = exchange_field(&mesh, &mut field, HaloPayload::SolutionOld, &comm);
        assert!(matches!(err, Err(HeatError::CommError { neighbor: 1, .. })));
        assert_eq!(field.solution_old[PointId::new(1).index()], 0.0);
    }
}
