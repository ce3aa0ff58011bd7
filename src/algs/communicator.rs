//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! All handles are **waitable** but non-blocking; the halo exchange and the
//! collectives call `.wait()` before they trust that the buffer is ready.
//!
//! Messages between the same `(source, destination, tag)` triple are
//! delivered in the order they were sent.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;

use crate::heat_error::HeatError;

/// Tag reserved for the built-in collectives.
pub const REDUCE_TAG: u16 = u16::MAX;

/// Non-blocking communication interface.
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// Post a send of `buf` to `peer`.
    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of `buf.len()` bytes from `peer`.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Rank of this process/thread in the world.
    fn rank(&self) -> usize;
    /// Number of ranks in the world.
    fn size(&self) -> usize;

    /// Gather one equally sized buffer from every rank, indexed by rank.
    fn all_gather(&self, buf: &[u8]) -> Result<Vec<Vec<u8>>, HeatError> {
        let (me, size) = (self.rank(), self.size());
        if size <= 1 {
            return Ok(vec![buf.to_vec()]);
        }

        let mut pending = Vec::with_capacity(size - 1);
        for peer in (0..size).filter(|&p| p != me) {
            let mut scratch = vec![0u8; buf.len()];
            pending.push((peer, self.irecv(peer, REDUCE_TAG, &mut scratch)));
        }
        let sends: Vec<_> = (0..size)
            .filter(|&p| p != me)
            .map(|peer| self.isend(peer, REDUCE_TAG, buf))
            .collect();

        let mut out = vec![Vec::new(); size];
        out[me] = buf.to_vec();
        for (peer, handle) in pending {
            let raw = handle.wait().ok_or_else(|| HeatError::CommError {
                neighbor: peer,
                reason: "collective receive did not complete".into(),
            })?;
            if raw.len() != buf.len() {
                return Err(HeatError::CommError {
                    neighbor: peer,
                    reason: format!(
                        "collective buffer has {} bytes, expected {}",
                        raw.len(),
                        buf.len()
                    ),
                });
            }
            out[peer] = raw;
        }
        for send in sends {
            let _ = send.wait();
        }
        Ok(out)
    }

    /// Gather a fixed-length `f64` record from every rank, indexed by rank.
    fn all_gather_f64(&self, values: &[f64]) -> Result<Vec<Vec<f64>>, HeatError> {
        let gathered = self.all_gather(bytemuck::cast_slice(values))?;
        Ok(gathered
            .iter()
            .map(|raw| {
                raw.chunks_exact(std::mem::size_of::<f64>())
                    .map(bytemuck::pod_read_unaligned::<f64>)
                    .collect()
            })
            .collect())
    }

    /// Sum of `value` over all ranks, folded in rank order.
    fn all_reduce_sum(&self, value: f64) -> Result<f64, HeatError> {
        Ok(self
            .all_gather_f64(&[value])?
            .iter()
            .map(|record| record[0])
            .sum())
    }

    fn all_reduce_max(&self, value: f64) -> Result<f64, HeatError> {
        Ok(self
            .all_gather_f64(&[value])?
            .iter()
            .map(|record| record[0])
            .fold(f64::NEG_INFINITY, f64::max))
    }

    fn all_reduce_min(&self, value: f64) -> Result<f64, HeatError> {
        Ok(self
            .all_gather_f64(&[value])?
            .iter()
            .map(|record| record[0])
            .fold(f64::INFINITY, f64::min))
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

/// Compile-time no-op comm for pure serial runs.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }
}

// --- RayonComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)
type Mailbox = Arc<DashMap<Key, VecDeque<Bytes>>>;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pending receive on a [`RayonComm`] mailbox.
pub struct LocalHandle {
    mailbox: Mailbox,
    key: Key,
    timeout: Duration,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let start = Instant::now();
        loop {
            if let Some(mut queue) = self.mailbox.get_mut(&self.key) {
                if let Some(bytes) = queue.pop_front() {
                    return Some(bytes.to_vec());
                }
            }
            if start.elapsed() > self.timeout {
                log::warn!(
                    "receive from rank {} (tag {}) timed out after {:?}",
                    self.key.0,
                    self.key.2,
                    self.timeout
                );
                return None;
            }
            std::thread::yield_now();
        }
    }
}

/// In-process world: each rank is a thread sharing one mailbox.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Mailbox,
    timeout: Duration,
}

impl RayonComm {
    /// Create the communicators of a `size`-rank world, indexed by rank.
    pub fn world(size: usize) -> Vec<RayonComm> {
        let mailbox: Mailbox = Arc::new(DashMap::new());
        (0..size)
            .map(|rank| RayonComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
                timeout: DEFAULT_TIMEOUT,
            })
            .collect()
    }

    /// Give up on a receive after `timeout` (reported as a failed wait).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.mailbox
            .entry((self.rank, peer, tag))
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            timeout: self.timeout,
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use mpi::environment::Universe;
    use mpi::request::{Request, StaticScope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;
    use std::sync::Arc;

    struct Inner {
        // dropped before the universe finalizes MPI
        world: SimpleCommunicator,
        _universe: Universe,
    }

    /// One MPI process per partition.
    #[derive(Clone)]
    pub struct MpiComm {
        inner: Arc<Inner>,
        rank: usize,
        size: usize,
    }

    // Each rank drives its communicator from a single thread.
    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    impl MpiComm {
        /// Initialise MPI; `None` if it was already initialised.
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Some(Self {
                inner: Arc::new(Inner {
                    world,
                    _universe: universe,
                }),
                rank,
                size,
            })
        }
    }

    pub struct MpiSendHandle {
        request: Request<'static, [u8], StaticScope>,
        _buf: Box<[u8]>,
    }

    impl Wait for MpiSendHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.request.wait();
            None
        }
    }

    pub struct MpiRecvHandle {
        inner: Arc<Inner>,
        peer: i32,
        tag: i32,
    }

    impl Wait for MpiRecvHandle {
        fn wait(self) -> Option<Vec<u8>> {
            let (data, _status) = self
                .inner
                .world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            Some(data)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSendHandle;
        type RecvHandle = MpiRecvHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiSendHandle {
            let owned: Box<[u8]> = buf.into();
            // SAFETY: the box is kept alive in the handle until the request completes.
            let view: &'static [u8] = unsafe { &*(owned.as_ref() as *const [u8]) };
            let request = self
                .inner
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, view, tag as i32);
            MpiSendHandle {
                request,
                _buf: owned,
            }
        }

        fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> MpiRecvHandle {
            MpiRecvHandle {
                inner: Arc::clone(&self.inner),
                peer: peer as i32,
                tag: tag as i32,
            }
        }

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
