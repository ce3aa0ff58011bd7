//! Re-export public algorithms.

pub mod communicator;
pub mod halo;

pub use communicator::{Communicator, NoComm, RayonComm, Wait};
pub use halo::{HaloPayload, exchange_field, exchange_values};
