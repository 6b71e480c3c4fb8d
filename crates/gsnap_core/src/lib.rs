pub mod consts;
pub mod errors;
pub mod record;
pub mod header;
pub mod block;
pub mod snapshot;
pub mod com;

pub use consts::{BlockRole, Framing, MANDATORY_BLOCKS, NSPECIES};
pub use errors::{Result, SnapError, Stage};
pub use header::Header;
pub use block::Block;
pub use snapshot::{Snapshot, SnapshotSummary};
pub use com::{compute, ComConfig, ComEstimate, Particle, ParticleSet};
