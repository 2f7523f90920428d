//! Keeping the post list fresh

pub mod snapshot;

#[cfg(feature = "tokio-runtime")]
pub mod poller;

pub use snapshot::{SequenceGate, Snapshot};

#[cfg(feature = "tokio-runtime")]
pub use poller::{PollingSynchronizer, SyncHandle, SyncStats};
