//! Working-copy synchronization.
//!
//! The [`Synchronizer`] clones, fetches and checks out working copies on
//! demand, one lock per working-copy identity, and hands out
//! [`WorkingCopy`] leases that keep a copy stable while it is read.

mod state;
mod synchronizer;
mod working_copy;

pub use state::{CopyState, CopyStatus, SyncState};
pub use synchronizer::{SyncOptions, SyncTarget, Synchronizer};
pub use working_copy::WorkingCopy;
