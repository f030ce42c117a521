//! Run progress: counters, the attempt log and its persisted snapshot.

pub mod snapshot;
pub mod store;

pub use snapshot::{ProgressCounters, ProgressSnapshot, ResumePlan};
pub use store::{new_run_id, ProgressStore};
