//! Submission orchestration: target catalog, field matching, adapters,
//! per-attempt execution and phased scheduling.

pub mod adapter;
pub mod catalog;
pub mod classify;
pub mod domain;
pub mod executor;
pub mod generic;
pub mod matcher;
pub mod outcome;
pub mod scheduler;
pub mod specialized;

#[cfg(test)]
mod tests;

pub use adapter::{AdapterKind, AdapterRegistry, Submission, TargetAdapter};
pub use catalog::{CatalogError, TargetCatalog};
pub use classify::{classify, Classification, PageState};
pub use domain::{DailyHours, DifficultyTier, PostalAddress, ProfileError, ProfileRecord, Target};
pub use executor::{AttemptExecutor, ExecutorConfig};
pub use generic::GenericAdapter;
pub use matcher::{FieldMatcher, FillReport, LogicalField};
pub use outcome::{Attempt, AttemptId, Outcome, OutcomeBucket};
pub use scheduler::{AttemptRunner, RunSummary, Scheduler, SchedulerConfig, SchedulerError};
pub use specialized::{FieldSpec, FormDefinition, SpecializedAdapter};
