pub mod progress;
pub mod submission;
pub mod verification;
