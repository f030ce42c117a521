use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::DifficultyTier;

const MAX_ERROR_CHARS: usize = 120;

/// Result taxonomy for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Submitted,
    PendingVerification,
    FormNotFound,
    Blocked(String),
    TimedOut,
    Error(String),
}

/// Counter an outcome contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeBucket {
    Successful,
    Pending,
    Failed,
}

impl Outcome {
    /// Builds an `Error` outcome, truncating the message to 120 characters.
    pub fn error(message: impl AsRef<str>) -> Self {
        Self::Error(truncate(message.as_ref()))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::PendingVerification => "pending_verification",
            Self::FormNotFound => "form_not_found",
            Self::Blocked(_) => "blocked",
            Self::TimedOut => "timed_out",
            Self::Error(_) => "error",
        }
    }

    pub fn bucket(&self) -> OutcomeBucket {
        match self {
            Self::Submitted => OutcomeBucket::Successful,
            Self::PendingVerification => OutcomeBucket::Pending,
            Self::FormNotFound | Self::Blocked(_) | Self::TimedOut | Self::Error(_) => {
                OutcomeBucket::Failed
            }
        }
    }

    /// Transient failures worth another try on a later run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TimedOut | Self::Error(_))
    }
}

fn truncate(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_CHARS) {
        Some((index, _)) => message[..index].to_string(),
        None => message.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub String);

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recorded (target, run) pairing. Never modified after it is logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: AttemptId,
    pub target: String,
    pub tier: DifficultyTier,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: Outcome,
    pub message: String,
    pub fields_filled: usize,
}

impl Attempt {
    pub fn elapsed_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
