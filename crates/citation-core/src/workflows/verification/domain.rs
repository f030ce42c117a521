use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::submission::AttemptId;

/// What a verification email asks the recipient to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VerificationPayload {
    Link(String),
    Code(String),
}

/// One verification email, reduced to what correlation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationEvent {
    pub message_id: String,
    pub sender: String,
    pub subject: String,
    pub payload: VerificationPayload,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum TargetIdentity {
    Known(String),
    Unknown,
}

/// Marks a pending attempt as verified. Attempts themselves stay untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRecord {
    pub message_id: String,
    pub target: String,
    pub attempt_id: AttemptId,
    pub payload: VerificationPayload,
    pub reconciled_at: DateTime<Utc>,
    /// More than one unreconciled pending attempt matched; the latest was used.
    pub anomaly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    UnknownSender,
    NoPendingAttempt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedEvent {
    pub message_id: String,
    pub identity: TargetIdentity,
    pub reason: UnmatchedReason,
    pub received_at: DateTime<Utc>,
}
