use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::VerificationEvent;
use super::extract::payload_from_body;
use super::identity::IdentityTable;

const SUBJECT_TERMS: &[&str] = &[
    "verify",
    "confirm",
    "activate",
    "verify your listing",
    "confirm your business",
];

/// Which messages count as verification mail: a subject term in the subject
/// or a sender term in the sender, case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxQuery {
    pub subject_terms: Vec<String>,
    pub sender_terms: Vec<String>,
}

impl InboxQuery {
    pub fn standard(table: &IdentityTable) -> Self {
        Self {
            subject_terms: SUBJECT_TERMS.iter().map(|term| term.to_string()).collect(),
            sender_terms: table.keywords().map(str::to_string).collect(),
        }
    }

    pub fn matches(&self, sender: &str, subject: &str) -> bool {
        let sender = sender.to_lowercase();
        let subject = subject.to_lowercase();
        self.subject_terms
            .iter()
            .any(|term| subject.contains(&term.to_lowercase()))
            || self
                .sender_terms
                .iter()
                .any(|term| sender.contains(&term.to_lowercase()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    #[error("failed to read inbox export {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid inbox export {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Source of recent verification mail.
#[async_trait]
pub trait InboxClient: Send + Sync {
    async fn search_recent(
        &self,
        query: &InboxQuery,
        window: Duration,
    ) -> Result<Vec<VerificationEvent>, InboxError>;
}

/// One exported message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    pub id: String,
    pub sender: String,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    pub received_at: DateTime<Utc>,
}

/// Inbox backed by a JSON array of exported messages.
#[derive(Debug, Clone)]
pub struct JsonInboxExport {
    path: PathBuf,
    now: Option<DateTime<Utc>>,
}

impl JsonInboxExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            now: None,
        }
    }

    /// Measures the search window from `now` instead of the wall clock.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    async fn messages(&self) -> Result<Vec<InboxMessage>, InboxError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|source| InboxError::Read {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_slice(&raw).map_err(|source| InboxError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl InboxClient for JsonInboxExport {
    async fn search_recent(
        &self,
        query: &InboxQuery,
        window: Duration,
    ) -> Result<Vec<VerificationEvent>, InboxError> {
        let now = self.now.unwrap_or_else(Utc::now);
        let cutoff = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut events = Vec::new();
        for message in self.messages().await? {
            if message.received_at < cutoff || !query.matches(&message.sender, &message.subject) {
                continue;
            }
            match payload_from_body(&message.body) {
                Some(payload) => events.push(VerificationEvent {
                    message_id: message.id,
                    sender: message.sender,
                    subject: message.subject,
                    payload,
                    received_at: message.received_at,
                }),
                None => {
                    tracing::debug!(target: "inbox", message_id = %message.id, "no link or code in message body")
                }
            }
        }
        events.sort_by(|a, b| a.received_at.cmp(&b.received_at));
        Ok(events)
    }
}
