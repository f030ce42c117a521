use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout, timeout_at, Instant};

use super::adapter::{AdapterRegistry, Submission};
use super::domain::{ProfileRecord, Target};
use super::outcome::{Attempt, AttemptId, Outcome};
use crate::session::{AutomationSession, SessionError, SessionFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Deadline for navigation, filling and submitting one target.
    pub attempt_timeout: Duration,
    pub session_open_timeout: Duration,
    pub close_timeout: Duration,
}

impl ExecutorConfig {
    pub fn with_attempt_timeout(attempt_timeout: Duration) -> Self {
        Self {
            attempt_timeout,
            ..Self::default()
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(45),
            session_open_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(5),
        }
    }
}

/// Runs one target in its own session and always produces an [`Attempt`].
#[derive(Clone)]
pub struct AttemptExecutor {
    sessions: Arc<dyn SessionFactory>,
    adapters: Arc<AdapterRegistry>,
    profile: Arc<ProfileRecord>,
    config: ExecutorConfig,
}

impl AttemptExecutor {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        adapters: Arc<AdapterRegistry>,
        profile: Arc<ProfileRecord>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            sessions,
            adapters,
            profile,
            config,
        }
    }

    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    pub async fn execute(&self, id: AttemptId, target: &Target) -> Attempt {
        let started_at = Utc::now();
        tracing::info!(target: "executor", attempt = %id, target_name = %target.name, tier = %target.tier, "attempt started");

        let submission = self.submit(target).await;

        let attempt = Attempt {
            id,
            target: target.name.clone(),
            tier: target.tier,
            started_at,
            finished_at: Utc::now(),
            outcome: submission.outcome,
            message: submission.detail,
            fields_filled: submission.fields_filled,
        };
        tracing::info!(
            target: "executor",
            attempt = %attempt.id,
            target_name = %attempt.target,
            outcome = attempt.outcome.label(),
            fields = attempt.fields_filled,
            "attempt finished"
        );
        attempt
    }

    async fn submit(&self, target: &Target) -> Submission {
        let deadline = Instant::now() + self.config.attempt_timeout;

        let open_deadline = deadline.min(Instant::now() + self.config.session_open_timeout);
        let mut session = match timeout_at(open_deadline, self.sessions.open()).await {
            Ok(Ok(session)) => session,
            Ok(Err(err)) => return failure(Outcome::error(format!("session unavailable: {err}"))),
            Err(_) => return failure(Outcome::TimedOut),
        };

        let adapter = self.adapters.resolve(target);
        let result = timeout_at(
            deadline,
            adapter.submit(session.as_mut(), target, &self.profile),
        )
        .await;

        self.close(session.as_mut(), target).await;

        match result {
            Ok(Ok(submission)) => submission,
            Ok(Err(err)) => failure(Outcome::error(err.to_string())),
            Err(_) => Submission {
                outcome: Outcome::TimedOut,
                fields_filled: 0,
                detail: format!(
                    "no result within {}s",
                    self.config.attempt_timeout.as_secs_f64()
                ),
            },
        }
    }

    async fn close(&self, session: &mut dyn AutomationSession, target: &Target) {
        match timeout(self.config.close_timeout, session.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(target: "executor", target_name = %target.name, error = %err, "session close failed")
            }
            Err(_) => {
                tracing::warn!(target: "executor", target_name = %target.name, "session close timed out")
            }
        }
    }

    /// Opens and closes one session to prove the automation engine is reachable.
    pub async fn preflight(&self) -> Result<(), SessionError> {
        let mut session = timeout(self.config.session_open_timeout, self.sessions.open())
            .await
            .map_err(|_| SessionError::Unavailable("timed out opening a session".to_string()))??;
        session.close().await
    }
}

fn failure(outcome: Outcome) -> Submission {
    let detail = match &outcome {
        Outcome::Error(message) => message.clone(),
        other => other.label().to_string(),
    };
    Submission {
        outcome,
        fields_filled: 0,
        detail,
    }
}
