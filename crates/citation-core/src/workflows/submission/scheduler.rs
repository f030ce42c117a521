//! Phased, bounded-concurrency dispatch of attempts.
//!
//! Phases run strictly in `easy → medium → hard` order. A phase is drained
//! completely before the next one starts; `hard` targets run one at a time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::domain::{DifficultyTier, Target};
use super::executor::AttemptExecutor;
use super::outcome::{Attempt, AttemptId, Outcome};
use crate::session::SessionError;
use crate::workflows::progress::{ProgressSnapshot, ProgressStore};

/// Executes one attempt. Implementations must always return an [`Attempt`].
#[async_trait]
pub trait AttemptRunner: Send + Sync + 'static {
    async fn run(&self, id: AttemptId, target: &Target) -> Attempt;

    /// Checks that sessions can be opened at all.
    async fn preflight(&self) -> Result<(), SessionError>;
}

#[async_trait]
impl AttemptRunner for AttemptExecutor {
    async fn run(&self, id: AttemptId, target: &Target) -> Attempt {
        self.execute(id, target).await
    }

    async fn preflight(&self) -> Result<(), SessionError> {
        AttemptExecutor::preflight(self).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Pool width for the easy and medium phases.
    pub batch_size: usize,
    pub attempt_ceiling: Duration,
    /// Extra time granted past the ceiling for session teardown.
    pub teardown_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            attempt_ceiling: Duration::from_secs(45),
            teardown_grace: Duration::from_secs(10),
        }
    }
}

impl SchedulerConfig {
    pub fn width(&self, tier: DifficultyTier) -> usize {
        match tier {
            DifficultyTier::Hard => 1,
            DifficultyTier::Easy | DifficultyTier::Medium => self.batch_size.max(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("automation session preflight failed: {0}")]
    SessionSetup(#[source] SessionError),
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub snapshot: ProgressSnapshot,
    /// The run was cancelled before every target was dispatched.
    pub interrupted: bool,
    /// Targets never dispatched because of cancellation.
    pub skipped: Vec<String>,
}

pub struct Scheduler<R> {
    runner: Arc<R>,
    store: Arc<ProgressStore>,
    config: SchedulerConfig,
    shutdown: CancellationToken,
}

impl<R: AttemptRunner> Scheduler<R> {
    pub fn new(runner: Arc<R>, store: Arc<ProgressStore>, config: SchedulerConfig) -> Self {
        Self {
            runner,
            store,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling `token` stops dispatch; in-flight attempts still finish.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn store(&self) -> &Arc<ProgressStore> {
        &self.store
    }

    pub async fn run(&self, targets: &[Target]) -> Result<RunSummary, SchedulerError> {
        self.runner
            .preflight()
            .await
            .map_err(SchedulerError::SessionSetup)?;

        let mut skipped = Vec::new();
        for tier in DifficultyTier::ORDERED {
            let phase: Vec<Target> = targets
                .iter()
                .filter(|target| target.tier == tier)
                .cloned()
                .collect();
            if phase.is_empty() {
                continue;
            }

            let width = self.config.width(tier);
            tracing::info!(target: "scheduler", phase = %tier, targets = phase.len(), width, "phase started");
            let phase_skipped = self.run_phase(phase, width).await;
            tracing::info!(target: "scheduler", phase = %tier, skipped = phase_skipped.len(), "phase finished");
            skipped.extend(phase_skipped);
        }

        Ok(RunSummary {
            snapshot: self.store.snapshot(),
            interrupted: self.shutdown.is_cancelled(),
            skipped,
        })
    }

    async fn run_phase(&self, phase: Vec<Target>, width: usize) -> Vec<String> {
        let mut in_flight = FuturesUnordered::new();
        let mut queue = phase.into_iter();

        loop {
            while in_flight.len() < width && !self.shutdown.is_cancelled() {
                match queue.next() {
                    Some(target) => in_flight.push(self.dispatch(target)),
                    None => break,
                }
            }

            match in_flight.next().await {
                Some(attempt) => self.store.record(attempt),
                None => break,
            }
        }

        let skipped: Vec<String> = queue.map(|target| target.name).collect();
        if !skipped.is_empty() {
            tracing::info!(target: "scheduler", count = skipped.len(), "dispatch stopped by shutdown");
        }
        skipped
    }

    fn dispatch(&self, target: Target) -> impl Future<Output = Attempt> + Send + 'static {
        let id = self.store.next_attempt_id();
        let ceiling = self.config.attempt_ceiling + self.config.teardown_grace;
        let started_at = Utc::now();

        let runner = Arc::clone(&self.runner);
        let task_id = id.clone();
        let task_target = target.clone();
        let handle =
            tokio::spawn(async move { timeout(ceiling, runner.run(task_id, &task_target)).await });

        async move {
            let (outcome, message) = match handle.await {
                Ok(Ok(attempt)) => return attempt,
                Ok(Err(_)) => {
                    tracing::warn!(target: "scheduler", attempt = %id, target_name = %target.name, "attempt exceeded ceiling");
                    (
                        Outcome::TimedOut,
                        format!("no outcome within {}s", ceiling.as_secs_f64()),
                    )
                }
                Err(err) => {
                    tracing::error!(target: "scheduler", attempt = %id, target_name = %target.name, error = %err, "attempt task failed to join");
                    let outcome = Outcome::error(format!("attempt task failed: {err}"));
                    let message = match &outcome {
                        Outcome::Error(message) => message.clone(),
                        _ => String::new(),
                    };
                    (outcome, message)
                }
            };

            Attempt {
                id,
                target: target.name,
                tier: target.tier,
                started_at,
                finished_at: Utc::now(),
                outcome,
                message,
                fields_filled: 0,
            }
        }
    }
}
