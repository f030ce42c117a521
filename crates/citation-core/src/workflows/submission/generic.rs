use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::adapter::{AdapterKind, Submission, TargetAdapter};
use super::classify::classify_session;
use super::domain::{ProfileRecord, Target};
use super::matcher::{FieldMatcher, LogicalField};
use super::outcome::Outcome;
use crate::session::{AutomationSession, SessionError};

/// Fallback adapter: tries known and guessed submission pages until one has a
/// fillable name field.
#[derive(Debug, Clone)]
pub struct GenericAdapter {
    matcher: Arc<FieldMatcher>,
    settle: Duration,
}

impl GenericAdapter {
    pub fn new(matcher: Arc<FieldMatcher>, settle: Duration) -> Self {
        Self { matcher, settle }
    }

    /// Known URLs first, then the guessed patterns, without duplicates.
    pub fn candidate_urls(target: &Target) -> Vec<String> {
        let slug: String = target
            .slug()
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '.' || *ch == '-')
            .collect();
        let host = if slug.contains('.') {
            slug
        } else {
            format!("{slug}.com")
        };

        let guessed = [
            format!("https://www.{host}/add-business"),
            format!("https://www.{host}/add"),
            format!("https://www.{host}/register"),
            format!("https://{host}/add-listing"),
        ];

        let mut candidates: Vec<String> = Vec::with_capacity(target.urls.len() + guessed.len());
        for url in target.urls.iter().cloned().chain(guessed) {
            if !candidates.contains(&url) {
                candidates.push(url);
            }
        }
        candidates
    }
}

#[async_trait]
impl TargetAdapter for GenericAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Generic
    }

    async fn submit(
        &self,
        session: &mut dyn AutomationSession,
        target: &Target,
        profile: &ProfileRecord,
    ) -> Result<Submission, SessionError> {
        let candidates = Self::candidate_urls(target);
        let mut last_miss = String::from("no candidate urls");

        for url in &candidates {
            if let Err(err) = session.navigate(url).await {
                tracing::debug!(target: "adapter", target_name = %target.name, %url, error = %err, "candidate did not load");
                last_miss = format!("navigation failed at {url}");
                continue;
            }
            let start_url = session.current_url().await.unwrap_or_else(|_| url.clone());

            if !self.matcher.probe_name(session, profile).await {
                tracing::debug!(target: "adapter", target_name = %target.name, %url, "no name field");
                last_miss = format!("no fillable name field at {url}");
                continue;
            }

            let report = self
                .matcher
                .fill_profile(session, profile, &[LogicalField::BusinessName])
                .await;
            let fields_filled = report.count() + 1;

            let Some(submit) = self.matcher.locate_submit(session).await else {
                tracing::debug!(target: "adapter", target_name = %target.name, %url, "no submit control");
                last_miss = format!("name field but no submit control at {url}");
                continue;
            };

            session.click(&submit).await?;
            if !self.settle.is_zero() {
                tokio::time::sleep(self.settle).await;
            }

            let verdict = classify_session(session, true, &start_url).await?;
            return Ok(Submission {
                outcome: verdict.outcome,
                fields_filled,
                detail: format!("{url}: {}", verdict.reason),
            });
        }

        Ok(Submission {
            outcome: Outcome::FormNotFound,
            fields_filled: 0,
            detail: format!(
                "no usable form across {} candidate urls; last: {last_miss}",
                candidates.len()
            ),
        })
    }
}
