use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Utc, Weekday};
use tokio_util::sync::CancellationToken;

use crate::session::{MemoryElement, MemoryPage, SessionError};
use crate::workflows::submission::{
    Attempt, AttemptId, AttemptRunner, DailyHours, DifficultyTier, Outcome, PostalAddress,
    ProfileRecord, Target,
};

pub(super) fn profile() -> ProfileRecord {
    ProfileRecord {
        name: "Harbor Light Dental".to_string(),
        address: PostalAddress {
            street: "12 Pier Rd".to_string(),
            city: "Tampa".to_string(),
            state: "FL".to_string(),
            zip: "33602".to_string(),
        },
        phone: "(813) 555-0142".to_string(),
        email: "office@harborlight.test".to_string(),
        alternate_email: None,
        website: "https://harborlight.test".to_string(),
        category: "Dentist".to_string(),
        description: "Family dentistry on the waterfront.".to_string(),
        hours: vec![DailyHours {
            day: Weekday::Mon,
            opens: Some("08:00".to_string()),
            closes: Some("17:00".to_string()),
        }],
    }
}

pub(super) fn target(name: &str, tier: DifficultyTier) -> Target {
    Target::new(name, tier)
}

/// A typical "add your business" form whose submit button loads `after`.
pub(super) fn listing_form(after: &str) -> MemoryPage {
    MemoryPage::new("Add your business for free").with_elements([
        MemoryElement::input().name("business_name"),
        MemoryElement::input().name("street_address"),
        MemoryElement::input().name("city"),
        MemoryElement::select([("FL", "Florida"), ("GA", "Georgia")]).name("state"),
        MemoryElement::input().name("zip"),
        MemoryElement::input().name("phone").kind("tel"),
        MemoryElement::input().name("email").kind("email"),
        MemoryElement::input().name("website"),
        MemoryElement::textarea().name("description"),
        MemoryElement::button("Submit listing")
            .kind("submit")
            .navigates_to(after),
    ])
}

pub(super) fn result_page(text: &str) -> MemoryPage {
    MemoryPage::new(text)
}

/// Event observed by [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum RunnerEvent {
    Started(String, DifficultyTier),
    Finished(String, DifficultyTier),
}

#[derive(Default)]
struct RunnerState {
    events: Vec<RunnerEvent>,
    active: HashMap<DifficultyTier, usize>,
    peak: HashMap<DifficultyTier, usize>,
}

/// Attempt runner with scripted outcomes and delays, recording start/finish
/// order and peak concurrency per tier.
#[derive(Default)]
pub(super) struct ScriptedRunner {
    outcomes: HashMap<String, Outcome>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    preflight_failure: Option<String>,
    cancel_on_start: Option<CancellationToken>,
    state: Mutex<RunnerState>,
}

impl ScriptedRunner {
    pub(super) fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            ..Self::default()
        }
    }

    pub(super) fn with_outcome(mut self, target: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(target.to_string(), outcome);
        self
    }

    pub(super) fn with_delay(mut self, target: &str, delay: Duration) -> Self {
        self.delays.insert(target.to_string(), delay);
        self
    }

    pub(super) fn failing_preflight(mut self, reason: &str) -> Self {
        self.preflight_failure = Some(reason.to_string());
        self
    }

    pub(super) fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_start = Some(token);
        self
    }

    pub(super) fn events(&self) -> Vec<RunnerEvent> {
        self.state.lock().expect("runner mutex poisoned").events.clone()
    }

    pub(super) fn peak(&self, tier: DifficultyTier) -> usize {
        self.state
            .lock()
            .expect("runner mutex poisoned")
            .peak
            .get(&tier)
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, target: &Target) {
        let mut state = self.state.lock().expect("runner mutex poisoned");
        state
            .events
            .push(RunnerEvent::Started(target.name.clone(), target.tier));
        let active = {
            let active = state.active.entry(target.tier).or_insert(0);
            *active += 1;
            *active
        };
        let peak = state.peak.entry(target.tier).or_insert(0);
        *peak = (*peak).max(active);
    }

    fn exit(&self, target: &Target) {
        let mut state = self.state.lock().expect("runner mutex poisoned");
        if let Some(active) = state.active.get_mut(&target.tier) {
            *active -= 1;
        }
        state
            .events
            .push(RunnerEvent::Finished(target.name.clone(), target.tier));
    }
}

#[async_trait]
impl AttemptRunner for ScriptedRunner {
    async fn run(&self, id: AttemptId, target: &Target) -> Attempt {
        let started_at = Utc::now();
        self.enter(target);
        if let Some(token) = &self.cancel_on_start {
            token.cancel();
        }

        let delay = self
            .delays
            .get(&target.name)
            .copied()
            .unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.exit(target);
        Attempt {
            id,
            target: target.name.clone(),
            tier: target.tier,
            started_at,
            finished_at: Utc::now(),
            outcome: self
                .outcomes
                .get(&target.name)
                .cloned()
                .unwrap_or(Outcome::Submitted),
            message: String::new(),
            fields_filled: 0,
        }
    }

    async fn preflight(&self) -> Result<(), SessionError> {
        match &self.preflight_failure {
            Some(reason) => Err(SessionError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}
