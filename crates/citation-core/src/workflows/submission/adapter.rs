use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::domain::{ProfileRecord, Target};
use super::generic::GenericAdapter;
use super::matcher::FieldMatcher;
use super::outcome::Outcome;
use super::specialized::{FormDefinition, SpecializedAdapter};
use crate::session::{AutomationSession, SessionError};

/// What an adapter produced for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub outcome: Outcome,
    pub fields_filled: usize,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Specialized,
    Generic,
}

/// Per-target submission routine.
///
/// Session failures are returned as errors; the executor turns them into an
/// outcome. Anything the adapter can judge from the page itself (no form, a
/// blocked page) is reported through [`Submission::outcome`].
#[async_trait]
pub trait TargetAdapter: Send + Sync + fmt::Debug {
    fn kind(&self) -> AdapterKind;

    async fn submit(
        &self,
        session: &mut dyn AutomationSession,
        target: &Target,
        profile: &ProfileRecord,
    ) -> Result<Submission, SessionError>;
}

fn registry_key(key: &str) -> String {
    key.chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Specialized adapters keyed by target, with the generic adapter as fallback.
#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    specialized: HashMap<String, Arc<dyn TargetAdapter>>,
    fallback: Arc<dyn TargetAdapter>,
}

impl AdapterRegistry {
    pub fn new(fallback: Arc<dyn TargetAdapter>) -> Self {
        Self {
            specialized: HashMap::new(),
            fallback,
        }
    }

    /// Generic fallback plus the built-in specialized form definitions.
    /// `settle` is how long adapters wait after clicking submit.
    pub fn standard(matcher: Arc<FieldMatcher>, settle: Duration) -> Self {
        let mut registry = Self::new(Arc::new(GenericAdapter::new(Arc::clone(&matcher), settle)));
        for (key, definition) in FormDefinition::builtin() {
            registry.register(
                key,
                Arc::new(SpecializedAdapter::new(
                    definition,
                    Arc::clone(&matcher),
                    settle,
                )),
            );
        }
        registry
    }

    pub fn register(&mut self, key: &str, adapter: Arc<dyn TargetAdapter>) {
        self.specialized.insert(registry_key(key), adapter);
    }

    /// Specialized adapter for the target's adapter key or name, else the
    /// fallback.
    pub fn resolve(&self, target: &Target) -> Arc<dyn TargetAdapter> {
        let key = registry_key(target.adapter.as_deref().unwrap_or(&target.name));
        self.specialized
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    pub fn specialized_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.specialized.keys().cloned().collect();
        keys.sort();
        keys
    }
}
