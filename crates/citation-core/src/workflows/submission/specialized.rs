use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::adapter::{AdapterKind, Submission, TargetAdapter};
use super::classify::classify_session;
use super::domain::{ProfileRecord, Target};
use super::matcher::{FieldMatcher, LogicalField};
use super::outcome::Outcome;
use crate::session::LocatorAttribute::{Class, Id, Name, Type};
use crate::session::{AutomationSession, ElementTag, Locator, SessionError};

/// One field of a fixed form layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: LogicalField,
    pub strategies: Vec<Locator>,
}

impl FieldSpec {
    pub fn new(field: LogicalField, strategies: Vec<Locator>) -> Self {
        Self { field, strategies }
    }

    /// `input[name*=key]` then `input[id*=key]`.
    fn named(field: LogicalField, key: &str) -> Self {
        Self::new(
            field,
            vec![Locator::input(Name, key), Locator::input(Id, key)],
        )
    }
}

/// Known layout of a directory's submission form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDefinition {
    pub entry_url: String,
    /// Clicked in order before filling, e.g. a "list your business" button
    /// that reveals the form. Missing elements are skipped.
    pub pre_clicks: Vec<Locator>,
    pub fields: Vec<FieldSpec>,
    pub submit: Vec<Locator>,
    /// Fewer filled fields than this means the layout changed.
    pub min_filled: usize,
}

fn submit_button() -> Locator {
    Locator::button(Type, "submit")
}

impl FormDefinition {
    pub fn builtin() -> Vec<(&'static str, FormDefinition)> {
        vec![
            (
                "yellowpages",
                FormDefinition {
                    entry_url: "https://www.yellowpages.com/add-business".to_string(),
                    pre_clicks: Vec::new(),
                    fields: vec![
                        FieldSpec::named(LogicalField::BusinessName, "business"),
                        FieldSpec::named(LogicalField::Phone, "phone"),
                        FieldSpec::named(LogicalField::Address, "address"),
                        FieldSpec::named(LogicalField::City, "city"),
                        FieldSpec::named(LogicalField::Zip, "zip"),
                        FieldSpec::named(LogicalField::Website, "website"),
                    ],
                    submit: vec![submit_button(), Locator::input(Type, "submit")],
                    min_filled: 3,
                },
            ),
            (
                "hotfrog",
                FormDefinition {
                    entry_url: "https://www.hotfrog.com/add-company".to_string(),
                    pre_clicks: Vec::new(),
                    fields: vec![
                        FieldSpec::new(
                            LogicalField::BusinessName,
                            vec![Locator::input(Name, "company")],
                        ),
                        FieldSpec::new(LogicalField::Email, vec![Locator::input(Name, "email")]),
                        FieldSpec::new(LogicalField::Phone, vec![Locator::input(Name, "phone")]),
                        FieldSpec::new(
                            LogicalField::Address,
                            vec![Locator::input(Name, "address")],
                        ),
                        FieldSpec::new(LogicalField::City, vec![Locator::input(Name, "city")]),
                        FieldSpec::new(LogicalField::Zip, vec![Locator::input(Name, "postcode")]),
                        FieldSpec::new(
                            LogicalField::Website,
                            vec![Locator::input(Name, "website")],
                        ),
                    ],
                    submit: vec![submit_button()],
                    min_filled: 3,
                },
            ),
            (
                "manta",
                FormDefinition {
                    entry_url: "https://www.manta.com/add-your-business".to_string(),
                    pre_clicks: Vec::new(),
                    fields: vec![
                        FieldSpec::new(
                            LogicalField::BusinessName,
                            vec![Locator::input(Id, "business-name")],
                        ),
                        FieldSpec::new(LogicalField::Phone, vec![Locator::input(Id, "phone")]),
                    ],
                    submit: vec![Locator::new(ElementTag::Button, Class, "continue")],
                    min_filled: 2,
                },
            ),
            (
                "brownbook",
                FormDefinition {
                    entry_url: "https://www.brownbook.net/business/add".to_string(),
                    pre_clicks: Vec::new(),
                    fields: vec![
                        FieldSpec::new(
                            LogicalField::BusinessName,
                            vec![Locator::input(Name, "company_name")],
                        ),
                        FieldSpec::new(LogicalField::Phone, vec![Locator::input(Name, "phone")]),
                        FieldSpec::new(
                            LogicalField::Website,
                            vec![Locator::input(Name, "website")],
                        ),
                        FieldSpec::new(
                            LogicalField::Description,
                            vec![Locator::textarea(Name, "description")],
                        ),
                    ],
                    submit: vec![submit_button()],
                    min_filled: 4,
                },
            ),
        ]
    }
}

/// Adapter driven by a fixed [`FormDefinition`].
#[derive(Debug, Clone)]
pub struct SpecializedAdapter {
    definition: FormDefinition,
    matcher: Arc<FieldMatcher>,
    settle: Duration,
}

impl SpecializedAdapter {
    pub fn new(definition: FormDefinition, matcher: Arc<FieldMatcher>, settle: Duration) -> Self {
        Self {
            definition,
            matcher,
            settle,
        }
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }
}

#[async_trait]
impl TargetAdapter for SpecializedAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Specialized
    }

    async fn submit(
        &self,
        session: &mut dyn AutomationSession,
        target: &Target,
        profile: &ProfileRecord,
    ) -> Result<Submission, SessionError> {
        let definition = &self.definition;
        session.navigate(&definition.entry_url).await?;

        for locator in &definition.pre_clicks {
            match FieldMatcher::locate_with(session, std::slice::from_ref(locator)).await {
                Some(handle) => session.click(&handle).await?,
                None => {
                    tracing::debug!(target: "adapter", target_name = %target.name, %locator, "pre-click control missing")
                }
            }
        }

        let start_url = session.current_url().await?;
        let mut filled = 0;
        for spec in &definition.fields {
            let value = spec.field.value_from(profile);
            if FieldMatcher::fill_with(session, &spec.strategies, &value).await {
                filled += 1;
            }
        }

        if filled < definition.min_filled {
            return Ok(Submission {
                outcome: Outcome::FormNotFound,
                fields_filled: filled,
                detail: format!(
                    "filled {filled} of {} fields, {} required",
                    definition.fields.len(),
                    definition.min_filled
                ),
            });
        }

        let submit = match FieldMatcher::locate_with(session, &definition.submit).await {
            Some(handle) => handle,
            None => match self.matcher.locate_submit(session).await {
                Some(handle) => handle,
                None => {
                    return Ok(Submission {
                        outcome: Outcome::FormNotFound,
                        fields_filled: filled,
                        detail: "submit control not found".to_string(),
                    })
                }
            },
        };

        session.click(&submit).await?;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let verdict = classify_session(session, true, &start_url).await?;
        Ok(Submission {
            outcome: verdict.outcome,
            fields_filled: filled,
            detail: verdict.reason,
        })
    }
}
