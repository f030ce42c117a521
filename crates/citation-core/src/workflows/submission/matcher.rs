//! Greedy field matching against unknown form layouts.
//!
//! Each logical field carries an ordered list of locator strategies. The first
//! strategy that yields a visible, enabled element wins; there is no scoring,
//! so a fixed page and a fixed table always pick the same element.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::ProfileRecord;
use crate::session::LocatorAttribute::{Class, Id, Name, Placeholder, Text, Type};
use crate::session::{AutomationSession, ElementHandle, ElementTag, Locator, SelectBy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    BusinessName,
    Address,
    City,
    State,
    Zip,
    Phone,
    Email,
    Website,
    Description,
    Category,
    Hours,
}

impl LogicalField {
    pub const ALL: [LogicalField; 11] = [
        Self::BusinessName,
        Self::Address,
        Self::City,
        Self::State,
        Self::Zip,
        Self::Phone,
        Self::Email,
        Self::Website,
        Self::Description,
        Self::Category,
        Self::Hours,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::BusinessName => "business_name",
            Self::Address => "address",
            Self::City => "city",
            Self::State => "state",
            Self::Zip => "zip",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Website => "website",
            Self::Description => "description",
            Self::Category => "category",
            Self::Hours => "hours",
        }
    }

    pub fn value_from(self, profile: &ProfileRecord) -> String {
        match self {
            Self::BusinessName => profile.name.clone(),
            Self::Address => profile.address.street.clone(),
            Self::City => profile.address.city.clone(),
            Self::State => profile.address.state.clone(),
            Self::Zip => profile.address.zip.clone(),
            Self::Phone => profile.phone.clone(),
            Self::Email => profile.email.clone(),
            Self::Website => profile.website.clone(),
            Self::Description => profile.description.clone(),
            Self::Category => profile.category.clone(),
            Self::Hours => profile.hours_summary(),
        }
    }

    /// Priority-ordered strategies for the field.
    pub fn default_strategies(self) -> Vec<Locator> {
        match self {
            Self::BusinessName => vec![
                Locator::input(Name, "business"),
                Locator::input(Name, "company"),
                Locator::input(Placeholder, "business name"),
                Locator::input(Id, "business-name"),
                Locator::input(Id, "company"),
                Locator::input(Placeholder, "business"),
                Locator::input(Name, "name"),
            ],
            Self::Address => vec![
                Locator::input(Name, "address"),
                Locator::input(Placeholder, "address"),
                Locator::input(Id, "address"),
                Locator::input(Name, "street"),
            ],
            Self::City => vec![
                Locator::input(Name, "city"),
                Locator::input(Placeholder, "city"),
                Locator::input(Id, "city"),
            ],
            Self::State => vec![
                Locator::select(Name, "state"),
                Locator::input(Name, "state"),
                Locator::select(Id, "state"),
                Locator::select(Name, "region"),
            ],
            Self::Zip => vec![
                Locator::input(Name, "zip"),
                Locator::input(Name, "postal"),
                Locator::input(Name, "postcode"),
                Locator::input(Placeholder, "zip"),
            ],
            Self::Phone => vec![
                Locator::input(Name, "phone"),
                Locator::input(Placeholder, "phone"),
                Locator::input(Type, "tel"),
            ],
            Self::Email => vec![
                Locator::input(Name, "email"),
                Locator::input(Placeholder, "email"),
                Locator::input(Type, "email"),
            ],
            Self::Website => vec![
                Locator::input(Name, "website"),
                Locator::input(Name, "url"),
                Locator::input(Placeholder, "website"),
                Locator::input(Type, "url"),
            ],
            Self::Description => vec![
                Locator::textarea(Name, "description"),
                Locator::textarea(Placeholder, "description"),
                Locator::textarea(Id, "description"),
                Locator::textarea(Name, "about"),
            ],
            Self::Category => vec![
                Locator::input(Name, "category"),
                Locator::select(Name, "category"),
                Locator::input(Placeholder, "category"),
            ],
            Self::Hours => vec![
                Locator::textarea(Name, "hours"),
                Locator::input(Name, "hours"),
                Locator::input(Placeholder, "hours"),
            ],
        }
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fields written and fields that had no matching element or no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    pub filled: Vec<LogicalField>,
    pub missing: Vec<LogicalField>,
}

impl FillReport {
    pub fn count(&self) -> usize {
        self.filled.len()
    }
}

#[derive(Debug, Clone)]
pub struct FieldMatcher {
    fields: Vec<(LogicalField, Vec<Locator>)>,
    name_probe: Vec<Locator>,
    submit: Vec<Locator>,
}

impl FieldMatcher {
    pub fn standard() -> Self {
        Self {
            fields: LogicalField::ALL
                .into_iter()
                .map(|field| (field, field.default_strategies()))
                .collect(),
            name_probe: Self::name_probe_strategies(),
            submit: Self::submit_strategies(),
        }
    }

    /// Name-like inputs the generic adapter requires before it fills a page.
    pub fn name_probe_strategies() -> Vec<Locator> {
        vec![
            Locator::input(Name, "business"),
            Locator::input(Id, "business"),
            Locator::input(Name, "company"),
            Locator::input(Id, "company"),
            Locator::input(Name, "name"),
            Locator::input(Id, "name"),
        ]
    }

    pub fn submit_strategies() -> Vec<Locator> {
        vec![
            Locator::button(Type, "submit"),
            Locator::input(Type, "submit"),
            Locator::button(Text, "submit"),
            Locator::button(Text, "add business"),
            Locator::button(Text, "continue"),
            Locator::link(Text, "submit"),
            Locator::new(ElementTag::Button, Class, "submit-button"),
            Locator::new(ElementTag::Button, Class, "btn-submit"),
        ]
    }

    pub fn strategies(&self, field: LogicalField) -> &[Locator] {
        self.fields
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, strategies)| strategies.as_slice())
            .unwrap_or(&[])
    }

    /// Replaces the strategy list for one field.
    pub fn with_strategies(mut self, field: LogicalField, strategies: Vec<Locator>) -> Self {
        match self.fields.iter_mut().find(|(candidate, _)| *candidate == field) {
            Some((_, existing)) => *existing = strategies,
            None => self.fields.push((field, strategies)),
        }
        self
    }

    pub async fn locate(
        &self,
        session: &mut dyn AutomationSession,
        field: LogicalField,
    ) -> Option<ElementHandle> {
        Self::locate_with(session, self.strategies(field)).await
    }

    /// First interactable element for the first strategy that yields one.
    pub async fn locate_with(
        session: &mut dyn AutomationSession,
        strategies: &[Locator],
    ) -> Option<ElementHandle> {
        for locator in strategies {
            match session.find_interactable(locator).await {
                Ok(Some(handle)) => {
                    tracing::debug!(target: "matcher", %locator, "element matched");
                    return Some(handle);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(target: "matcher", %locator, error = %err, "lookup failed");
                }
            }
        }
        None
    }

    /// Locates and writes `value`; `false` when nothing matched or the write
    /// failed.
    pub async fn fill_with(
        session: &mut dyn AutomationSession,
        strategies: &[Locator],
        value: &str,
    ) -> bool {
        if value.trim().is_empty() {
            return false;
        }
        let Some(handle) = Self::locate_with(session, strategies).await else {
            return false;
        };
        Self::write(session, &handle, value).await
    }

    async fn write(session: &mut dyn AutomationSession, handle: &ElementHandle, value: &str) -> bool {
        if handle.is_select() {
            for by in [SelectBy::Value, SelectBy::Label] {
                match session.select_option(handle, by, value).await {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(err) => {
                        tracing::debug!(target: "matcher", error = %err, "select failed");
                        return false;
                    }
                }
            }
            return false;
        }

        match session.type_text(handle, value).await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(target: "matcher", error = %err, "typing failed");
                false
            }
        }
    }

    pub async fn fill(
        &self,
        session: &mut dyn AutomationSession,
        field: LogicalField,
        profile: &ProfileRecord,
    ) -> bool {
        let value = field.value_from(profile);
        Self::fill_with(session, self.strategies(field), &value).await
    }

    /// Fills every known field except those in `skip`.
    pub async fn fill_profile(
        &self,
        session: &mut dyn AutomationSession,
        profile: &ProfileRecord,
        skip: &[LogicalField],
    ) -> FillReport {
        let mut report = FillReport::default();
        for (field, _) in &self.fields {
            if skip.contains(field) {
                continue;
            }
            if self.fill(session, *field, profile).await {
                report.filled.push(*field);
            } else {
                report.missing.push(*field);
            }
        }
        tracing::debug!(
            target: "matcher",
            filled = report.filled.len(),
            missing = report.missing.len(),
            "form fill finished"
        );
        report
    }

    /// Writes the business name into the first name-like input, if any.
    pub async fn probe_name(
        &self,
        session: &mut dyn AutomationSession,
        profile: &ProfileRecord,
    ) -> bool {
        Self::fill_with(session, &self.name_probe, &profile.name).await
    }

    pub async fn locate_submit(&self, session: &mut dyn AutomationSession) -> Option<ElementHandle> {
        Self::locate_with(session, &self.submit).await
    }
}
