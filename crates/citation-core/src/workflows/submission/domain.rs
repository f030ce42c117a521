use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Difficulty bucket controlling which phase a target runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
}

impl DifficultyTier {
    /// Phase order.
    pub const ORDERED: [DifficultyTier; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One listing directory the profile is submitted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub tier: DifficultyTier,
    /// Key of a specialized adapter; the target name is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
    /// Known submission pages, tried before any guessed URL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

impl Target {
    pub fn new(name: impl Into<String>, tier: DifficultyTier) -> Self {
        Self {
            name: name.into(),
            tier,
            adapter: None,
            urls: Vec::new(),
        }
    }

    pub fn with_adapter(mut self, key: impl Into<String>) -> Self {
        self.adapter = Some(key.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    /// Lowercase name with whitespace removed, used for URL guessing.
    pub fn slug(&self) -> String {
        self.name
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Opening hours for one weekday; `None` on both ends means closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyHours {
    pub day: Weekday,
    #[serde(default)]
    pub opens: Option<String>,
    #[serde(default)]
    pub closes: Option<String>,
}

impl DailyHours {
    fn summary(&self) -> String {
        match (&self.opens, &self.closes) {
            (Some(opens), Some(closes)) => format!("{} {opens}-{closes}", self.day),
            _ => format!("{} closed", self.day),
        }
    }
}

/// The business data submitted to every target. Read-only for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub name: String,
    pub address: PostalAddress,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub alternate_email: Option<String>,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hours: Vec<DailyHours>,
}

impl ProfileRecord {
    pub fn from_path(path: &Path) -> Result<Self, ProfileError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ProfileError> {
        let profile: Self = serde_json::from_reader(reader)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::Invalid(
                "business name must not be empty".to_string(),
            ));
        }
        if self.phone.trim().is_empty() && self.email.trim().is_empty() {
            return Err(ProfileError::Invalid(
                "at least one of phone or email is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Hours flattened to one line, e.g. `Mon 09:00-17:00, Sun closed`.
    pub fn hours_summary(&self) -> String {
        self.hours
            .iter()
            .map(DailyHours::summary)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse profile: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid profile: {0}")]
    Invalid(String),
}
