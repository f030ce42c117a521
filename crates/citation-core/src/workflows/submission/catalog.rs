use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::domain::{DifficultyTier, Target};

const EASY: &[&str] = &[
    "YellowPages",
    "Hotfrog",
    "Manta",
    "Brownbook",
    "ShowMeLocal",
    "CitySquares",
    "Cylex",
    "Tupalo",
    "Where To",
    "EZlocal",
    "LocalDatabase",
    "GoLocal247",
    "Opendi",
    "Wand",
    "ChamberOfCommerce",
    "LocalStack",
    "B2BYellowPages",
    "ExpressBusinessDirectory",
    "Spoke",
    "Lacartes",
];

const MEDIUM: &[&str] = &[
    "Bing Places",
    "Apple Maps",
    "Foursquare",
    "TripAdvisor",
    "Mapquest",
    "Superpages",
    "DexKnows",
    "MerchantCircle",
    "Judy's Book",
    "Citysearch",
    "Local.com",
    "Kudzu",
    "AreaConnect",
    "Magic Yellow",
    "LocalPages",
    "YellowBot",
    "Yasabe",
    "ELocalListing",
    "TeleAdreson",
    "GetFave",
];

const HARD: &[&str] = &[
    "Yelp",
    "Facebook",
    "Instagram",
    "LinkedIn",
    "Nextdoor",
    "Angie's List",
    "HomeAdvisor",
    "Thumbtack",
    "Houzz",
    "Alignable",
    "BBB",
    "Glassdoor",
    "Indeed",
    "ZocDoc",
    "Healthgrades",
];

/// Targets that ship with a specialized adapter, keyed by target name.
const SPECIALIZED: &[(&str, &str)] = &[
    ("YellowPages", "yellowpages"),
    ("Hotfrog", "hotfrog"),
    ("Manta", "manta"),
    ("Brownbook", "brownbook"),
];

/// Ordered, duplicate-free list of targets for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCatalog {
    targets: Vec<Target>,
}

impl TargetCatalog {
    pub fn new(targets: Vec<Target>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for target in &targets {
            if !seen.insert(target.name.to_ascii_lowercase()) {
                return Err(CatalogError::Duplicate(target.name.clone()));
            }
        }
        Ok(Self { targets })
    }

    /// The built-in directory list.
    pub fn standard() -> Self {
        let tiers = [
            (DifficultyTier::Easy, EASY),
            (DifficultyTier::Medium, MEDIUM),
            (DifficultyTier::Hard, HARD),
        ];

        let targets = tiers
            .into_iter()
            .flat_map(|(tier, names)| names.iter().map(move |name| Target::new(*name, tier)))
            .map(|target| {
                match SPECIALIZED.iter().find(|(name, _)| *name == target.name) {
                    Some((_, key)) => target.with_adapter(*key),
                    None => target,
                }
            })
            .collect();

        Self { targets }
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let targets: Vec<Target> = serde_json::from_reader(reader)?;
        Self::new(targets)
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets
            .iter()
            .find(|target| target.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Narrows the catalog to the named targets and/or tiers. Empty filters
    /// keep everything; an unknown name is an error.
    pub fn select(
        &self,
        only: &[String],
        tiers: &[DifficultyTier],
    ) -> Result<Vec<Target>, CatalogError> {
        if let Some(unknown) = only.iter().find(|name| self.get(name).is_none()) {
            return Err(CatalogError::UnknownTarget(unknown.clone()));
        }

        Ok(self
            .targets
            .iter()
            .filter(|target| {
                only.is_empty()
                    || only
                        .iter()
                        .any(|name| target.name.eq_ignore_ascii_case(name.trim()))
            })
            .filter(|target| tiers.is_empty() || tiers.contains(&target.tier))
            .cloned()
            .collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read target catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse target catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("target '{0}' is listed more than once")]
    Duplicate(String),
    #[error("unknown target '{0}'")]
    UnknownTarget(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_three_tiers() {
        let catalog = TargetCatalog::standard();
        assert_eq!(catalog.len(), 55);

        let count = |tier| {
            catalog
                .targets()
                .iter()
                .filter(|target| target.tier == tier)
                .count()
        };
        assert_eq!(count(DifficultyTier::Easy), 20);
        assert_eq!(count(DifficultyTier::Medium), 20);
        assert_eq!(count(DifficultyTier::Hard), 15);

        let manta = catalog.get("manta").expect("manta listed");
        assert_eq!(manta.adapter.as_deref(), Some("manta"));
        TargetCatalog::new(catalog.targets().to_vec()).expect("no duplicates");
    }

    #[test]
    fn select_filters_by_name_and_tier() {
        let catalog = TargetCatalog::standard();
        let picked = catalog
            .select(
                &["yelp".to_string(), "Hotfrog".to_string()],
                &[DifficultyTier::Easy],
            )
            .expect("known targets");
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "Hotfrog");

        let err = catalog
            .select(&["Geocities".to_string()], &[])
            .expect_err("unknown target");
        assert!(matches!(err, CatalogError::UnknownTarget(name) if name == "Geocities"));
    }

    #[test]
    fn json_catalog_rejects_duplicates() {
        let raw = r#"[
            {"name": "Cylex", "tier": "easy"},
            {"name": "cylex", "tier": "medium", "urls": ["https://cylex.test/add"]}
        ]"#;
        let err = TargetCatalog::from_reader(raw.as_bytes()).expect_err("duplicate");
        assert!(matches!(err, CatalogError::Duplicate(_)));
    }
}
