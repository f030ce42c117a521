use super::domain::TargetIdentity;

const KNOWN_SENDERS: &[(&str, &str)] = &[
    ("yellowpages", "YellowPages"),
    ("hotfrog", "Hotfrog"),
    ("manta", "Manta"),
    ("yelp", "Yelp"),
    ("bing", "Bing Places"),
    ("foursquare", "Foursquare"),
    ("brownbook", "Brownbook"),
    ("citysquares", "CitySquares"),
    ("showmelocal", "ShowMeLocal"),
    ("local.com", "Local.com"),
];

/// Ordered keyword → target table; the first keyword found wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityTable {
    entries: Vec<(String, String)>,
}

impl IdentityTable {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(keyword, target)| (keyword.to_lowercase(), target))
                .collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(
            KNOWN_SENDERS
                .iter()
                .map(|(keyword, target)| (keyword.to_string(), target.to_string()))
                .collect(),
        )
    }

    pub fn resolve(&self, sender: &str, subject: &str) -> TargetIdentity {
        let haystack = format!("{sender} {subject}").to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword.as_str()))
            .map(|(_, target)| TargetIdentity::Known(target.clone()))
            .unwrap_or(TargetIdentity::Unknown)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(keyword, _)| keyword.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_or_subject_identifies_target() {
        let table = IdentityTable::standard();
        assert_eq!(
            table.resolve("noreply@hotfrog.com", "Confirm your listing"),
            TargetIdentity::Known("Hotfrog".to_string())
        );
        assert_eq!(
            table.resolve("alerts@mailer.test", "Welcome to Local.com"),
            TargetIdentity::Known("Local.com".to_string())
        );
        assert_eq!(
            table.resolve("hello@newsletter.test", "Confirm your subscription"),
            TargetIdentity::Unknown
        );
    }

    #[test]
    fn first_table_entry_wins() {
        // "yellowpages" precedes "yelp" in the table.
        let table = IdentityTable::standard();
        assert_eq!(
            table.resolve("support@yellowpages.com", "Yelp users love you"),
            TargetIdentity::Known("YellowPages".to_string())
        );
    }
}
