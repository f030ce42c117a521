use std::sync::LazyLock;

use regex::Regex;

use super::domain::VerificationPayload;

/// Link patterns, tried in order.
static LINK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)https?://[^\s<>"]+(?:verify|confirm|activate)[^\s<>"]*"#,
        r#"(?i)https?://[^\s<>"]+/listings/[^\s<>"]+"#,
        r#"(?i)https?://[^\s<>"]+/business/[^\s<>"]+"#,
        r#"(?i)https?://[^\s<>"]+/claim[^\s<>"]*"#,
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("link pattern is valid"))
    .collect()
});

/// Code patterns; the first capture group is the code.
static CODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:code|pin|verification)[\s:]+(\d{4,6})",
        r"(?i)\b(\d{4,6})\b.*(?:code|verify|confirm)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("code pattern is valid"))
    .collect()
});

/// Pulls a verification link, or failing that a 4 to 6 digit code, from a
/// message body.
pub fn payload_from_body(body: &str) -> Option<VerificationPayload> {
    let link = LINK_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(body))
        .map(|found| found.as_str().trim_matches(|ch| matches!(ch, '.' | ',' | ';' | ':')))
        .filter(|link| !link.is_empty());
    if let Some(link) = link {
        return Some(VerificationPayload::Link(link.to_string()));
    }

    CODE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(body))
        .and_then(|captures| captures.get(1))
        .map(|code| VerificationPayload::Code(code.as_str().to_string()))
}
