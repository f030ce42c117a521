use super::outcome::Outcome;
use crate::session::AutomationSession;

/// Checked before success keywords; a page with both is treated as blocked.
pub const ERROR_INDICATORS: &[&str] = &[
    "error",
    "failed",
    "invalid",
    "missing required",
    "please correct",
    "try again",
    "captcha",
];

pub const SUCCESS_INDICATORS: &[&str] = &[
    "success",
    "thank you",
    "confirmation",
    "welcome",
    "verify your email",
    "check your email",
    "account created",
    "listing created",
    "submission received",
    "dashboard",
];

/// What the browser showed after the submit click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    pub form_found: bool,
    pub start_url: String,
    pub current_url: String,
    pub page_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    pub reason: String,
}

fn normalized(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

pub fn classify(state: &PageState) -> Classification {
    let verdict = |outcome, reason: &str| Classification {
        outcome,
        reason: reason.to_string(),
    };

    if !state.form_found {
        return verdict(Outcome::FormNotFound, "no interactable submission form");
    }

    let text = state.page_text.to_lowercase();
    if let Some(keyword) = ERROR_INDICATORS.iter().find(|keyword| text.contains(*keyword)) {
        return Classification {
            outcome: Outcome::Blocked("error indicators present".to_string()),
            reason: format!("page mentions '{keyword}'"),
        };
    }

    if let Some(keyword) = SUCCESS_INDICATORS
        .iter()
        .find(|keyword| text.contains(*keyword))
    {
        return Classification {
            outcome: Outcome::Submitted,
            reason: format!("page mentions '{keyword}'"),
        };
    }

    if normalized(&state.current_url) != normalized(&state.start_url) {
        return verdict(Outcome::PendingVerification, "url changed after submit");
    }

    verdict(
        Outcome::PendingVerification,
        "submission completed, status uncertain",
    )
}

/// Reads the post-submit page from the session and classifies it.
pub async fn classify_session(
    session: &mut dyn AutomationSession,
    form_found: bool,
    start_url: &str,
) -> Result<Classification, crate::session::SessionError> {
    let current_url = session.current_url().await?;
    let page_text = session.page_text().await?;
    Ok(classify(&PageState {
        form_found,
        start_url: start_url.to_string(),
        current_url,
        page_text,
    }))
}
