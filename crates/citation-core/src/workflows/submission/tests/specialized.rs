use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::session::{
    Locator, LocatorAttribute, MemoryBrowser, MemoryElement, MemoryPage, SessionError,
    SessionFactory,
};
use crate::workflows::submission::{
    DifficultyTier, FieldMatcher, FieldSpec, FormDefinition, LogicalField, Outcome,
    SpecializedAdapter, TargetAdapter,
};

const YELLOWPAGES: &str = "https://www.yellowpages.com/add-business";

fn builtin(key: &str) -> SpecializedAdapter {
    let definition = FormDefinition::builtin()
        .into_iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, definition)| definition)
        .expect("builtin definition exists");
    SpecializedAdapter::new(definition, Arc::new(FieldMatcher::standard()), Duration::ZERO)
}

#[tokio::test]
async fn yellowpages_submits_once_threshold_is_met() {
    let browser = MemoryBrowser::new()
        .with_page(
            YELLOWPAGES,
            MemoryPage::new("Get listed").with_elements([
                MemoryElement::input().id("businessName"),
                MemoryElement::input().name("phone"),
                MemoryElement::input().name("city"),
                MemoryElement::button("Continue")
                    .kind("submit")
                    .navigates_to("https://www.yellowpages.com/add-business/verify"),
            ]),
        )
        .with_page(
            "https://www.yellowpages.com/add-business/verify",
            result_page("Check your email to verify your listing"),
        );

    let mut session = browser.open().await.expect("session opens");
    let submission = builtin("yellowpages")
        .submit(
            session.as_mut(),
            &target("YellowPages", DifficultyTier::Easy),
            &profile(),
        )
        .await
        .expect("no session failure");

    assert_eq!(submission.outcome, Outcome::Submitted);
    assert_eq!(submission.fields_filled, 3);
    assert_eq!(
        browser.journal().typed_into("businessName"),
        Some("Harbor Light Dental")
    );
}

#[tokio::test]
async fn below_threshold_is_form_not_found_without_submitting() {
    let browser = MemoryBrowser::new().with_page(
        YELLOWPAGES,
        MemoryPage::new("Get listed").with_elements([
            MemoryElement::input().name("business"),
            MemoryElement::input().name("phone"),
            MemoryElement::button("Continue").kind("submit"),
        ]),
    );

    let mut session = browser.open().await.expect("session opens");
    let submission = builtin("yellowpages")
        .submit(
            session.as_mut(),
            &target("YellowPages", DifficultyTier::Easy),
            &profile(),
        )
        .await
        .expect("no session failure");

    assert_eq!(submission.outcome, Outcome::FormNotFound);
    assert_eq!(submission.fields_filled, 2);
    assert!(browser.journal().clicks.is_empty());
}

#[tokio::test]
async fn pre_clicks_reveal_the_form() {
    let entry = "https://claims.test/start";
    let form = "https://claims.test/form";
    let definition = FormDefinition {
        entry_url: entry.to_string(),
        pre_clicks: vec![
            Locator::button(LocatorAttribute::Text, "list your business"),
            Locator::button(LocatorAttribute::Text, "accept cookies"),
        ],
        fields: vec![FieldSpec::new(
            LogicalField::BusinessName,
            vec![Locator::input(LocatorAttribute::Name, "company")],
        )],
        submit: vec![Locator::button(LocatorAttribute::Type, "submit")],
        min_filled: 1,
    };
    let browser = MemoryBrowser::new()
        .with_page(
            entry,
            MemoryPage::new("Claim your page")
                .with_element(MemoryElement::button("List your business").navigates_to(form)),
        )
        .with_page(
            form,
            MemoryPage::new("Business details").with_elements([
                MemoryElement::input().name("company"),
                MemoryElement::button("Save").kind("submit"),
            ]),
        );

    let adapter =
        SpecializedAdapter::new(definition, Arc::new(FieldMatcher::standard()), Duration::ZERO);
    let mut session = browser.open().await.expect("session opens");
    let submission = adapter
        .submit(
            session.as_mut(),
            &target("Claims", DifficultyTier::Medium),
            &profile(),
        )
        .await
        .expect("no session failure");

    // Clicking "Save" stays on the form page, so nothing signals success.
    assert_eq!(submission.outcome, Outcome::PendingVerification);
    assert_eq!(
        browser.journal().clicks,
        vec!["List your business", "Save"]
    );
}

#[tokio::test]
async fn navigation_failure_is_a_session_error() {
    let browser = MemoryBrowser::new().with_page(
        "https://www.manta.com/add-your-business",
        MemoryPage::new("").failing("net::ERR_CONNECTION_RESET"),
    );

    let mut session = browser.open().await.expect("session opens");
    let result = builtin("manta")
        .submit(
            session.as_mut(),
            &target("Manta", DifficultyTier::Easy),
            &profile(),
        )
        .await;

    assert!(matches!(result, Err(SessionError::Navigation { .. })));
}
