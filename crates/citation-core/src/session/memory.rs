//! Scripted in-memory browser.
//!
//! Pages are keyed by URL and hold a flat list of elements in document order.
//! Unknown URLs load an empty "not found" page the way a real browser renders
//! a 404, so URL guessing behaves as it would against live sites. Every
//! session writes to a shared [`BrowserJournal`] so callers can inspect what
//! was visited, typed and clicked.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    AutomationSession, ElementHandle, ElementTag, Locator, LocatorAttribute, SelectBy,
    SessionError, SessionFactory,
};

const NOT_FOUND_TEXT: &str = "404 Not Found";

#[derive(Debug, Clone)]
pub struct MemoryElement {
    tag: ElementTag,
    attributes: Vec<(LocatorAttribute, String)>,
    text: String,
    visible: bool,
    enabled: bool,
    options: Vec<(String, String)>,
    navigates_to: Option<String>,
}

impl MemoryElement {
    pub fn new(tag: ElementTag) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            options: Vec::new(),
            navigates_to: None,
        }
    }

    pub fn input() -> Self {
        Self::new(ElementTag::Input)
    }

    pub fn textarea() -> Self {
        Self::new(ElementTag::TextArea)
    }

    /// A `select` with `(value, label)` options.
    pub fn select<V, L>(options: impl IntoIterator<Item = (V, L)>) -> Self
    where
        V: Into<String>,
        L: Into<String>,
    {
        let mut element = Self::new(ElementTag::Select);
        element.options = options
            .into_iter()
            .map(|(value, label)| (value.into(), label.into()))
            .collect();
        element
    }

    pub fn button(text: impl Into<String>) -> Self {
        let mut element = Self::new(ElementTag::Button);
        element.text = text.into();
        element
    }

    pub fn link(text: impl Into<String>) -> Self {
        let mut element = Self::new(ElementTag::Link);
        element.text = text.into();
        element
    }

    pub fn attr(mut self, attribute: LocatorAttribute, value: impl Into<String>) -> Self {
        if attribute == LocatorAttribute::Text {
            self.text = value.into();
        } else {
            self.attributes.push((attribute, value.into()));
        }
        self
    }

    pub fn name(self, value: impl Into<String>) -> Self {
        self.attr(LocatorAttribute::Name, value)
    }

    pub fn id(self, value: impl Into<String>) -> Self {
        self.attr(LocatorAttribute::Id, value)
    }

    pub fn placeholder(self, value: impl Into<String>) -> Self {
        self.attr(LocatorAttribute::Placeholder, value)
    }

    pub fn kind(self, value: impl Into<String>) -> Self {
        self.attr(LocatorAttribute::Type, value)
    }

    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr(LocatorAttribute::Class, value)
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Clicking the element loads `url`.
    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.navigates_to = Some(url.into());
        self
    }

    fn attribute(&self, attribute: LocatorAttribute) -> Option<&str> {
        if attribute == LocatorAttribute::Text {
            return Some(self.text.as_str());
        }
        self.attributes
            .iter()
            .find(|(key, _)| *key == attribute)
            .map(|(_, value)| value.as_str())
    }

    fn label(&self) -> String {
        [
            LocatorAttribute::Name,
            LocatorAttribute::Id,
            LocatorAttribute::Placeholder,
        ]
        .into_iter()
        .find_map(|attribute| self.attribute(attribute))
        .map(str::to_string)
        .unwrap_or_else(|| self.text.clone())
    }

    fn is_interactable(&self) -> bool {
        self.visible && self.enabled
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    text: String,
    elements: Vec<MemoryElement>,
    load_delay: Option<Duration>,
    failure: Option<String>,
}

impl MemoryPage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_element(mut self, element: MemoryElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_elements(mut self, elements: impl IntoIterator<Item = MemoryElement>) -> Self {
        self.elements.extend(elements);
        self
    }

    /// Loading the page sleeps for `delay` first.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Loading the page fails with a navigation error.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedValue {
    pub url: String,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct BrowserJournal {
    pub opened: usize,
    pub closed: usize,
    pub visits: Vec<String>,
    pub typed: Vec<TypedValue>,
    pub clicks: Vec<String>,
}

impl BrowserJournal {
    pub fn typed_into(&self, field: &str) -> Option<&str> {
        self.typed
            .iter()
            .rev()
            .find(|entry| entry.field == field)
            .map(|entry| entry.value.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBrowser {
    pages: Arc<HashMap<String, MemoryPage>>,
    journal: Arc<Mutex<BrowserJournal>>,
    open_failure: Option<String>,
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

impl MemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, page: MemoryPage) -> Self {
        Arc::make_mut(&mut self.pages).insert(normalize_url(url), page);
        self
    }

    /// Every `open` fails, as when the automation engine is not running.
    pub fn failing_to_open(mut self, reason: impl Into<String>) -> Self {
        self.open_failure = Some(reason.into());
        self
    }

    pub fn journal(&self) -> BrowserJournal {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SessionFactory for MemoryBrowser {
    async fn open(&self) -> Result<Box<dyn AutomationSession>, SessionError> {
        if let Some(reason) = &self.open_failure {
            return Err(SessionError::Unavailable(reason.clone()));
        }

        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .opened += 1;

        Ok(Box::new(MemorySession {
            pages: Arc::clone(&self.pages),
            journal: Arc::clone(&self.journal),
            current: None,
            handles: Vec::new(),
        }))
    }
}

#[derive(Debug)]
struct MemorySession {
    pages: Arc<HashMap<String, MemoryPage>>,
    journal: Arc<Mutex<BrowserJournal>>,
    current: Option<String>,
    handles: Vec<(String, usize)>,
}

impl MemorySession {
    fn record<F: FnOnce(&mut BrowserJournal)>(&self, update: F) {
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut *journal);
    }

    fn current_page(&self) -> Option<&MemoryPage> {
        self.current.as_ref().and_then(|url| self.pages.get(url))
    }

    fn element(&self, handle: &ElementHandle) -> Result<&MemoryElement, SessionError> {
        let (url, index) = self
            .handles
            .get(handle.id)
            .ok_or(SessionError::UnknownElement(handle.id))?;
        if self.current.as_deref() != Some(url.as_str()) {
            return Err(SessionError::UnknownElement(handle.id));
        }
        self.pages
            .get(url)
            .and_then(|page| page.elements.get(*index))
            .ok_or(SessionError::UnknownElement(handle.id))
    }

    async fn load(&mut self, url: &str) -> Result<(), SessionError> {
        let key = normalize_url(url);
        self.record(|journal| journal.visits.push(key.clone()));

        let (delay, failure) = match self.pages.get(&key) {
            Some(page) => (page.load_delay, page.failure.clone()),
            None => (None, None),
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = failure {
            return Err(SessionError::Navigation { url: key, reason });
        }

        self.current = Some(key);
        Ok(())
    }
}

#[async_trait]
impl AutomationSession for MemorySession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.load(url).await
    }

    async fn find_interactable(
        &mut self,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, SessionError> {
        let found = self.current_page().and_then(|page| {
            page.elements.iter().enumerate().find(|(_, element)| {
                element.is_interactable()
                    && locator.matches(element.tag, |attribute| element.attribute(attribute))
            })
        });

        let Some((index, element)) = found else {
            return Ok(None);
        };
        let tag = element.tag;
        let url = self.current.clone().unwrap_or_default();
        self.handles.push((url, index));
        Ok(Some(ElementHandle {
            id: self.handles.len() - 1,
            tag,
        }))
    }

    async fn type_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
    ) -> Result<(), SessionError> {
        let field = self.element(element)?.label();
        let url = self.current.clone().unwrap_or_default();
        self.record(|journal| {
            journal.typed.push(TypedValue {
                url,
                field,
                value: text.to_string(),
            })
        });
        Ok(())
    }

    async fn select_option(
        &mut self,
        element: &ElementHandle,
        by: SelectBy,
        value: &str,
    ) -> Result<bool, SessionError> {
        let target = self.element(element)?;
        let chosen = target.options.iter().find(|(option_value, label)| match by {
            SelectBy::Value => option_value == value,
            SelectBy::Label => label.trim().eq_ignore_ascii_case(value.trim()),
        });

        let Some((option_value, _)) = chosen else {
            return Ok(false);
        };
        let field = target.label();
        let value = option_value.clone();
        let url = self.current.clone().unwrap_or_default();
        self.record(|journal| journal.typed.push(TypedValue { url, field, value }));
        Ok(true)
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), SessionError> {
        let target = self.element(element)?;
        let label = target.label();
        let destination = target.navigates_to.clone();
        self.record(|journal| journal.clicks.push(label));

        if let Some(url) = destination {
            self.load(&url).await?;
        }
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, SessionError> {
        Ok(self
            .current
            .clone()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn page_text(&mut self) -> Result<String, SessionError> {
        Ok(match self.current_page() {
            Some(page) => page.text.clone(),
            None if self.current.is_some() => NOT_FOUND_TEXT.to_string(),
            None => String::new(),
        })
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.current = None;
        self.handles.clear();
        self.record(|journal| journal.closed += 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browser() -> MemoryBrowser {
        MemoryBrowser::new().with_page(
            "https://listings.test/add",
            MemoryPage::new("Add your business")
                .with_element(MemoryElement::input().name("company_name").hidden())
                .with_element(MemoryElement::input().name("company_name_visible"))
                .with_element(MemoryElement::select([("FL", "Florida"), ("GA", "Georgia")]).name("state"))
                .with_element(
                    MemoryElement::button("Submit")
                        .kind("submit")
                        .navigates_to("https://listings.test/thanks"),
                ),
        )
        .with_page("https://listings.test/thanks", MemoryPage::new("Thank you!"))
    }

    #[tokio::test]
    async fn finds_first_interactable_match_in_document_order() {
        let browser = browser();
        let mut session = browser.open().await.expect("session opens");
        session
            .navigate("https://listings.test/add/")
            .await
            .expect("page loads");

        let handle = session
            .find_interactable(&Locator::input(LocatorAttribute::Name, "company"))
            .await
            .expect("lookup succeeds")
            .expect("visible field found");
        session.type_text(&handle, "Salon").await.expect("typed");

        assert_eq!(
            browser.journal().typed_into("company_name_visible"),
            Some("Salon")
        );
    }

    #[tokio::test]
    async fn select_matches_value_or_label() {
        let browser = browser();
        let mut session = browser.open().await.expect("session opens");
        session
            .navigate("https://listings.test/add")
            .await
            .expect("page loads");
        let state = session
            .find_interactable(&Locator::select(LocatorAttribute::Name, "state"))
            .await
            .expect("lookup")
            .expect("select present");

        assert!(!session
            .select_option(&state, SelectBy::Value, "Florida")
            .await
            .expect("select call"));
        assert!(session
            .select_option(&state, SelectBy::Label, "florida")
            .await
            .expect("select call"));
        assert_eq!(browser.journal().typed_into("state"), Some("FL"));
    }

    #[tokio::test]
    async fn clicking_navigates_and_invalidates_old_handles() {
        let browser = browser();
        let mut session = browser.open().await.expect("session opens");
        session
            .navigate("https://listings.test/add")
            .await
            .expect("page loads");
        let submit = session
            .find_interactable(&Locator::button(LocatorAttribute::Type, "submit"))
            .await
            .expect("lookup")
            .expect("button present");

        session.click(&submit).await.expect("click");
        assert_eq!(
            session.current_url().await.expect("url"),
            "https://listings.test/thanks"
        );
        assert_eq!(session.page_text().await.expect("text"), "Thank you!");
        assert!(matches!(
            session.click(&submit).await,
            Err(SessionError::UnknownElement(_))
        ));

        session.close().await.expect("close");
        let journal = browser.journal();
        assert_eq!((journal.opened, journal.closed), (1, 1));
    }

    #[tokio::test]
    async fn unknown_urls_render_not_found() {
        let browser = MemoryBrowser::new();
        let mut session = browser.open().await.expect("session opens");
        session
            .navigate("https://nowhere.test/add")
            .await
            .expect("unknown pages still load");
        assert_eq!(session.page_text().await.expect("text"), NOT_FOUND_TEXT);
    }
}
