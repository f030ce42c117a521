//! Browser automation boundary.
//!
//! The orchestration engine only ever talks to a page through
//! [`AutomationSession`]; the WebDriver implementation and the scripted
//! in-memory browser both sit behind it.

pub mod memory;
pub mod webdriver;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::{BrowserJournal, MemoryBrowser, MemoryElement, MemoryPage};
pub use webdriver::WebDriverSessionFactory;

/// Element kinds a locator can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementTag {
    Input,
    TextArea,
    Select,
    Button,
    Link,
}

impl ElementTag {
    pub const fn html(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::TextArea => "textarea",
            Self::Select => "select",
            Self::Button => "button",
            Self::Link => "a",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorAttribute {
    Name,
    Id,
    Placeholder,
    Type,
    Class,
    /// Visible text content of the element.
    Text,
}

impl LocatorAttribute {
    pub const fn html(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Id => "id",
            Self::Placeholder => "placeholder",
            Self::Type => "type",
            Self::Class => "class",
            Self::Text => "text",
        }
    }
}

/// Rendered form of a [`Locator`] for a concrete driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Css(String),
    XPath(String),
}

/// One identification strategy: "a `tag` whose `attribute` contains `pattern`".
///
/// Matching is case-insensitive. `Type` is the exception and requires the
/// whole attribute value to match, so `type="tel"` never matches `telephone`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub tag: ElementTag,
    pub attribute: LocatorAttribute,
    pub pattern: String,
}

impl Locator {
    pub fn new(tag: ElementTag, attribute: LocatorAttribute, pattern: impl Into<String>) -> Self {
        Self {
            tag,
            attribute,
            pattern: pattern.into(),
        }
    }

    pub fn input(attribute: LocatorAttribute, pattern: impl Into<String>) -> Self {
        Self::new(ElementTag::Input, attribute, pattern)
    }

    pub fn textarea(attribute: LocatorAttribute, pattern: impl Into<String>) -> Self {
        Self::new(ElementTag::TextArea, attribute, pattern)
    }

    pub fn select(attribute: LocatorAttribute, pattern: impl Into<String>) -> Self {
        Self::new(ElementTag::Select, attribute, pattern)
    }

    pub fn button(attribute: LocatorAttribute, pattern: impl Into<String>) -> Self {
        Self::new(ElementTag::Button, attribute, pattern)
    }

    pub fn link(attribute: LocatorAttribute, pattern: impl Into<String>) -> Self {
        Self::new(ElementTag::Link, attribute, pattern)
    }

    /// Whether an element with the given tag and attribute lookup satisfies
    /// this strategy. Used by drivers that cannot evaluate CSS themselves.
    pub fn matches<'a>(
        &self,
        tag: ElementTag,
        attribute: impl Fn(LocatorAttribute) -> Option<&'a str>,
    ) -> bool {
        if tag != self.tag {
            return false;
        }

        let Some(value) = attribute(self.attribute) else {
            return false;
        };

        let pattern = self.pattern.to_lowercase();
        let value = value.trim().to_lowercase();
        match self.attribute {
            LocatorAttribute::Type => value == pattern,
            _ => value.contains(&pattern),
        }
    }

    pub fn selector(&self) -> Selector {
        let tag = self.tag.html();
        let pattern = self.pattern.replace('"', "\\\"");
        match self.attribute {
            LocatorAttribute::Type => Selector::Css(format!("{tag}[type=\"{pattern}\" i]")),
            LocatorAttribute::Text => {
                let needle = self.pattern.to_lowercase().replace('\'', "");
                Selector::XPath(format!(
                    "//{tag}[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), '{needle}')]"
                ))
            }
            attribute => Selector::Css(format!("{tag}[{}*=\"{pattern}\" i]", attribute.html())),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}~{}]",
            self.tag.html(),
            self.attribute.html(),
            self.pattern
        )
    }
}

/// Opaque reference to an element found during the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub id: usize,
    pub tag: ElementTag,
}

impl ElementHandle {
    pub fn is_select(&self) -> bool {
        self.tag == ElementTag::Select
    }
}

/// How an option of a `select` element is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectBy {
    Value,
    Label,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("automation engine unavailable: {0}")]
    Unavailable(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("browser command failed: {0}")]
    Command(String),
    #[error("element handle {0} is not known to this session")]
    UnknownElement(usize),
}

/// Capabilities the engine needs from a live browser page.
///
/// Implementations only report visible, enabled elements from
/// [`find_interactable`](AutomationSession::find_interactable), in document
/// order.
#[async_trait]
pub trait AutomationSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    async fn find_interactable(
        &mut self,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, SessionError>;

    /// Clears the element and types `text` into it.
    async fn type_text(&mut self, element: &ElementHandle, text: &str)
        -> Result<(), SessionError>;

    /// Returns `false` when no option matches.
    async fn select_option(
        &mut self,
        element: &ElementHandle,
        by: SelectBy,
        value: &str,
    ) -> Result<bool, SessionError>;

    async fn click(&mut self, element: &ElementHandle) -> Result<(), SessionError>;

    async fn current_url(&mut self) -> Result<String, SessionError>;

    async fn page_text(&mut self) -> Result<String, SessionError>;

    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens isolated sessions; each worker owns the session it opened.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn AutomationSession>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_locators_render_case_insensitive_css() {
        let locator = Locator::input(LocatorAttribute::Name, "phone");
        assert_eq!(
            locator.selector(),
            Selector::Css("input[name*=\"phone\" i]".to_string())
        );

        let typed = Locator::input(LocatorAttribute::Type, "tel");
        assert_eq!(
            typed.selector(),
            Selector::Css("input[type=\"tel\" i]".to_string())
        );
    }

    #[test]
    fn text_locators_render_xpath() {
        let locator = Locator::button(LocatorAttribute::Text, "Add Business");
        match locator.selector() {
            Selector::XPath(xpath) => {
                assert!(xpath.starts_with("//button["));
                assert!(xpath.contains("'add business'"));
            }
            other => panic!("expected xpath, got {other:?}"),
        }
    }

    #[test]
    fn matches_is_contains_except_for_type() {
        let name = Locator::input(LocatorAttribute::Name, "Phone");
        assert!(name.matches(ElementTag::Input, |attr| match attr {
            LocatorAttribute::Name => Some("contact_phone_number"),
            _ => None,
        }));
        assert!(!name.matches(ElementTag::TextArea, |_| Some("phone")));

        let typed = Locator::input(LocatorAttribute::Type, "tel");
        assert!(!typed.matches(ElementTag::Input, |_| Some("telephone")));
        assert!(typed.matches(ElementTag::Input, |_| Some("TEL")));
    }
}
