//! WebDriver-backed sessions over fantoccini.

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::map::Map as JsonMap;

use super::{
    AutomationSession, ElementHandle, Locator, SelectBy, Selector, SessionError, SessionFactory,
};

const CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--window-size=1280,900",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--mute-audio",
    "--log-level=1",
];

/// Connects one Chrome session per call to a running WebDriver endpoint.
#[derive(Debug, Clone)]
pub struct WebDriverSessionFactory {
    webdriver_url: String,
    headless: bool,
}

impl WebDriverSessionFactory {
    pub fn new(webdriver_url: impl Into<String>, headless: bool) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless,
        }
    }

    fn capabilities(&self) -> JsonMap<String, serde_json::Value> {
        let mut args: Vec<&str> = CHROME_ARGS.to_vec();
        if self.headless {
            args.insert(0, "--headless=new");
        }

        let mut chrome_opts = JsonMap::new();
        chrome_opts.insert("args".to_string(), serde_json::json!(args));

        let mut caps = JsonMap::new();
        caps.insert("browserName".to_string(), serde_json::json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::Value::Object(chrome_opts),
        );
        caps
    }
}

#[async_trait]
impl SessionFactory for WebDriverSessionFactory {
    async fn open(&self) -> Result<Box<dyn AutomationSession>, SessionError> {
        tracing::debug!(target: "webdriver", url = %self.webdriver_url, headless = self.headless, "connecting");

        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());

        let client = builder.connect(&self.webdriver_url).await.map_err(|err| {
            tracing::error!(target: "webdriver", url = %self.webdriver_url, error = %err, "connect failed");
            SessionError::Unavailable(format!("{}: {err}", self.webdriver_url))
        })?;

        Ok(Box::new(WebDriverSession {
            client,
            elements: Vec::new(),
        }))
    }
}

struct WebDriverSession {
    client: Client,
    elements: Vec<Element>,
}

fn command(err: CmdError) -> SessionError {
    SessionError::Command(err.to_string())
}

impl WebDriverSession {
    fn element(&self, handle: &ElementHandle) -> Result<&Element, SessionError> {
        self.elements
            .get(handle.id)
            .ok_or(SessionError::UnknownElement(handle.id))
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>, CmdError> {
        match locator.selector() {
            Selector::Css(css) => self.client.find_all(fantoccini::Locator::Css(&css)).await,
            Selector::XPath(xpath) => {
                self.client
                    .find_all(fantoccini::Locator::XPath(&xpath))
                    .await
            }
        }
    }
}

#[async_trait]
impl AutomationSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.elements.clear();
        self.client
            .goto(url)
            .await
            .map_err(|err| SessionError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            })
    }

    async fn find_interactable(
        &mut self,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, SessionError> {
        let candidates = self.find_all(locator).await.map_err(command)?;

        for candidate in candidates {
            // Elements can go stale between lookup and inspection; skip them.
            let displayed = candidate.is_displayed().await.unwrap_or(false);
            let enabled = candidate.is_enabled().await.unwrap_or(false);
            if displayed && enabled {
                self.elements.push(candidate);
                return Ok(Some(ElementHandle {
                    id: self.elements.len() - 1,
                    tag: locator.tag,
                }));
            }
        }
        Ok(None)
    }

    async fn type_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
    ) -> Result<(), SessionError> {
        let target = self.element(element)?;
        target.clear().await.map_err(command)?;
        target.send_keys(text).await.map_err(command)
    }

    async fn select_option(
        &mut self,
        element: &ElementHandle,
        by: SelectBy,
        value: &str,
    ) -> Result<bool, SessionError> {
        let target = self.element(element)?;
        let selected = match by {
            SelectBy::Value => target.select_by_value(value).await,
            SelectBy::Label => target.select_by_label(value).await,
        };
        match selected {
            Ok(()) => Ok(true),
            Err(err) if err.is_no_such_element() => Ok(false),
            Err(err) => Err(command(err)),
        }
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), SessionError> {
        self.element(element)?.click().await.map_err(command)
    }

    async fn current_url(&mut self) -> Result<String, SessionError> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(command)
    }

    async fn page_text(&mut self) -> Result<String, SessionError> {
        let body = self
            .client
            .find(fantoccini::Locator::Css("body"))
            .await
            .map_err(command)?;
        body.text().await.map_err(command)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.elements.clear();
        self.client.clone().close().await.map_err(command)
    }
}
