//! Live browser control over the WebDriver protocol

use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::components::SelectElement;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{Browser, BrowserConfig};
use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::runner::Connector;

const FRAME_POLL: Duration = Duration::from_millis(100);

fn driver_err(e: WebDriverError) -> E2eError {
    E2eError::Driver(e.to_string())
}

fn by(locator: &Locator) -> By {
    match locator {
        Locator::Css(s) => By::Css(s.as_str()),
        Locator::XPath(s) => By::XPath(s.as_str()),
    }
}

/// A browser session opened against a WebDriver endpoint
pub struct WebDriverSession {
    driver: WebDriver,
    element_wait: Duration,
    element_poll: Duration,
}

impl WebDriverSession {
    pub async fn connect(webdriver_url: &str, browser: &BrowserConfig) -> E2eResult<Self> {
        info!(
            "Starting {:?} session via {} (headless: {})",
            browser.kind, webdriver_url, browser.headless
        );

        let driver = match browser.kind {
            Browser::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                if browser.headless {
                    caps.set_headless().map_err(driver_err)?;
                }
                WebDriver::new(webdriver_url, caps).await
            }
            Browser::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                if browser.headless {
                    caps.set_headless().map_err(driver_err)?;
                }
                WebDriver::new(webdriver_url, caps).await
            }
        }
        .map_err(|e| E2eError::Transport(format!("{}: {}", webdriver_url, e)))?;

        Ok(Self {
            driver,
            element_wait: browser.element_wait(),
            element_poll: browser.element_poll(),
        })
    }

    /// End the browser session
    pub async fn quit(self) -> E2eResult<()> {
        self.driver.quit().await.map_err(driver_err)
    }

    /// First element matching `locator`, waiting for it to appear
    async fn first(&self, locator: &Locator) -> E2eResult<WebElement> {
        self.driver
            .query(by(locator))
            .wait(self.element_wait, self.element_poll)
            .first()
            .await
            .map_err(driver_err)
    }
}

#[async_trait]
impl Driver for WebDriverSession {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        debug!("GET {}", url);
        self.driver
            .goto(url)
            .await
            .map_err(|e| E2eError::Transport(e.to_string()))
    }

    async fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()> {
        self.driver
            .set_window_rect(0, 0, width, height)
            .await
            .map_err(driver_err)
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        debug!("click {}", locator);
        self.first(locator).await?.click().await.map_err(driver_err)
    }

    async fn clear(&self, locator: &Locator) -> E2eResult<()> {
        self.first(locator).await?.clear().await.map_err(driver_err)
    }

    async fn set_text(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        let element = self.first(locator).await?;
        element.clear().await.map_err(driver_err)?;
        element.send_keys(value).await.map_err(driver_err)
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let found = self.driver.find_all(by(locator)).await.map_err(driver_err)?;
        Ok(found.len())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let found = self.driver.find_all(by(locator)).await.map_err(driver_err)?;
        for element in found {
            // Elements can go stale between lookup and the display check
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        self.first(locator).await?.attr(name).await.map_err(driver_err)
    }

    async fn select_by_text(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        let element = self.first(locator).await?;
        let select = SelectElement::new(&element).await.map_err(driver_err)?;
        select.select_by_visible_text(text).await.map_err(driver_err)
    }

    async fn enter_frame(&self, index: u16, wait: Option<Duration>) -> E2eResult<()> {
        let deadline = Instant::now() + wait.unwrap_or_default();
        loop {
            match self.driver.enter_frame(index).await {
                Ok(()) => return Ok(()),
                Err(e) if Instant::now() >= deadline => return Err(driver_err(e)),
                Err(_) => tokio::time::sleep(FRAME_POLL).await,
            }
        }
    }

    async fn leave_frame(&self) -> E2eResult<()> {
        self.driver.enter_default_frame().await.map_err(driver_err)
    }

    async fn run_script(&self, script: &str) -> E2eResult<()> {
        self.driver
            .execute(script, Vec::new())
            .await
            .map(|_| ())
            .map_err(driver_err)
    }
}

/// Opens one fresh browser session per scenario
#[derive(Debug, Clone)]
pub struct WebDriverConnector {
    pub webdriver_url: String,
    pub browser: BrowserConfig,
}

impl WebDriverConnector {
    pub fn new(webdriver_url: impl Into<String>, browser: BrowserConfig) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            browser,
        }
    }
}

#[async_trait]
impl Connector for WebDriverConnector {
    type Driver = WebDriverSession;

    async fn connect(&self) -> E2eResult<WebDriverSession> {
        WebDriverSession::connect(&self.webdriver_url, &self.browser).await
    }

    async fn release(&self, driver: WebDriverSession) -> E2eResult<()> {
        driver.quit().await
    }
}
