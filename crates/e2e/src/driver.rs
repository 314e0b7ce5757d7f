//! Browser capability surface
//!
//! Everything the harness does to a page goes through [`Driver`]. The live
//! implementation is [`crate::webdriver::WebDriverSession`]; tests script
//! their own.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::E2eResult;
use crate::locator::Locator;

#[async_trait]
pub trait Driver: Send + Sync {
    /// Load a URL. Failures to reach the page must surface as
    /// [`crate::E2eError::Transport`] so navigation can be retried.
    async fn navigate(&self, url: &str) -> E2eResult<()>;

    async fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()>;

    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    async fn clear(&self, locator: &Locator) -> E2eResult<()>;

    /// Replace the element's text; clears it first
    async fn set_text(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    /// Number of elements currently matching
    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    /// Whether any matching element is displayed
    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    /// Attribute of the first matching element
    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>>;

    async fn select_by_text(&self, locator: &Locator, text: &str) -> E2eResult<()>;

    /// Switch into the nested frame at `index`, waiting up to `wait` for it
    async fn enter_frame(&self, index: u16, wait: Option<Duration>) -> E2eResult<()>;

    /// Switch back to the top-level document
    async fn leave_frame(&self) -> E2eResult<()>;

    async fn run_script(&self, script: &str) -> E2eResult<()>;

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
