//! Login/logout bracketing and editor-frame focus

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::retry::{self, Attempt, RetryPolicy};
use crate::selectors::{loc, LoginSelectors};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Browser-session tuning shared by every scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub window_width: u32,
    pub window_height: u32,
    /// Index of the rich-text editor frame on the page
    pub editor_frame: u16,
    /// How long to wait for the editor frame before writing into it
    pub frame_wait_secs: u64,
    /// Pause after page loads and frame switches
    pub settle_ms: u64,
    pub element_retry: RetryPolicy,
    pub navigation_retry: RetryPolicy,
    pub authentication_retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_width: 1550,
            window_height: 878,
            editor_frame: 0,
            frame_wait_secs: 20,
            settle_ms: 1000,
            element_retry: RetryPolicy::element(),
            navigation_retry: RetryPolicy::navigation(),
            authentication_retry: RetryPolicy::authentication(),
        }
    }
}

impl SessionConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn frame_wait(&self) -> Duration {
        Duration::from_secs(self.frame_wait_secs)
    }
}

/// One browser session driven on behalf of a scenario
pub struct Session<'d, D: Driver + ?Sized> {
    driver: &'d D,
    config: SessionConfig,
}

impl<'d, D: Driver + ?Sized> Session<'d, D> {
    pub fn new(driver: &'d D, config: SessionConfig) -> Self {
        Self { driver, config }
    }

    pub fn driver(&self) -> &'d D {
        self.driver
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Load the page, size the window and let it settle
    pub async fn open(&self, url: &str) -> E2eResult<()> {
        retry::open_with_retries(self.driver, url, &self.config.navigation_retry).await?;
        self.driver
            .set_window_size(self.config.window_width, self.config.window_height)
            .await?;
        self.driver.pause(self.config.settle()).await;
        Ok(())
    }

    /// Submit credentials until the logged-in marker shows up
    pub async fn login(&self, credentials: &Credentials, selectors: &LoginSelectors) -> E2eResult<()> {
        info!("Logging in as {}", credentials.username);
        self.driver.click(&loc(&selectors.login_entry)).await?;

        let username = &loc(&selectors.username);
        let password = &loc(&selectors.password);
        let submit = &loc(&selectors.login_button);
        let marker = &loc(&selectors.logged_in_marker);
        let driver = self.driver;

        retry::retry(
            &self.config.authentication_retry,
            &format!("Login as {}", credentials.username),
            move |_| async move {
                driver.clear(username).await?;
                driver.set_text(username, &credentials.username).await?;
                driver.clear(password).await?;
                driver.set_text(password, &credentials.password).await?;
                driver.click(submit).await?;

                if driver.is_visible(marker).await? {
                    Ok(Attempt::Ready(()))
                } else {
                    Ok(Attempt::Pending(format!("'{}' not visible", marker)))
                }
            },
            |attempts| E2eError::AuthenticationExhausted { attempts },
        )
        .await
    }

    /// Open whichever user menu the page shows, then follow the log-out link
    pub async fn logout(&self, selectors: &LoginSelectors) -> E2eResult<()> {
        let user_menu = loc(&selectors.user_menu_toggle);
        let toggle = if self.driver.count(&user_menu).await? > 0 {
            user_menu
        } else {
            loc(&selectors.action_menu_toggle)
        };
        debug!("Opening user menu via {}", toggle);
        self.driver.click(&toggle).await?;
        self.driver.click(&loc(&selectors.logout_link)).await?;
        info!("Logged out");
        Ok(())
    }

    /// Run `op` with focus inside the editor frame.
    ///
    /// The switch back to the top-level document happens whether or not
    /// `op` succeeds. `op` is not polled until the frame has been entered.
    pub async fn within_editor<T, F>(&self, wait: Option<Duration>, op: F) -> E2eResult<T>
    where
        F: Future<Output = E2eResult<T>>,
    {
        self.driver.enter_frame(self.config.editor_frame, wait).await?;
        let outcome = op.await;
        let left = self.driver.leave_frame().await;

        match (outcome, left) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(leave_err)) => {
                warn!("Failed to leave editor frame after error: {}", leave_err);
                Err(e)
            }
        }
    }

    /// Clear the editor body and type `content` into it
    pub async fn replace_editor_content(&self, body: &Locator, content: &str) -> E2eResult<()> {
        let wait = Some(self.config.frame_wait());
        self.within_editor(wait, async {
            self.driver.pause(self.config.settle()).await;
            self.driver.clear(body).await?;
            self.driver.set_text(body, content).await
        })
        .await
    }

    /// Highlight the whole editor body so a toolbar command applies to all of it
    pub async fn select_all_editor_content(&self, body: &Locator) -> E2eResult<()> {
        self.within_editor(None, async {
            retry::wait_visible(self.driver, body, &self.config.element_retry).await?;
            self.driver.run_script(&select_all_script(body)).await
        })
        .await
    }
}

/// Script selecting every node under the element matched by `body`
pub fn select_all_script(body: &Locator) -> String {
    let selector = serde_json::Value::String(body.as_str().to_string());
    let lookup = match body {
        Locator::Css(_) => format!("document.querySelector({})", selector),
        Locator::XPath(_) => format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            selector
        ),
    };

    format!(
        r#"
var editor = {lookup};
if (editor && document.createRange && window.getSelection) {{
    var range = document.createRange();
    range.selectNodeContents(editor);
    var sel = window.getSelection();
    sel.removeAllRanges();
    sel.addRange(range);
}}
"#
    )
}
