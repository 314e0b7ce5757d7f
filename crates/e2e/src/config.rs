//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::selectors::{AssignmentSelectors, CourseSelectors, EditorSelectors};
use crate::session::SessionConfig;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// WebDriver endpoint (chromedriver, geckodriver or a grid)
    pub webdriver_url: String,

    /// Browser settings
    pub browser: BrowserConfig,

    /// Site used when a record has no `url` column
    pub site_url: String,

    /// Directory holding the `test_<scenario>.csv` case files
    pub cases_dir: PathBuf,

    /// Output directory for results
    pub output_dir: PathBuf,

    /// Session tuning and retry budgets
    pub session: SessionConfig,

    /// Course that assignments are created in
    pub course: CourseConfig,

    /// Default selectors before per-record overrides
    pub selectors: SelectorDefaults,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            browser: BrowserConfig::default(),
            site_url: "https://sandbox.moodledemo.net/".to_string(),
            cases_dir: PathBuf::from("cases"),
            output_dir: PathBuf::from("test-results"),
            session: SessionConfig::default(),
            course: CourseConfig::default(),
            selectors: SelectorDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(Browser::Chrome),
            "firefox" => Ok(Browser::Firefox),
            other => Err(E2eError::Config(format!("unsupported browser '{}'", other))),
        }
    }
}

/// Browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: Browser,
    pub headless: bool,
    /// How long an element lookup waits for the element to appear
    pub element_wait_secs: u64,
    pub element_poll_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: Browser::Chrome,
            headless: true,
            element_wait_secs: 10,
            element_poll_ms: 250,
        }
    }
}

impl BrowserConfig {
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn element_poll(&self) -> Duration {
        Duration::from_millis(self.element_poll_ms)
    }
}

/// Course configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseConfig {
    /// Full name, also the text of the course link used as existence marker
    pub name: String,
    pub short_name: String,
    pub id_number: String,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            name: "L01.25-Q".to_string(),
            short_name: "L01.25-Q".to_string(),
            id_number: "L01.25-Q-001".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorDefaults {
    pub assignment: AssignmentSelectors,
    pub editor: EditorSelectors,
    pub course: CourseSelectors,
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Path of a scenario's case file
    pub fn case_path(&self, file_name: &str) -> PathBuf {
        self.cases_dir.join(file_name)
    }

    /// Path of the JSON results file
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("test-results.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml(
            r##"
webdriver_url = "http://127.0.0.1:9515"
cases_dir = "data"

[browser]
kind = "firefox"
element_wait_secs = 3

[session.element_retry]
attempts = 5
delay_ms = 250

[selectors.assignment]
assignment_name = "#id_name_custom"
"##,
        )
        .unwrap();

        assert_eq!(config.webdriver_url, "http://127.0.0.1:9515");
        assert_eq!(config.browser.kind, Browser::Firefox);
        assert!(config.browser.headless);
        assert_eq!(config.browser.element_wait(), Duration::from_secs(3));
        assert_eq!(config.browser.element_poll(), Duration::from_millis(250));
        assert_eq!(config.session.element_retry, RetryPolicy::new(5, 250));
        assert_eq!(config.session.navigation_retry, RetryPolicy::navigation());
        assert_eq!(config.selectors.assignment.assignment_name, "#id_name_custom");
        assert_eq!(config.selectors.assignment.submit, "#id_submitbutton2");
        assert_eq!(config.case_path("test_italic.csv"), PathBuf::from("data/test_italic.csv"));
        assert_eq!(config.course.name, "L01.25-Q");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("lms-e2e.toml")).unwrap();
        assert_eq!(config.site_url, "https://sandbox.moodledemo.net/");
        assert_eq!(config.results_path(), PathBuf::from("test-results/test-results.json"));
        assert_eq!(config.browser.element_wait(), Duration::from_secs(10));
    }

    #[test]
    fn test_browser_names() {
        assert_eq!("Chromium".parse::<Browser>().unwrap(), Browser::Chrome);
        assert_eq!("firefox".parse::<Browser>().unwrap(), Browser::Firefox);
        assert!(matches!("webkit".parse::<Browser>(), Err(E2eError::Config(_))));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(HarnessConfig::from_toml("webdriver_url = [").is_err());
    }
}
