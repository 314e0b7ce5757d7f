//! Moodle LMS E2E Test Harness
//!
//! This crate drives a real browser over WebDriver through data-driven
//! scenarios:
//! - Loads test cases from CSV files with escape decoding and type coercion
//! - Wraps element checks, page loads and login in bounded retries
//! - Brackets every scenario with login/logout and every rich-text edit
//!   with an editor-frame switch that is always undone
//! - Creates assignments (and the course they live in, once) and applies
//!   editor toolbar formatting, checking the resulting markup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SuiteRunner (one session each)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioId -> test_<name>.csv -> CaseFile                  │
//! │    ├── AssignmentScenario                                   │
//! │    │     ├── ensure_course (idempotent)                     │
//! │    │     └── create_assignment + verify                     │
//! │    └── FormattingScenario                                   │
//! │          ├── replace_editor_content (frame scoped)          │
//! │          ├── apply_format (pressed-state checked)           │
//! │          └── verify_format (frame scoped)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Session: open / login / logout / within_editor             │
//! │  retry: verify_present / verify_absent / open_with_retries  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Driver (trait)                                             │
//! │    └── WebDriverSession (thirtyfour)                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cases;
pub mod config;
pub mod driver;
pub mod error;
pub mod locator;
pub mod retry;
pub mod runner;
pub mod scenario;
pub mod selectors;
pub mod session;
pub mod webdriver;

pub use cases::{CaseFile, CaseRecord, CaseValue};
pub use config::HarnessConfig;
pub use driver::Driver;
pub use error::{E2eError, E2eResult};
pub use locator::Locator;
pub use runner::{Connector, ScenarioId, SuiteResult, SuiteRunner};
pub use session::{Credentials, Session};
pub use webdriver::{WebDriverConnector, WebDriverSession};
