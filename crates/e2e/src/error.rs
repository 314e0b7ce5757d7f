//! Error types for E2E testing

use thiserror::Error;

use crate::retry::ElementState;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Case file error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Case file line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Case file has no header row")]
    MissingHeader,

    #[error("Case file line {line}: missing required field '{field}'")]
    MissingField { line: u64, field: String },

    #[error("Case file line {line}: field '{field}' {reason}")]
    InvalidField {
        line: u64,
        field: String,
        reason: String,
    },

    #[error("Case file line {line}: unknown selector column '{column}'")]
    UnknownSelectorColumn { line: u64, column: String },

    #[error("Unknown format command '{0}'")]
    UnknownFormatCommand(String),

    #[error("Unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("Navigation error: {0}")]
    Transport(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Failed to open the page {url} after {attempts} attempts")]
    NavigationExhausted { url: String, attempts: u32 },

    #[error("Failed to log in after {attempts} attempts")]
    AuthenticationExhausted { attempts: u32 },

    #[error("Element with selector '{selector}' {} after {retries} retries", .expectation.failure_text())]
    Assertion {
        selector: String,
        retries: u32,
        expectation: ElementState,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl E2eError {
    /// Whether this failure came from the page-load transport and may be retried
    pub fn is_transport(&self) -> bool {
        matches!(self, E2eError::Transport(_))
    }

    /// Whether this failure is a fatal assertion about page state
    pub fn is_assertion(&self) -> bool {
        matches!(self, E2eError::Assertion { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
