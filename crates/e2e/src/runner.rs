//! Suite runner: one browser session and one case file per scenario

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cases::CaseFile;
use crate::config::HarnessConfig;
use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::scenario::{AssignmentScenario, FormattingScenario, ScenarioReport};
use crate::selectors::FormatCommand;
use crate::session::Session;

/// Source of browser sessions
#[async_trait]
pub trait Connector: Send + Sync {
    type Driver: Driver;

    async fn connect(&self) -> E2eResult<Self::Driver>;

    /// Close a session obtained from [`Connector::connect`]
    async fn release(&self, driver: Self::Driver) -> E2eResult<()>;
}

/// A runnable scenario, bound to its case file by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    CreateAssignment,
    /// Formatting rows that name their own command
    EditorStyle,
    Format(FormatCommand),
}

impl ScenarioId {
    pub fn all() -> Vec<ScenarioId> {
        let mut ids = vec![ScenarioId::CreateAssignment, ScenarioId::EditorStyle];
        ids.extend(FormatCommand::ALL.into_iter().map(ScenarioId::Format));
        ids
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::CreateAssignment => "create_assignment",
            ScenarioId::EditorStyle => "editor_style",
            ScenarioId::Format(command) => command.name(),
        }
    }

    pub fn case_file(&self) -> String {
        format!("test_{}.csv", self.name())
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioId {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ScenarioId::all()
            .into_iter()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| E2eError::UnknownScenario(s.to_string()))
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub report: Option<ScenarioReport>,
    pub error: Option<String>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs scenarios against fresh browser sessions
pub struct SuiteRunner {
    config: HarnessConfig,
}

impl SuiteRunner {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Load a scenario's case file
    pub fn load_cases(&self, id: ScenarioId) -> E2eResult<CaseFile> {
        CaseFile::load(&self.config.case_path(&id.case_file()))
    }

    /// Run one scenario on an already open browser
    pub async fn run_scenario_with<D: Driver + ?Sized>(
        &self,
        driver: &D,
        id: ScenarioId,
    ) -> E2eResult<ScenarioReport> {
        let cases = self.load_cases(id)?;
        let session = Session::new(driver, self.config.session);

        match id {
            ScenarioId::CreateAssignment => {
                AssignmentScenario::from_config(&self.config)
                    .run(&session, &cases)
                    .await
            }
            ScenarioId::EditorStyle => {
                FormattingScenario::from_config(&self.config, None)
                    .run(&session, &cases)
                    .await
            }
            ScenarioId::Format(command) => {
                FormattingScenario::from_config(&self.config, Some(command))
                    .run(&session, &cases)
                    .await
            }
        }
    }

    /// Run one scenario in its own browser session; the session is always closed
    pub async fn run_scenario<C: Connector>(&self, connector: &C, id: ScenarioId) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", id);

        let outcome = match connector.connect().await {
            Ok(driver) => {
                let outcome = self.run_scenario_with(&driver, id).await;
                if let Err(e) = connector.release(driver).await {
                    warn!("Failed to close browser after {}: {}", id, e);
                }
                outcome
            }
            Err(e) => Err(e),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(report) => ScenarioResult {
                name: id.name().to_string(),
                success: true,
                duration_ms,
                report: Some(report),
                error: None,
            },
            Err(e) => ScenarioResult {
                name: id.name().to_string(),
                success: false,
                duration_ms,
                report: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Run scenarios in order; a failing scenario does not stop the others
    pub async fn run_suite<C: Connector>(&self, connector: &C, ids: &[ScenarioId]) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s)...", ids.len());

        for &id in ids {
            let result = self.run_scenario(connector, id).await;
            if result.success {
                passed += 1;
                let (executed, skipped) = result
                    .report
                    .as_ref()
                    .map(|r| (r.executed, r.skipped))
                    .unwrap_or_default();
                info!(
                    "✓ {} ({} executed, {} skipped, {} ms)",
                    result.name, executed, skipped, result.duration_ms
                );
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            started_at,
            total: ids.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.results_path();
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Scenarios named on the command line, or all of them
pub fn select_scenarios(names: &[String]) -> E2eResult<Vec<ScenarioId>> {
    if names.is_empty() {
        return Ok(ScenarioId::all());
    }
    names.iter().map(|n| n.parse()).collect()
}

/// libtest switches cargo may forward to a `harness = false` target
const LIBTEST_FLAGS: &[&str] = &[
    "--nocapture",
    "--show-output",
    "--quiet",
    "-q",
    "--ignored",
    "--include-ignored",
    "--exact",
    "--test",
    "--bench",
    "--list",
    "--force-run-in-process",
];

/// libtest options that take a value, as `--opt value` or `--opt=value`
const LIBTEST_OPTIONS: &[&str] = &[
    "--test-threads",
    "--format",
    "--color",
    "--skip",
    "--logfile",
    "--report-time",
    "--shuffle-seed",
    "-Z",
];

/// Suite options whose value is the next argument
const SUITE_OPTIONS: &[&str] = &[
    "-c",
    "--config",
    "--cases",
    "-s",
    "--scenario",
    "--webdriver",
    "--browser",
    "-o",
    "--output",
];

/// Drop the libtest arguments cargo forwards to every test target, keeping
/// the program name and everything else so unknown suite flags still fail
pub fn suite_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut kept: Vec<String> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        if SUITE_OPTIONS.contains(&arg.as_str()) {
            kept.push(arg);
            kept.extend(args.next());
            continue;
        }
        if LIBTEST_FLAGS.contains(&arg.as_str()) || arg == "--" {
            continue;
        }
        if LIBTEST_OPTIONS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        let option = arg.split_once('=').map_or(arg.as_str(), |(name, _)| name);
        if LIBTEST_OPTIONS.contains(&option) {
            continue;
        }
        // Bare words are libtest name filters
        if !arg.starts_with('-') {
            continue;
        }
        kept.push(arg);
    }

    kept
}
