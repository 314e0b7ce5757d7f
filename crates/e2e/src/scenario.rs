//! Scenario families
//!
//! A scenario turns every active record of its case file into a typed case
//! before touching the browser, so a bad row fails the run up front. Skipped
//! rows are never validated. Cases then run in file order: skipped rows are
//! logged and counted, and the first failing row ends the scenario.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cases::{CaseFile, CaseRecord, CaseValue};
use crate::config::{CourseConfig, HarnessConfig};
use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::retry::{verify_absent, verify_present, wait_visible, RetryPolicy};
use crate::selectors::{
    loc, AssignmentSelectors, CourseSelectors, EditorSelectors, FormatCommand, LoginSelectors,
    SelectorBundle,
};
use crate::session::{Credentials, Session};

/// What happened to one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub name: String,
    pub line: u64,
    pub status: CaseStatus,
}

/// Per-record outcomes of one scenario run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioReport {
    pub total: usize,
    pub executed: usize,
    pub skipped: usize,
    pub cases: Vec<CaseOutcome>,
}

impl ScenarioReport {
    fn record(&mut self, name: &str, line: u64, status: CaseStatus) {
        self.total += 1;
        match status {
            CaseStatus::Passed => self.executed += 1,
            CaseStatus::Skipped => {
                info!("Skipping test: {}", name);
                self.skipped += 1;
            }
        }
        self.cases.push(CaseOutcome {
            name: name.to_string(),
            line,
            status,
        });
    }
}

/// A record after planning: a typed case to run, or a skipped row
#[derive(Debug, Clone)]
pub enum Planned<T> {
    Run(T),
    Skip { name: String, line: u64 },
}

impl<T> Planned<T> {
    pub fn case(&self) -> Option<&T> {
        match self {
            Planned::Run(case) => Some(case),
            Planned::Skip { .. } => None,
        }
    }
}

/// Build typed cases for active records, failing on the first bad one
fn plan_records<T>(
    cases: &CaseFile,
    mut build: impl FnMut(&CaseRecord, usize) -> E2eResult<T>,
) -> E2eResult<Vec<Planned<T>>> {
    cases
        .records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if r.is_skipped() {
                Ok(Planned::Skip {
                    name: case_name(r, i),
                    line: r.line,
                })
            } else {
                build(r, i).map(Planned::Run)
            }
        })
        .collect()
}

fn case_name(record: &CaseRecord, index: usize) -> String {
    record
        .non_empty_text("test_name")
        .unwrap_or_else(|| format!("Test_{}", index + 1))
}

fn credentials(record: &CaseRecord) -> E2eResult<Credentials> {
    Ok(Credentials::new(
        record.require_text("username")?,
        record.require_text("password")?,
    ))
}

/// Dropdown option text; integers render as two digits ("5" -> "05")
fn dropdown_text(record: &CaseRecord, column: &str) -> String {
    match record.get(column) {
        Some(CaseValue::Int(n)) => format!("{:02}", n),
        Some(value) if !value.is_empty() => value.to_string(),
        _ => "00".to_string(),
    }
}

/// How course creation gets an authenticated page
#[derive(Debug, Clone)]
pub enum CourseAccess {
    /// Caller is already logged in and stays logged in
    CurrentSession,
    /// Log in first and log out afterwards
    Login(Credentials),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStatus {
    AlreadyPresent,
    Created,
}

/// Create the course unless its link is already visible.
///
/// Safe to call on every run; when the course exists no form field is touched.
pub async fn ensure_course<D: Driver + ?Sized>(
    session: &Session<'_, D>,
    site_url: &str,
    course: &CourseConfig,
    selectors: &CourseSelectors,
    login: &LoginSelectors,
    access: &CourseAccess,
) -> E2eResult<CourseStatus> {
    let driver = session.driver();
    session.open(site_url).await?;

    if let CourseAccess::Login(credentials) = access {
        session.login(credentials, login).await?;
    }

    let status = if driver.is_visible(&Locator::text("a", &course.name)).await? {
        info!("Course {} already exists, skipping creation", course.name);
        CourseStatus::AlreadyPresent
    } else {
        info!("Course {} does not exist, creating it", course.name);
        driver.click(&loc(&selectors.my_courses)).await?;
        driver.click(&loc(&selectors.new_course)).await?;
        driver.set_text(&loc(&selectors.full_name), &course.name).await?;
        driver.set_text(&loc(&selectors.short_name), &course.short_name).await?;
        driver.set_text(&loc(&selectors.id_number), &course.id_number).await?;

        if let Err(e) = driver.click(&loc(&selectors.save_and_display)).await {
            warn!("Course creation did not complete, it may already exist: {}", e);
        }
        driver.click(&loc(&selectors.home)).await?;
        CourseStatus::Created
    };

    if matches!(access, CourseAccess::Login(_)) {
        session.logout(login).await?;
    }

    Ok(status)
}

/// Submission-window setting of the assignment form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionWindow {
    /// Pick a calendar day and the given time
    Open { minute: String, hour: String },
    /// Untick the enable box
    Disabled,
}

/// One typed row of the assignment case file
#[derive(Debug, Clone)]
pub struct AssignmentCase {
    pub name: String,
    pub line: u64,
    pub url: String,
    pub credentials: Credentials,
    pub assignment_name: String,
    pub description: String,
    pub show_description: bool,
    pub submission_window: SubmissionWindow,
    pub online_text_submission: bool,
    /// Checked after submitting the form
    pub assert_element: String,
    pub assert_submission_window: Option<String>,
    pub assert_online_text: Option<String>,
    pub assert_online_text_absent: Option<String>,
    /// Fields the row author expects to be empty
    pub expect_empty: Vec<String>,
    pub selectors: AssignmentSelectors,
}

impl AssignmentCase {
    pub fn from_record(
        record: &CaseRecord,
        index: usize,
        defaults: &AssignmentSelectors,
        site_url: &str,
    ) -> E2eResult<Self> {
        let assignment_name = record.require_text("assignment_name")?;
        let submission_window = if record.flag("enable_allow_submissions_from", false) {
            SubmissionWindow::Open {
                minute: dropdown_text(record, "allow_submissions_from_minute"),
                hour: dropdown_text(record, "allow_submissions_from_hour"),
            }
        } else {
            SubmissionWindow::Disabled
        };

        Ok(Self {
            name: case_name(record, index),
            line: record.line,
            url: record
                .non_empty_text("url")
                .unwrap_or_else(|| site_url.to_string()),
            credentials: credentials(record)?,
            description: record.require_text("description")?,
            show_description: record.flag("show_description", false),
            submission_window,
            online_text_submission: record.flag("enable_online_text_submission", false),
            assert_element: record
                .non_empty_text("assert_element_sel")
                .unwrap_or_else(|| format!("[data-value=\"{}\"]", assignment_name)),
            assert_submission_window: record.non_empty_text("assert_allow_submissions_from_sel"),
            assert_online_text: record.non_empty_text("online_text_submission_sel"),
            assert_online_text_absent: record.non_empty_text("online_text_submission_absent_sel"),
            expect_empty: record
                .text_or("expect_empty", "")
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect(),
            selectors: defaults.merged_with(record)?,
            assignment_name,
        })
    }

    /// Fields flagged as expected-empty that are not
    pub fn unexpected_values(&self) -> Vec<&str> {
        self.expect_empty
            .iter()
            .filter(|field| match field.as_str() {
                "assignment_name" => !self.assignment_name.is_empty(),
                "description" => !self.description.is_empty(),
                _ => false,
            })
            .map(String::as_str)
            .collect()
    }
}

/// Create assignments in a course and check the resulting page
#[derive(Debug, Clone)]
pub struct AssignmentScenario {
    pub selectors: AssignmentSelectors,
    pub course_selectors: CourseSelectors,
    pub course: CourseConfig,
    pub site_url: String,
}

impl AssignmentScenario {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            selectors: config.selectors.assignment.clone(),
            course_selectors: config.selectors.course.clone(),
            course: config.course.clone(),
            site_url: config.site_url.clone(),
        }
    }

    pub fn plan(&self, cases: &CaseFile) -> E2eResult<Vec<Planned<AssignmentCase>>> {
        plan_records(cases, |r, i| {
            AssignmentCase::from_record(r, i, &self.selectors, &self.site_url)
        })
    }

    pub async fn run<D: Driver + ?Sized>(
        &self,
        session: &Session<'_, D>,
        cases: &CaseFile,
    ) -> E2eResult<ScenarioReport> {
        let planned = self.plan(cases)?;
        let mut report = ScenarioReport::default();

        for planned in &planned {
            let case = match planned {
                Planned::Run(case) => case,
                Planned::Skip { name, line } => {
                    report.record(name, *line, CaseStatus::Skipped);
                    continue;
                }
            };
            for field in case.unexpected_values() {
                warn!("{} (line {}): {} is not empty", case.name, case.line, field);
            }

            info!("Running test: {}", case.name);
            self.run_case(session, case).await?;
            report.record(&case.name, case.line, CaseStatus::Passed);
        }

        Ok(report)
    }

    async fn run_case<D: Driver + ?Sized>(
        &self,
        session: &Session<'_, D>,
        case: &AssignmentCase,
    ) -> E2eResult<()> {
        let login = &case.selectors.login;
        let policy = session.config().element_retry;

        session.open(&case.url).await?;
        session.login(&case.credentials, login).await?;
        ensure_course(
            session,
            &case.url,
            &self.course,
            &self.course_selectors,
            login,
            &CourseAccess::CurrentSession,
        )
        .await?;

        self.create_assignment(session, case).await?;
        verify_present(session.driver(), &loc(&case.assert_element), &policy).await?;

        session.logout(login).await
    }

    /// Fill in and submit the new-assignment form
    pub async fn create_assignment<D: Driver + ?Sized>(
        &self,
        session: &Session<'_, D>,
        case: &AssignmentCase,
    ) -> E2eResult<()> {
        let driver = session.driver();
        let sel = &case.selectors;
        let policy = session.config().element_retry;

        driver.click(&Locator::text("a", &self.course.name)).await?;
        driver.click(&loc(&sel.edit_mode_toggle)).await?;
        wait_visible(driver, &loc(&sel.add_activity), &RetryPolicy::new(5, 1000)).await?;
        driver.click(&loc(&sel.add_activity)).await?;
        driver.click(&loc(&sel.assignment_option)).await?;

        driver.set_text(&loc(&sel.assignment_name), &case.assignment_name).await?;
        if case.show_description {
            driver.click(&loc(&sel.show_description)).await?;
        }
        let description = loc(&sel.description);
        session
            .within_editor(None, driver.set_text(&description, &case.description))
            .await?;

        match &case.submission_window {
            SubmissionWindow::Open { minute, hour } => {
                driver.click(&loc(&sel.allow_submissions_from)).await?;
                driver.pause(session.config().settle()).await;
                driver.click(&loc(&sel.calendar_day)).await?;
                driver.select_by_text(&loc(&sel.submissions_from_minute), minute).await?;
                driver.select_by_text(&loc(&sel.submissions_from_hour), hour).await?;
                if let Some(check) = &case.assert_submission_window {
                    verify_present(driver, &loc(check), &policy).await?;
                }
            }
            SubmissionWindow::Disabled => {
                driver.click(&loc(&sel.allow_submissions_enabled)).await?;
                let check = case
                    .assert_submission_window
                    .as_deref()
                    .unwrap_or("#id_allowsubmissionsfromdate_calendar.disabled");
                verify_present(driver, &loc(check), &policy).await?;
            }
        }

        if case.online_text_submission {
            driver.click(&loc(&sel.enable_online_text_submission)).await?;
        }
        let online_text_check = case.assert_online_text.clone().unwrap_or_else(|| {
            if case.online_text_submission {
                "//*[@id='fgroup_id_assignsubmission_onlinetext_wordlimit_group_label']".to_string()
            } else {
                "//*[@data-groupname=\"assignsubmission_onlinetext_wordlimit_group\" and contains(@style, \"display: none;\")]".to_string()
            }
        });
        verify_present(driver, &loc(&online_text_check), &policy).await?;
        if let Some(absent) = &case.assert_online_text_absent {
            verify_absent(driver, &loc(absent), &policy).await?;
        }

        debug!("Submitting assignment {}", case.assignment_name);
        driver.click(&loc(&sel.submit)).await
    }
}

/// Toolbar control a formatting case presses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatAction {
    pub command: Option<FormatCommand>,
    pub toolbar: String,
    /// Target URL when the action opens the link dialog
    pub link: Option<String>,
}

/// One typed row of a formatting case file
#[derive(Debug, Clone)]
pub struct FormatCase {
    pub name: String,
    pub line: u64,
    pub url: String,
    pub credentials: Credentials,
    pub editor_content: String,
    pub action: FormatAction,
    /// Selector that must match inside the editor afterwards
    pub assertion: String,
    pub selectors: EditorSelectors,
}

impl FormatCase {
    pub fn from_record(
        record: &CaseRecord,
        index: usize,
        defaults: &EditorSelectors,
        default_command: Option<FormatCommand>,
        site_url: &str,
    ) -> E2eResult<Self> {
        let selectors = defaults.merged_with(record)?;

        let command = match record.non_empty_text("format") {
            Some(name) => Some(name.parse::<FormatCommand>().map_err(|_| E2eError::InvalidField {
                line: record.line,
                field: "format".to_string(),
                reason: format!("names no known command: '{}'", name),
            })?),
            None => default_command,
        };

        let link_button = record.non_empty_text("tiny_link_button_selector");
        let is_link = command == Some(FormatCommand::Link) || link_button.is_some();
        let toolbar = link_button
            .or_else(|| record.non_empty_text("style_button_selector"))
            .or_else(|| command.map(FormatCommand::toolbar_selector))
            .ok_or_else(|| E2eError::MissingField {
                line: record.line,
                field: "format".to_string(),
            })?;

        let link = if is_link {
            Some(record.non_empty_text("link").ok_or_else(|| E2eError::MissingField {
                line: record.line,
                field: "link".to_string(),
            })?)
        } else {
            None
        };

        let assertion = match record.non_empty_text("assert_element_sel") {
            Some(selector) => selector,
            None if is_link => FormatCommand::Link.expected_markup(&selectors.editor_root, link.as_deref()),
            None => command
                .map(|c| c.expected_markup(&selectors.editor_root, None))
                .ok_or_else(|| E2eError::MissingField {
                    line: record.line,
                    field: "assert_element_sel".to_string(),
                })?,
        };

        Ok(Self {
            name: case_name(record, index),
            line: record.line,
            url: record
                .non_empty_text("url")
                .unwrap_or_else(|| site_url.to_string()),
            credentials: credentials(record)?,
            editor_content: record.require_text("editor_content")?,
            action: FormatAction {
                command,
                toolbar,
                link,
            },
            assertion,
            selectors,
        })
    }
}

/// Apply toolbar formatting to editor content and check the markup
#[derive(Debug, Clone)]
pub struct FormattingScenario {
    pub selectors: EditorSelectors,
    /// Command for rows without a `format` column
    pub default_command: Option<FormatCommand>,
    pub site_url: String,
}

impl FormattingScenario {
    pub fn from_config(config: &HarnessConfig, default_command: Option<FormatCommand>) -> Self {
        Self {
            selectors: config.selectors.editor.clone(),
            default_command,
            site_url: config.site_url.clone(),
        }
    }

    pub fn plan(&self, cases: &CaseFile) -> E2eResult<Vec<Planned<FormatCase>>> {
        plan_records(cases, |r, i| {
            FormatCase::from_record(r, i, &self.selectors, self.default_command, &self.site_url)
        })
    }

    pub async fn run<D: Driver + ?Sized>(
        &self,
        session: &Session<'_, D>,
        cases: &CaseFile,
    ) -> E2eResult<ScenarioReport> {
        let planned = self.plan(cases)?;
        let mut report = ScenarioReport::default();

        for planned in &planned {
            let case = match planned {
                Planned::Run(case) => case,
                Planned::Skip { name, line } => {
                    report.record(name, *line, CaseStatus::Skipped);
                    continue;
                }
            };

            info!("Running test: {}", case.name);
            let login = &case.selectors.login;
            session.open(&case.url).await?;
            session.login(&case.credentials, login).await?;
            session.driver().click(&loc(&case.selectors.settings_link)).await?;

            let body = loc(&case.selectors.editor_body);
            session.replace_editor_content(&body, &case.editor_content).await?;
            apply_format(session, case).await?;
            verify_format(session, case).await?;

            session.logout(login).await?;
            report.record(&case.name, case.line, CaseStatus::Passed);
        }

        Ok(report)
    }
}

/// Select all editor content and press the toolbar control unless it is
/// already pressed. Returns whether the control was clicked.
pub async fn apply_format<D: Driver + ?Sized>(
    session: &Session<'_, D>,
    case: &FormatCase,
) -> E2eResult<bool> {
    let driver = session.driver();
    let toolbar = loc(&case.action.toolbar);

    session
        .select_all_editor_content(&loc(&case.selectors.editor_body))
        .await?;

    let pressed = driver.attribute(&toolbar, "aria-pressed").await?;
    let clicked = pressed.as_deref() != Some("true");
    if clicked {
        driver.click(&toolbar).await?;
    } else {
        debug!("{} already active, not toggling", toolbar);
    }

    if let Some(link) = &case.action.link {
        driver.set_text(&loc(&case.selectors.link_url_entry), link).await?;
        driver.click(&loc(&case.selectors.link_dialog_submit)).await?;
    }

    Ok(clicked)
}

/// Check the editor markup for the expected structure
pub async fn verify_format<D: Driver + ?Sized>(
    session: &Session<'_, D>,
    case: &FormatCase,
) -> E2eResult<()> {
    let driver = session.driver();
    let policy = session.config().element_retry;
    let assertion = loc(&case.assertion);

    session
        .within_editor(None, async {
            if case.action.link.is_some() {
                // Move the caret off the new anchor so the editor commits it
                driver.click(&loc("p")).await?;
                driver.click(&loc("html")).await?;
            }
            verify_present(driver, &assertion, &policy).await
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const SITE: &str = "https://sandbox.moodledemo.net/";

    fn records(text: &str) -> CaseFile {
        CaseFile::from_reader(text.as_bytes(), Path::new("inline.csv")).unwrap()
    }

    #[test]
    fn test_assignment_case_defaults() {
        let cases = records(
            "username,password,assignment_name,description,enable_allow_submissions_from,allow_submissions_from_minute\n\
             teacher,sandbox24,Essay 1,Write,true,5\n",
        );
        let case =
            AssignmentCase::from_record(&cases.records[0], 0, &AssignmentSelectors::default(), SITE)
                .unwrap();

        assert_eq!(case.name, "Test_1");
        assert_eq!(case.url, SITE);
        assert_eq!(case.assert_element, "[data-value=\"Essay 1\"]");
        assert_eq!(
            case.submission_window,
            SubmissionWindow::Open {
                minute: "05".into(),
                hour: "00".into()
            }
        );
        assert!(!case.show_description);
        assert!(!case.online_text_submission);
    }

    #[test]
    fn test_assignment_case_requires_credentials() {
        let cases = records("username,assignment_name,description\nteacher,A,B\n");
        let err =
            AssignmentCase::from_record(&cases.records[0], 0, &AssignmentSelectors::default(), SITE)
                .unwrap_err();
        assert!(matches!(err, E2eError::MissingField { ref field, .. } if field == "password"));
    }

    #[test]
    fn test_expect_empty_reports_anomalies() {
        let cases = records(
            "username,password,assignment_name,description,expect_empty\n\
             teacher,pw,,Some text,\"description, assignment_name\"\n",
        );
        let case =
            AssignmentCase::from_record(&cases.records[0], 0, &AssignmentSelectors::default(), SITE)
                .unwrap();
        assert_eq!(case.unexpected_values(), vec!["description"]);
    }

    #[test]
    fn test_format_case_from_default_command() {
        let cases = records("username,password,editor_content\nadmin,pw,Hello\n");
        let case = FormatCase::from_record(
            &cases.records[0],
            0,
            &EditorSelectors::default(),
            Some(FormatCommand::Italic),
            SITE,
        )
        .unwrap();

        assert_eq!(case.action.toolbar, "[data-mce-name=\"italic\"]");
        assert_eq!(case.assertion, "[data-id=\"id_s__summary\"] em");
        assert_eq!(case.action.link, None);
    }

    #[test]
    fn test_format_case_with_raw_toolbar_override() {
        let cases = records(
            "username,password,editor_content,style_button_selector,assert_element_sel\n\
             admin,pw,Hello,[data-mce-name=\"bold\"],[data-id=\"id_s__summary\"] strong\n",
        );
        let case =
            FormatCase::from_record(&cases.records[0], 0, &EditorSelectors::default(), None, SITE)
                .unwrap();
        assert_eq!(case.action.command, None);
        assert_eq!(case.action.toolbar, "[data-mce-name=\"bold\"]");
        assert_eq!(case.assertion, "[data-id=\"id_s__summary\"] strong");
    }

    #[test]
    fn test_format_case_link_needs_target() {
        let cases = records("username,password,editor_content,format\nadmin,pw,Hello,link\n");
        let err =
            FormatCase::from_record(&cases.records[0], 0, &EditorSelectors::default(), None, SITE)
                .unwrap_err();
        assert!(matches!(err, E2eError::MissingField { ref field, .. } if field == "link"));
    }

    #[test]
    fn test_format_case_unknown_command_names_line() {
        let cases = records("username,password,editor_content,format\nadmin,pw,Hello,blink\n");
        let err =
            FormatCase::from_record(&cases.records[0], 0, &EditorSelectors::default(), None, SITE)
                .unwrap_err();
        assert!(matches!(err, E2eError::InvalidField { line: 2, ref field, .. } if field == "format"));
    }

    #[test]
    fn test_format_case_without_any_command_fails() {
        let cases = records("username,password,editor_content\nadmin,pw,Hello\n");
        let err =
            FormatCase::from_record(&cases.records[0], 0, &EditorSelectors::default(), None, SITE)
                .unwrap_err();
        assert!(matches!(err, E2eError::MissingField { ref field, .. } if field == "format"));
    }

    #[test]
    fn test_plan_does_not_validate_skipped_rows() {
        let cases = records(
            "test_name,username,password,editor_content,format,_skip_\n\
             bold,admin,pw,Hello,bold,false\n\
             unfinished,admin,pw,Hello,,true\n\
             typo,,,,blink,true\n",
        );
        let planned = FormattingScenario::from_config(&HarnessConfig::default(), None)
            .plan(&cases)
            .unwrap();

        assert_eq!(planned.len(), 3);
        assert!(planned[0].case().is_some());
        assert!(matches!(&planned[1], Planned::Skip { name, line: 3 } if name == "unfinished"));
        assert!(matches!(&planned[2], Planned::Skip { line: 4, .. }));
    }

    #[test]
    fn test_plan_still_fails_on_active_rows() {
        let cases = records(
            "username,assignment_name,_skip_\n\
             teacher,Essay,true\n\
             teacher,Essay,false\n",
        );
        let err = AssignmentScenario::from_config(&HarnessConfig::default())
            .plan(&cases)
            .unwrap_err();
        assert!(matches!(err, E2eError::MissingField { line: 3, ref field } if field == "password"));
    }
}
