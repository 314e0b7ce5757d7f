//! Selector bundles and toolbar action targets
//!
//! Each scenario family owns a bundle of default selectors. A record may
//! override any of them through `<slot>_sel` columns; the override applies
//! to that record only; the next record starts again from the defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cases::CaseRecord;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

/// Named selectors overridable from case-file columns
pub trait SelectorBundle: Clone {
    /// Selector columns read per record that are not bundle slots
    const RECORD_COLUMNS: &'static [&'static str];

    /// The slot a column overrides, if any
    fn slot_mut(&mut self, column: &str) -> Option<&mut String>;

    /// Copy of `self` with the record's non-empty overrides applied.
    ///
    /// Fails on a `*_sel` column that is neither a slot nor a known
    /// per-record selector.
    fn merged_with(&self, record: &CaseRecord) -> E2eResult<Self> {
        let mut merged = self.clone();
        for column in record.columns() {
            match merged.slot_mut(column) {
                Some(slot) => {
                    if let Some(value) = record.non_empty_text(column) {
                        *slot = value;
                    }
                }
                None if column.ends_with("_sel")
                    && !Self::RECORD_COLUMNS.iter().any(|c| *c == column) =>
                {
                    return Err(E2eError::UnknownSelectorColumn {
                        line: record.line,
                        column: column.to_string(),
                    });
                }
                None => {}
            }
        }
        Ok(merged)
    }
}

pub fn loc(selector: &str) -> Locator {
    Locator::parse(selector)
}

/// Login form and user menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSelectors {
    pub login_entry: String,
    pub username: String,
    pub password: String,
    pub login_button: String,
    /// Marker that only appears once logged in
    pub logged_in_marker: String,
    pub user_menu_toggle: String,
    pub action_menu_toggle: String,
    pub logout_link: String,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            login_entry: ".usermenu .login a".to_string(),
            username: "#username".to_string(),
            password: "#password".to_string(),
            login_button: "#loginbtn".to_string(),
            logged_in_marker: ".userinitials".to_string(),
            user_menu_toggle: "#user-menu-toggle".to_string(),
            action_menu_toggle: "#action-menu-toggle-0".to_string(),
            logout_link: "a:contains('Log out')".to_string(),
        }
    }
}

impl LoginSelectors {
    fn slot(&mut self, column: &str) -> Option<&mut String> {
        Some(match column {
            "login_entry_sel" => &mut self.login_entry,
            "username_sel" => &mut self.username,
            "password_sel" => &mut self.password,
            "login_btn_sel" => &mut self.login_button,
            "logged_in_marker_sel" => &mut self.logged_in_marker,
            _ => return None,
        })
    }
}

/// Course page and assignment form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentSelectors {
    pub login: LoginSelectors,
    pub edit_mode_toggle: String,
    pub add_activity: String,
    pub assignment_option: String,
    pub assignment_name: String,
    pub description: String,
    pub show_description: String,
    pub allow_submissions_from: String,
    pub calendar_day: String,
    pub submissions_from_minute: String,
    pub submissions_from_hour: String,
    pub allow_submissions_enabled: String,
    pub enable_online_text_submission: String,
    pub submit: String,
}

impl Default for AssignmentSelectors {
    fn default() -> Self {
        Self {
            login: LoginSelectors::default(),
            edit_mode_toggle: ".custom-switch".to_string(),
            add_activity: ".activity-add-text".to_string(),
            assignment_option:
                "//div[contains(@class, 'optionname') and contains(text(), 'Assignment')]"
                    .to_string(),
            assignment_name: "#id_name".to_string(),
            description: "#tinymce".to_string(),
            show_description: "#id_showdescription".to_string(),
            allow_submissions_from: "#id_allowsubmissionsfromdate_calendar .icon".to_string(),
            calendar_day: ".yui3-calendar-row:nth-of-type(2) :last-child".to_string(),
            submissions_from_minute: "#id_allowsubmissionsfromdate_minute".to_string(),
            submissions_from_hour: "#id_allowsubmissionsfromdate_hour".to_string(),
            allow_submissions_enabled: "#id_allowsubmissionsfromdate_enabled".to_string(),
            enable_online_text_submission: "#id_assignsubmission_onlinetext_enabled".to_string(),
            submit: "#id_submitbutton2".to_string(),
        }
    }
}

impl SelectorBundle for AssignmentSelectors {
    const RECORD_COLUMNS: &'static [&'static str] = &[
        "assert_element_sel",
        "assert_allow_submissions_from_sel",
        "online_text_submission_sel",
        "online_text_submission_absent_sel",
    ];

    fn slot_mut(&mut self, column: &str) -> Option<&mut String> {
        if let Some(slot) = self.login.slot(column) {
            return Some(slot);
        }
        Some(match column {
            "assignment_name_sel" => &mut self.assignment_name,
            "description_sel" => &mut self.description,
            "show_description_sel" => &mut self.show_description,
            "allow_submissions_from_sel" => &mut self.allow_submissions_from,
            "calendar_day_sel" => &mut self.calendar_day,
            "submissions_from_minute_sel" => &mut self.submissions_from_minute,
            "submissions_from_hour_sel" => &mut self.submissions_from_hour,
            "allow_submissions_enabled_sel" => &mut self.allow_submissions_enabled,
            "enable_online_text_submission_sel" => &mut self.enable_online_text_submission,
            "submit_sel" => &mut self.submit,
            _ => return None,
        })
    }
}

/// Site settings page hosting the rich-text editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSelectors {
    pub login: LoginSelectors,
    pub settings_link: String,
    /// Editable body inside the editor frame
    pub editor_body: String,
    /// Root that verification selectors are scoped to
    pub editor_root: String,
    pub link_url_entry: String,
    pub link_dialog_submit: String,
}

impl Default for EditorSelectors {
    fn default() -> Self {
        Self {
            login: LoginSelectors::default(),
            settings_link: "a:contains('Settings')".to_string(),
            editor_body: "#tinymce".to_string(),
            editor_root: "[data-id=\"id_s__summary\"]".to_string(),
            link_url_entry: "#id_s__summary_tiny_link_urlentry".to_string(),
            link_dialog_submit: ".modal-footer > .btn".to_string(),
        }
    }
}

impl SelectorBundle for EditorSelectors {
    const RECORD_COLUMNS: &'static [&'static str] = &["assert_element_sel"];

    fn slot_mut(&mut self, column: &str) -> Option<&mut String> {
        if let Some(slot) = self.login.slot(column) {
            return Some(slot);
        }
        Some(match column {
            "settings_link_sel" => &mut self.settings_link,
            "editor_body_sel" => &mut self.editor_body,
            "editor_root_sel" => &mut self.editor_root,
            "link_url_entry_sel" => &mut self.link_url_entry,
            "link_dialog_submit_sel" => &mut self.link_dialog_submit,
            _ => return None,
        })
    }
}

/// Course listing and the new-course form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseSelectors {
    pub my_courses: String,
    pub new_course: String,
    pub full_name: String,
    pub short_name: String,
    pub id_number: String,
    pub save_and_display: String,
    pub home: String,
}

impl Default for CourseSelectors {
    fn default() -> Self {
        Self {
            my_courses: "a:contains(\"My courses\")".to_string(),
            new_course: "[id=\"action_bar\"] .btn-primary".to_string(),
            full_name: "#id_fullname".to_string(),
            short_name: "#id_shortname".to_string(),
            id_number: "#id_idnumber".to_string(),
            save_and_display: "#id_saveanddisplay".to_string(),
            home: "[data-key=\"home\"]".to_string(),
        }
    }
}

/// Editor toolbar commands the harness knows how to apply and verify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatCommand {
    Italic,
    Bold,
    AlignCenter,
    AlignRight,
    BulletList,
    NumberList,
    IndentIncrease,
    Link,
}

impl FormatCommand {
    pub const ALL: [FormatCommand; 8] = [
        FormatCommand::Italic,
        FormatCommand::Bold,
        FormatCommand::AlignCenter,
        FormatCommand::AlignRight,
        FormatCommand::BulletList,
        FormatCommand::NumberList,
        FormatCommand::IndentIncrease,
        FormatCommand::Link,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FormatCommand::Italic => "italic",
            FormatCommand::Bold => "bold",
            FormatCommand::AlignCenter => "align_center",
            FormatCommand::AlignRight => "align_right",
            FormatCommand::BulletList => "bullet_list",
            FormatCommand::NumberList => "number_list",
            FormatCommand::IndentIncrease => "indent_increase",
            FormatCommand::Link => "link",
        }
    }

    /// Toolbar button identifier used by the editor
    pub fn toolbar_name(self) -> &'static str {
        match self {
            FormatCommand::Italic => "italic",
            FormatCommand::Bold => "bold",
            FormatCommand::AlignCenter => "aligncenter",
            FormatCommand::AlignRight => "alignright",
            FormatCommand::BulletList => "bullist",
            FormatCommand::NumberList => "numlist",
            FormatCommand::IndentIncrease => "indent",
            FormatCommand::Link => "tiny_link_link",
        }
    }

    pub fn toolbar_selector(self) -> String {
        format!("[data-mce-name=\"{}\"]", self.toolbar_name())
    }

    /// Markup expected under `root` once the command has been applied
    pub fn expected_markup(self, root: &str, link: Option<&str>) -> String {
        match self {
            FormatCommand::Italic => format!("{} em", root),
            FormatCommand::Bold => format!("{} strong", root),
            FormatCommand::AlignCenter => format!("{} > [style*=\"text-align: center;\"]", root),
            FormatCommand::AlignRight => format!("{} > [style*=\"text-align: right;\"]", root),
            FormatCommand::BulletList => format!("{} ul li", root),
            FormatCommand::NumberList => format!("{} ol li", root),
            FormatCommand::IndentIncrease => format!("{} > [style*=\"padding-left: 40px;\"]", root),
            FormatCommand::Link => format!("{} a[href=\"{}\"]", root, link.unwrap_or_default()),
        }
    }
}

impl fmt::Display for FormatCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatCommand {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        FormatCommand::ALL
            .into_iter()
            .find(|c| c.name() == wanted || c.toolbar_name() == wanted)
            .ok_or_else(|| E2eError::UnknownFormatCommand(s.to_string()))
    }
}
