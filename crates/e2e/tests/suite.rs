//! Suite runner isolation and results output

mod common;

use common::{ScriptedConnector, ScriptedDriver};
use lms_e2e::selectors::FormatCommand;
use lms_e2e::{HarnessConfig, ScenarioId, SuiteRunner};

fn runner_in(dir: &std::path::Path) -> SuiteRunner {
    let config = HarnessConfig {
        cases_dir: dir.join("cases"),
        output_dir: dir.join("out"),
        ..HarnessConfig::default()
    };
    std::fs::create_dir_all(&config.cases_dir).unwrap();
    SuiteRunner::new(config)
}

#[tokio::test(start_paused = true)]
async fn test_failing_scenarios_do_not_affect_others() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_in(dir.path());
    let cases = &runner.config().cases_dir;

    std::fs::write(
        cases.join("test_bold.csv"),
        "username,password,editor_content\nadmin,pw,Hello\nadmin,pw,World\n",
    )
    .unwrap();
    // Second data row is short a field
    std::fs::write(
        cases.join("test_italic.csv"),
        "username,password,editor_content\nadmin,pw,Hello\nadmin,pw\n",
    )
    .unwrap();
    std::fs::write(
        cases.join("test_number_list.csv"),
        "username,password,editor_content\nadmin,pw,Hello\n",
    )
    .unwrap();

    let connector = ScriptedConnector::new(|| {
        ScriptedDriver::new().with_count("[data-id=\"id_s__summary\"] ol li", &[0])
    });
    let ids = [
        ScenarioId::Format(FormatCommand::Italic),
        ScenarioId::Format(FormatCommand::NumberList),
        ScenarioId::Format(FormatCommand::Link),
        ScenarioId::Format(FormatCommand::Bold),
    ];

    let suite = runner.run_suite(&connector, &ids).await;

    assert_eq!((suite.total, suite.passed, suite.failed), (4, 1, 3));
    assert!(!suite.success());

    let italic = &suite.results[0];
    assert!(!italic.success);
    assert!(italic.error.as_deref().unwrap().contains("line 3"));

    let number_list = &suite.results[1];
    assert_eq!(
        number_list.error.as_deref(),
        Some("Element with selector '[data-id=\"id_s__summary\"] ol li' not found after 3 retries")
    );

    // No case file for the link scenario
    assert!(suite.results[2].error.is_some());

    let bold = &suite.results[3];
    assert!(bold.success);
    assert_eq!(bold.report.as_ref().unwrap().executed, 2);

    assert_eq!(connector.connects(), 4);
    assert_eq!(connector.releases(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_results_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_in(dir.path());
    std::fs::write(
        runner.config().cases_dir.join("test_editor_style.csv"),
        "username,password,editor_content,format,_skip_\n\
         admin,pw,Hello,align_center,\n\
         admin,pw,Hello,align_right,true\n",
    )
    .unwrap();

    let connector = ScriptedConnector::new(ScriptedDriver::new);
    let suite = runner
        .run_suite(&connector, &[ScenarioId::EditorStyle])
        .await;
    let path = runner.write_results(&suite).unwrap();

    assert_eq!(path, dir.path().join("out").join("test-results.json"));
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["passed"], 1);
    assert_eq!(json["failed"], 0);
    assert!(json["started_at"].is_string());

    let result = &json["results"][0];
    assert_eq!(result["name"], "editor_style");
    assert_eq!(result["report"]["executed"], 1);
    assert_eq!(result["report"]["skipped"], 1);
    assert_eq!(result["report"]["cases"][1]["status"], "skipped");
}
