//! The dbt sequence against a stand-in `dbt` executable

#![cfg(unix)]

use pretty_assertions::assert_eq;
use shopqa_core::{Config, DbtConfig};
use shopqa_transform::{DbtStep, ProcessRunner, TransformError, Transformer};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

const FAKE_DBT: &str = r#"#!/bin/sh
echo "$* profiles=$DBT_PROFILES_DIR account=$SNOWFLAKE_ACCOUNT" >> "$PWD/calls.log"
case "$*" in
  "test --models mart.*")
    echo "Failure in test not_null_daily_metrics_metric_date" >&2
    exit 1
    ;;
esac
echo "Completed successfully"
"#;

fn config(root: &Path, executable: &str) -> Config {
    Config {
        project_root: root.to_path_buf(),
        dbt: DbtConfig {
            executable: executable.to_string(),
            ..DbtConfig::default()
        },
        ..Config::default()
    }
}

#[tokio::test]
async fn steps_run_in_project_dir_until_the_first_failure() {
    let root = tempfile::tempdir().unwrap();
    let project = root.path().join("dbt");
    std::fs::create_dir_all(&project).unwrap();

    let script = root.path().join("fake-dbt");
    std::fs::write(&script, FAKE_DBT).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let transformer = Transformer::from_config(&config(root.path(), &script.display().to_string()), Arc::new(ProcessRunner))
        .with_env("SNOWFLAKE_ACCOUNT", "xy12345");

    let err = transformer.run_all().await.unwrap_err();
    assert_eq!(err.step(), DbtStep::TestMart);
    assert!(err.to_string().ends_with("Failure in test not_null_daily_metrics_metric_date"));

    let calls = std::fs::read_to_string(project.join("calls.log")).unwrap();
    let lines: Vec<&str> = calls.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[1],
        format!("run --models staging.* profiles={} account=xy12345", project.display())
    );
}

#[tokio::test]
async fn missing_executable_is_a_spawn_error() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("dbt")).unwrap();

    let transformer = Transformer::from_config(
        &config(root.path(), "/nonexistent/bin/dbt"),
        Arc::new(ProcessRunner),
    );
    let err = transformer.run_step(DbtStep::Deps).await.unwrap_err();
    assert!(matches!(err, TransformError::Spawn { step: DbtStep::Deps, .. }));
}
