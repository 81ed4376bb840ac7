#![cfg(unix)]

use etl_bootstrap::{
    BootstrapConfig, BootstrapError, BootstrapPlan, BootstrapRunner, RunState,
    TokioCommandExecutor,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Stand-in interpreter: `-m venv DIR` copies itself into DIR/bin/python,
/// `-m pip ...` succeeds unless `-r` names a missing file, and anything
/// else runs the given script with sh. Every invocation is appended to the
/// trace file.
fn write_stub_python(dir: &Path, trace: &Path) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
echo "$*" >> "{trace}"
if [ "$1" = "-m" ] && [ "$2" = "venv" ]; then
  mkdir -p "$3/bin" && cp "$0" "$3/bin/python" && chmod +x "$3/bin/python"
  exit $?
fi
if [ "$1" = "-m" ] && [ "$2" = "pip" ]; then
  if [ "$4" = "-r" ] && [ ! -f "$5" ]; then
    echo "ERROR: Could not open requirements file: $5" >&2
    exit 1
  fi
  exit 0
fi
exec /bin/sh "$1"
"#,
        trace = trace.display()
    );

    let path = dir.join("stub-python");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

struct Project {
    dir: TempDir,
    trace: PathBuf,
    python: PathBuf,
}

impl Project {
    fn new(job_body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let tools = dir.path().join("tools");
        std::fs::create_dir(&tools).unwrap();
        let trace = dir.path().join("trace.log");
        let python = write_stub_python(&tools, &trace);

        std::fs::write(dir.path().join("requirements.txt"), "pandas\n").unwrap();
        std::fs::create_dir(dir.path().join("batch_jobs")).unwrap();
        std::fs::write(dir.path().join("batch_jobs/stock_etl.py"), job_body).unwrap();

        Self { dir, trace, python }
    }

    fn config(&self) -> BootstrapConfig {
        let mut config = BootstrapConfig::default();
        config.project_root = self.dir.path().to_path_buf();
        config.environment.python = self.python.to_str().unwrap().to_string();
        config
    }

    fn trace_lines(&self) -> Vec<String> {
        std::fs::read_to_string(&self.trace)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

async fn run(project: &Project) -> (etl_bootstrap::RunReport, etl_bootstrap::Result<()>) {
    let plan = BootstrapPlan::from_config(&project.config()).unwrap();
    BootstrapRunner::new(TokioCommandExecutor::new(), plan)
        .run_with_report()
        .await
}

#[tokio::test]
async fn test_full_run_with_real_processes() {
    let project = Project::new("exit 0\n");

    let (report, result) = run(&project).await;

    assert!(result.is_ok(), "run failed: {:?}", result);
    assert_eq!(report.final_state, RunState::Success);
    assert!(project.dir.path().join(".venv/bin/python").is_file());
    assert_eq!(
        project.trace_lines(),
        vec![
            "-m venv .venv",
            "-m pip install --upgrade pip",
            "-m pip install -r requirements.txt",
            "batch_jobs/stock_etl.py",
        ]
    );
}

#[tokio::test]
async fn test_job_runs_inside_activated_environment() {
    let project = Project::new(
        r#"[ -n "$VIRTUAL_ENV" ] || exit 90
case "$PATH" in
  "$VIRTUAL_ENV/bin":*) exit 0 ;;
  *) exit 91 ;;
esac
"#,
    );

    let (report, result) = run(&project).await;
    assert!(result.is_ok(), "job saw wrong environment: {:?}", result);
    assert_eq!(report.exit_code, 0);
}

#[tokio::test]
async fn test_missing_manifest_aborts_before_job() {
    let project = Project::new("exit 0\n");
    std::fs::remove_file(project.dir.path().join("requirements.txt")).unwrap();

    let (report, result) = run(&project).await;

    let err = result.unwrap_err();
    assert!(matches!(err, BootstrapError::DependencyInstallFailure { .. }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(report.exit_code, 1);
    assert!(!project
        .trace_lines()
        .iter()
        .any(|line| line.contains("stock_etl")));
}

#[tokio::test]
async fn test_job_failure_code_propagates() {
    let project = Project::new("exit 3\n");

    let (report, result) = run(&project).await;

    assert!(matches!(
        result,
        Err(BootstrapError::JobExecutionFailure { .. })
    ));
    assert_eq!(report.exit_code, 3);
}

#[tokio::test]
async fn test_missing_base_interpreter() {
    let project = Project::new("exit 0\n");
    let mut config = project.config();
    config.environment.python = "/nonexistent/python3".to_string();

    let runner = BootstrapRunner::new(
        TokioCommandExecutor::new(),
        BootstrapPlan::from_config(&config).unwrap(),
    );
    let err = runner.run().await.unwrap_err();

    assert!(matches!(err, BootstrapError::EnvironmentSetupFailure { .. }));
    assert_eq!(err.exit_code(), 127);
}

#[test]
fn test_binary_exit_code_matches_job() {
    let project = Project::new("exit 5\n");

    let status = Command::new(env!("CARGO_BIN_EXE_etl-bootstrap"))
        .arg("--project-root")
        .arg(project.dir.path())
        .arg("--python")
        .arg(&project.python)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(5));
}

#[test]
fn test_binary_with_relative_project_root() {
    let project = Project::new(
        r#"case "$VIRTUAL_ENV" in
  /*) exit 0 ;;
  *) exit 92 ;;
esac
"#,
    );
    let parent = project.dir.path().parent().unwrap();
    let relative_root = project.dir.path().file_name().unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_etl-bootstrap"))
        .current_dir(parent)
        .arg("--project-root")
        .arg(relative_root)
        .arg("--python")
        .arg(&project.python)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(project.dir.path().join(".venv/bin/python").is_file());
    assert_eq!(project.trace_lines().len(), 4);
}

#[test]
fn test_binary_writes_report() {
    let project = Project::new("exit 0\n");
    let report_path = project.dir.path().join("reports/run.json");

    let status = Command::new(env!("CARGO_BIN_EXE_etl-bootstrap"))
        .arg("--project-root")
        .arg(project.dir.path())
        .arg("--python")
        .arg(&project.python)
        .arg("--report")
        .arg(&report_path)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["final_state"], "Success");
    assert_eq!(report["environment_created"], true);
}

#[test]
fn test_binary_dry_run_executes_nothing() {
    let project = Project::new("exit 0\n");

    let output = Command::new(env!("CARGO_BIN_EXE_etl-bootstrap"))
        .arg("--project-root")
        .arg(project.dir.path())
        .arg("--python")
        .arg(&project.python)
        .arg("--dry-run")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("-m venv .venv"));
    assert!(stdout.contains("batch_jobs/stock_etl.py"));
    assert!(project.trace_lines().is_empty());
    assert!(!project.dir.path().join(".venv").exists());
}

#[test]
fn test_binary_rejects_invalid_config() {
    let project = Project::new("exit 0\n");

    let status = Command::new(env!("CARGO_BIN_EXE_etl-bootstrap"))
        .arg("--project-root")
        .arg(project.dir.path())
        .arg("--index-url")
        .arg("ftp://mirror.example.com")
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(project.trace_lines().is_empty());
}
