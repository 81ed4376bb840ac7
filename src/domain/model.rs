use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Runner 狀態機
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Start,
    EnvCheck,
    EnvActivated,
    PipUpgraded,
    DepsInstalled,
    JobRunning,
    Success,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Success | RunState::Failed)
    }

    /// The only non-failure successor of each state.
    pub fn next(self) -> Option<RunState> {
        match self {
            RunState::Start => Some(RunState::EnvCheck),
            RunState::EnvCheck => Some(RunState::EnvActivated),
            RunState::EnvActivated => Some(RunState::PipUpgraded),
            RunState::PipUpgraded => Some(RunState::DepsInstalled),
            RunState::DepsInstalled => Some(RunState::JobRunning),
            RunState::JobRunning => Some(RunState::Success),
            RunState::Success | RunState::Failed => None,
        }
    }

    pub fn can_transition_to(self, target: RunState) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == RunState::Failed || self.next() == Some(target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    CreateEnvironment,
    UpgradeInstaller,
    InstallDependencies,
    RunJob,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::CreateEnvironment => "Creating virtual environment",
            Step::UpgradeInstaller => "Upgrading pip",
            Step::InstallDependencies => "Installing requirements",
            Step::RunJob => "Running ETL job",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One external command, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: PathBuf,
    pub envs: Vec<(OsString, OsString)>,
    pub env_removals: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: current_dir.into(),
            envs: Vec::new(),
            env_removals: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// 設定環境變數，同名者覆蓋
    pub fn set_env(&mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
        let key = key.as_ref().to_os_string();
        self.env_removals.retain(|k| k != &key);
        self.envs.retain(|(k, _)| k != &key);
        self.envs.push((key, value.as_ref().to_os_string()));
    }

    pub fn remove_env(&mut self, key: impl AsRef<OsStr>) {
        let key = key.as_ref().to_os_string();
        self.envs.retain(|(k, _)| k != &key);
        if !self.env_removals.contains(&key) {
            self.env_removals.push(key);
        }
    }

    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Shell-like rendering for logs and dry runs.
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in self.args_lossy() {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push_str(&format!("\"{}\"", arg));
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Exited(i32),
    Terminated(i32),
}

impl ProcessExit {
    pub fn success(self) -> bool {
        self == ProcessExit::Exited(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepOutcome {
    Exited { code: i32 },
    Terminated { signal: i32 },
    NotStarted { kind: String, reason: String },
}

impl StepOutcome {
    pub fn not_started(err: &io::Error) -> Self {
        StepOutcome::NotStarted {
            kind: format!("{:?}", err.kind()),
            reason: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Exited { code: 0 })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            StepOutcome::Exited { code } => *code,
            StepOutcome::Terminated { signal } => 128 + signal,
            StepOutcome::NotStarted { kind, .. } => match kind.as_str() {
                "NotFound" => 127,
                "PermissionDenied" => 126,
                _ => 1,
            },
        }
    }
}

impl From<ProcessExit> for StepOutcome {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Exited(code) => StepOutcome::Exited { code },
            ProcessExit::Terminated(signal) => StepOutcome::Terminated { signal },
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Exited { code } => write!(f, "exited with code {}", code),
            StepOutcome::Terminated { signal } => write!(f, "terminated by signal {}", signal),
            StepOutcome::NotStarted { reason, .. } => write!(f, "could not start: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub state: RunState,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,
    pub command: String,
    pub duration_ms: u64,
    pub outcome: StepOutcome,
}

/// Run report, written as JSON with `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub environment_created: bool,
    pub transitions: Vec<StateTransition>,
    pub steps: Vec<StepRecord>,
    pub final_state: RunState,
    pub exit_code: i32,
}

impl RunReport {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: None,
            environment_created: false,
            transitions: vec![StateTransition {
                state: RunState::Start,
                at: now,
            }],
            steps: Vec::new(),
            final_state: RunState::Start,
            exit_code: 0,
        }
    }

    pub fn states(&self) -> Vec<RunState> {
        self.transitions.iter().map(|t| t.state).collect()
    }

    pub fn executed_steps(&self) -> Vec<Step> {
        self.steps.iter().map(|s| s.step).collect()
    }

    pub fn to_json(&self) -> crate::utils::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
