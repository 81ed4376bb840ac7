use crate::core::plan::BootstrapPlan;
use crate::domain::model::{RunReport, RunState, StateTransition, Step, StepOutcome, StepRecord};
use crate::domain::ports::CommandExecutor;
use crate::utils::error::{BootstrapError, Result};
use crate::utils::monitor::SystemMonitor;
use chrono::Utc;
use std::time::Instant;

/// 依序執行：檢查環境 → 啟用 → 升級 pip → 安裝依賴 → 執行 ETL job
///
/// Every step is fatal and never retried; the first failure ends the run.
pub struct BootstrapRunner<E: CommandExecutor> {
    executor: E,
    plan: BootstrapPlan,
    monitor: SystemMonitor,
}

impl<E: CommandExecutor> BootstrapRunner<E> {
    pub fn new(executor: E, plan: BootstrapPlan) -> Self {
        Self::new_with_monitoring(executor, plan, false)
    }

    pub fn new_with_monitoring(executor: E, plan: BootstrapPlan, monitor_enabled: bool) -> Self {
        Self {
            executor,
            plan,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn plan(&self) -> &BootstrapPlan {
        &self.plan
    }

    pub async fn run(&self) -> Result<RunReport> {
        let (report, result) = self.run_with_report().await;
        result.map(|_| report)
    }

    /// Runs the sequence and always returns the report, even when a step failed.
    pub async fn run_with_report(&self) -> (RunReport, Result<()>) {
        let mut report = RunReport::new();
        let result = self.execute_steps(&mut report).await;

        match &result {
            Ok(()) => {
                report.exit_code = 0;
            }
            Err(e) => {
                transition(&mut report, RunState::Failed);
                report.exit_code = e.exit_code();
                tracing::error!(
                    "❌ Bootstrap failed in state {:?}: {} (exit code {})",
                    report.transitions[report.transitions.len() - 2].state,
                    e,
                    report.exit_code
                );
            }
        }
        report.finished_at = Some(Utc::now());
        self.monitor.log_final_stats();

        (report, result)
    }

    async fn execute_steps(&self, report: &mut RunReport) -> Result<()> {
        transition(report, RunState::EnvCheck);
        let venv = &self.plan.venv;
        println!("Checking virtual environment at {}...", venv.root().display());

        if venv.exists().await? {
            tracing::info!("Virtual environment already present, skipping creation");
        } else {
            self.run_step(Step::CreateEnvironment, report).await?;
            report.environment_created = true;
        }

        println!("Activating virtual environment...");
        tracing::debug!("Environment interpreter: {}", venv.python().display());
        transition(report, RunState::EnvActivated);

        self.run_step(Step::UpgradeInstaller, report).await?;
        transition(report, RunState::PipUpgraded);

        self.run_step(Step::InstallDependencies, report).await?;
        transition(report, RunState::DepsInstalled);

        transition(report, RunState::JobRunning);
        self.run_step(Step::RunJob, report).await?;
        transition(report, RunState::Success);

        Ok(())
    }

    async fn run_step(&self, step: Step, report: &mut RunReport) -> Result<()> {
        let command = self.plan.command(step);
        println!("{}...", step);
        tracing::info!("▶ {}: {}", step, command.display_line());

        let started = Instant::now();
        let outcome = match self.executor.execute(command).await {
            Ok(exit) => StepOutcome::from(exit),
            Err(e) => StepOutcome::not_started(&e),
        };
        let elapsed = started.elapsed();

        report.steps.push(StepRecord {
            step,
            command: command.display_line(),
            duration_ms: elapsed.as_millis() as u64,
            outcome: outcome.clone(),
        });
        self.monitor.log_stats(step.label());
        tracing::debug!("{} finished in {:?}: {}", step, elapsed, outcome);

        if outcome.is_success() {
            Ok(())
        } else {
            Err(BootstrapError::step_failure(step, outcome))
        }
    }
}

fn transition(report: &mut RunReport, state: RunState) {
    debug_assert!(
        report.final_state.can_transition_to(state),
        "illegal transition {:?} -> {:?}",
        report.final_state,
        state
    );
    tracing::debug!("State: {:?} -> {:?}", report.final_state, state);
    report.final_state = state;
    report.transitions.push(StateTransition {
        state,
        at: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BootstrapConfig;
    use crate::domain::model::{CommandSpec, ProcessExit};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Returns a fixed exit per step and creates the venv directory when asked to.
    struct MockExecutor {
        exits: Vec<(&'static str, ProcessExit)>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl MockExecutor {
        fn new(exits: Vec<(&'static str, ProcessExit)>) -> Self {
            Self {
                exits,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandExecutor for MockExecutor {
        async fn execute(&self, command: &CommandSpec) -> std::io::Result<ProcessExit> {
            self.calls.lock().unwrap().push(command.clone());
            let line = command.display_line();
            if line.contains("-m venv") {
                let target = command.current_dir.join(&command.args[2]);
                std::fs::create_dir_all(target)?;
            }
            Ok(self
                .exits
                .iter()
                .find(|(needle, _)| line.contains(needle))
                .map(|(_, exit)| *exit)
                .unwrap_or(ProcessExit::Exited(0)))
        }
    }

    fn plan_in(dir: &TempDir) -> BootstrapPlan {
        let mut config = BootstrapConfig::default();
        config.project_root = dir.path().to_path_buf();
        BootstrapPlan::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_success_walks_every_state() {
        let temp_dir = TempDir::new().unwrap();
        let runner = BootstrapRunner::new(MockExecutor::new(vec![]), plan_in(&temp_dir));

        let report = runner.run().await.unwrap();
        assert_eq!(
            report.states(),
            vec![
                RunState::Start,
                RunState::EnvCheck,
                RunState::EnvActivated,
                RunState::PipUpgraded,
                RunState::DepsInstalled,
                RunState::JobRunning,
                RunState::Success,
            ]
        );
        assert!(report.environment_created);
        assert_eq!(report.exit_code, 0);
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_records_failed_state() {
        let temp_dir = TempDir::new().unwrap();
        let executor = MockExecutor::new(vec![("--upgrade", ProcessExit::Exited(4))]);
        let runner = BootstrapRunner::new(executor, plan_in(&temp_dir));

        let (report, result) = runner.run_with_report().await;
        assert!(matches!(
            result,
            Err(BootstrapError::DependencyToolFailure { .. })
        ));
        assert_eq!(report.final_state, RunState::Failed);
        assert_eq!(report.exit_code, 4);
        assert_eq!(
            report.states(),
            vec![
                RunState::Start,
                RunState::EnvCheck,
                RunState::EnvActivated,
                RunState::Failed,
            ]
        );
        assert_eq!(runner.executor.calls.lock().unwrap().len(), 2);
    }
}
