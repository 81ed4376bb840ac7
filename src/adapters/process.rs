use crate::domain::model::{CommandSpec, ProcessExit};
use crate::domain::ports::CommandExecutor;
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// Spawns real child processes. Stdio is inherited so the tools' own
/// output and errors reach the terminal unchanged.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandExecutor;

impl TokioCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for TokioCommandExecutor {
    async fn execute(&self, spec: &CommandSpec) -> std::io::Result<ProcessExit> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.current_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        for key in &spec.env_removals {
            command.env_remove(key);
        }
        command.envs(spec.envs.iter().map(|(k, v)| (k, v)));

        let status = command.status().await?;
        Ok(to_process_exit(status))
    }
}

fn to_process_exit(status: ExitStatus) -> ProcessExit {
    if let Some(code) = status.code() {
        return ProcessExit::Exited(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ProcessExit::Terminated(signal);
        }
    }

    ProcessExit::Exited(1)
}
