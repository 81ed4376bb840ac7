use crate::domain::model::{CommandSpec, ProcessExit};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// Runs one external command to completion.
///
/// Spawn failures come back as `Err`; any process that actually started
/// yields a `ProcessExit`, successful or not.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &CommandSpec) -> std::io::Result<ProcessExit>;
}

pub trait ConfigProvider: Send + Sync {
    fn project_root(&self) -> &Path;
    fn venv_path(&self) -> &Path;
    fn python(&self) -> &str;
    fn requirements(&self) -> &Path;
    fn index_url(&self) -> Option<&str>;
    fn job_script(&self) -> &Path;
    fn job_env(&self) -> &BTreeMap<String, String>;
}
