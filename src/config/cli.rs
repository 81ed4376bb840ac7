use crate::config::toml_config::BootstrapConfig;
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "etl-bootstrap")]
#[command(about = "Prepare the Python environment and run the stock ETL job")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the environment, requirements and job paths are relative to
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Virtual environment directory
    #[arg(long)]
    pub venv: Option<PathBuf>,

    /// Base interpreter used to create the environment
    #[arg(long)]
    pub python: Option<String>,

    /// Requirements manifest
    #[arg(long)]
    pub requirements: Option<PathBuf>,

    /// Package index passed to pip as --index-url
    #[arg(long)]
    pub index_url: Option<String>,

    /// ETL job script
    #[arg(long)]
    pub job: Option<PathBuf>,

    /// Log per-step elapsed time and memory usage
    #[arg(long)]
    pub monitor: bool,

    /// Print the commands that would run, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 載入設定檔（若有指定），再套用命令列覆蓋
    pub fn load(&self) -> Result<BootstrapConfig> {
        let mut config = match &self.config {
            Some(path) => BootstrapConfig::from_file(path)?,
            None => BootstrapConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut BootstrapConfig) {
        if let Some(root) = &self.project_root {
            config.project_root = root.clone();
        }
        if let Some(venv) = &self.venv {
            config.environment.path = venv.clone();
        }
        if let Some(python) = &self.python {
            config.environment.python = python.clone();
        }
        if let Some(requirements) = &self.requirements {
            config.dependencies.requirements = requirements.clone();
        }
        if let Some(index_url) = &self.index_url {
            config.dependencies.index_url = Some(index_url.clone());
        }
        if let Some(job) = &self.job {
            config.job.script = job.clone();
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
    }
}
