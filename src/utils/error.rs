use crate::domain::model::{Step, StepOutcome};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Environment creation failed: {outcome}")]
    EnvironmentSetupFailure { outcome: StepOutcome },

    #[error("Package installer upgrade failed: {outcome}")]
    DependencyToolFailure { outcome: StepOutcome },

    #[error("Dependency installation failed: {outcome}")]
    DependencyInstallFailure { outcome: StepOutcome },

    #[error("ETL job failed: {outcome}")]
    JobExecutionFailure { outcome: StepOutcome },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Configuration file not found: {path}")]
    MissingConfigError { path: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Environment,
    Dependencies,
    Job,
    Configuration,
    System,
}

pub type Result<T> = std::result::Result<T, BootstrapError>;

impl BootstrapError {
    /// 依照失敗步驟建立對應的錯誤
    pub fn step_failure(step: Step, outcome: StepOutcome) -> Self {
        match step {
            Step::CreateEnvironment => Self::EnvironmentSetupFailure { outcome },
            Step::UpgradeInstaller => Self::DependencyToolFailure { outcome },
            Step::InstallDependencies => Self::DependencyInstallFailure { outcome },
            Step::RunJob => Self::JobExecutionFailure { outcome },
        }
    }

    pub fn failed_step(&self) -> Option<Step> {
        match self {
            Self::EnvironmentSetupFailure { .. } => Some(Step::CreateEnvironment),
            Self::DependencyToolFailure { .. } => Some(Step::UpgradeInstaller),
            Self::DependencyInstallFailure { .. } => Some(Step::InstallDependencies),
            Self::JobExecutionFailure { .. } => Some(Step::RunJob),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&StepOutcome> {
        match self {
            Self::EnvironmentSetupFailure { outcome }
            | Self::DependencyToolFailure { outcome }
            | Self::DependencyInstallFailure { outcome }
            | Self::JobExecutionFailure { outcome } => Some(outcome),
            _ => None,
        }
    }

    /// 子程序的退出碼原樣傳遞，其餘錯誤一律為 1
    pub fn exit_code(&self) -> i32 {
        self.outcome().map(StepOutcome::exit_code).unwrap_or(1)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EnvironmentSetupFailure { .. } => ErrorCategory::Environment,
            Self::DependencyToolFailure { .. } | Self::DependencyInstallFailure { .. } => {
                ErrorCategory::Dependencies
            }
            Self::JobExecutionFailure { .. } => ErrorCategory::Job,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::EnvironmentSetupFailure { outcome } => {
                format!("Could not create the virtual environment ({})", outcome)
            }
            Self::DependencyToolFailure { outcome } => {
                format!("Could not upgrade pip inside the environment ({})", outcome)
            }
            Self::DependencyInstallFailure { outcome } => {
                format!("Could not install the requirements ({})", outcome)
            }
            Self::JobExecutionFailure { outcome } => {
                format!("The ETL job did not complete ({})", outcome)
            }
            Self::ConfigError { message } => format!("Configuration problem: {}", message),
            Self::ConfigValidationError { field, message } => {
                format!("Configuration field '{}' is invalid: {}", field, message)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            Self::MissingConfigError { path } => {
                format!("Configuration file '{}' does not exist", path)
            }
            Self::IoError(e) => format!("File system error: {}", e),
            Self::SerializationError(e) => format!("Could not serialize data: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::EnvironmentSetupFailure { .. } => {
                "Check that the base interpreter exists and ships the venv module (--python)"
            }
            Self::DependencyToolFailure { .. } => {
                "Check network access to the package index, or remove the environment directory and retry"
            }
            Self::DependencyInstallFailure { .. } => {
                "Check that the requirements file exists and every listed package can be resolved"
            }
            Self::JobExecutionFailure { .. } => {
                "Inspect the job output above; the job script path can be changed with --job"
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => "Fix the configuration file or command line flags",
            Self::MissingConfigError { .. } => {
                "Check the --config path, or omit it to use the built-in defaults"
            }
            Self::IoError(_) => "Check file permissions under the project root",
            Self::SerializationError(_) => "Check the report path and retry",
        }
    }
}
