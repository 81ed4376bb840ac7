pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, LogFormat};

pub use adapters::process::TokioCommandExecutor;
pub use config::BootstrapConfig;
pub use crate::core::{environment::VirtualEnv, plan::BootstrapPlan, runner::BootstrapRunner};
pub use domain::model::{RunReport, RunState, Step, StepOutcome};
pub use utils::error::{BootstrapError, Result};
