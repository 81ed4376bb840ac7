pub mod environment;
pub mod plan;
pub mod runner;

pub use crate::domain::model::{CommandSpec, ProcessExit, RunReport, RunState, Step, StepOutcome};
pub use crate::domain::ports::{CommandExecutor, ConfigProvider};
pub use crate::utils::error::Result;
