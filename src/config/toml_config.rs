use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BootstrapError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[cfg(windows)]
pub const DEFAULT_PYTHON: &str = "python";
#[cfg(not(windows))]
pub const DEFAULT_PYTHON: &str = "python3";

pub const DEFAULT_VENV: &str = ".venv";
pub const DEFAULT_REQUIREMENTS: &str = "requirements.txt";
pub const DEFAULT_JOB_SCRIPT: &str = "batch_jobs/stock_etl.py";

/// Runner 設定；所有欄位皆有預設值，預設即原本腳本的固定路徑
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub project_root: PathBuf,
    pub environment: EnvironmentConfig,
    pub dependencies: DependenciesConfig,
    pub job: JobConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub path: PathBuf,
    pub python: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DependenciesConfig {
    pub requirements: PathBuf,
    pub index_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub script: PathBuf,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            environment: EnvironmentConfig::default(),
            dependencies: DependenciesConfig::default(),
            job: JobConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_VENV),
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            requirements: PathBuf::from(DEFAULT_REQUIREMENTS),
            index_url: None,
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            script: PathBuf::from(DEFAULT_JOB_SCRIPT),
            env: BTreeMap::new(),
        }
    }
}

impl BootstrapConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BootstrapError::MissingConfigError {
                path: path.display().to_string(),
            },
            _ => BootstrapError::IoError(e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| BootstrapError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PIP_INDEX_URL})，未定義者保留原樣
    fn substitute_env_vars(content: &str) -> String {
        static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_existing_dir("project_root", &self.project_root)?;
        validation::validate_path("environment.path", &self.environment.path)?;
        validation::validate_non_empty_string("environment.python", &self.environment.python)?;
        validation::validate_path("dependencies.requirements", &self.dependencies.requirements)?;
        validation::validate_path("job.script", &self.job.script)?;

        if let Some(index_url) = &self.dependencies.index_url {
            validation::validate_url("dependencies.index_url", index_url)?;
        }

        for key in self.job.env.keys() {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                return Err(BootstrapError::InvalidConfigValueError {
                    field: "job.env".to_string(),
                    value: key.clone(),
                    reason: "Environment variable names cannot be empty or contain '=' or NUL"
                        .to_string(),
                });
            }
        }

        Ok(())
    }
}

impl ConfigProvider for BootstrapConfig {
    fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn venv_path(&self) -> &Path {
        &self.environment.path
    }

    fn python(&self) -> &str {
        &self.environment.python
    }

    fn requirements(&self) -> &Path {
        &self.dependencies.requirements
    }

    fn index_url(&self) -> Option<&str> {
        self.dependencies.index_url.as_deref()
    }

    fn job_script(&self) -> &Path {
        &self.job.script
    }

    fn job_env(&self) -> &BTreeMap<String, String> {
        &self.job.env
    }
}

impl Validate for BootstrapConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
