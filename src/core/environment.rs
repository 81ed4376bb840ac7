use crate::domain::model::CommandSpec;
use crate::utils::error::Result;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

#[cfg(windows)]
const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const BIN_DIR: &str = "bin";

#[cfg(windows)]
const PYTHON_EXE: &str = "python.exe";
#[cfg(not(windows))]
const PYTHON_EXE: &str = "python";

/// 隔離環境目錄的位置與啟用方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualEnv {
    root: PathBuf,
}

impl VirtualEnv {
    pub fn new(project_root: &Path, path: &Path) -> Self {
        Self {
            root: project_root.join(path),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join(BIN_DIR)
    }

    pub fn python(&self) -> PathBuf {
        self.bin_dir().join(PYTHON_EXE)
    }

    /// Only an existing directory counts; a stray file at the path does not.
    pub async fn exists(&self) -> Result<bool> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// 模擬 `source bin/activate`：設定 VIRTUAL_ENV 並把 bin 目錄放到 PATH 最前面
    pub fn activate(&self, command: &mut CommandSpec) {
        command.set_env("VIRTUAL_ENV", self.root.as_os_str());
        command.set_env("PATH", self.search_path());
        command.remove_env("PYTHONHOME");
    }

    fn search_path(&self) -> OsString {
        prepend_search_path(self.bin_dir(), std::env::var_os("PATH").as_deref())
    }
}

/// Puts `bin_dir` in front of `inherited`. Entries that cannot be joined
/// (they contain the platform separator) are dropped one by one.
fn prepend_search_path(bin_dir: PathBuf, inherited: Option<&OsStr>) -> OsString {
    let mut dirs = vec![bin_dir];
    if let Some(current) = inherited {
        dirs.extend(std::env::split_paths(current));
    }

    dirs.retain(|dir| {
        let joinable = std::env::join_paths([dir]).is_ok();
        if !joinable {
            tracing::warn!("Skipping PATH entry that contains a separator: {}", dir.display());
        }
        joinable
    });

    std::env::join_paths(&dirs).unwrap_or_default()
}
