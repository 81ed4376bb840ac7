use crate::core::environment::VirtualEnv;
use crate::domain::model::{CommandSpec, Step};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;

/// 四個外部命令，依執行順序排列
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    pub venv: VirtualEnv,
    pub create_environment: CommandSpec,
    pub upgrade_installer: CommandSpec,
    pub install_dependencies: CommandSpec,
    pub run_job: CommandSpec,
}

impl BootstrapPlan {
    /// The project root is made absolute here, so the environment paths,
    /// `VIRTUAL_ENV` and every working directory agree no matter where the
    /// runner was started from.
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let root = &std::path::absolute(config.project_root())?;
        let venv = VirtualEnv::new(root, config.venv_path());
        let venv_python = venv.python();

        let create_environment = CommandSpec::new(config.python(), root)
            .args(["-m", "venv"])
            .arg(config.venv_path());

        let mut upgrade_installer = CommandSpec::new(&venv_python, root)
            .args(["-m", "pip", "install", "--upgrade", "pip"]);

        let mut install_dependencies = CommandSpec::new(&venv_python, root)
            .args(["-m", "pip", "install", "-r"])
            .arg(config.requirements());

        if let Some(index_url) = config.index_url() {
            upgrade_installer = upgrade_installer.args(["--index-url", index_url]);
            install_dependencies = install_dependencies.args(["--index-url", index_url]);
        }

        let mut run_job = CommandSpec::new(&venv_python, root).arg(config.job_script());

        venv.activate(&mut upgrade_installer);
        venv.activate(&mut install_dependencies);
        venv.activate(&mut run_job);

        for (key, value) in config.job_env() {
            run_job.set_env(key, value);
        }

        Ok(Self {
            venv,
            create_environment,
            upgrade_installer,
            install_dependencies,
            run_job,
        })
    }

    pub fn command(&self, step: Step) -> &CommandSpec {
        match step {
            Step::CreateEnvironment => &self.create_environment,
            Step::UpgradeInstaller => &self.upgrade_installer,
            Step::InstallDependencies => &self.install_dependencies,
            Step::RunJob => &self.run_job,
        }
    }

    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} (only if {} is missing): {}",
            Step::CreateEnvironment,
            self.venv.root().display(),
            self.create_environment.display_line()
        )];
        for step in [Step::UpgradeInstaller, Step::InstallDependencies, Step::RunJob] {
            lines.push(format!("{}: {}", step, self.command(step).display_line()));
        }
        lines
    }
}
