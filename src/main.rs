use anyhow::Context;
use clap::Parser;
use etl_bootstrap::utils::{logger, validation::Validate};
use etl_bootstrap::{
    BootstrapPlan, BootstrapRunner, CliConfig, LogFormat, RunReport, TokioCommandExecutor,
};
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    let exit_code = run(&cli).await;
    std::process::exit(exit_code);
}

async fn run(cli: &CliConfig) -> i32 {
    tracing::info!("🚀 Starting etl-bootstrap");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置，再建立執行計畫
    let prepared = cli.load().and_then(|config| {
        config.validate()?;
        let plan = BootstrapPlan::from_config(&config)?;
        Ok((config, plan))
    });
    let (config, plan) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            return e.exit_code();
        }
    };

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no commands will be executed");
        for line in plan.describe() {
            println!("{}", line);
        }
        return 0;
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let runner =
        BootstrapRunner::new_with_monitoring(TokioCommandExecutor::new(), plan, monitor_enabled);
    let (report, result) = runner.run_with_report().await;

    let mut exit_code = report.exit_code;
    match result {
        Ok(()) => {
            tracing::info!("✅ ETL job completed successfully");
        }
        Err(e) => {
            tracing::error!(
                "❌ {} (category: {:?}, exit code: {})",
                e,
                e.category(),
                exit_code
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        }
    }

    if let Some(path) = &cli.report {
        if let Err(e) = write_report(&report, path) {
            tracing::error!("❌ {:#}", e);
            if exit_code == 0 {
                exit_code = 1;
            }
        }
    }

    exit_code
}

fn write_report(report: &RunReport, path: &Path) -> anyhow::Result<()> {
    let json = report.to_json().context("failed to serialize run report")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write run report to {}", path.display()))?;
    tracing::info!("📁 Run report saved to: {}", path.display());
    Ok(())
}
