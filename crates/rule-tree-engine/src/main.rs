//! 规则树校验命令行工具
//!
//! 加载 JSON 规则树定义与 JSON 上下文，执行校验并输出评估报告。
//! 定义中可引用的规则与守卫见 [`catalogue`]。

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rule_tree::{JsonContext, Status, TreeCompiler, TreeRunner};
use rule_tree_shared::config::AppConfig;
use rule_tree_shared::observability;
use tracing::{info, warn};

mod catalogue;

const SERVICE_NAME: &str = "rule-tree";

/// 规则树校验工具
#[derive(Parser, Debug)]
#[command(name = "rule-tree")]
#[command(version, about = "对 JSON 上下文执行声明式规则树校验")]
struct Cli {
    /// 规则树定义文件（JSON）
    #[arg(short, long)]
    definition: PathBuf,

    /// 校验上下文文件（JSON）
    #[arg(short, long)]
    context: PathBuf,

    /// 输出每次状态变化的评估追踪
    #[arg(long)]
    trace: bool,

    /// 超时时间（毫秒），覆盖配置文件
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }

    let obs_config = config.observability.clone().with_service_name(SERVICE_NAME);
    let _guard = observability::init(&obs_config)?;

    let compiler = TreeCompiler::from_config(catalogue::registry(), &config.engine);
    let root = compiler
        .compile_from_file(&cli.definition)
        .with_context(|| format!("无法编译规则树 {}", cli.definition.display()))?;

    let raw = std::fs::read_to_string(&cli.context)
        .with_context(|| format!("无法读取上下文 {}", cli.context.display()))?;
    let context = JsonContext::from_json(&raw).context("上下文不是合法的 JSON")?;

    let mut runner = TreeRunner::from_config(&config.engine);
    if cli.trace {
        runner = runner.with_trace();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        runner = runner.with_timeout(Duration::from_millis(timeout_ms));
    }

    let report = runner.run(&root, &context).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    match report.result.status() {
        Status::Pass | Status::NotApplicable => {
            info!(root = %report.root_id, status = %report.result.status(), "校验通过");
            Ok(ExitCode::SUCCESS)
        }
        status => {
            warn!(root = %report.root_id, status = %status, "校验未通过");
            Ok(ExitCode::FAILURE)
        }
    }
}
