//! 日志初始化模块
//!
//! 引擎内每个节点的校验都在 `validate` span 中执行；
//! JSON 格式下 span 关闭事件会带上耗时，便于定位慢规则。

use anyhow::{Context, Result};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use super::ObservabilityConfig;

/// 引擎相关 crate 的日志目标
const ENGINE_TARGETS: [&str; 2] = ["rule_tree", "rule_tree_shared"];

/// Tracing 资源守卫
///
/// 记录订阅器是否由本次调用安装（测试或宿主已安装时为 false）。
pub struct TracingGuard {
    installed: bool,
}

impl TracingGuard {
    pub fn installed(&self) -> bool {
        self.installed
    }
}

/// 构建日志过滤器
///
/// `RUST_LOG` 存在时完全以其为准；否则第三方 crate 固定为 `warn`，
/// 引擎 crate 使用配置中的日志级别。
pub fn build_filter(config: &ObservabilityConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directives = std::iter::once("warn".to_string())
        .chain(
            ENGINE_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, config.log_level)),
        )
        .collect::<Vec<_>>()
        .join(",");

    EnvFilter::try_new(&directives)
        .with_context(|| format!("无效的日志级别: {}", config.log_level))
}

/// 初始化 tracing 日志
///
/// 重复初始化不会报错，返回的 guard 中 `installed()` 为 false。
pub fn init(config: &ObservabilityConfig) -> Result<TracingGuard> {
    let filter = build_filter(config)?;

    let layer = if config.json_logs {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed()
    } else {
        fmt::layer().compact().with_target(false).boxed()
    };

    let installed = tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .is_ok();

    Ok(TracingGuard { installed })
}
