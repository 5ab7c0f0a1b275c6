//! 可观测性
//!
//! 宿主程序（如 `rule-tree` 命令行）通过 [`init`] 一次性安装日志订阅器并注册指标描述。
//! 引擎本身只依赖 `tracing` 与 `metrics` 门面，不安装任何全局状态。

pub mod metrics;
pub mod tracing;

use ::tracing::{debug, info};
use anyhow::Result;

pub use crate::config::ObservabilityConfig;

/// 可观测性资源守卫，需在宿主程序退出前保持存活
pub struct ObservabilityGuard {
    service_name: String,
    tracing_guard: tracing::TracingGuard,
    metrics_described: bool,
}

impl ObservabilityGuard {
    /// 日志订阅器是否由本次初始化安装
    pub fn logs_installed(&self) -> bool {
        self.tracing_guard.installed()
    }

    /// 是否已注册规则树指标描述
    pub fn metrics_described(&self) -> bool {
        self.metrics_described
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if self.tracing_guard.installed() {
            debug!(service = %self.service_name, "observability shut down");
        }
    }
}

/// 初始化日志并（按配置）注册指标描述
///
/// ```ignore
/// let config = AppConfig::load("rule-tree")?;
/// let _guard = observability::init(&config.observability)?;
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    let tracing_guard = tracing::init(config)?;

    if config.metrics_enabled {
        metrics::describe_metrics();
    }

    info!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        metrics = config.metrics_enabled,
        "observability ready"
    );

    Ok(ObservabilityGuard {
        service_name: config.service_name.clone(),
        tracing_guard,
        metrics_described: config.metrics_enabled,
    })
}
