//! 规则树运行器
//!
//! 在 `validate` 之上提供：评估追踪、超时、耗时统计与指标记录，
//! 并输出可序列化的评估报告。

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rule_tree_shared::config::EngineConfig;
use rule_tree_shared::observability::metrics as engine_metrics;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, RuleError};
use crate::models::{ErrorValue, Status, ValidationResult};
use crate::node::Node;
use crate::report::NodeSnapshot;
use crate::rule_spec::ObserverFn;

/// 一次状态变化
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    pub path: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorValue>,
    /// 相对于运行开始的微秒数
    pub at_us: u64,
}

/// 评估报告
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub root_id: String,
    pub result: ValidationResult,
    pub tree: NodeSnapshot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceEvent>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// 规则树运行器
#[derive(Debug, Clone, Default)]
pub struct TreeRunner {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
    timeout: Option<Duration>,
}

impl TreeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            trace_enabled: config.trace_enabled,
            timeout: config.timeout_ms.map(Duration::from_millis),
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 超时后放弃本次校验；被中断的节点会停留在 `running`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 执行校验并生成报告
    #[instrument(skip_all, fields(root = %root.id()))]
    pub async fn run<C>(&self, root: &Node<C>, context: &C) -> Result<EvaluationReport>
    where
        C: Send + Sync + 'static,
    {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let start = Instant::now();

        let trace = Mutex::new(Vec::new());
        let record = |node: &Node<C>, result: &ValidationResult| {
            trace.lock().push(TraceEvent {
                path: node.path(),
                status: result.status(),
                error: result.error().cloned(),
                at_us: saturating_u64(start.elapsed().as_micros()),
            });
        };
        let observer: Option<&ObserverFn<'_, C>> = if self.trace_enabled {
            Some(&record)
        } else {
            None
        };

        let validation = root.validate_with(context, observer);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, validation).await {
                Ok(result) => result,
                Err(_) => {
                    engine_metrics::record_timeout(root.id());
                    let timeout_ms = saturating_u64(limit.as_millis());
                    warn!(timeout_ms, "校验超时");
                    return Err(RuleError::Timeout {
                        root: root.id().to_string(),
                        timeout_ms,
                    });
                }
            },
            None => validation.await,
        };

        let elapsed = start.elapsed();
        let elapsed_ms = saturating_u64(elapsed.as_millis());
        engine_metrics::record_validation(root.id(), result.status().as_str(), elapsed.as_secs_f64());
        info!(
            run_id = %run_id,
            status = %result.status(),
            elapsed_ms,
            "校验完成"
        );

        Ok(EvaluationReport {
            run_id,
            root_id: root.id().to_string(),
            result,
            tree: root.snapshot(),
            trace: trace.into_inner(),
            started_at,
            elapsed_ms,
        })
    }
}

/// u128 计时值转换为 u64，溢出时取上限
fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
