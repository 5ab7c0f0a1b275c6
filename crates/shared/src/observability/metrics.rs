//! 规则树指标
//!
//! 基于 metrics crate 门面记录指标，导出器（如 Prometheus）由宿主程序安装。
//! 未安装 recorder 时所有记录都是空操作。

/// 校验次数（按最终状态区分）
pub const VALIDATIONS_TOTAL: &str = "rule_tree_validations_total";
/// 单次校验耗时
pub const VALIDATION_DURATION_SECONDS: &str = "rule_tree_validation_duration_seconds";
/// 超时次数
pub const VALIDATION_TIMEOUTS_TOTAL: &str = "rule_tree_validation_timeouts_total";

/// 注册指标描述
///
/// 这些描述会出现在导出端点的 HELP 注释中。
pub fn describe_metrics() {
    metrics::describe_counter!(VALIDATIONS_TOTAL, "Total number of rule tree validations");
    metrics::describe_histogram!(
        VALIDATION_DURATION_SECONDS,
        "Rule tree validation duration in seconds"
    );
    metrics::describe_counter!(
        VALIDATION_TIMEOUTS_TOTAL,
        "Total number of rule tree validations aborted by timeout"
    );
}

/// 记录一次完成的校验
#[inline]
pub fn record_validation(root_id: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        VALIDATIONS_TOTAL,
        "root" => root_id.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        VALIDATION_DURATION_SECONDS,
        "root" => root_id.to_string()
    )
    .record(duration_secs);
}

/// 记录一次超时
#[inline]
pub fn record_timeout(root_id: &str) {
    metrics::counter!(VALIDATION_TIMEOUTS_TOTAL, "root" => root_id.to_string()).increment(1);
}
