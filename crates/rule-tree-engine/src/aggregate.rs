//! 结果聚合
//!
//! 将规则体或子节点的结果并入节点当前结果，实现状态优先级格。

use tracing::trace;

use crate::models::{Status, ValidationResult};
use crate::node::Node;
use crate::rule_spec::ObserverFn;

/// 计算合并后的结果
///
/// 返回 `None` 表示当前结果保持不变。
///
/// - `none` / `not-applicable` / `running`：无条件覆盖
/// - `pass`：仅在收尾合并且当前为 `running` 时覆盖，其余情况视为"无异议"忽略
/// - `inconclusive`：当前不是 `fail` 时覆盖
/// - `fail`：当前不是 `fail` 时覆盖
pub fn merge(
    current: &ValidationResult,
    incoming: ValidationResult,
    finalizing: bool,
) -> Option<ValidationResult> {
    let overwrite = match incoming.status() {
        Status::None | Status::NotApplicable | Status::Running => true,
        Status::Pass => finalizing && current.status() == Status::Running,
        Status::Inconclusive | Status::Fail => current.status() != Status::Fail,
    };

    overwrite.then_some(incoming)
}

impl<C> Node<C> {
    /// 合并结果；状态发生变化时通知观察者
    pub(crate) fn merge(
        &self,
        incoming: ValidationResult,
        finalizing: bool,
        observer: Option<&ObserverFn<'_, C>>,
    ) {
        let (previous, next) = self.update_result(|current| merge(current, incoming, finalizing));

        if previous != next.status() {
            trace!(node = %self.id(), from = %previous, to = %next.status(), "状态变更");
            if let Some(observer) = observer {
                observer(self, &next);
            }
        }
    }
}
