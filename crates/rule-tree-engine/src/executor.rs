//! 规则树执行器
//!
//! 深度优先、顺序、短路的异步校验。守卫和规则体抛出的任何错误（包括 panic）
//! 都在节点边界被捕获并转换为 `fail` 结果，`validate` 本身永远不会失败。
//!
//! 遍历使用堆上的显式帧栈而不是递归 future，树的深度不受线程栈大小限制。

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::vec;

use futures::FutureExt;
use tracing::{Instrument, Span, debug, debug_span, warn};

use crate::models::{ErrorValue, Status, ValidationResult};
use crate::node::Node;
use crate::rule_spec::ObserverFn;

/// 正在遍历子节点的节点
struct Frame<C> {
    node: Node<C>,
    children: vec::IntoIter<Node<C>>,
    span: Span,
}

/// 进入节点后的状态
enum Entered<C> {
    /// 守卫未满足或守卫失败，节点已有最终结果
    Settled(ValidationResult),
    /// 规则体已执行，等待遍历子节点
    Open(Frame<C>),
}

impl<C> Node<C>
where
    C: Send + Sync + 'static,
{
    /// 校验节点及其子树
    pub async fn validate(&self, context: &C) -> ValidationResult {
        self.validate_with(context, None).await
    }

    /// 校验节点及其子树，并在每次状态变化时通知观察者
    ///
    /// 执行步骤：
    /// 1. 将整棵子树的结果重置为 `none`（不通知）
    /// 2. 守卫未满足：结果为 `not-applicable`，不执行规则体和子节点
    /// 3. 标记为 `running`，执行规则体并合并其结果
    /// 4. 依次校验子节点；一旦状态离开 `running` 立即停止（短路）
    /// 5. 若仍为 `running`，收尾为 `pass`
    pub async fn validate_with(
        &self,
        context: &C,
        observer: Option<&ObserverFn<'_, C>>,
    ) -> ValidationResult {
        self.reset_subtree();

        let mut stack = match self.enter(context, observer).await {
            Entered::Settled(result) => return result,
            Entered::Open(frame) => vec![frame],
        };

        while let Some(frame) = stack.last_mut() {
            let next = if frame.node.status() == Status::Running {
                frame.children.next()
            } else {
                if frame.children.len() > 0 {
                    debug!(
                        parent: &frame.span,
                        status = %frame.node.status(),
                        skipped = frame.children.len(),
                        "短路 - 跳过剩余子节点"
                    );
                }
                None
            };

            if let Some(child) = next {
                match child.enter(context, observer).await {
                    Entered::Settled(result) => frame.node.merge(result, false, observer),
                    Entered::Open(child_frame) => stack.push(child_frame),
                }
                continue;
            }

            let Some(finished) = stack.pop() else { break };
            let result = finished.finish(observer);
            match stack.last() {
                Some(parent) => parent.node.merge(result, false, observer),
                None => return result,
            }
        }

        self.result()
    }

    /// 执行守卫与规则体
    async fn enter(&self, context: &C, observer: Option<&ObserverFn<'_, C>>) -> Entered<C> {
        let span = debug_span!("validate", node = %self.id());

        if let Some(guard) = self.spec().guard() {
            match capture(guard.evaluate(context, self)).instrument(span.clone()).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(parent: &span, "守卫未满足，跳过节点");
                    self.merge(ValidationResult::not_applicable(), true, observer);
                    return Entered::Settled(self.result());
                }
                Err(error) => {
                    warn!(parent: &span, path = %self.path(), error = %error, "守卫执行失败");
                    self.merge(ValidationResult::fail_with(error), false, observer);
                    return Entered::Settled(self.result());
                }
            }
        }

        self.merge(ValidationResult::running(), false, observer);

        if let Some(body) = self.spec().body() {
            let outcome = match capture(body.execute(context, self)).instrument(span.clone()).await {
                Ok(Some(result)) if result.status().is_terminal() => result,
                Ok(Some(result)) => {
                    debug!(parent: &span, status = %result.status(), "规则体返回非终态，按通过处理");
                    ValidationResult::pass()
                }
                Ok(None) => ValidationResult::pass(),
                Err(error) => {
                    warn!(parent: &span, path = %self.path(), error = %error, "规则体执行失败");
                    ValidationResult::fail_with(error)
                }
            };
            self.merge(outcome, false, observer);
        }

        Entered::Open(Frame {
            node: self.clone(),
            children: self.children().into_iter(),
            span,
        })
    }
}

impl<C> Frame<C> {
    /// 子节点遍历结束后收尾
    fn finish(self, observer: Option<&ObserverFn<'_, C>>) -> ValidationResult {
        if self.node.status() == Status::Running {
            self.node.merge(ValidationResult::pass(), true, observer);
        }
        let result = self.node.result();
        debug!(parent: &self.span, status = %result.status(), "节点校验完成");
        result
    }
}

/// 在节点边界捕获错误与 panic
async fn capture<T, F>(future: F) -> Result<T, ErrorValue>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ErrorValue::from_raised(err)),
        Err(payload) => Err(ErrorValue::from_panic(payload)),
    }
}
