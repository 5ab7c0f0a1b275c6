//! 节点描述
//!
//! `RuleSpec` 由调用方提供：标识、描述、可选守卫、可选规则体。
//! 守卫与规则体是封闭的两种能力：同步闭包（`Sync`）或异步实现（`Deferred`）。

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::ValidationResult;
use crate::node::Node;

/// 规则体的返回值：`None` 表示隐式通过
pub type RuleOutcome = anyhow::Result<Option<ValidationResult>>;

/// 同步守卫
pub type GuardFn<C> = Arc<dyn Fn(&C, &Node<C>) -> anyhow::Result<bool> + Send + Sync>;

/// 同步规则体
pub type RuleFn<C> = Arc<dyn Fn(&C, &Node<C>) -> RuleOutcome + Send + Sync>;

/// 观察者：每次节点状态发生变化时调用，可借用调用方的局部状态
pub type ObserverFn<'a, C> = dyn Fn(&Node<C>, &ValidationResult) + Send + Sync + 'a;

/// 异步守卫
#[async_trait]
pub trait AsyncGuard<C>: Send + Sync {
    /// 判断节点（及其子树）是否适用于当前上下文
    async fn applies(&self, context: &C, node: &Node<C>) -> anyhow::Result<bool>;
}

/// 异步规则体
#[async_trait]
pub trait AsyncRule<C>: Send + Sync {
    async fn check(&self, context: &C, node: &Node<C>) -> RuleOutcome;
}

/// 守卫
pub enum Guard<C> {
    Sync(GuardFn<C>),
    Deferred(Arc<dyn AsyncGuard<C>>),
}

impl<C: Sync> Guard<C> {
    pub(crate) async fn evaluate(&self, context: &C, node: &Node<C>) -> anyhow::Result<bool> {
        match self {
            Self::Sync(f) => f(context, node),
            Self::Deferred(guard) => guard.applies(context, node).await,
        }
    }
}

impl<C> Clone for Guard<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(f) => Self::Sync(Arc::clone(f)),
            Self::Deferred(guard) => Self::Deferred(Arc::clone(guard)),
        }
    }
}

/// 规则体
pub enum RuleBody<C> {
    Sync(RuleFn<C>),
    Deferred(Arc<dyn AsyncRule<C>>),
}

impl<C: Sync> RuleBody<C> {
    pub(crate) async fn execute(&self, context: &C, node: &Node<C>) -> RuleOutcome {
        match self {
            Self::Sync(f) => f(context, node),
            Self::Deferred(rule) => rule.check(context, node).await,
        }
    }
}

impl<C> Clone for RuleBody<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(f) => Self::Sync(Arc::clone(f)),
            Self::Deferred(rule) => Self::Deferred(Arc::clone(rule)),
        }
    }
}

impl<C> RuleBody<C> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Deferred(_) => "deferred",
        }
    }
}

/// 节点描述
///
/// 没有规则体的节点是纯分组节点，其结果完全由子节点决定。
///
/// ```ignore
/// let spec = RuleSpec::new("adult")
///     .description("applicant must be at least 18")
///     .rule(|ctx: &Applicant, _node| {
///         Ok((ctx.age < 18).then(|| ValidationResult::fail_with(ErrorValue::new("AGE"))))
///     });
/// ```
pub struct RuleSpec<C> {
    id: String,
    description: Option<String>,
    guard: Option<Guard<C>>,
    body: Option<RuleBody<C>>,
}

impl<C> RuleSpec<C> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            guard: None,
            body: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 设置同步守卫
    pub fn when<F>(mut self, f: F) -> Self
    where
        F: Fn(&C, &Node<C>) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.guard = Some(Guard::Sync(Arc::new(f)));
        self
    }

    /// 设置异步守卫
    pub fn when_async<G>(mut self, guard: G) -> Self
    where
        G: AsyncGuard<C> + 'static,
    {
        self.guard = Some(Guard::Deferred(Arc::new(guard)));
        self
    }

    /// 设置同步规则体
    pub fn rule<F>(mut self, f: F) -> Self
    where
        F: Fn(&C, &Node<C>) -> RuleOutcome + Send + Sync + 'static,
    {
        self.body = Some(RuleBody::Sync(Arc::new(f)));
        self
    }

    /// 设置异步规则体
    pub fn rule_async<R>(mut self, rule: R) -> Self
    where
        R: AsyncRule<C> + 'static,
    {
        self.body = Some(RuleBody::Deferred(Arc::new(rule)));
        self
    }

    /// 直接设置规则体（用于注册表中已装箱的规则）
    pub fn with_body(mut self, body: RuleBody<C>) -> Self {
        self.body = Some(body);
        self
    }

    /// 直接设置守卫
    pub fn with_guard(mut self, guard: Guard<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn guard(&self) -> Option<&Guard<C>> {
        self.guard.as_ref()
    }

    pub fn body(&self) -> Option<&RuleBody<C>> {
        self.body.as_ref()
    }
}

impl<C> fmt::Debug for RuleSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSpec")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("guarded", &self.guard.is_some())
            .field("body", &self.body.as_ref().map(RuleBody::kind))
            .finish()
    }
}
