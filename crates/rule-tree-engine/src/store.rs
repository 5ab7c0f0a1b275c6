//! 具名规则注册表
//!
//! 使用 DashMap 提供线程安全的规则体与守卫注册，声明式规则树通过名称引用它们。
//! 规则的具体逻辑始终由宿主程序以代码提供。

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::error::{Result, RuleError};
use crate::node::Node;
use crate::rule_spec::{AsyncGuard, AsyncRule, Guard, RuleBody, RuleOutcome};

/// 规则注册表
pub struct RuleRegistry<C> {
    rules: Arc<DashMap<String, RuleBody<C>>>,
    guards: Arc<DashMap<String, Guard<C>>>,
}

impl<C> Clone for RuleRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            guards: Arc::clone(&self.guards),
        }
    }
}

impl<C> Default for RuleRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RuleRegistry<C> {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(DashMap::new()),
            guards: Arc::new(DashMap::new()),
        }
    }

    /// 当前注册的规则体数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.guards.is_empty()
    }

    /// 注册同步规则体（同名规则会被替换）
    pub fn register<F>(&self, name: impl Into<String>, f: F) -> &Self
    where
        F: Fn(&C, &Node<C>) -> RuleOutcome + Send + Sync + 'static,
    {
        insert(&self.rules, "rule", name.into(), RuleBody::Sync(Arc::new(f)));
        self
    }

    /// 注册异步规则体（同名规则会被替换）
    pub fn register_async<R>(&self, name: impl Into<String>, rule: R) -> &Self
    where
        R: AsyncRule<C> + 'static,
    {
        insert(&self.rules, "rule", name.into(), RuleBody::Deferred(Arc::new(rule)));
        self
    }

    /// 注册同步守卫（同名守卫会被替换）
    pub fn register_guard<F>(&self, name: impl Into<String>, f: F) -> &Self
    where
        F: Fn(&C, &Node<C>) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        insert(&self.guards, "guard", name.into(), Guard::Sync(Arc::new(f)));
        self
    }

    /// 注册异步守卫（同名守卫会被替换）
    pub fn register_guard_async<G>(&self, name: impl Into<String>, guard: G) -> &Self
    where
        G: AsyncGuard<C> + 'static,
    {
        insert(&self.guards, "guard", name.into(), Guard::Deferred(Arc::new(guard)));
        self
    }

    /// 按名称获取规则体
    pub fn get(&self, name: &str) -> Result<RuleBody<C>> {
        self.rules
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RuleError::RuleNotFound(name.to_string()))
    }

    /// 按名称获取守卫
    pub fn guard(&self, name: &str) -> Result<Guard<C>> {
        self.guards
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RuleError::GuardNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn contains_guard(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    /// 删除规则体
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.rules.remove(name).is_some();
        if removed {
            info!(rule = %name, "规则已删除");
        }
        removed
    }

    /// 所有已注册的规则体名称（已排序）
    pub fn names(&self) -> Vec<String> {
        sorted_keys(&self.rules)
    }

    /// 所有已注册的守卫名称（已排序）
    pub fn guard_names(&self) -> Vec<String> {
        sorted_keys(&self.guards)
    }
}

fn insert<V>(map: &DashMap<String, V>, kind: &'static str, name: String, value: V) {
    if map.insert(name.clone(), value).is_some() {
        warn!(kind, name = %name, "已存在，已替换");
    } else {
        info!(kind, name = %name, "已注册");
    }
}

fn sorted_keys<V>(map: &DashMap<String, V>) -> Vec<String> {
    let mut names: Vec<String> = map.iter().map(|entry| entry.key().clone()).collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Status, ValidationResult};
    use crate::rule_spec::RuleSpec;
    use async_trait::async_trait;

    struct AlwaysInconclusive;

    #[async_trait]
    impl AsyncRule<()> for AlwaysInconclusive {
        async fn check(&self, _context: &(), _node: &Node<()>) -> RuleOutcome {
            Ok(Some(ValidationResult::inconclusive()))
        }
    }

    struct Never;

    #[async_trait]
    impl AsyncGuard<()> for Never {
        async fn applies(&self, _context: &(), _node: &Node<()>) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry: RuleRegistry<()> = RuleRegistry::new();
        registry
            .register("always_pass", |_, _| Ok(None))
            .register_async("remote_check", AlwaysInconclusive);

        assert_eq!(registry.len(), 2);
        assert!(matches!(registry.get("always_pass").unwrap(), RuleBody::Sync(_)));
        assert!(matches!(registry.get("remote_check").unwrap(), RuleBody::Deferred(_)));
        assert_eq!(registry.names(), vec!["always_pass", "remote_check"]);
    }

    #[test]
    fn test_guards_are_separate_from_rules() {
        let registry: RuleRegistry<()> = RuleRegistry::new();
        registry
            .register_guard("always", |_, _| Ok(true))
            .register_guard_async("never", Never);

        assert_eq!(registry.len(), 0);
        assert!(!registry.is_empty());
        assert!(registry.contains_guard("never"));
        assert!(!registry.contains("never"));
        assert!(matches!(registry.guard("always").unwrap(), Guard::Sync(_)));
        assert_eq!(registry.guard_names(), vec!["always", "never"]);
    }

    #[test]
    fn test_missing_rule_and_guard() {
        let registry: RuleRegistry<()> = RuleRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(RuleError::RuleNotFound(name)) if name == "nope"
        ));
        assert!(matches!(
            registry.guard("nope"),
            Err(RuleError::GuardNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_replace_and_remove() {
        let registry: RuleRegistry<()> = RuleRegistry::new();
        registry.register("check", |_, _| Ok(None));
        registry.register_async("check", AlwaysInconclusive);

        assert_eq!(registry.len(), 1);
        assert!(matches!(registry.get("check").unwrap(), RuleBody::Deferred(_)));

        let shared = registry.clone();
        assert!(shared.remove("check"));
        assert!(!registry.contains("check"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registered_entries_run_in_tree() {
        let registry: RuleRegistry<()> = RuleRegistry::new();
        registry
            .register_async("remote_check", AlwaysInconclusive)
            .register_guard_async("never", Never);

        let node = Node::new(RuleSpec::new("remote").with_body(registry.get("remote_check").unwrap()));
        let result = tokio_test::block_on(node.validate(&()));
        assert_eq!(result, ValidationResult::inconclusive());

        let skipped = Node::new(
            RuleSpec::new("skipped")
                .with_guard(registry.guard("never").unwrap())
                .with_body(registry.get("remote_check").unwrap()),
        );
        assert_eq!(tokio_test::block_on(skipped.validate(&())).status(), Status::NotApplicable);
    }
}
