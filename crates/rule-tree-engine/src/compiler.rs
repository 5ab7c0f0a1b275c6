//! 声明式规则树编译器
//!
//! 将 JSON 节点定义校验并编译成内存中的 [`Node`] 树。
//! 定义只描述结构：守卫和规则体都通过名称引用宿主程序在 [`RuleRegistry`] 中注册的实现。

use std::collections::HashSet;
use std::path::Path;

use rule_tree_shared::config::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{Result, RuleError};
use crate::node::Node;
use crate::rule_spec::RuleSpec;
use crate::store::RuleRegistry;

/// 默认最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// 节点定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 注册表中的守卫名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// 注册表中的规则体名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDefinition>,
}

/// 规则树编译器
pub struct TreeCompiler<C> {
    registry: RuleRegistry<C>,
    max_depth: usize,
}

impl<C> TreeCompiler<C> {
    pub fn new(registry: RuleRegistry<C>) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn from_config(registry: RuleRegistry<C>, config: &EngineConfig) -> Self {
        Self::new(registry).with_max_depth(config.max_depth)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 从 JSON 字符串编译
    pub fn compile_from_json(&self, json: &str) -> Result<Node<C>> {
        let definition: NodeDefinition = serde_json::from_str(json)?;
        self.compile(&definition)
    }

    /// 从文件编译
    pub fn compile_from_file(&self, path: impl AsRef<Path>) -> Result<Node<C>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        self.compile_from_json(&content)
    }

    /// 校验定义并构建节点树
    #[instrument(skip(self, definition), fields(root = %definition.id))]
    pub fn compile(&self, definition: &NodeDefinition) -> Result<Node<C>> {
        let mut seen = HashSet::new();
        let count = self.validate_definition(definition, 1, &mut seen)?;

        let root = self.build(definition)?;
        info!(nodes = count, "规则树已编译");
        Ok(root)
    }

    /// 校验定义结构，返回节点总数
    fn validate_definition<'a>(
        &self,
        definition: &'a NodeDefinition,
        depth: usize,
        seen: &mut HashSet<&'a str>,
    ) -> Result<usize> {
        if definition.id.trim().is_empty() {
            return Err(RuleError::ParseError("节点 ID 不能为空".to_string()));
        }

        if depth > self.max_depth {
            return Err(RuleError::InvalidDefinition {
                node: definition.id.clone(),
                reason: format!("嵌套深度超过上限 {}", self.max_depth),
            });
        }

        if !seen.insert(definition.id.as_str()) {
            return Err(RuleError::InvalidDefinition {
                node: definition.id.clone(),
                reason: "节点 ID 重复".to_string(),
            });
        }

        if let Some(name) = &definition.when {
            if !self.registry.contains_guard(name) {
                return Err(RuleError::GuardNotFound(name.clone()));
            }
        }

        if let Some(name) = &definition.rule {
            if !self.registry.contains(name) {
                return Err(RuleError::RuleNotFound(name.clone()));
            }
        }

        let mut count = 1;
        for child in &definition.children {
            count += self.validate_definition(child, depth + 1, seen)?;
        }
        Ok(count)
    }

    fn build(&self, definition: &NodeDefinition) -> Result<Node<C>> {
        let mut spec = RuleSpec::new(definition.id.clone());

        if let Some(description) = &definition.description {
            spec = spec.description(description.clone());
        }
        if let Some(name) = &definition.when {
            spec = spec.with_guard(self.registry.guard(name)?);
        }
        if let Some(name) = &definition.rule {
            spec = spec.with_body(self.registry.get(name)?);
        }

        let node = Node::new(spec);
        for child in &definition.children {
            node.add_child(self.build(child)?)?;
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorValue, JsonContext, Status, ValidationResult};
    use serde_json::{Value, json};

    fn compiler() -> TreeCompiler<JsonContext> {
        let registry = RuleRegistry::new();
        registry
            .register("adult", |ctx: &JsonContext, _node: &Node<JsonContext>| {
                let age = ctx.get_field("applicant.age").and_then(Value::as_u64).unwrap_or(0);
                Ok((age < 18).then(|| {
                    ValidationResult::fail_with(
                        ErrorValue::new("AGE_LIMIT").with_message("applicant must be an adult"),
                    )
                }))
            })
            .register("has_documents", |ctx: &JsonContext, _node: &Node<JsonContext>| {
                let documents = ctx
                    .get_field("documents")
                    .and_then(Value::as_array)
                    .map(Vec::len)
                    .unwrap_or(0);
                Ok((documents == 0).then(|| ValidationResult::fail_with(ErrorValue::new("NO_DOCUMENTS"))))
            })
            .register_guard("large_loan", |ctx: &JsonContext, _node: &Node<JsonContext>| {
                Ok(ctx.get_field("loan.amount").and_then(Value::as_u64).unwrap_or(0) > 10_000)
            });
        TreeCompiler::new(registry)
    }

    const LOAN_TREE: &str = r#"
    {
        "id": "loan",
        "description": "loan eligibility",
        "children": [
            { "id": "age", "rule": "adult" },
            { "id": "documents", "rule": "has_documents" },
            {
                "id": "large_loan_review",
                "when": "large_loan",
                "children": [ { "id": "large_loan_documents", "rule": "has_documents" } ]
            }
        ]
    }
    "#;

    #[test]
    fn test_compile_builds_tree() {
        let root = compiler().compile_from_json(LOAN_TREE).unwrap();

        assert_eq!(root.id(), "loan");
        assert_eq!(root.description(), Some("loan eligibility"));
        assert_eq!(root.child_count(), 3);
        assert!(root.find("large_loan_review").unwrap().spec().guard().is_some());
        assert!(root.find("age").unwrap().spec().body().is_some());
        assert_eq!(
            root.find("large_loan_documents").unwrap().path(),
            "loan/large_loan_review/large_loan_documents"
        );
    }

    #[test]
    fn test_compiled_tree_validates() {
        let root = compiler().compile_from_json(LOAN_TREE).unwrap();

        let large = JsonContext::new(json!({
            "applicant": { "age": 30 },
            "loan": { "amount": 20000 },
            "documents": [ { "kind": "id_card" } ]
        }));
        assert!(tokio_test::block_on(root.validate(&large)).is_pass());

        // 不适用的子节点会成为父节点的终态
        let small = JsonContext::new(json!({
            "applicant": { "age": 30 },
            "loan": { "amount": 500 },
            "documents": [ { "kind": "id_card" } ]
        }));
        let result = tokio_test::block_on(root.validate(&small));
        assert_eq!(result.status(), Status::NotApplicable);
        assert_eq!(root.find("large_loan_review").unwrap().status(), Status::NotApplicable);
        assert_eq!(root.find("large_loan_documents").unwrap().status(), Status::None);
        assert_eq!(root.find("documents").unwrap().status(), Status::Pass);

        let minor = JsonContext::new(json!({
            "applicant": { "age": 16 },
            "loan": { "amount": 500 },
            "documents": []
        }));
        let result = tokio_test::block_on(root.validate(&minor));
        assert_eq!(result.status(), Status::Fail);
        assert_eq!(result.error().unwrap().code(), &json!("AGE_LIMIT"));
        assert_eq!(result.error().unwrap().message(), Some("applicant must be an adult"));
        assert_eq!(root.find("documents").unwrap().status(), Status::None);
    }

    #[test]
    fn test_definition_round_trips_through_serde() {
        let definition: NodeDefinition = serde_json::from_str(LOAN_TREE).unwrap();
        let value = serde_json::to_value(&definition).unwrap();

        assert_eq!(value["children"][2]["when"], json!("large_loan"));
        assert!(value["children"][0].get("when").is_none());
        assert!(value["children"][0].get("children").is_none());
    }

    #[test]
    fn test_invalid_definitions_are_rejected() {
        let compiler = compiler();

        let duplicate = r#"{ "id": "a", "children": [ { "id": "b" }, { "id": "b" } ] }"#;
        assert!(matches!(
            compiler.compile_from_json(duplicate),
            Err(RuleError::InvalidDefinition { node, .. }) if node == "b"
        ));

        let unknown = r#"{ "id": "a", "rule": "missing_rule" }"#;
        assert!(matches!(
            compiler.compile_from_json(unknown),
            Err(RuleError::RuleNotFound(name)) if name == "missing_rule"
        ));

        let unknown_guard = r#"{ "id": "a", "when": "adult" }"#;
        assert!(matches!(
            compiler.compile_from_json(unknown_guard),
            Err(RuleError::GuardNotFound(name)) if name == "adult"
        ));

        let empty_id = r#"{ "id": " " }"#;
        assert!(matches!(compiler.compile_from_json(empty_id), Err(RuleError::ParseError(_))));

        assert!(matches!(
            compiler.compile_from_json("{ not json"),
            Err(RuleError::JsonError(_))
        ));
    }

    #[test]
    fn test_max_depth() {
        let nested = r#"{ "id": "a", "children": [ { "id": "b", "children": [ { "id": "c" } ] } ] }"#;

        assert!(compiler().with_max_depth(3).compile_from_json(nested).is_ok());
        assert!(matches!(
            compiler().with_max_depth(2).compile_from_json(nested),
            Err(RuleError::InvalidDefinition { node, .. }) if node == "c"
        ));
    }

    #[test]
    fn test_from_config_uses_max_depth() {
        let config = EngineConfig {
            max_depth: 1,
            ..EngineConfig::default()
        };
        let compiler = TreeCompiler::from_config(RuleRegistry::<JsonContext>::new(), &config);
        assert!(compiler.compile_from_json(r#"{ "id": "a" }"#).is_ok());
        assert!(compiler
            .compile_from_json(r#"{ "id": "a", "children": [ { "id": "b" } ] }"#)
            .is_err());
    }
}
