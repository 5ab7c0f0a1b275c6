//! 命令行内置规则目录
//!
//! 声明式定义只能按名称引用宿主注册的实现，`rule-tree` 命令行注册以下通用检查。
//! 每个检查都把节点 id 当作上下文中的点号字段路径，例如 `{"id": "applicant.email", "rule": "present"}`。
//!
//! | 名称 | 规则体 | 守卫 |
//! |---|---|---|
//! | `present` | 字段缺失或为 null 时 `fail` | 字段存在且非 null |
//! | `truthy` | 字段不为真值时 `fail` | 字段为真值 |
//! | `non_empty` | 字段缺失时 `inconclusive`，为空时 `fail` | - |

use rule_tree::{ErrorValue, JsonContext, Node, RuleRegistry, ValidationResult};
use serde_json::Value;

/// 注册内置检查
pub fn registry() -> RuleRegistry<JsonContext> {
    let registry = RuleRegistry::new();
    registry
        .register("present", |ctx: &JsonContext, node: &Node<JsonContext>| {
            Ok((!is_present(field(ctx, node))).then(|| missing(node)))
        })
        .register("truthy", |ctx: &JsonContext, node: &Node<JsonContext>| {
            Ok((!is_truthy(field(ctx, node))).then(|| {
                ValidationResult::fail_with(
                    ErrorValue::new(node.id()).with_message(format!("字段 {} 不为真", node.id())),
                )
            }))
        })
        .register("non_empty", |ctx: &JsonContext, node: &Node<JsonContext>| {
            let outcome = match field(ctx, node) {
                None | Some(Value::Null) => Some(ValidationResult::inconclusive_with(
                    ErrorValue::new(node.id()).with_message(format!("字段 {} 缺失", node.id())),
                )),
                Some(value) if is_empty(value) => Some(ValidationResult::fail_with(
                    ErrorValue::new(node.id()).with_message(format!("字段 {} 为空", node.id())),
                )),
                Some(_) => None,
            };
            Ok(outcome)
        })
        .register_guard("present", |ctx: &JsonContext, node: &Node<JsonContext>| {
            Ok(is_present(field(ctx, node)))
        })
        .register_guard("truthy", |ctx: &JsonContext, node: &Node<JsonContext>| {
            Ok(is_truthy(field(ctx, node)))
        });
    registry
}

fn field<'a>(ctx: &'a JsonContext, node: &Node<JsonContext>) -> Option<&'a Value> {
    ctx.get_field(node.id())
}

fn missing(node: &Node<JsonContext>) -> ValidationResult {
    ValidationResult::fail_with(
        ErrorValue::new(node.id()).with_message(format!("字段 {} 缺失", node.id())),
    )
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(value) => !is_empty(value),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}
