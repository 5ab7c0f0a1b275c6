//! 测试工具模块
//!
//! 提供集成测试所需的辅助函数和测试数据生成器：
//! 校验上下文（JSON）以及声明式规则树定义片段。

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

/// 生成唯一的测试申请人 ID
pub fn test_applicant_id() -> String {
    format!("test-applicant-{}", Uuid::new_v4())
}

// ==================== 测试数据生成器 ====================

/// 测试数据生成器
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 生成贷款申请上下文
    pub fn loan_application(applicant_id: &str, age: u32, amount: i64) -> Value {
        json!({
            "applicant": {
                "id": applicant_id,
                "age": age,
                "country": "DE",
                "email": format!("{}@example.com", applicant_id),
                "tags": ["returning"],
                "registered_at": (Utc::now() - Duration::days(400)).to_rfc3339()
            },
            "loan": {
                "amount": amount,
                "currency": "EUR",
                "term_months": 24
            },
            "documents": [
                {"kind": "id_card", "verified": true},
                {"kind": "payslip", "verified": true}
            ]
        })
    }

    /// 生成缺少证件的申请上下文
    pub fn undocumented_application(applicant_id: &str, age: u32, amount: i64) -> Value {
        let mut ctx = Self::loan_application(applicant_id, age, amount);
        ctx["documents"] = json!([]);
        ctx
    }

    /// 生成企业申请上下文（`applicant.kind = business`）
    pub fn business_application(applicant_id: &str, amount: i64) -> Value {
        let mut ctx = Self::loan_application(applicant_id, 40, amount);
        ctx["applicant"]["kind"] = json!("business");
        ctx
    }

    /// 生成引用注册规则的叶子节点定义
    pub fn rule_node(id: &str, rule: &str) -> Value {
        json!({
            "id": id,
            "rule": rule
        })
    }

    /// 生成分组节点定义
    pub fn group_node(id: &str, children: Vec<Value>) -> Value {
        json!({
            "id": id,
            "children": children
        })
    }

    /// 为节点定义附加注册表中的守卫
    pub fn guarded(mut node: Value, guard: &str) -> Value {
        node["when"] = json!(guard);
        node
    }
}

// ==================== 测试断言辅助 ====================

/// 测试断言辅助
pub struct TestAssertions;

impl TestAssertions {
    /// 断言 JSON 字段值相等（字段支持点号路径，数组用数字下标）
    pub fn assert_json_field_eq(actual: &Value, expected: &Value, field: &str) {
        let value = field.split('.').try_fold(actual, |current, part| {
            match (current, part.parse::<usize>()) {
                (Value::Array(items), Ok(index)) => items.get(index),
                _ => current.get(part),
            }
        });
        assert_eq!(
            value,
            Some(expected),
            "Field '{}' mismatch in {}",
            field,
            actual
        );
    }

    /// 断言 JSON 包含指定字段
    pub fn assert_json_has_field(value: &Value, field: &str) {
        assert!(
            value.get(field).is_some(),
            "Expected field '{}' not found in {}",
            field,
            value
        );
    }
}
