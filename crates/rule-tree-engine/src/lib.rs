//! 分层异步规则校验引擎
//!
//! 提供可组合的校验节点树：
//! - 每个节点可带守卫与规则体（同步或异步）
//! - 状态优先级格合并子节点与规则结果
//! - 深度优先、顺序短路的异步校验
//! - 状态变化观察者与评估追踪
//! - JSON 声明式规则树结构与具名规则/守卫注册表

pub mod aggregate;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod models;
pub mod node;
pub mod report;
pub mod rule_spec;
pub mod runner;
pub mod store;

pub use compiler::{NodeDefinition, TreeCompiler};
pub use error::{Result, RuleError};
pub use models::{ErrorValue, JsonContext, Status, ValidationResult, raise};
pub use node::Node;
pub use report::NodeSnapshot;
pub use rule_spec::{AsyncGuard, AsyncRule, Guard, ObserverFn, RuleBody, RuleOutcome, RuleSpec};
pub use runner::{EvaluationReport, TraceEvent, TreeRunner};
pub use store::RuleRegistry;
