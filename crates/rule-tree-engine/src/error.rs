//! 规则树引擎错误类型
//!
//! 这里只包含引擎 API 自身的失败（树结构误用、定义解析、超时等）。
//! 规则体与守卫的失败永远不会以错误形式返回，而是被捕获为 `fail` 结果。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("节点已挂载: {child} 已是 {parent} 的子节点")]
    AlreadyAttached { child: String, parent: String },

    #[error("循环挂载: 节点 {child} 是 {parent} 自身或其祖先")]
    CyclicAttachment { child: String, parent: String },

    #[error("规则定义解析失败: {0}")]
    ParseError(String),

    #[error("规则定义无效: {node} - {reason}")]
    InvalidDefinition { node: String, reason: String },

    #[error("规则未找到: {0}")]
    RuleNotFound(String),

    #[error("守卫未找到: {0}")]
    GuardNotFound(String),

    #[error("校验超时: {root} 超过 {timeout_ms}ms")]
    Timeout { root: String, timeout_ms: u64 },

    #[error("读取规则定义失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;
