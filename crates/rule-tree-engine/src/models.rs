//! 规则树领域模型
//!
//! 状态枚举、节点结果、结构化错误值，以及基于 JSON 的校验上下文。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 节点状态
///
/// 六个取值构成覆盖优先级格（而不是执行时间上的全序），
/// 具体的覆盖规则见 [`crate::aggregate::merge`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// 初始状态，每次校验开始时重置为此值
    #[default]
    None,
    /// 守卫未满足
    NotApplicable,
    /// 正在校验
    Running,
    Pass,
    Inconclusive,
    Fail,
}

impl Status {
    /// 是否为校验可以结束的终态
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::NotApplicable | Self::Pass | Self::Inconclusive | Self::Fail
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NotApplicable => "not-applicable",
            Self::Running => "running",
            Self::Pass => "pass",
            Self::Inconclusive => "inconclusive",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化校验错误
///
/// 携带调用方自定义的错误码（任意 JSON 值）和可选的说明文字。
/// 规则体可以直接返回 `Err(ErrorValue)`，引擎会原样保留；
/// 其它任何错误都会被包装成新的 `ErrorValue`。
#[derive(Clone, Serialize)]
pub struct ErrorValue {
    code: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    /// 被包装的原始错误（仅当由非结构化错误转换而来时存在）
    #[serde(skip)]
    raw: Option<Arc<anyhow::Error>>,
}

impl ErrorValue {
    pub fn new(code: impl Into<Value>) -> Self {
        Self {
            code: code.into(),
            message: None,
            raw: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn code(&self) -> &Value {
        &self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// 被包装的原始错误
    pub fn raw(&self) -> Option<&anyhow::Error> {
        self.raw.as_deref()
    }

    /// 将规则体或守卫抛出的错误转换为结构化错误
    ///
    /// - 已经是 `ErrorValue`：原样返回
    /// - 由 [`raise`] 抛出的普通值：错误码即该值
    /// - 其它错误：错误码为错误链的文本，并保留原始错误
    pub fn from_raised(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ErrorValue>() {
            Ok(value) => return value,
            Err(err) => err,
        };

        let err = match err.downcast::<Value>() {
            Ok(code) => return Self::new(code),
            Err(err) => err,
        };

        Self {
            code: Value::String(format!("{:#}", err)),
            message: None,
            raw: Some(Arc::new(err)),
        }
    }

    /// 将 panic 负载转换为结构化错误
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let text = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic".to_string()
        };

        Self::new(text)
    }
}

/// 抛出一个普通值
///
/// 返回的错误被引擎捕获后，节点结果为 `fail`，错误码与 `code` 相等，且没有说明文字。
pub fn raise(code: impl Into<Value>) -> anyhow::Error {
    anyhow::Error::msg(code.into())
}

impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorValue")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("wrapped", &self.raw.is_some())
            .finish()
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "[{}] {}", self.code, message),
            None => write!(f, "[{}]", self.code),
        }
    }
}

impl std::error::Error for ErrorValue {}

/// 节点结果
///
/// 不可变值：每次变更都以新的结果整体替换旧结果。
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationResult {
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorValue>,
}

impl ValidationResult {
    pub fn new(status: Status, error: Option<ErrorValue>) -> Self {
        Self { status, error }
    }

    pub fn none() -> Self {
        Self::new(Status::None, None)
    }

    pub fn not_applicable() -> Self {
        Self::new(Status::NotApplicable, None)
    }

    pub fn running() -> Self {
        Self::new(Status::Running, None)
    }

    pub fn pass() -> Self {
        Self::new(Status::Pass, None)
    }

    pub fn inconclusive() -> Self {
        Self::new(Status::Inconclusive, None)
    }

    pub fn fail() -> Self {
        Self::new(Status::Fail, None)
    }

    pub fn fail_with(error: ErrorValue) -> Self {
        Self::new(Status::Fail, Some(error))
    }

    pub fn inconclusive_with(error: ErrorValue) -> Self {
        Self::new(Status::Inconclusive, Some(error))
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&ErrorValue> {
        self.error.as_ref()
    }

    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }

    pub fn is_fail(&self) -> bool {
        self.status == Status::Fail
    }
}

impl From<Status> for ValidationResult {
    fn from(status: Status) -> Self {
        Self::new(status, None)
    }
}

/// 基于 JSON 的校验上下文
///
/// `rule-tree` 命令行编译声明式规则树（见 [`crate::compiler`]）时使用的上下文类型。
#[derive(Debug, Clone, Default)]
pub struct JsonContext {
    data: Value,
}

impl JsonContext {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 从 JSON 字符串创建
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: Value = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// 获取字段值（支持点号分隔的路径，如 "applicant.age" 或 "documents.0.kind"）
    pub fn get_field(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.data, |current, part| match current {
            Value::Object(map) => map.get(part),
            Value::Array(arr) => part.parse::<usize>().ok().and_then(|index| arr.get(index)),
            _ => None,
        })
    }

    /// 获取底层数据
    pub fn data(&self) -> &Value {
        &self.data
    }
}
