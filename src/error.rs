//! 统一错误处理
//!
//! 引擎内部几乎没有致命错误：存储失败回退到安全默认值，DOM 瞬时错误跳过单个元素，
//! 配置错误被钳制到最近的合法值。这里的类型主要用于在边界处（存储、配置文件、CLI）报告问题。

use std::fmt;

use thiserror::Error;

/// SmartReader 错误类型
#[derive(Error, Debug)]
pub enum ReaderError {
    /// 存储读写错误
    #[error("存储错误: {0}")]
    Storage(String),

    /// 文件 I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// DOM 状态错误（节点在处理中途被移除等）
    #[error("DOM 错误: {0}")]
    Dom(String),
}

/// 结果类型别名
pub type ReaderResult<T> = Result<T, ReaderError>;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 存储或消息 I/O，回退到默认值
    Io,
    /// 瞬时 DOM 状态，跳过当前元素
    Dom,
    /// 配置或编程错误，钳制到合法范围
    Configuration,
}

impl ReaderError {
    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReaderError::Storage(_) | ReaderError::Io(_) | ReaderError::Serialization(_) => {
                ErrorCategory::Io
            }
            ReaderError::Dom(_) => ErrorCategory::Dom,
            ReaderError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        match self {
            ReaderError::Storage(msg) => ReaderError::Storage(format!("{} ({})", msg, context)),
            ReaderError::Config(msg) => ReaderError::Config(format!("{} ({})", msg, context)),
            ReaderError::Dom(msg) => ReaderError::Dom(format!("{} ({})", msg, context)),
            other => other,
        }
    }
}

impl From<toml::de::Error> for ReaderError {
    fn from(err: toml::de::Error) -> Self {
        ReaderError::Config(err.to_string())
    }
}
