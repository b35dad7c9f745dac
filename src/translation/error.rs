//! 翻译运行时统一错误处理
//!
//! 只有清单加载失败与不受支持的语言代码会暴露给调用方，
//! 其余错误（字典拉取、快照存储）在能够容忍空结果的边界上被吞掉并记录日志。

use std::fmt;

use thiserror::Error;

use crate::core::TranslifyError;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 请求的语言代码不在清单支持的语言集合中
    #[error("unsupported locale: {0}")]
    InvalidLocale(String),

    /// 清单获取或解析失败，运行时无法初始化
    #[error("manifest unavailable: {0}")]
    Manifest(String),

    /// 网络错误
    #[error("network error: {0}")]
    Network(String),

    /// JSON / 数据解析错误
    #[error("parse error: {0}")]
    Parse(String),

    /// 持久化存储错误
    #[error("storage error: {0}")]
    Storage(String),

    /// 模板术语无法编译为匹配模式
    #[error("invalid term pattern: {0}")]
    Pattern(String),

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(String),
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 调用方输入
    Input,
    /// 初始化
    Startup,
    /// 网络与数据
    Transport,
    /// 存储
    Storage,
    /// 内部
    Internal,
}

impl TranslationError {
    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::InvalidLocale(_) => ErrorCategory::Input,
            TranslationError::Manifest(_) | TranslationError::Config(_) => ErrorCategory::Startup,
            TranslationError::Network(_) | TranslationError::Parse(_) => ErrorCategory::Transport,
            TranslationError::Storage(_) | TranslationError::Io(_) => ErrorCategory::Storage,
            TranslationError::Pattern(_) => ErrorCategory::Internal,
        }
    }

    /// 被拒绝的语言代码（仅 `InvalidLocale`）
    pub fn rejected_locale(&self) -> Option<&str> {
        match self {
            TranslationError::InvalidLocale(code) => Some(code),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::Parse(error.to_string())
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        TranslationError::Network(error.to_string())
    }
}

impl From<url::ParseError> for TranslationError {
    fn from(error: url::ParseError) -> Self {
        TranslationError::Config(format!("invalid url: {error}"))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::Config(format!("invalid TOML: {error}"))
    }
}

impl From<regex::Error> for TranslationError {
    fn from(error: regex::Error) -> Self {
        TranslationError::Pattern(error.to_string())
    }
}

impl From<redb::Error> for TranslationError {
    fn from(error: redb::Error) -> Self {
        TranslationError::Storage(error.to_string())
    }
}

/// 转换为 CLI 层错误
impl From<TranslationError> for TranslifyError {
    fn from(error: TranslationError) -> Self {
        TranslifyError::new(&error.to_string())
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 把任意 redb 错误归一为存储错误
    pub fn storage_error<E: Into<redb::Error>>(error: E) -> TranslationError {
        TranslationError::from(error.into())
    }

    /// 创建清单错误
    pub fn manifest_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::Manifest(msg.to_string())
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::Config(msg.to_string())
    }
}
