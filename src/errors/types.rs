// 统一错误类型定义

use thiserror::Error;
use useful_logs_common::CommonError;

/// 日志库结果类型
pub type LogResult<T> = Result<T, LogError>;

/// 日志库统一错误类型
#[derive(Debug, Error)]
pub enum LogError {
    /// 日志记录无法序列化为 JSON
    #[error("日志记录序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 向非空执行上下文恢复快照
    #[error("执行上下文在恢复快照前必须为空, 当前字段: {keys:?}")]
    ContextNotEmpty { keys: Vec<String> },

    /// 配置错误
    #[error("配置错误: {message}")]
    Configuration { message: String },

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl LogError {
    /// 获取错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::ContextNotEmpty { .. } => "CONTEXT_NOT_EMPTY",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// 创建配置错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// 创建上下文非空错误
    pub fn context_not_empty(mut keys: Vec<String>) -> Self {
        keys.sort();
        Self::ContextNotEmpty { keys }
    }
}

/// 从 CommonError 转换
impl From<CommonError> for LogError {
    fn from(err: CommonError) -> Self {
        Self::configuration(err.to_string())
    }
}
