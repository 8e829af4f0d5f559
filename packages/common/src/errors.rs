// 通用错误类型定义

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 通用错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct CommonError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl CommonError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: &str, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// 创建配置错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new("CONFIGURATION_ERROR", message)
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CommonError::configuration("缺少日志级别");
        assert_eq!(error.code, "CONFIGURATION_ERROR");
        assert_eq!(error.to_string(), "CONFIGURATION_ERROR: 缺少日志级别");
        assert!(error.details.is_none());
    }

    #[test]
    fn test_error_with_details() {
        let error = CommonError::with_details("VALIDATION_ERROR", "字段无效", "fields.time");
        assert_eq!(error.details.as_deref(), Some("fields.time"));
    }
}
