// 错误处理系统测试

#[cfg(test)]
mod tests {
    use crate::errors::LogError;
    use useful_logs_common::CommonError;

    #[test]
    fn test_error_codes() {
        assert_eq!(LogError::configuration("x").error_code(), "CONFIGURATION_ERROR");
        assert_eq!(
            LogError::context_not_empty(vec!["a".into()]).error_code(),
            "CONTEXT_NOT_EMPTY"
        );
    }

    #[test]
    fn test_context_not_empty_sorts_keys() {
        let error = LogError::context_not_empty(vec!["user".into(), "request_id".into()]);
        match error {
            LogError::ContextNotEmpty { keys } => assert_eq!(keys, vec!["request_id", "user"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: LogError = json_error.into();

        assert_eq!(error.error_code(), "SERIALIZATION_ERROR");
        assert!(error.to_string().starts_with("日志记录序列化失败"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "文件未找到");
        let error: LogError = io_error.into();

        assert_eq!(error.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_common_error_conversion() {
        let common_error = CommonError::validation("日志级别无效");
        let error: LogError = common_error.into();

        assert_eq!(error.error_code(), "CONFIGURATION_ERROR");
        assert!(error.to_string().contains("日志级别无效"));
    }
}
