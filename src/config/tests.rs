// 配置系统测试

#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::logging::FieldMap;
    use crate::logging::context::RestorePolicy;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();

        assert_eq!(config.level, "info");
        assert!(config.json);
        assert!(config.file_path.is_none());
        assert_eq!(config.rotation, "never");
        assert_eq!(config.restore_policy, RestorePolicy::Warn);
        assert!(config.install_hooks);
        assert!(config.fields.references("message"));
    }

    #[test]
    fn test_config_validation() {
        let config = LoggingConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = LoggingConfig::default();

        // 测试无效的日志级别
        config.level = String::new();
        assert!(config.validate().is_err());

        // 重置级别，测试无效的轮转策略
        config.level = "debug".to_string();
        config.rotation = "weekly".to_string();
        assert!(config.validate().is_err());

        // 重置轮转策略，测试无效的时间格式
        config.rotation = "hourly".to_string();
        config.date_format = Some("%Y-%m-%d %!".to_string());
        assert!(config.validate().is_err());

        // 重置时间格式，测试空文件路径
        config.date_format = Some("%H:%M:%S".to_string());
        config.file_path = Some("  ".to_string());
        assert!(config.validate().is_err());

        config.file_path = Some("/var/log/{hostname}-{filename}".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validator_collects_all_errors() {
        let config = LoggingConfig {
            level: String::new(),
            rotation: "weekly".to_string(),
            file_path: Some("/var/log/".to_string()),
            ..LoggingConfig::default()
        };

        let errors = ConfigValidator::validate_all(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.code == "VALIDATION_ERROR"));
    }

    #[test]
    fn test_field_map_validation() {
        let mut config = LoggingConfig::default();
        config.fields = config.fields.clone().with("", "message");
        assert!(ConfigValidator::validate_fields(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("custom-logging");
        let mut file = std::fs::File::create(base.with_extension("toml")).unwrap();
        writeln!(
            file,
            r#"
level = "debug"
json = false
date_format = "%H:%M:%S"
restore_policy = "strict"

[fields]
message = "message"
severity = "levelname"

[always_extra]
src = "billing"
"#
        )
        .unwrap();

        let config = LoggingConfig::load_from(base.to_str().unwrap()).unwrap();
        assert_eq!(config.level, "debug");
        assert!(!config.json);
        assert_eq!(config.date_format.as_deref(), Some("%H:%M:%S"));
        assert_eq!(config.restore_policy, RestorePolicy::Strict);
        assert!(config.fields.references("levelname"));
        assert_eq!(config.always_extra.get("src"), Some(&json!("billing")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_maps_replace_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("minimal-logging");
        std::fs::write(
            base.with_extension("toml"),
            "[fields]\nmessage = \"message\"\n\n[always_extra]\nservice = \"billing\"\n",
        )
        .unwrap();

        let config = LoggingConfig::load_from(base.to_str().unwrap()).unwrap();
        let keys: Vec<&str> = config.fields.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["message"]);
        assert!(!config.fields.references("asctime"));

        let extra: Vec<&str> = config.always_extra.keys().collect();
        assert_eq!(extra, ["service"]);
        assert!(config.always_extra.get("src").is_none());

        // 未配置的标量仍取默认值
        assert_eq!(config.level, "info");
        assert!(config.json);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = LoggingConfig::load_from("/nonexistent/useful-logs-config").unwrap();
        assert!(config.json);
        assert!(config.fields.references("asctime"));
        assert_eq!(config.fields.len(), FieldMap::default().len());
        assert_eq!(config.always_extra.get("src"), Some(&json!("rust")));
    }

    #[test]
    fn test_loader_requires_init() {
        // 测试中从不调用 init
        assert!(ConfigLoader::get().is_err());
    }

    #[test]
    fn test_convert_config_error() {
        let err = convert_config_error(config::ConfigError::Message("bad".to_string()));
        assert_eq!(err.code, "CONFIGURATION_ERROR");
        assert!(err.message.contains("bad"));
    }
}
