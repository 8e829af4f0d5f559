// 配置验证器
// 提供详细的配置验证逻辑

use crate::config::LoggingConfig;
use crate::logging::formatter::validate_date_format;
use crate::logging::setup::LoggingSetup;
use tracing_subscriber::EnvFilter;
use useful_logs_common::CommonError;

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证完整配置，收集所有错误
    pub fn validate_all(config: &LoggingConfig) -> Result<(), Vec<CommonError>> {
        let checks = [
            Self::validate_level(&config.level),
            Self::validate_file_path(config.file_path.as_deref()),
            Self::validate_rotation(&config.rotation),
            Self::validate_date_format(config.date_format.as_deref()),
            Self::validate_fields(config),
        ];

        let errors: Vec<CommonError> = checks.into_iter().filter_map(Result::err).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// 验证日志级别或过滤指令
    pub fn validate_level(level: &str) -> Result<(), CommonError> {
        if level.trim().is_empty() {
            return Err(CommonError::validation("日志级别不能为空"));
        }

        EnvFilter::try_new(level)
            .map(|_| ())
            .map_err(|e| CommonError::validation(format!("日志级别无效: {level} ({e})")))
    }

    /// 验证日志文件路径
    pub fn validate_file_path(file_path: Option<&str>) -> Result<(), CommonError> {
        match file_path {
            Some(path) if path.trim().is_empty() => {
                Err(CommonError::validation("日志文件路径不能为空字符串"))
            }
            Some(path) if path.ends_with('/') || path.ends_with('\\') => {
                Err(CommonError::validation(format!("日志文件路径缺少文件名: {path}")))
            }
            _ => Ok(()),
        }
    }

    /// 验证轮转策略
    pub fn validate_rotation(rotation: &str) -> Result<(), CommonError> {
        LoggingSetup::parse_rotation(rotation)
            .map(|_| ())
            .map_err(|e| CommonError::validation(e.to_string()))
    }

    /// 验证时间格式
    pub fn validate_date_format(date_format: Option<&str>) -> Result<(), CommonError> {
        match date_format {
            Some(format) => {
                validate_date_format(format).map_err(|e| CommonError::validation(e.to_string()))
            }
            None => Ok(()),
        }
    }

    /// 验证字段映射和静态字段
    pub fn validate_fields(config: &LoggingConfig) -> Result<(), CommonError> {
        for (key, attribute) in config.fields.iter() {
            if key.is_empty() || attribute.is_empty() {
                return Err(CommonError::validation(format!(
                    "字段映射不能包含空键或空属性: {key:?} -> {attribute:?}"
                )));
            }
        }

        if config.always_extra.keys().any(str::is_empty) {
            return Err(CommonError::validation("静态字段名不能为空"));
        }

        Ok(())
    }
}
