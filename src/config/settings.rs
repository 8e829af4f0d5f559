// 日志设置
// 定义配置结构体和加载逻辑

use crate::logging::context::RestorePolicy;
use crate::logging::formatter::{AlwaysExtra, FieldMap};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use useful_logs_common::CommonError;

/// 配置文件名（不含扩展名）
pub const CONFIG_FILE: &str = "logging";

/// 环境变量前缀
pub const ENV_PREFIX: &str = "USEFUL_LOGS";

// 覆盖时整体替换而不是与默认值合并的键
const MAP_KEYS: [&str; 2] = ["fields", "always_extra"];

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 最低日志级别或 EnvFilter 指令，`RUST_LOG` 优先
    pub level: String,
    /// 关闭时使用纯文本格式
    pub json: bool,
    /// 日志文件路径，支持 `{hostname}` 和 `{filename}`；为空时写 stdout
    pub file_path: Option<String>,
    /// 文件轮转策略: never、minutely、hourly、daily
    pub rotation: String,
    pub fields: FieldMap,
    pub always_extra: AlwaysExtra,
    /// strftime 时间格式
    pub date_format: Option<String>,
    pub restore_policy: RestorePolicy,
    /// 是否安装 panic 钩子
    pub install_hooks: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
            file_path: None,
            rotation: "never".to_string(),
            fields: FieldMap::default(),
            always_extra: AlwaysExtra::default(),
            date_format: None,
            restore_policy: RestorePolicy::default(),
            install_hooks: true,
        }
    }
}

impl LoggingConfig {
    /// 从默认值、配置文件和环境变量加载配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// 从指定配置文件加载，文件不存在时跳过
    pub fn load_from(config_file: &str) -> Result<Self, ConfigError> {
        let mut config = Config::builder();

        // 1. 加载默认配置
        // 映射类字段不参与合并，由 serde(default) 补齐，配置时整体替换
        let mut defaults = serde_json::to_value(LoggingConfig::default())
            .map_err(|e| ConfigError::Foreign(Box::new(e)))?;
        if let Some(table) = defaults.as_object_mut() {
            table.retain(|key, value| !MAP_KEYS.contains(&key.as_str()) && !value.is_null());
        }
        config = config.add_source(Config::try_from(&defaults)?);

        // 2. 尝试加载配置文件
        if Path::new(&format!("{config_file}.toml")).exists() {
            config = config.add_source(File::with_name(config_file));
        }

        // 3. 加载环境变量（优先级最高）
        config = config.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        // 4. 构建并反序列化
        config.build()?.try_deserialize()
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), CommonError> {
        use crate::config::ConfigValidator;

        match ConfigValidator::validate_all(self) {
            Ok(()) => Ok(()),
            Err(errors) => {
                let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                Err(CommonError::configuration(format!(
                    "配置验证失败: {}",
                    error_messages.join("; ")
                )))
            }
        }
    }

    /// 是否写入文件
    pub fn file_enabled(&self) -> bool {
        self.file_path.is_some()
    }
}
