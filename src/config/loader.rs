// 配置加载器
// 处理 .env 文件加载和全局配置实例

use crate::config::LoggingConfig;
use config::ConfigError;
use dotenvy::dotenv;
use std::sync::OnceLock;
use useful_logs_common::CommonError;

/// 全局配置实例
static CONFIG: OnceLock<LoggingConfig> = OnceLock::new();

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 初始化配置
    ///
    /// 日志系统此时尚未初始化，加载过程本身不写日志。
    pub fn init() -> Result<&'static LoggingConfig, CommonError> {
        // 加载 .env 文件，文件不存在时忽略
        let _ = dotenv();

        // 加载并验证配置
        let config = LoggingConfig::load().map_err(convert_config_error)?;
        config.validate()?;

        // 存储到全局变量
        CONFIG
            .set(config)
            .map_err(|_| CommonError::internal("配置已经初始化"))?;

        Self::get()
    }

    /// 获取配置
    pub fn get() -> Result<&'static LoggingConfig, CommonError> {
        CONFIG
            .get()
            .ok_or_else(|| CommonError::internal("配置未初始化，请先调用 ConfigLoader::init()"))
    }

    /// 打印配置摘要
    pub fn print_summary() -> Result<(), CommonError> {
        let config = Self::get()?;

        tracing::info!(
            level = %config.level,
            json = config.json,
            file_path = ?config.file_path,
            rotation = %config.rotation,
            fields = config.fields.len(),
            restore_policy = ?config.restore_policy,
            install_hooks = config.install_hooks,
            "日志配置摘要"
        );
        Ok(())
    }
}

/// 配置错误转换辅助函数
pub fn convert_config_error(err: ConfigError) -> CommonError {
    CommonError::configuration(format!("配置错误: {}", err))
}
