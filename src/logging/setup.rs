// 日志系统设置

use crate::config::LoggingConfig;
use crate::errors::{LogError, LogResult};
use crate::logging::context::set_restore_policy;
use crate::logging::event::mark_start_time;
use crate::logging::formatter::{JsonFormatter, configure_formatter};
use crate::logging::hooks;
use crate::logging::plain::PlainFormatter;
use anyhow::Result;
use std::path::Path;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// 路径模板中 `{filename}` 的替换值
pub const DEFAULT_LOG_FILENAME: &str = "rust.log";

/// 日志系统初始化器
pub struct LoggingSetup;

impl LoggingSetup {
    /// 初始化日志系统
    pub fn init(config: &LoggingConfig) -> Result<()> {
        mark_start_time();

        // 创建环境过滤器
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let (writer, path) = Self::make_writer(config)?;

        // 根据配置创建订阅器
        if config.json {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .event_format(Self::build_formatter(config)?)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        } else {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .event_format(PlainFormatter::new(config.date_format.as_deref())?)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }

        set_restore_policy(config.restore_policy);
        if config.install_hooks {
            hooks::install();
        }

        tracing::debug!(
            level = %config.level,
            json = config.json,
            restore_policy = ?config.restore_policy,
            "日志系统初始化完成"
        );
        if let Some(path) = path {
            tracing::debug!(path = %path, "文件日志已启用");
        }

        Ok(())
    }

    /// 按配置创建 JSON 格式化器
    pub fn build_formatter(config: &LoggingConfig) -> LogResult<JsonFormatter> {
        configure_formatter(
            config.fields.clone(),
            config.always_extra.clone(),
            config.date_format.as_deref(),
        )
    }

    // 未配置路径时写 stdout
    fn make_writer(config: &LoggingConfig) -> LogResult<(BoxMakeWriter, Option<String>)> {
        let Some(template) = config.file_path.as_deref() else {
            return Ok((BoxMakeWriter::new(std::io::stdout), None));
        };

        let path = Self::resolve_path(template);
        let file = Path::new(&path);
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| LogError::configuration(format!("日志文件路径缺少文件名: {path}")))?;
        let directory = match file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        std::fs::create_dir_all(&directory)?;

        let appender = RollingFileAppender::builder()
            .rotation(Self::parse_rotation(&config.rotation)?)
            .filename_prefix(file_name)
            .build(directory)
            .map_err(|e| LogError::configuration(format!("无法创建日志文件 {path}: {e}")))?;

        Ok((BoxMakeWriter::new(appender), Some(path)))
    }

    /// 替换路径模板中的 `{hostname}` 和 `{filename}`
    pub fn resolve_path(template: &str) -> String {
        template
            .replace("{hostname}", &Self::hostname())
            .replace("{filename}", DEFAULT_LOG_FILENAME)
    }

    /// 当前主机名
    pub fn hostname() -> String {
        ["HOSTNAME", "COMPUTERNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    }

    /// 解析日志级别
    pub fn parse_level(level: &str) -> Level {
        match level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// 解析文件轮转策略
    pub fn parse_rotation(rotation: &str) -> LogResult<Rotation> {
        match rotation.to_lowercase().as_str() {
            "never" => Ok(Rotation::NEVER),
            "minutely" => Ok(Rotation::MINUTELY),
            "hourly" => Ok(Rotation::HOURLY),
            "daily" => Ok(Rotation::DAILY),
            other => Err(LogError::configuration(format!("未知的日志轮转策略: {other}"))),
        }
    }

    /// 创建开发环境日志配置
    pub fn development_config() -> LoggingConfig {
        LoggingConfig {
            level: "debug".to_string(),
            json: false,
            ..LoggingConfig::default()
        }
    }

    /// 创建生产环境日志配置
    pub fn production_config() -> LoggingConfig {
        LoggingConfig {
            level: "info".to_string(),
            json: true,
            file_path: Some("./logs/{hostname}-{filename}".to_string()),
            rotation: "daily".to_string(),
            ..LoggingConfig::default()
        }
    }

    /// 创建测试环境日志配置
    pub fn test_config() -> LoggingConfig {
        LoggingConfig {
            level: "warn".to_string(),
            json: true,
            install_hooks: false,
            ..LoggingConfig::default()
        }
    }
}
