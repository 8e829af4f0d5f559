// Useful Logs Library
// 结构化 JSON 日志、可在线程间传递的上下文字段，以及统一的未捕获错误日志

pub mod config;
pub mod errors;
pub mod logging;

pub use crate::config::{ConfigLoader, LoggingConfig};
pub use crate::errors::{LogError, LogResult};
pub use crate::logging::context;
pub use crate::logging::{LoggingSetup, configure_formatter};
pub use useful_logs_common::{CommonError, FieldValue, Fields};
