// 日志系统模块
// 结构化 JSON 日志、线程上下文字段和未捕获错误钩子

pub mod context;
pub mod event;
pub mod formatter;
pub mod plain;
pub mod hooks;
pub mod setup;


pub use context::{ContextGuard, ContextSnapshot, FutureExt, RestorePolicy, WithContext};
pub use event::{ExceptionInfo, LogEvent};
pub use formatter::*;
pub use plain::*;
pub use hooks::{ThreadExceptionArgs, UnraisableArgs};
pub use setup::*;
