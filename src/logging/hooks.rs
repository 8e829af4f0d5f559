// 未捕获错误日志钩子
// 将 panic 和无法向上传播的错误转换为 ERROR 级别的普通日志

use crate::logging::event::ExceptionInfo;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;
use std::panic::PanicHookInfo;
use std::sync::Once;

/// 主线程未捕获 panic 的日志消息
pub const UNCAUGHT_MESSAGE: &str = "Uncaught exception";

/// 后台线程未捕获 panic 的日志消息
pub const UNCAUGHT_THREAD_MESSAGE: &str = "Uncaught threading exception";

/// 无法传播的错误的默认日志消息
pub const UNRAISABLE_MESSAGE: &str = "Unraisable exception";

const MAIN_THREAD_NAME: &str = "main";

static INSTALL: Once = Once::new();

/// 后台线程异常参数
#[derive(Debug, Clone, Default)]
pub struct ThreadExceptionArgs {
    pub exc: Option<ExceptionInfo>,
    pub thread: Option<String>,
}

/// 无法传播的错误参数
///
/// `object` 只是出错对象的引用，不会写入日志。
#[derive(Default)]
pub struct UnraisableArgs<'a> {
    pub exc: Option<ExceptionInfo>,
    pub err_msg: Option<String>,
    pub object: Option<&'a dyn fmt::Debug>,
}

/// 记录主线程未捕获的异常
pub fn except_logging(exc: Option<&ExceptionInfo>) {
    emit(UNCAUGHT_MESSAGE, exc, None);
}

/// 记录后台线程未捕获的异常
pub fn threading_except_logging(args: &ThreadExceptionArgs) {
    emit(UNCAUGHT_THREAD_MESSAGE, args.exc.as_ref(), args.thread.as_deref());
}

/// 记录无法传播的异常，没有消息时使用默认消息
pub fn unraisable_logging(args: &UnraisableArgs<'_>) {
    let message = args.err_msg.as_deref().unwrap_or(UNRAISABLE_MESSAGE);
    emit(message, args.exc.as_ref(), None);
}

/// 供 `Drop` 等清理路径上报无法返回的错误
pub fn report_unraisable<E>(err: &E, err_msg: Option<&str>, object: Option<&dyn fmt::Debug>)
where
    E: Error + ?Sized,
{
    unraisable_logging(&UnraisableArgs {
        exc: Some(ExceptionInfo::from_error(err)),
        err_msg: err_msg.map(ToOwned::to_owned),
        object,
    });
}

fn emit(message: &str, exc: Option<&ExceptionInfo>, thread: Option<&str>) {
    let Some(exc) = exc else {
        match thread {
            Some(thread) => tracing::error!(exc_thread = thread, "{message}"),
            None => tracing::error!("{message}"),
        }
        return;
    };

    let value = exc.value.as_deref().unwrap_or_default();
    let traceback = exc.traceback.as_deref().unwrap_or_default();
    match thread {
        Some(thread) => tracing::error!(
            exc_type = %exc.type_name,
            exc_value = value,
            exc_traceback = traceback,
            exc_thread = thread,
            "{message}"
        ),
        None => tracing::error!(
            exc_type = %exc.type_name,
            exc_value = value,
            exc_traceback = traceback,
            "{message}"
        ),
    }
}

/// 安装进程级 panic 钩子
///
/// 只会安装一次，且不提供卸载。主线程的 panic 交给 [`except_logging`]，
/// 其他线程交给 [`threading_except_logging`]。
pub fn install() {
    INSTALL.call_once(|| {
        std::panic::set_hook(Box::new(panic_hook));
    });
}

fn panic_hook(info: &PanicHookInfo<'_>) {
    let exc = panic_exception(info);
    let current = std::thread::current();

    match current.name() {
        Some(MAIN_THREAD_NAME) => except_logging(Some(&exc)),
        name => threading_except_logging(&ThreadExceptionArgs {
            exc: Some(exc),
            thread: name.map(ToOwned::to_owned),
        }),
    }
}

fn panic_exception(info: &PanicHookInfo<'_>) -> ExceptionInfo {
    let payload = info.payload();
    let value = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());

    let mut traceback = Vec::new();
    if let Some(location) = info.location() {
        traceback.push(format!("at {}:{}:{}", location.file(), location.line(), location.column()));
    }
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        traceback.push(backtrace.to_string());
    }

    ExceptionInfo {
        type_name: "panic".to_string(),
        value,
        traceback: (!traceback.is_empty()).then(|| traceback.join("\n")),
    }
}
