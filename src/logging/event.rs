// 日志事件模型
// 标准属性、异常信息，以及从 tracing 事件的转换

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use useful_logs_common::FieldValue;

/// 时间戳属性名，字段映射引用它时才格式化时间
pub const TIMESTAMP_ATTRIBUTE: &str = "asctime";

/// 异常堆栈属性名，解析为缓存的堆栈文本
pub const TRACEBACK_ATTRIBUTE: &str = "exc_info";

/// 内部字段前缀，带此前缀的附加字段不会输出
pub const INTERNAL_PREFIX: &str = "_";

/// 标准事件属性，附加字段不能覆盖它们
pub const RESERVED_ATTRIBUTES: &[&str] = &[
    "args",
    "asctime",
    "created",
    "exc_info",
    "exc_text",
    "filename",
    "func_name",
    "levelname",
    "levelno",
    "lineno",
    "message",
    "module",
    "msecs",
    "msg",
    "name",
    "pathname",
    "process",
    "process_name",
    "relative_created",
    "stack_info",
    "thread",
    "thread_name",
];

// tracing 字段约定
const MESSAGE_FIELD: &str = "message";
const EXC_TYPE_FIELD: &str = "exc_type";
const EXC_VALUE_FIELD: &str = "exc_value";
const EXC_TRACEBACK_FIELD: &str = "exc_traceback";
const STACK_INFO_FIELD: &str = "stack_info";
/// 恢复快照时的原上下文，以 JSON 文本记录，输出为 JSON 对象
pub(crate) const CURRENT_STATE_FIELD: &str = "current_state";

static START_TIME: LazyLock<DateTime<Utc>> = LazyLock::new(Utc::now);

static PROCESS_NAME: LazyLock<Option<String>> = LazyLock::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
});

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// 判断名称是否属于标准属性
pub fn is_reserved(name: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&name)
}

/// 记录进程启动时间，`relative_created` 以此为基准
pub fn mark_start_time() {
    LazyLock::force(&START_TIME);
}

/// 当前线程的数字标识
pub fn current_thread_id() -> u64 {
    THREAD_ID.try_with(|id| *id).unwrap_or(0)
}

/// tracing 级别对应的数字级别
pub fn level_number(level: Level) -> u8 {
    match level {
        Level::TRACE => 5,
        Level::DEBUG => 10,
        Level::INFO => 20,
        Level::WARN => 30,
        _ => 40,
    }
}

/// 异常信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub value: Option<String>,
    pub traceback: Option<String>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: None,
            traceback: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    /// 从错误值创建，错误链写入堆栈部分
    pub fn from_error<E: Error + ?Sized>(err: &E) -> Self {
        let mut info = Self::new(std::any::type_name::<E>()).with_value(err.to_string());

        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("Caused by: {cause}"));
            source = cause.source();
        }
        if !causes.is_empty() {
            info.traceback = Some(causes.join("\n"));
        }
        info
    }

    /// 渲染为堆栈文本：堆栈在前，`类型: 值` 在最后一行
    pub fn format(&self) -> String {
        let mut text = String::new();
        if let Some(traceback) = self.traceback.as_deref().filter(|t| !t.is_empty()) {
            text.push_str(traceback.trim_end());
            text.push('\n');
        }
        text.push_str(&self.type_name);
        if let Some(value) = self.value.as_deref().filter(|v| !v.is_empty()) {
            text.push_str(": ");
            text.push_str(value);
        }
        text
    }
}

/// 一次日志调用
///
/// 构造后不可变，唯一的例外是格式化后的异常堆栈缓存。
#[derive(Debug)]
pub struct LogEvent {
    msg: String,
    args: Vec<String>,
    level: Level,
    name: String,
    pathname: Option<String>,
    module: Option<String>,
    func_name: Option<String>,
    lineno: Option<u32>,
    created: DateTime<Utc>,
    process: u32,
    process_name: Option<String>,
    thread: u64,
    thread_name: Option<String>,
    exc_info: Option<ExceptionInfo>,
    exc_text: OnceLock<String>,
    stack_info: Option<String>,
    extra: BTreeMap<String, FieldValue>,
}

impl LogEvent {
    /// 在当前线程上创建事件
    pub fn new(level: Level, msg: impl Into<String>) -> Self {
        mark_start_time();
        let current = std::thread::current();
        Self {
            msg: msg.into(),
            args: Vec::new(),
            level,
            name: "root".to_string(),
            pathname: None,
            module: None,
            func_name: None,
            lineno: None,
            created: Utc::now(),
            process: std::process::id(),
            process_name: PROCESS_NAME.clone(),
            thread: current_thread_id(),
            thread_name: current.name().map(ToOwned::to_owned),
            exc_info: None,
            exc_text: OnceLock::new(),
            stack_info: None,
            extra: BTreeMap::new(),
        }
    }

    /// 从 tracing 事件创建
    pub fn from_tracing(event: &Event<'_>) -> Self {
        let meta = event.metadata();
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut record = Self::new(*meta.level(), visitor.message.unwrap_or_default());
        record.name = meta.target().to_string();
        record.pathname = meta.file().map(ToOwned::to_owned);
        record.module = meta.module_path().map(ToOwned::to_owned);
        record.lineno = meta.line();
        record.stack_info = visitor.stack_info;
        record.extra = visitor.extra;
        record.exc_info = match (visitor.exc_type, visitor.exc_value, visitor.exc_traceback) {
            (None, None, None) => None,
            (type_name, value, traceback) => Some(ExceptionInfo {
                type_name: type_name.unwrap_or_else(|| "Error".to_string()),
                value,
                traceback,
            }),
        };
        record
    }

    /// 从格式化上下文创建，当前 span 名作为函数名
    pub fn from_fmt_context<S, N>(ctx: &FmtContext<'_, S, N>, event: &Event<'_>) -> Self
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
        N: for<'a> FormatFields<'a> + 'static,
    {
        let record = Self::from_tracing(event);
        match ctx.lookup_current() {
            Some(span) => record.with_func_name(span.name()),
            None => record,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: fmt::Display,
    {
        self.args = args.into_iter().map(|arg| arg.to_string()).collect();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_location(mut self, pathname: impl Into<String>, lineno: u32) -> Self {
        self.pathname = Some(pathname.into());
        self.lineno = Some(lineno);
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_func_name(mut self, func_name: impl Into<String>) -> Self {
        self.func_name = Some(func_name.into());
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn with_exception(mut self, exc_info: ExceptionInfo) -> Self {
        self.exc_info = Some(exc_info);
        self
    }

    pub fn with_stack_info(mut self, stack_info: impl Into<String>) -> Self {
        self.stack_info = Some(stack_info.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// 渲染后的消息：`msg` 中的 `{}` 依次替换为 `args`
    pub fn message(&self) -> String {
        if self.args.is_empty() {
            return self.msg.clone();
        }

        let mut args = self.args.iter();
        let mut rendered = String::with_capacity(self.msg.len());
        let mut rest = self.msg.as_str();
        while let Some(pos) = rest.find("{}") {
            rendered.push_str(&rest[..pos]);
            match args.next() {
                Some(arg) => rendered.push_str(arg),
                None => rendered.push_str("{}"),
            }
            rest = &rest[pos + 2..];
        }
        rendered.push_str(rest);
        rendered
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pathname(&self) -> Option<&str> {
        self.pathname.as_deref()
    }

    pub fn lineno(&self) -> Option<u32> {
        self.lineno
    }

    pub fn created(&self) -> &DateTime<Utc> {
        &self.created
    }

    pub fn process(&self) -> u32 {
        self.process
    }

    pub fn exc_info(&self) -> Option<&ExceptionInfo> {
        self.exc_info.as_ref()
    }

    /// 已缓存的异常堆栈文本
    pub fn exc_text(&self) -> Option<&str> {
        self.exc_text.get().map(String::as_str)
    }

    /// 格式化异常堆栈，每个事件只格式化一次
    pub fn cache_exc_text(&self) -> Option<&str> {
        let exc_info = self.exc_info.as_ref()?;
        Some(self.exc_text.get_or_init(|| exc_info.format()).as_str())
    }

    pub fn stack_info(&self) -> Option<&str> {
        self.stack_info.as_deref()
    }

    pub fn extra(&self) -> &BTreeMap<String, FieldValue> {
        &self.extra
    }

    /// 按名称解析标准属性，未知名称回退到附加字段
    ///
    /// `asctime` 由格式化器计算，这里不解析。
    pub fn attribute(&self, name: &str) -> serde_json::Result<Option<Value>> {
        let value = match name {
            "message" => Some(json!(self.message())),
            "msg" => Some(json!(self.msg)),
            "args" => Some(json!(self.args)),
            "created" => Some(json!(self.created.timestamp_micros() as f64 / 1_000_000.0)),
            "msecs" => Some(json!(self.created.timestamp_subsec_micros() as f64 / 1000.0)),
            "relative_created" => {
                let elapsed = self.created - *START_TIME;
                Some(json!(elapsed.num_microseconds().unwrap_or(0) as f64 / 1000.0))
            }
            "levelname" => Some(json!(self.level.as_str())),
            "levelno" => Some(json!(level_number(self.level))),
            "name" => Some(json!(self.name)),
            "pathname" => self.pathname.as_ref().map(|p| json!(p)),
            "filename" => self
                .pathname
                .as_deref()
                .and_then(|p| Path::new(p).file_name())
                .map(|f| json!(f.to_string_lossy())),
            "module" => self.module.as_ref().map(|m| json!(m)),
            "func_name" => self.func_name.as_ref().map(|f| json!(f)),
            "lineno" => self.lineno.map(|l| json!(l)),
            "process" => Some(json!(self.process)),
            "process_name" => self.process_name.as_ref().map(|p| json!(p)),
            "thread" => Some(json!(self.thread)),
            "thread_name" => self.thread_name.as_ref().map(|t| json!(t)),
            "exc_info" | "exc_text" => self.exc_text().map(|t| json!(t)),
            "stack_info" => self.stack_info.as_ref().map(|s| json!(s)),
            TIMESTAMP_ATTRIBUTE => None,
            other => match self.extra.get(other) {
                Some(value) => Some(value.to_json()?),
                None => None,
            },
        };
        Ok(value)
    }
}

/// 收集 tracing 事件字段
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    exc_type: Option<String>,
    exc_value: Option<String>,
    exc_traceback: Option<String>,
    stack_info: Option<String>,
    extra: BTreeMap<String, FieldValue>,
}

impl EventVisitor {
    fn record_text(&mut self, field: &Field, text: String) {
        match field.name() {
            MESSAGE_FIELD => self.message = Some(text),
            EXC_TYPE_FIELD => self.exc_type = Some(text),
            EXC_VALUE_FIELD => self.exc_value = Some(text),
            EXC_TRACEBACK_FIELD => self.exc_traceback = Some(text),
            STACK_INFO_FIELD => self.stack_info = Some(text),
            CURRENT_STATE_FIELD => {
                let value = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
                self.extra.insert(CURRENT_STATE_FIELD.to_string(), FieldValue::from(value));
            }
            name => {
                self.extra.insert(name.to_string(), FieldValue::from(text));
            }
        }
    }

    // 保留字段名按文本处理，其余保留原始类型
    fn record_value<T>(&mut self, field: &Field, value: T)
    where
        T: Into<FieldValue> + fmt::Display,
    {
        match field.name() {
            MESSAGE_FIELD | EXC_TYPE_FIELD | EXC_VALUE_FIELD | EXC_TRACEBACK_FIELD
            | STACK_INFO_FIELD => self.record_text(field, value.to_string()),
            name => {
                self.extra.insert(name.to_string(), value.into());
            }
        }
    }
}

impl Visit for EventVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value);
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        self.record_value(field, value);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        self.record_value(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.record_text(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field, format!("{value:?}"));
    }
}
