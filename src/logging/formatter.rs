// JSON 日志格式化器
// 合并静态字段、事件属性、附加字段和执行上下文，生成单行 JSON

use crate::errors::{LogError, LogResult};
use crate::logging::context;
use crate::logging::event::{INTERNAL_PREFIX, LogEvent, TIMESTAMP_ATTRIBUTE, TRACEBACK_ATTRIBUTE, is_reserved};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// 默认时间格式，例如 `2024-05-01 12:30:45,123`
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// 字段映射：输出键 → 事件属性名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, key: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.0.insert(key.into(), attribute.into());
        self
    }

    /// 是否有输出键引用该属性
    pub fn references(&self, attribute: &str) -> bool {
        self.0.values().any(|value| value == attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FieldMap {
    /// 消息、时间、级别、进程、线程和异常堆栈
    fn default() -> Self {
        Self::new()
            .with("message", "message")
            .with("time", TIMESTAMP_ATTRIBUTE)
            .with("level", "levelname")
            .with("process", "process")
            .with("process_name", "process_name")
            .with("thread", "thread")
            .with("thread_name", "thread_name")
            .with("traceback", TRACEBACK_ATTRIBUTE)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// 每条日志都附带的静态字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlwaysExtra(Map<String, Value>);

impl AlwaysExtra {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl Default for AlwaysExtra {
    fn default() -> Self {
        Self::new().with("src", "rust")
    }
}

impl From<Map<String, Value>> for AlwaysExtra {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// 时间戳格式化
pub trait TimeFormatter: Send + Sync {
    fn format_time(&self, created: &DateTime<Utc>, date_format: &str) -> String;
}

/// 基于 chrono 的本地时间格式化
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTime;

impl TimeFormatter for LocalTime {
    fn format_time(&self, created: &DateTime<Utc>, date_format: &str) -> String {
        created.with_timezone(&Local).format(date_format).to_string()
    }
}

/// 校验 strftime 格式，非法格式在 chrono 渲染时会 panic
pub fn validate_date_format(date_format: &str) -> LogResult<()> {
    if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
        return Err(LogError::configuration(format!("无效的时间格式: {date_format}")));
    }
    Ok(())
}

/// 判断值是否为空，空值不写入字段映射的输出
pub(crate) fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// JSON 格式化器
///
/// 配置完成后不可变，可被多个线程同时使用。每次格式化都读取调用线程的执行上下文。
#[derive(Clone)]
pub struct JsonFormatter {
    fields: FieldMap,
    always_extra: AlwaysExtra,
    date_format: String,
    uses_time: bool,
    timer: Arc<dyn TimeFormatter>,
}

impl fmt::Debug for JsonFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFormatter")
            .field("fields", &self.fields)
            .field("always_extra", &self.always_extra)
            .field("date_format", &self.date_format)
            .field("uses_time", &self.uses_time)
            .finish_non_exhaustive()
    }
}

/// 创建 JSON 格式化器
pub fn configure_formatter(
    fields: FieldMap,
    always_extra: AlwaysExtra,
    date_format: Option<&str>,
) -> LogResult<JsonFormatter> {
    JsonFormatter::new(fields, always_extra, date_format)
}

impl JsonFormatter {
    pub fn new(fields: FieldMap, always_extra: AlwaysExtra, date_format: Option<&str>) -> LogResult<Self> {
        let date_format = date_format.unwrap_or(DEFAULT_DATE_FORMAT);
        validate_date_format(date_format)?;

        Ok(Self {
            uses_time: fields.references(TIMESTAMP_ATTRIBUTE),
            fields,
            always_extra,
            date_format: date_format.to_string(),
            timer: Arc::new(LocalTime),
        })
    }

    /// 替换时间戳格式化实现
    pub fn with_timer(mut self, timer: impl TimeFormatter + 'static) -> Self {
        self.timer = Arc::new(timer);
        self
    }

    /// 字段映射是否引用了时间戳
    pub fn uses_time(&self) -> bool {
        self.uses_time
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn always_extra(&self) -> &AlwaysExtra {
        &self.always_extra
    }

    /// 格式化为单行 JSON
    pub fn format(&self, event: &LogEvent) -> LogResult<String> {
        let record = self.build_record(event)?;
        Ok(serde_json::to_string(&record)?)
    }

    /// 按优先级合并：静态字段 < 字段映射 < 附加字段 < 执行上下文
    pub fn build_record(&self, event: &LogEvent) -> LogResult<Map<String, Value>> {
        let mut data = self.always_extra.0.clone();

        let asctime = self
            .uses_time
            .then(|| self.timer.format_time(event.created(), &self.date_format));
        let exc_text = event.cache_exc_text();

        for (key, attribute) in self.fields.iter() {
            let value = match attribute {
                TIMESTAMP_ATTRIBUTE => asctime.clone().map(Value::String),
                TRACEBACK_ATTRIBUTE => exc_text.map(|text| Value::String(text.to_string())),
                _ => event.attribute(attribute)?,
            };

            if let Some(value) = value.filter(|v| !is_falsy(v)) {
                data.insert(key.to_string(), value);
            }
        }

        for (key, value) in event.extra() {
            if is_reserved(key) || key.starts_with(INTERNAL_PREFIX) {
                continue;
            }
            data.insert(key.clone(), value.to_json()?);
        }

        for (key, value) in context::get_all() {
            data.insert(key, value.to_json()?);
        }

        Ok(data)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        let fields = FieldMap::default();
        Self {
            uses_time: fields.references(TIMESTAMP_ATTRIBUTE),
            fields,
            always_extra: AlwaysExtra::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            timer: Arc::new(LocalTime),
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let record = LogEvent::from_fmt_context(ctx, event);
        // 格式化失败交给 tracing-subscriber 输出到 stderr，不再经过日志管道
        let line = self.format(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}
