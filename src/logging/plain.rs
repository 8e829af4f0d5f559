// 纯文本日志格式化器
// 关闭 JSON 模式时使用: `时间 [级别] 路径:行号 (进程号): 消息`

use crate::errors::LogResult;
use crate::logging::event::LogEvent;
use crate::logging::formatter::{DEFAULT_DATE_FORMAT, LocalTime, TimeFormatter, validate_date_format};
use std::fmt;
use std::sync::Arc;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// 纯文本格式化器
#[derive(Clone)]
pub struct PlainFormatter {
    date_format: String,
    timer: Arc<dyn TimeFormatter>,
}

impl PlainFormatter {
    pub fn new(date_format: Option<&str>) -> LogResult<Self> {
        let date_format = date_format.unwrap_or(DEFAULT_DATE_FORMAT);
        validate_date_format(date_format)?;

        Ok(Self {
            date_format: date_format.to_string(),
            timer: Arc::new(LocalTime),
        })
    }

    pub fn with_timer(mut self, timer: impl TimeFormatter + 'static) -> Self {
        self.timer = Arc::new(timer);
        self
    }

    pub fn format(&self, event: &LogEvent) -> String {
        let mut line = format!(
            "{} [{}] {}:{} ({}): {}",
            self.timer.format_time(event.created(), &self.date_format),
            event.level(),
            event.pathname().unwrap_or("<unknown>"),
            event.lineno().unwrap_or(0),
            event.process(),
            event.message(),
        );

        if let Some(exc_text) = event.cache_exc_text() {
            line.push('\n');
            line.push_str(exc_text);
        }
        if let Some(stack_info) = event.stack_info() {
            line.push('\n');
            line.push_str(stack_info);
        }
        line
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            timer: Arc::new(LocalTime),
        }
    }
}

impl fmt::Debug for PlainFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainFormatter")
            .field("date_format", &self.date_format)
            .finish_non_exhaustive()
    }
}

impl<S, N> FormatEvent<S, N> for PlainFormatter
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
        writeln!(writer, "{}", self.format(&record))
    }
}
