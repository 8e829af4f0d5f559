// 日志上下文管理
// 每个线程独立的环境字段，通过快照在线程和任务之间传递

use crate::errors::{LogError, LogResult};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use useful_logs_common::{FieldValue, Fields};

thread_local! {
    static CONTEXT: RefCell<Fields> = RefCell::new(HashMap::new());
}

static RESTORE_POLICY: AtomicU8 = AtomicU8::new(RestorePolicy::Warn as u8);

/// 向非空上下文恢复快照时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestorePolicy {
    /// 记录一条警告，然后逐字段覆盖
    #[default]
    Warn = 0,
    /// 拒绝恢复并返回 `LogError::ContextNotEmpty`
    Strict = 1,
}

/// 设置进程级的恢复策略
pub fn set_restore_policy(policy: RestorePolicy) {
    RESTORE_POLICY.store(policy as u8, Ordering::Relaxed);
}

/// 获取进程级的恢复策略
pub fn restore_policy() -> RestorePolicy {
    match RESTORE_POLICY.load(Ordering::Relaxed) {
        1 => RestorePolicy::Strict,
        _ => RestorePolicy::Warn,
    }
}

/// 执行上下文快照
///
/// 创建后与源上下文完全独立，源上下文之后的修改不会影响快照。
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    fields: Fields,
}

impl ContextSnapshot {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// 按进程策略恢复到当前线程，守卫释放时清理上下文
    pub fn attach(self) -> LogResult<ContextGuard> {
        restore(self)?;
        Ok(ContextGuard { _private: () })
    }
}

impl From<Fields> for ContextSnapshot {
    fn from(fields: Fields) -> Self {
        Self { fields }
    }
}

/// 上下文守卫，释放时调用 [`cleanup`]
#[must_use = "守卫释放时会立即清理上下文"]
#[derive(Debug)]
pub struct ContextGuard {
    _private: (),
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        cleanup();
    }
}

/// 设置当前线程上下文中的字段，同名字段会被覆盖
pub fn set(key: impl Into<String>, value: impl Into<FieldValue>) {
    let (key, value) = (key.into(), value.into());
    // 旧值在借用结束后才释放，其 Drop 可以记录日志
    let previous = CONTEXT.with(|ctx| ctx.borrow_mut().insert(key, value));
    drop(previous);
}

/// 获取单个字段
pub fn get(key: &str) -> Option<FieldValue> {
    CONTEXT
        .try_with(|ctx| ctx.borrow().get(key).cloned())
        .ok()
        .flatten()
}

/// 移除单个字段
pub fn remove(key: &str) -> Option<FieldValue> {
    CONTEXT
        .try_with(|ctx| ctx.borrow_mut().remove(key))
        .ok()
        .flatten()
}

/// 获取当前线程上下文的全部字段
///
/// 线程退出阶段（线程局部存储已销毁）返回空映射。
pub fn get_all() -> Fields {
    CONTEXT
        .try_with(|ctx| ctx.borrow().clone())
        .unwrap_or_default()
}

pub fn is_empty() -> bool {
    CONTEXT
        .try_with(|ctx| ctx.borrow().is_empty())
        .unwrap_or(true)
}

/// 复制当前线程上下文
pub fn snapshot() -> ContextSnapshot {
    ContextSnapshot::from(get_all())
}

/// 按进程策略将快照恢复到当前线程
pub fn restore(snapshot: ContextSnapshot) -> LogResult<()> {
    restore_with(snapshot, restore_policy())
}

/// 按指定策略将快照恢复到当前线程
pub fn restore_with(snapshot: ContextSnapshot, policy: RestorePolicy) -> LogResult<()> {
    let current = get_all();
    if !current.is_empty() {
        match policy {
            RestorePolicy::Strict => {
                return Err(LogError::context_not_empty(current.into_keys().collect()));
            }
            RestorePolicy::Warn => {
                let current_state: Map<String, Value> = current
                    .iter()
                    .map(|(key, value)| {
                        let json = value
                            .to_json()
                            .unwrap_or_else(|_| Value::String("<unserializable>".to_string()));
                        (key.clone(), json)
                    })
                    .collect();
                tracing::warn!(
                    current_state = %serde_json::Value::Object(current_state),
                    "恢复快照前执行上下文应为空"
                );
            }
        }
    }

    let replaced: Vec<FieldValue> = CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        let replaced = snapshot
            .fields
            .into_iter()
            .filter_map(|(key, value)| ctx.insert(key, value))
            .collect();
        replaced
    });
    drop(replaced);
    Ok(())
}

/// 清空当前线程上下文，可重复调用
pub fn cleanup() {
    let fields = CONTEXT.try_with(|ctx| mem::take(&mut *ctx.borrow_mut()));
    drop(fields);
}

/// 启动新线程，新线程以调用方上下文的快照开始，结束时清理
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let snapshot = snapshot();
    thread::spawn(move || {
        let previous = CONTEXT.with(|ctx| ctx.replace(snapshot.fields));
        drop(previous);
        let result = f();
        cleanup();
        result
    })
}

/// 将上下文绑定到 future 上
pub trait FutureExt: Future + Sized {
    /// 每次 poll 期间把快照字段换入当前线程，poll 结束后换出
    fn with_context(self, snapshot: ContextSnapshot) -> WithContext<Self> {
        WithContext {
            inner: Box::pin(self),
            fields: snapshot.fields,
        }
    }
}

impl<F: Future> FutureExt for F {}

/// 携带执行上下文的 future
pub struct WithContext<F> {
    inner: Pin<Box<F>>,
    fields: Fields,
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let outer = CONTEXT.with(|ctx| ctx.replace(mem::take(&mut this.fields)));
        let _swap = SwapBack {
            fields: &mut this.fields,
            outer: Some(outer),
        };
        this.inner.as_mut().poll(cx)
    }
}

// poll 返回或 panic 时都把线程原有的上下文换回
struct SwapBack<'a> {
    fields: &'a mut Fields,
    outer: Option<Fields>,
}

impl Drop for SwapBack<'_> {
    fn drop(&mut self) {
        let outer = self.outer.take().unwrap_or_default();
        if let Ok(fields) = CONTEXT.try_with(|ctx| ctx.replace(outer)) {
            *self.fields = fields;
        }
    }
}
