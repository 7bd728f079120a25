//! 执行上下文：在一段工作前后建立与拆除运行环境。
//!
//! # 教案式概览
//! - **意图（Why）**：作业需要在特定的运行环境中执行（关联 ID、区域设置、任意属性），
//!   且无论工作成功、失败还是 panic，环境都必须被拆除；
//! - **结构（How）**：[`ExecutionContext::enter`] 建立环境并返回 [`ContextScope`]，
//!   作用域在 `Drop` 中执行拆除；[`ExecutionContext::activate`] 把“进入 → 执行 → 拆除”封装为一次调用；
//! - **契约（What）**：拆除恰好执行一次；进入失败时工作不会执行。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{CoreResult, observability::targets};

/// 一次激活的作用域，离开作用域时执行拆除。
#[must_use = "dropping the scope tears the context down immediately"]
pub struct ContextScope {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl ContextScope {
    /// 以拆除动作构造作用域。
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextScope")
            .field("armed", &self.teardown.is_some())
            .finish()
    }
}

/// 可激活的执行上下文。
pub trait ExecutionContext: Send + Sync + 'static {
    /// 建立运行环境，返回负责拆除的作用域。
    fn enter(&self) -> CoreResult<ContextScope>;

    /// 在本上下文中执行 `work`，并保证拆除。
    fn activate<R, F>(&self, work: F) -> CoreResult<R>
    where
        Self: Sized,
        F: FnOnce() -> CoreResult<R>,
    {
        let _scope = self.enter()?;
        work()
    }
}

impl dyn ExecutionContext {
    /// 在本上下文中执行 `work`，并保证拆除。
    pub fn activate<R, F>(&self, work: F) -> CoreResult<R>
    where
        F: FnOnce() -> CoreResult<R>,
    {
        let _scope = self.enter()?;
        work()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<RunContext>>> = const { RefCell::new(None) };
}

/// 运行上下文：关联 ID、区域设置与任意字符串属性。
///
/// 激活期间，该上下文成为当前线程的“当前上下文”，可经 [`RunContext::current`] 读取；
/// 作用域结束时恢复之前的当前上下文，因此嵌套激活按栈语义还原。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunContext {
    correlation_id: Option<String>,
    locale: Option<String>,
    properties: BTreeMap<String, String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// 当前线程上处于激活状态的运行上下文。
    pub fn current() -> Option<Arc<RunContext>> {
        CURRENT.with(|current| current.borrow().clone())
    }
}

impl ExecutionContext for RunContext {
    fn enter(&self) -> CoreResult<ContextScope> {
        let previous = CURRENT.with(|current| current.replace(Some(Arc::new(self.clone()))));
        tracing::trace!(
            target: targets::CONTEXT,
            correlation_id = self.correlation_id.as_deref(),
            "run context entered"
        );
        Ok(ContextScope::new(move || {
            CURRENT.with(|current| current.replace(previous));
            tracing::trace!(target: targets::CONTEXT, "run context left");
        }))
    }
}
