//! 可链式执行单元。
//!
//! # 模块定位（Why）
//! - 作业执行被拆成若干“包装层”：每一层持有唯一的内层单元，在其前后补充上下文、异常处理、
//!   线程诊断等关注点，最内层是业务逻辑本身；
//! - 诊断工具需要沿链逐层遍历，因此每个包装层都暴露 [`Chainable::next`]。
//!
//! # 契约说明（What）
//! - 链是有限、无环的单向序列：所有权线性向内传递，[`walk`] 必然终止于最内层单元；
//! - 单元可重复执行，`call` 只借用 `&self`。

use std::borrow::Cow;
use std::fmt;

use crate::CoreResult;

/// 可执行单元：产生结果 `R` 或失败。
pub trait Callable<R>: Send + Sync {
    /// 执行单元。
    fn call(&self) -> CoreResult<R>;

    /// 若本单元是包装层，返回其链式视图。
    fn as_chainable(&self) -> Option<&dyn Chainable<R>> {
        None
    }
}

/// 类型擦除的执行单元。
pub type BoxCallable<R> = Box<dyn Callable<R>>;

impl<R> Callable<R> for Box<dyn Callable<R>> {
    fn call(&self) -> CoreResult<R> {
        (**self).call()
    }

    fn as_chainable(&self) -> Option<&dyn Chainable<R>> {
        (**self).as_chainable()
    }
}

/// 包装层的链式视图。
pub trait Chainable<R>: Callable<R> {
    /// 被包装的内层单元。
    fn next(&self) -> &dyn Callable<R>;

    /// 本层的描述信息。
    fn descriptor(&self) -> LayerDescriptor;
}

/// 闭包形式的执行单元，由 [`callable_fn`] 构造。
pub struct FnCallable<F> {
    f: F,
}

/// 将闭包包装为执行单元，通常作为链的最内层。
///
/// ```rust
/// use tenon_core::{callable_fn, Callable};
///
/// let work = callable_fn(|| Ok(21 * 2));
/// assert_eq!(work.call().unwrap(), 42);
/// assert!(work.as_chainable().is_none());
/// ```
pub fn callable_fn<R, F>(f: F) -> FnCallable<F>
where
    F: Fn() -> CoreResult<R> + Send + Sync,
{
    FnCallable { f }
}

impl<R, F> Callable<R> for FnCallable<F>
where
    F: Fn() -> CoreResult<R> + Send + Sync,
{
    fn call(&self) -> CoreResult<R> {
        (self.f)()
    }
}

impl<F> fmt::Debug for FnCallable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnCallable")
    }
}

/// 包装层的元数据，辅助链路诊断与可观测性。
///
/// # 契约说明（What）
/// - `name`：层的稳定标识，建议使用 `tenon.<layer>` 命名；
/// - `category`：分类（如 `context`、`exception`、`diagnostic`）；
/// - `summary`：人类可读描述。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerDescriptor {
    name: Cow<'static, str>,
    category: Cow<'static, str>,
    summary: Cow<'static, str>,
}

impl LayerDescriptor {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        category: impl Into<Cow<'static, str>>,
        summary: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            summary: summary.into(),
        }
    }

    /// 构造匿名描述，常用于测试或快速原型。
    pub fn anonymous(stage: impl Into<Cow<'static, str>>) -> Self {
        let stage = stage.into();
        Self {
            name: Cow::Owned(format!("anonymous.{stage}")),
            category: Cow::Borrowed("unspecified"),
            summary: Cow::Owned(format!("auto-generated descriptor for {stage}")),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// 从给定单元开始，逐层向内遍历整条链（含最内层）。
pub fn walk<'a, R>(head: &'a dyn Callable<R>) -> Walk<'a, R> {
    Walk {
        current: Some(head),
    }
}

/// 收集链上所有包装层的描述，顺序由外向内。
pub fn layer_descriptors<R>(head: &dyn Callable<R>) -> Vec<LayerDescriptor> {
    walk(head)
        .filter_map(|unit| unit.as_chainable())
        .map(|layer| layer.descriptor())
        .collect()
}

/// [`walk`] 返回的迭代器。
pub struct Walk<'a, R> {
    current: Option<&'a dyn Callable<R>>,
}

impl<'a, R> Iterator for Walk<'a, R> {
    type Item = &'a dyn Callable<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = current.as_chainable().map(|layer| layer.next());
        Some(current)
    }
}
