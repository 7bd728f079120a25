use std::sync::Arc;

use tenon_core::{
    BoxCallable, Callable, Chainable, CoreResult, ExecutionContext, LayerDescriptor,
};

/// 上下文应用层：在执行上下文的激活范围内运行内层。
///
/// # 契约说明（What）
/// - 提供上下文时，内层在 [`ExecutionContext::enter`] 建立的作用域内执行，作用域在本层返回前拆除，
///   包括内层失败或 panic 的情形；
/// - 未提供上下文时直接执行内层；
/// - 上下文建立失败时内层不会执行，失败原样返回。
pub struct ContextLayer<R> {
    context: Option<Arc<dyn ExecutionContext>>,
    next: BoxCallable<R>,
}

impl<R> ContextLayer<R> {
    pub fn new(context: Option<Arc<dyn ExecutionContext>>, next: BoxCallable<R>) -> Self {
        Self { context, next }
    }
}

impl<R> Callable<R> for ContextLayer<R> {
    fn call(&self) -> CoreResult<R> {
        match &self.context {
            Some(context) => {
                // Same as `ExecutionContext::activate`, which is ambiguous to call on `dyn` receivers.
                let _scope = context.enter()?;
                self.next.call()
            }
            None => self.next.call(),
        }
    }

    fn as_chainable(&self) -> Option<&dyn Chainable<R>> {
        Some(self)
    }
}

impl<R> Chainable<R> for ContextLayer<R> {
    fn next(&self) -> &dyn Callable<R> {
        &self.next
    }

    fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::new(
            "tenon.context",
            "context",
            "runs the inner unit inside the execution context",
        )
    }
}
