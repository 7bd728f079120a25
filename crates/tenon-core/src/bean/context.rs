use std::mem;
use std::sync::Arc;

use crate::CoreResult;
use crate::proxy::{Arguments, CallHandle, DispatchTable, InstanceInvocationHandler, Value};

use super::Bean;

/// 一次被拦截 Bean 调用的具体化状态。
///
/// # 教案式说明
/// - **意图（Why）**：拦截器需要读取“调用了谁、调用了什么、带了哪些参数”，并决定是否继续；
///   上下文把这些信息与“继续执行”的能力打包成一个值。
/// - **逻辑（How）**：上下文持有剩余的拦截器切片；[`proceed`](Self::proceed) 取走当前参数，
///   若还有下一个拦截器则为其构造新的上下文，否则经转发表调用真实目标。
/// - **契约（What）**：
///   - `target_bean` 与 `target_call` 永不为空；`target_object` 在懒加载注册尚未产出实例时为 `None`；
///   - `proceed` 使用调用时刻的参数；参数在调用时被移交，因此同一上下文的第二次 `proceed`
///     看到的是空参数序列。
pub struct BeanInvocationContext<'a, T> {
    bean: &'a dyn Bean<T>,
    target: Option<&'a T>,
    call: &'a CallHandle,
    args: Arguments,
    rest: &'a [Arc<dyn BeanInterceptor<T>>],
    terminal: &'a DispatchTable<T>,
}

impl<'a, T: Send + Sync + 'static> BeanInvocationContext<'a, T> {
    pub(crate) fn new(
        bean: &'a dyn Bean<T>,
        target: Option<&'a T>,
        call: &'a CallHandle,
        args: Arguments,
        rest: &'a [Arc<dyn BeanInterceptor<T>>],
        terminal: &'a DispatchTable<T>,
    ) -> Self {
        Self {
            bean,
            target,
            call,
            args,
            rest,
            terminal,
        }
    }

    /// 被调用的 Bean 注册。
    pub fn target_bean(&self) -> &'a dyn Bean<T> {
        self.bean
    }

    /// 已解析的目标实例。
    pub fn target_object(&self) -> Option<&'a T> {
        self.target
    }

    /// 被拦截调用的句柄。
    pub fn target_call(&self) -> &'a CallHandle {
        self.call
    }

    pub fn target_args(&self) -> &Arguments {
        &self.args
    }

    /// 可改写的参数序列，改写在下一次 `proceed` 时生效。
    pub fn target_args_mut(&mut self) -> &mut Arguments {
        &mut self.args
    }

    /// 继续执行：进入下一个拦截器，或在链尾执行真实调用。
    pub fn proceed(&mut self) -> CoreResult<Value> {
        let args = mem::take(&mut self.args);
        match self.rest.split_first() {
            Some((next, rest)) => {
                let mut inner = BeanInvocationContext::new(
                    self.bean,
                    self.target,
                    self.call,
                    args,
                    rest,
                    self.terminal,
                );
                next.invoke(&mut inner)
            }
            None => {
                tracing::trace!(
                    target: crate::observability::targets::BEAN,
                    bean = %self.bean.descriptor(),
                    call = %self.call,
                    "invoking bean target"
                );
                self.terminal.invoke(self.target, self.call, args)
            }
        }
    }
}

/// Bean 拦截器：专用于 Bean 装饰的调用处理器。
///
/// 实现必须二选一：调用 `context.proceed()`（可先改写参数），或者不继续而直接给出替代结果/失败。
pub trait BeanInterceptor<T>: Send + Sync + 'static {
    fn invoke(&self, context: &mut BeanInvocationContext<'_, T>) -> CoreResult<Value>;
}

/// 闭包形式的拦截器适配器，由 [`interceptor_fn`] 构造。
pub struct FnInterceptor<F> {
    f: F,
}

/// 将闭包包装为拦截器。
pub fn interceptor_fn<T, F>(f: F) -> FnInterceptor<F>
where
    F: Fn(&mut BeanInvocationContext<'_, T>) -> CoreResult<Value> + Send + Sync + 'static,
{
    FnInterceptor { f }
}

impl<T, F> BeanInterceptor<T> for FnInterceptor<F>
where
    F: Fn(&mut BeanInvocationContext<'_, T>) -> CoreResult<Value> + Send + Sync + 'static,
{
    fn invoke(&self, context: &mut BeanInvocationContext<'_, T>) -> CoreResult<Value> {
        (self.f)(context)
    }
}
