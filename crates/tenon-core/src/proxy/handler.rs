use std::collections::HashMap;
use std::fmt;

use crate::{CoreError, CoreResult, error::codes};

use super::{Arguments, CallHandle, Capability, Value};

/// 代理调用回调：拿到的是已解析的目标实例，而非代理自身。
///
/// # 契约说明（What）
/// - `instance`：代理目标；无目标代理或目标解析为空时为 `None`；
/// - `call`：被拦截调用的句柄，身份操作永远不会到达这里；
/// - `args`：参数所有权移交给处理器，处理器可任意改写；
/// - 返回值与失败都会被原样交还给调用方。
pub trait InstanceInvocationHandler<I>: Send + Sync + 'static {
    fn invoke(&self, instance: Option<&I>, call: &CallHandle, args: Arguments)
    -> CoreResult<Value>;
}

/// 以闭包实现 [`InstanceInvocationHandler`] 的适配器，由 [`handler_fn`] 构造。
pub struct FnHandler<F> {
    f: F,
}

/// 将闭包包装为调用处理器。
///
/// ```rust
/// use tenon_core::proxy::{handler_fn, Arguments, CallHandle, InstanceInvocationHandler};
///
/// let handler = handler_fn(|instance: Option<&u32>, _call: &CallHandle, _args: Arguments| {
///     Ok(Box::new(instance.copied().unwrap_or_default()) as tenon_core::proxy::Value)
/// });
/// # let _ = &handler;
/// ```
pub fn handler_fn<I, F>(f: F) -> FnHandler<F>
where
    F: Fn(Option<&I>, &CallHandle, Arguments) -> CoreResult<Value> + Send + Sync + 'static,
{
    FnHandler { f }
}

impl<I, F> InstanceInvocationHandler<I> for FnHandler<F>
where
    F: Fn(Option<&I>, &CallHandle, Arguments) -> CoreResult<Value> + Send + Sync + 'static,
{
    fn invoke(
        &self,
        instance: Option<&I>,
        call: &CallHandle,
        args: Arguments,
    ) -> CoreResult<Value> {
        (self.f)(instance, call, args)
    }
}

type Thunk<T> = Box<dyn Fn(&T, &mut Arguments) -> CoreResult<Value> + Send + Sync>;

/// 由 `(接口, 方法)` 映射到转发桩的分发表。
///
/// # 教案式说明
/// - **意图（Why）**：运行期无法反射调用目标方法，分发表把每个调用句柄映射到一个
///   “取参 → 调用目标 → 擦除返回值”的桩函数，构成行为保持的转发路径。
/// - **逻辑（How）**：桩函数通常由 [`capability!`](crate::capability) 生成的 [`Forwarding`]
///   实现批量注册，也可以通过 [`insert`](Self::insert) 手工登记。
/// - **契约（What）**：
///   - 未登记的调用返回 `proxy.unsupported_call`；
///   - 目标缺失时返回 `proxy.target_absent`，桩函数不会被执行。
pub struct DispatchTable<T> {
    entries: HashMap<CallHandle, Thunk<T>>,
}

impl<T: 'static> DispatchTable<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 为单个能力接口构造转发表。
    pub fn forwarding<C: ?Sized + Forwarding<T>>() -> Self {
        Self::new().with_capability::<C>()
    }

    /// 追加一个能力接口的全部转发桩。
    pub fn with_capability<C: ?Sized + Forwarding<T>>(mut self) -> Self {
        C::register(&mut self);
        self
    }

    /// 登记（或覆盖）一个转发桩。
    pub fn insert<F>(&mut self, call: CallHandle, thunk: F)
    where
        F: Fn(&T, &mut Arguments) -> CoreResult<Value> + Send + Sync + 'static,
    {
        self.entries.insert(call, Box::new(thunk));
    }

    pub fn contains(&self, call: &CallHandle) -> bool {
        self.entries.contains_key(call)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 对给定目标执行转发。
    pub fn forward(&self, target: &T, call: &CallHandle, args: &mut Arguments) -> CoreResult<Value> {
        let thunk = self.entries.get(call).ok_or_else(|| {
            CoreError::new(
                codes::PROXY_UNSUPPORTED_CALL,
                format!("no forwarding entry for `{call}`"),
            )
        })?;
        thunk(target, args)
    }
}

impl<T: 'static> Default for DispatchTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DispatchTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl<T: Send + Sync + 'static> InstanceInvocationHandler<T> for DispatchTable<T> {
    fn invoke(
        &self,
        instance: Option<&T>,
        call: &CallHandle,
        mut args: Arguments,
    ) -> CoreResult<Value> {
        let target = instance.ok_or_else(|| absent_target(call))?;
        self.forward(target, call, &mut args)
    }
}

fn absent_target(call: &CallHandle) -> CoreError {
    CoreError::new(
        codes::PROXY_TARGET_ABSENT,
        format!("`{call}` requires a target instance but none is bound"),
    )
}

/// 由 `dyn Trait` 实现：向分发表登记把调用转发给 `T` 的桩函数。
///
/// 通常由 [`capability!`](crate::capability) 生成，无需手写。
pub trait Forwarding<T>: Capability {
    fn register(table: &mut DispatchTable<T>);
}
