use std::fmt;
use std::sync::Arc;

use crate::CoreResult;
use crate::observability::targets;
use crate::proxy::{
    Arguments, CallHandle, DecoratingProxy, DispatchTable, Forwarding, Instance,
    InstanceInvocationHandler, Interface, Value,
};

use super::{Bean, BeanInterceptor, BeanInvocationContext};

/// 把拦截器链适配为调用处理器。
///
/// # 契约说明（What）
/// - 拦截器按登记顺序嵌套：第一个登记的拦截器位于最外层，最先看到调用、最后看到结果；
/// - 链尾经转发表把调用交给真实目标；目标缺失时返回 `proxy.target_absent`；
/// - 每次调用都创建新的 [`BeanInvocationContext`]，处理器自身无可变状态。
pub struct BeanDecorationHandler<T> {
    bean: Arc<dyn Bean<T>>,
    interceptors: Vec<Arc<dyn BeanInterceptor<T>>>,
    terminal: DispatchTable<T>,
}

impl<T: Send + Sync + 'static> BeanDecorationHandler<T> {
    pub fn new(
        bean: Arc<dyn Bean<T>>,
        interceptors: Vec<Arc<dyn BeanInterceptor<T>>>,
        terminal: DispatchTable<T>,
    ) -> Self {
        Self {
            bean,
            interceptors,
            terminal,
        }
    }
}

impl<T: Send + Sync + 'static> InstanceInvocationHandler<T> for BeanDecorationHandler<T> {
    fn invoke(
        &self,
        instance: Option<&T>,
        call: &CallHandle,
        args: Arguments,
    ) -> CoreResult<Value> {
        let mut context = BeanInvocationContext::new(
            self.bean.as_ref(),
            instance,
            call,
            args,
            &self.interceptors,
            &self.terminal,
        );
        context.proceed()
    }
}

impl<T: 'static> fmt::Debug for BeanDecorationHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDecorationHandler")
            .field("bean", self.bean.descriptor())
            .field("interceptors", &self.interceptors.len())
            .field("terminal", &self.terminal)
            .finish()
    }
}

/// Bean 装饰工厂：为 Bean 注册生成带拦截器链的装饰代理。
///
/// # 教案式说明
/// - **意图（Why）**：拦截器的组合顺序属于装饰工厂的职责，集中在此处决定，
///   拦截器本身只需遵守单次 `proceed` 契约。
/// - **逻辑（How）**：目标提供者委托给 [`Bean::instance`]，因此实例在首次非空调用时才被创建
///   并由代理缓存；处理器为 [`BeanDecorationHandler`]。
/// - **契约（What）**：同一工厂可多次装饰，拦截器以 `Arc` 在生成的代理之间共享。
pub struct BeanDecorationFactory<T> {
    interceptors: Vec<Arc<dyn BeanInterceptor<T>>>,
}

impl<T: Instance> BeanDecorationFactory<T> {
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// 追加一个拦截器，位于已登记拦截器的内侧。
    pub fn with_interceptor(mut self, interceptor: impl BeanInterceptor<T>) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// 追加一个共享拦截器。
    pub fn with_shared_interceptor(mut self, interceptor: Arc<dyn BeanInterceptor<T>>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// 以单个能力接口装饰 Bean。
    pub fn decorate<C>(&self, bean: Arc<dyn Bean<T>>) -> DecoratingProxy<T>
    where
        C: ?Sized + Forwarding<T>,
    {
        self.decorate_with(bean, DispatchTable::forwarding::<C>(), [C::interface()])
    }

    /// 以自定义转发表与接口集合装饰 Bean。
    pub fn decorate_with(
        &self,
        bean: Arc<dyn Bean<T>>,
        terminal: DispatchTable<T>,
        interfaces: impl IntoIterator<Item = Interface>,
    ) -> DecoratingProxy<T> {
        tracing::debug!(
            target: targets::BEAN,
            bean = %bean.descriptor(),
            interceptors = self.interceptors.len(),
            "decorating bean"
        );
        let provider_bean = Arc::clone(&bean);
        let handler = BeanDecorationHandler::new(bean, self.interceptors.clone(), terminal);
        DecoratingProxy::with_target(handler, move || provider_bean.instance(), interfaces)
    }
}

impl<T: Instance> Default for BeanDecorationFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BeanDecorationFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDecorationFactory")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
