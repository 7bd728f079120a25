//! Bean 装饰：在装饰代理之上叠加 AOP 风格的拦截器链。
//!
//! # 模块定位（Why）
//! - 缓存、审计、重试这类横切关注点需要围绕“真实 Bean 调用”执行，且可以改写参数、
//!   替换结果或直接短路；
//! - 代理层只提供“所有调用汇聚到一个处理器”的能力，本模块把处理器进一步展开为
//!   “拦截器链 + 真实调用”的结构。
//!
//! # 组成（How）
//! - [`Bean`]/[`SimpleBean`]：Bean 注册契约与最小实现；
//! - [`BeanInvocationContext`]：一次被拦截调用的具体化状态；
//! - [`BeanInterceptor`]：拦截器契约；
//! - [`BeanDecorationHandler`]/[`BeanDecorationFactory`]：把拦截器链接到代理上。

mod context;
mod decoration;

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;

use crate::{CoreError, CoreResult, error::codes};

pub use context::{BeanInterceptor, BeanInvocationContext, FnInterceptor, interceptor_fn};
pub use decoration::{BeanDecorationFactory, BeanDecorationHandler};

/// Bean 注册的描述信息。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeanDescriptor {
    name: Cow<'static, str>,
    type_name: &'static str,
}

impl BeanDescriptor {
    /// 以 Bean 名称与实例类型构造描述。
    pub fn of<T>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for BeanDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.type_name)
    }
}

/// Bean 注册契约。
///
/// # 契约说明（What）
/// - `descriptor`：注册描述，生命周期内不变；
/// - `instance`：提供实例；懒加载注册可以合法地返回 `Ok(None)`，
///   失败会原样传递给触发解析的调用方。
pub trait Bean<T>: Send + Sync + 'static {
    fn descriptor(&self) -> &BeanDescriptor;

    fn instance(&self) -> CoreResult<Option<T>>;
}

type Supplier<T> = Box<dyn Fn() -> CoreResult<Option<T>> + Send + Sync>;

/// 以值或供给函数提供实例的 Bean 注册。
pub struct SimpleBean<T> {
    descriptor: BeanDescriptor,
    supplier: Supplier<T>,
}

impl<T: Send + Sync + 'static> SimpleBean<T> {
    /// 每次提供给定值的副本。
    pub fn eager(name: impl Into<Cow<'static, str>>, value: T) -> Self
    where
        T: Clone,
    {
        Self::lazy(name, move || Ok(Some(value.clone())))
    }

    /// 由供给函数按需提供实例。
    pub fn lazy<F>(name: impl Into<Cow<'static, str>>, supplier: F) -> Self
    where
        F: Fn() -> CoreResult<Option<T>> + Send + Sync + 'static,
    {
        Self {
            descriptor: BeanDescriptor::of::<T>(name),
            supplier: Box::new(supplier),
        }
    }

    /// 必须提供实例的注册：供给函数给不出实例时报告 `bean.instance_unavailable`。
    ///
    /// 该失败与其他解析失败一样不会被代理缓存，下一次调用会再次询问供给函数。
    pub fn required<F>(name: impl Into<Cow<'static, str>>, supplier: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        let descriptor = BeanDescriptor::of::<T>(name);
        let label = descriptor.to_string();
        Self {
            descriptor,
            supplier: Box::new(move || match supplier() {
                Some(instance) => Ok(Some(instance)),
                None => Err(CoreError::new(
                    codes::BEAN_INSTANCE_UNAVAILABLE,
                    format!("bean `{label}` could not supply an instance"),
                )),
            }),
        }
    }
}

impl<T: Send + Sync + 'static> Bean<T> for SimpleBean<T> {
    fn descriptor(&self) -> &BeanDescriptor {
        &self.descriptor
    }

    fn instance(&self) -> CoreResult<Option<T>> {
        (self.supplier)()
    }
}

impl<T> fmt::Debug for SimpleBean<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleBean")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
