use std::any::Any;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::{CoreError, CoreResult, error::codes, observability::targets};

use super::{
    Arguments, CallHandle, IdentityKind, InstanceInvocationHandler, Interface, InterfaceSet, Value,
};

/// 本机制生成的替身对象所报告的机制标识。
pub const DECORATING_MECHANISM: &str = "tenon.decorating";

/// 可作为代理目标的实例：身份操作（相等、哈希、字符串化）委托给它。
pub trait Instance: Any + Send + Sync + PartialEq + Hash + fmt::Display {}

impl<T> Instance for T where T: Any + Send + Sync + PartialEq + Hash + fmt::Display {}

/// 无目标代理的占位实例类型。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoTarget;

impl fmt::Display for NoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<no target>")
    }
}

/// 目标提供者：零参数、可失败，允许合法地返回“无目标”。
pub type TargetProvider<I> = Box<dyn Fn() -> CoreResult<Option<I>> + Send + Sync>;

/// 任何代理机制生成的替身对象都实现的最小契约，用于跨机制的身份比较。
pub trait StandInObject: Send + Sync + 'static {
    /// 生成该替身的机制标识。
    fn mechanism(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// 身份比较的右操作数。
#[derive(Clone, Copy)]
pub enum Operand<'a> {
    /// 空值。
    Absent,
    /// 普通对象（非替身）。
    Value(&'a dyn Any),
    /// 某个代理机制生成的替身对象。
    StandIn(&'a dyn StandInObject),
}

impl fmt::Debug for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Absent => f.write_str("Absent"),
            Operand::Value(_) => f.write_str("Value(..)"),
            Operand::StandIn(stand_in) => write!(f, "StandIn({})", stand_in.mechanism()),
        }
    }
}

struct ProxyCore<I> {
    interfaces: InterfaceSet,
    target_provider: Option<TargetProvider<I>>,
    cached_target: OnceCell<Option<I>>,
    handler: Arc<dyn InstanceInvocationHandler<I>>,
}

impl<I: Instance> ProxyCore<I> {
    /// 惰性解析目标：成功结果只计算一次并永久复用；失败不缓存，下次访问重试。
    fn resolve_target(&self) -> CoreResult<Option<&I>> {
        let Some(provider) = &self.target_provider else {
            return Ok(None);
        };
        let target = self.cached_target.get_or_try_init(|| provider())?;
        Ok(target.as_ref())
    }

    /// 身份操作路径上的解析：失败记录日志并视作无目标，本次调用不抛错。
    fn resolve_target_lenient(&self) -> Option<&I> {
        match self.resolve_target() {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(
                    target: targets::PROXY,
                    code = err.code(),
                    interfaces = %self.interfaces,
                    "proxy target resolution failed during identity operation: {err}"
                );
                None
            }
        }
    }

    fn invoke_impl(&self, call: &CallHandle, args: Arguments) -> CoreResult<Value> {
        match call.identity_kind() {
            Some(IdentityKind::HashCode) => Ok(Box::new(self.hash_code()?)),
            Some(IdentityKind::ToString) => Ok(Box::new(self.describe()?)),
            Some(IdentityKind::Equals) => {
                let my_instance = self.resolve_target()?;
                let other = match args.raw(0) {
                    None => Operand::Absent,
                    Some(value) => Operand::Value(value),
                };
                Ok(Box::new(self.is_instance_equal_to(other, my_instance)))
            }
            None => {
                let target = self.resolve_target()?;
                self.handler.invoke(target, call, args)
            }
        }
    }

    fn hash_code(&self) -> CoreResult<u64> {
        Ok(self.hash_for(self.resolve_target()?))
    }

    fn hash_for(&self, target: Option<&I>) -> u64 {
        match target {
            Some(target) => {
                let mut hasher = DefaultHasher::new();
                target.hash(&mut hasher);
                hasher.finish()
            }
            None => self.interfaces.stable_hash(),
        }
    }

    fn describe(&self) -> CoreResult<String> {
        Ok(self.describe_for(self.resolve_target()?))
    }

    fn describe_for(&self, target: Option<&I>) -> String {
        match target {
            Some(target) => format!("{{proxy}} {target}"),
            None => format!("{{proxy}} {}", self.interfaces),
        }
    }

    fn is_instance_equal_to(&self, other: Operand<'_>, my_instance: Option<&I>) -> bool {
        let stand_in: &dyn StandInObject = match other {
            Operand::Absent => return false,
            Operand::StandIn(stand_in) => stand_in,
            Operand::Value(value) => match value.downcast_ref::<StandIn<I>>() {
                Some(stand_in) => stand_in,
                None => {
                    return my_instance
                        .is_some_and(|mine| value.downcast_ref::<I>() == Some(mine));
                }
            },
        };

        if stand_in.mechanism() != DECORATING_MECHANISM {
            return false;
        }
        let Some(other) = stand_in.as_any().downcast_ref::<StandIn<I>>() else {
            return false;
        };
        if std::ptr::eq(Arc::as_ptr(&other.core), self) {
            return true;
        }

        let other_instance = other.core.resolve_target_lenient();
        match (my_instance, other_instance) {
            (None, None) => self.interfaces.matches(&other.core.interfaces),
            (Some(mine), Some(theirs)) => std::ptr::eq(mine, theirs) || mine == theirs,
            _ => false,
        }
    }
}

/// 装饰代理：为一组能力接口生成替身对象，并把每一次非身份调用路由给处理器。
///
/// # 教案式说明
/// - **意图（Why）**：框架其余部分需要在不改动被装饰对象的前提下插入横切逻辑（缓存、审计、重试），
///   同时保持相等、哈希、字符串化与底层目标一致，替身才能放进集合或日志中“以假乱真”。
/// - **逻辑（How）**：
///   1. 构造时复制接口集合，登记处理器与可选的目标提供者；
///   2. 目标与替身各占一个单次赋值的备忘单元，首次访问时计算；
///   3. 身份操作在本层就地处理，其余调用交给 [`InstanceInvocationHandler`]。
/// - **契约（What）**：
///   - [`proxy`](Self::proxy) 多次调用返回同一个对象；
///   - 目标提供者成功一次后不再被调用；失败原样抛给触发方且不缓存；
///   - 并发首次访问时至多一次成功计算，其余线程阻塞等待（不自旋）并复用结果。
/// - **风险提示（Trade-offs）**：`PartialEq`/`Hash`/`Display` 这类标准 trait 无法返回错误，
///   走这些入口时解析失败会被记录并按“无目标”处理；需要感知失败请调用 [`invoke_impl`](Self::invoke_impl)。
pub struct DecoratingProxy<I: Instance = NoTarget> {
    core: Arc<ProxyCore<I>>,
    proxy: OnceCell<StandIn<I>>,
}

impl<I: Instance> DecoratingProxy<I> {
    /// 构造无目标代理：处理器收到的实例永远是 `None`。
    pub fn new(
        handler: impl InstanceInvocationHandler<I>,
        interfaces: impl IntoIterator<Item = Interface>,
    ) -> Self {
        Self::build(Arc::new(handler), None, interfaces)
    }

    /// 构造带惰性目标的代理。
    pub fn with_target<P>(
        handler: impl InstanceInvocationHandler<I>,
        target_provider: P,
        interfaces: impl IntoIterator<Item = Interface>,
    ) -> Self
    where
        P: Fn() -> CoreResult<Option<I>> + Send + Sync + 'static,
    {
        Self::build(Arc::new(handler), Some(Box::new(target_provider)), interfaces)
    }

    fn build(
        handler: Arc<dyn InstanceInvocationHandler<I>>,
        target_provider: Option<TargetProvider<I>>,
        interfaces: impl IntoIterator<Item = Interface>,
    ) -> Self {
        Self {
            core: Arc::new(ProxyCore {
                interfaces: InterfaceSet::new(interfaces),
                target_provider,
                cached_target: OnceCell::new(),
                handler,
            }),
            proxy: OnceCell::new(),
        }
    }

    /// 返回备忘的替身对象，首次调用时创建。
    pub fn proxy(&self) -> &StandIn<I> {
        self.proxy.get_or_init(|| StandIn {
            core: Arc::clone(&self.core),
        })
    }

    /// 返回接口集合的副本。
    pub fn interface_classes(&self) -> Vec<Interface> {
        self.core.interfaces.to_vec()
    }

    /// 解析（并缓存）目标实例。
    pub fn target(&self) -> CoreResult<Option<&I>> {
        self.core.resolve_target()
    }

    /// 调用分派入口：身份操作就地处理，其余交给处理器。
    pub fn invoke_impl(&self, call: &CallHandle, args: Arguments) -> CoreResult<Value> {
        self.core.invoke_impl(call, args)
    }

    /// 身份比较的全函数实现，对任何输入（包括空值）都不会失败。
    ///
    /// - 空值 → `false`；本代理自己的替身 → `true`；
    /// - 非替身对象 → 该对象与 `my_instance` 相等时为 `true`；
    /// - 其他机制的替身 → `false`；
    /// - 同机制替身 → 双方都无目标时比较接口集合，否则比较目标（同一引用或结构相等）。
    pub fn is_instance_equal_to(&self, other: Operand<'_>, my_instance: Option<&I>) -> bool {
        self.core.is_instance_equal_to(other, my_instance)
    }
}

impl<I: Instance> fmt::Debug for DecoratingProxy<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratingProxy")
            .field("interfaces", &self.core.interfaces)
            .field("has_target_provider", &self.core.target_provider.is_some())
            .field("target_resolved", &self.core.cached_target.get().is_some())
            .finish()
    }
}

/// 装饰代理生成的替身对象。
///
/// 替身本身不持有状态，只负责路由；克隆得到的仍是同一个替身（身份由所属代理决定）。
/// 能力接口的 trait 实现由 [`capability!`](crate::capability) 生成。
pub struct StandIn<I: Instance> {
    core: Arc<ProxyCore<I>>,
}

impl<I: Instance> StandIn<I> {
    /// 以动态形式发起一次调用。
    ///
    /// 非身份调用所属的接口必须在替身的接口集合内，否则返回 `proxy.unsupported_call`。
    pub fn dispatch(&self, call: &CallHandle, args: Arguments) -> CoreResult<Value> {
        if call.identity_kind().is_none() && !self.implements(&call.interface()) {
            return Err(CoreError::new(
                codes::PROXY_UNSUPPORTED_CALL,
                format!(
                    "`{call}` is not part of the stand-in's interfaces {}",
                    self.core.interfaces
                ),
            ));
        }
        self.core.invoke_impl(call, args)
    }

    /// 替身是否实现了给定接口。
    pub fn implements(&self, interface: &Interface) -> bool {
        self.core.interfaces.contains(interface)
    }

    /// 判断两个句柄是否指向同一个替身。
    pub fn same_stand_in(&self, other: &StandIn<I>) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl<I: Instance> Clone for StandIn<I> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<I: Instance> StandInObject for StandIn<I> {
    fn mechanism(&self) -> &'static str {
        DECORATING_MECHANISM
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<I: Instance> PartialEq for StandIn<I> {
    fn eq(&self, other: &Self) -> bool {
        let mine = self.core.resolve_target_lenient();
        self.core.is_instance_equal_to(Operand::StandIn(other), mine)
    }
}

impl<I: Instance> Eq for StandIn<I> {}

impl<I: Instance> Hash for StandIn<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let target = self.core.resolve_target_lenient();
        state.write_u64(self.core.hash_for(target));
    }
}

impl<I: Instance> fmt::Display for StandIn<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.core.resolve_target_lenient();
        f.write_str(&self.core.describe_for(target))
    }
}

impl<I: Instance> fmt::Debug for StandIn<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandIn")
            .field("mechanism", &DECORATING_MECHANISM)
            .field("interfaces", &self.core.interfaces)
            .finish()
    }
}
