//! 运行期拦截代理。
//!
//! # 模块定位（Why）
//! - 为“一组能力接口”生成替身对象，把每次调用交给统一的处理器，从而在不修改目标类型的前提下
//!   叠加横切逻辑；
//! - 身份操作（相等、哈希、字符串化）在代理层就地处理，使替身与其底层目标保持一致。
//!
//! # 组成（How）
//! - [`Interface`]/[`InterfaceSet`]：能力接口的运行期身份；
//! - [`CallHandle`]/[`Arguments`]/[`Value`]：被拦截调用的句柄、参数与擦除返回值；
//! - [`InstanceInvocationHandler`]：调用回调，[`DispatchTable`] 是其“转发给目标”的标准实现；
//! - [`DecoratingProxy`]/[`StandIn`]：代理本体与其生成的替身对象。
//!
//! 能力接口本身通过 [`capability!`](crate::capability) 声明。

mod args;
mod decorating;
mod handler;
mod interface;

pub use args::{ArgCursor, Arguments, Value, downcast_return};
pub use decorating::{
    DECORATING_MECHANISM, DecoratingProxy, Instance, NoTarget, Operand, StandIn, StandInObject,
    TargetProvider,
};
pub use handler::{DispatchTable, FnHandler, Forwarding, InstanceInvocationHandler, handler_fn};
pub use interface::{CallHandle, Capability, IdentityKind, Interface, InterfaceSet};
