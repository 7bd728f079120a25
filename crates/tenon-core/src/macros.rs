//! 能力接口声明宏。
//!
//! - [`capability!`] 为一个 trait 同时生成：trait 本身、运行期描述符、替身对象上的路由实现
//!   以及“转发给真实目标”的分发桩；
//! - [`interfaces!`](crate::interfaces) 把若干 `dyn Trait` 展开为描述符数组，供代理构造使用。

/// 声明一个可被装饰代理拦截的能力接口。
///
/// # 设计动机（Why）
/// - 运行期无法为任意接口集合合成实现，只能在编译期为每个能力接口生成一次路由代码；
///   宏把“trait 声明”与“代理所需的三段样板”绑在一起，避免手写时遗漏方法。
///
/// # 展开逻辑（How）
/// 1. 原样输出 trait；
/// 2. 为 `dyn Trait` 实现 [`Capability`](crate::proxy::Capability)，名称取 trait 标识符；
/// 3. 为 [`StandIn<I>`](crate::proxy::StandIn) 实现该 trait：参数按声明顺序装箱，
///    经 [`StandIn::dispatch`](crate::proxy::StandIn::dispatch) 路由，再把返回值还原为声明类型；
/// 4. 为 `dyn Trait` 实现 [`Forwarding<T>`](crate::proxy::Forwarding)：任何实现该 trait 的 `T`
///    都能获得一组把调用原样转交给自身的分发桩。
///
/// # 契约说明（What）
/// - 方法必须形如 `fn name(&self, a: A, b: B) -> CoreResult<R>;`，`CoreResult` 需在调用处可见；
/// - 参数与返回类型必须满足 `Any + Send`（即拥有所有权的 `'static` 类型）；
/// - 参数列表不接受尾随逗号。
///
/// ```rust
/// use tenon_core::{capability, CoreResult};
///
/// capability! {
///     /// 问候能力。
///     pub trait Greeter {
///         fn greet(&self, name: String) -> CoreResult<String>;
///     }
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self, name: String) -> CoreResult<String> {
///         Ok(format!("hello, {name}"))
///     }
/// }
///
/// assert_eq!(English.greet("ada".into()).unwrap(), "hello, ada");
/// ```
#[macro_export]
macro_rules! capability {
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)*) -> CoreResult<$ret:ty>;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $name {
            $(
                $(#[$method_meta])*
                fn $method(&self $(, $arg: $arg_ty)*) -> $crate::CoreResult<$ret>;
            )*
        }

        impl $crate::proxy::Capability for dyn $name {
            fn interface() -> $crate::proxy::Interface {
                $crate::proxy::Interface::named::<dyn $name>(::core::stringify!($name))
            }
        }

        impl<I: $crate::proxy::Instance> $name for $crate::proxy::StandIn<I> {
            $(
                fn $method(&self $(, $arg: $arg_ty)*) -> $crate::CoreResult<$ret> {
                    let call = $crate::proxy::CallHandle::new(
                        <dyn $name as $crate::proxy::Capability>::interface(),
                        ::core::stringify!($method),
                    );
                    #[allow(unused_mut)]
                    let mut args = $crate::proxy::Arguments::new();
                    $( args.push($arg); )*
                    let value = self.dispatch(&call, args)?;
                    $crate::proxy::downcast_return::<$ret>(value, &call)
                }
            )*
        }

        impl<T: $name + 'static> $crate::proxy::Forwarding<T> for dyn $name {
            #[allow(unused_variables)]
            fn register(table: &mut $crate::proxy::DispatchTable<T>) {
                $(
                    table.insert(
                        $crate::proxy::CallHandle::new(
                            <dyn $name as $crate::proxy::Capability>::interface(),
                            ::core::stringify!($method),
                        ),
                        |target: &T, args: &mut $crate::proxy::Arguments| {
                            #[allow(unused_mut, unused_variables)]
                            let mut cursor = args.cursor();
                            $( let $arg = cursor.take_next::<$arg_ty>()?; )*
                            let value = <T as $name>::$method(target $(, $arg)*)?;
                            ::core::result::Result::Ok(
                                ::std::boxed::Box::new(value) as $crate::proxy::Value
                            )
                        },
                    );
                )*
            }
        }
    };
}
