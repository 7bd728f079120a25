#![doc = "tenon-core: 装饰代理、Bean 拦截与可链式执行单元的核心契约。"]
#![doc = ""]
#![doc = "本 Crate 只定义契约与最小实现：代理机制（`proxy`）、Bean 装饰（`bean`）、"]
#![doc = "执行链（`chain`）及其所依赖的作业事件、执行上下文与工作线程诊断信息。"]
#![doc = "具体的执行层由 `tenon-pipeline` 提供。"]

pub mod bean;
pub mod chain;
pub mod context;
pub mod error;
pub mod job;
mod macros;
pub mod observability;
pub mod proxy;
/// 测试桩集合，集中提供记录型的上报器、监听器与内存事件源。
///
/// # 设计定位（Why）
/// - Pipeline 各层的契约测试需要可断言的协作者；集中出口避免每个测试文件重复定义。
///
/// # 使用方式（How）
/// - 通过 `use tenon_core::test_stubs::*;` 引入；所有桩对象均可跨线程共享。
pub mod test_stubs;
pub mod thread_info;
pub mod time;

pub use bean::{
    Bean, BeanDecorationFactory, BeanDecorationHandler, BeanDescriptor, BeanInterceptor,
    BeanInvocationContext, SimpleBean,
};
pub use chain::{BoxCallable, Callable, Chainable, LayerDescriptor, callable_fn, walk};
pub use context::{ExecutionContext, RunContext};
pub use error::{CoreError, CoreResult, ErrorCause};
pub use job::{
    ExceptionReporter, ExceptionTranslator, IdentityTranslator, JobDescriptor, JobEvent,
    JobEventKind, JobEventSource, JobId, JobListener, ProcessingExceptionTranslator,
    Subscription, TracingExceptionReporter,
};
pub use proxy::{
    CallHandle, Capability, DecoratingProxy, InstanceInvocationHandler, Interface, StandIn,
};
pub use thread_info::{WorkerInfo, WorkerSnapshot, WorkerState};
pub use time::{ManualClock, MonotonicClock, MonotonicTimePoint, SystemClock};
