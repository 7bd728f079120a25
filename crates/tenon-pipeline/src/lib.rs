//! tenon-pipeline：作业执行链的标准包装层。
//!
//! # 模块定位（Why）
//! - 一次作业执行被组织为“包装层 → … → 业务逻辑”的所有权链，每层只关心一个横切关注点；
//! - 本 crate 提供这些包装层以及按配置装配标准链路的构建器。
//!
//! # 组成（How）
//! - [`ContextLayer`]：在执行上下文中运行内层；
//! - [`ThreadLocalLayer`]：在内层执行期间安装线程局部值；
//! - [`ExceptionHandlerLayer`]：上报并翻译失败；
//! - [`ThreadNameLayer`]：维护工作线程诊断名，并按时间戳过滤作业事件；
//! - [`DiagnosticSpanLayer`]：在 `tracing` span 中运行内层；
//! - [`PipelineBuilder`]/[`StandardPipeline`]：装配链路；[`PipelineSettings`]：装配配置。
//!
//! # 契约说明（What）
//! - 各层同步嵌套执行，清理动作在内层返回（或失败、panic）之后、本层返回之前完成；
//! - 任何一层都不会把失败静默转换为默认值。

pub mod builder;
pub mod context;
pub mod diagnostic;
pub mod exception;
pub mod settings;
pub mod thread_local;
pub mod thread_name;

pub use builder::{PipelineBuilder, StandardPipeline};
pub use context::ContextLayer;
pub use diagnostic::DiagnosticSpanLayer;
pub use exception::ExceptionHandlerLayer;
pub use settings::{PipelineSettings, SettingsError};
pub use thread_local::ThreadLocalLayer;
pub use thread_name::ThreadNameLayer;
