//! 结构化日志的统一入口与稳定日志目标。
//!
//! # 教案式概览
//! - **意图（Why）**：代理与 Pipeline 各层都需要输出日志（吞掉的上报失败、被丢弃的过期事件等），
//!   集中定义目标名称，方便在 `EnvFilter` 中按模块筛选。
//! - **结构（How）**：日志统一经由 `tracing` 门面输出；宿主可调用 [`init_logging`] 安装
//!   `fmt + EnvFilter` 订阅者，也可以自行装配任意 `tracing` Subscriber。
//! - **契约（What）**：本模块不持有任何全局状态之外的资源；重复安装返回错误而非 panic。

use tracing_subscriber::EnvFilter;

use crate::{CoreError, CoreResult, error::codes};

/// 稳定的日志目标常量。
pub mod targets {
    pub const PROXY: &str = "tenon::proxy";
    pub const BEAN: &str = "tenon::bean";
    pub const CONTEXT: &str = "tenon::context";
    pub const PIPELINE_EXCEPTION: &str = "tenon::pipeline::exception";
    pub const PIPELINE_THREAD_NAME: &str = "tenon::pipeline::thread_name";
    pub const PIPELINE_DIAGNOSTIC: &str = "tenon::pipeline::diagnostic";
}

/// 默认过滤指令，在环境变量与调用方都未提供时生效。
pub const DEFAULT_FILTER: &str = "info";

/// 安装全局 `tracing` 订阅者（`fmt` 输出 + `EnvFilter`）。
///
/// # 教案式说明
/// - **意图（Why）**：为宿主进程提供“一行启用”的日志体验。
/// - **逻辑（How）**：优先读取 `RUST_LOG`；缺失时使用调用方给出的 `directive`，
///   若其非法则回退到 [`DEFAULT_FILTER`]。
/// - **契约（What）**：若全局订阅者已经存在，返回 `settings.invalid` 错误，原订阅者保持不变。
pub fn init_logging(directive: &str) -> CoreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(directive))
        .try_init()
        .map_err(|err| {
            CoreError::new(
                codes::SETTINGS_INVALID,
                format!("global tracing subscriber already installed: {err}"),
            )
        })
}

/// 按“环境变量 → 调用方指令 → 默认值”的顺序构造过滤器。
pub fn build_env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
