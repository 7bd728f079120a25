//! 作业描述、作业事件与异常协作者契约。
//!
//! # 模块定位（Why）
//! - Pipeline 的各包装层需要知道“正在执行哪个作业”，并订阅作业的阻塞/恢复事件；
//! - 异常处理层依赖两个可替换的协作者：上报器与翻译器。本模块只定义契约与默认实现，
//!   具体的宿主（调度器、作业管理器）由调用方注入。

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{CoreError, CoreResult, error::codes, observability::targets, time::MonotonicTimePoint};

/// 进程内唯一的作业标识。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 分配下一个进程内唯一标识。
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 作业描述：标识、名称与“失败时是否记录”的标志。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobDescriptor {
    id: JobId,
    name: Cow<'static, str>,
    log_on_error: bool,
}

impl JobDescriptor {
    /// 以新分配的标识构造作业描述，默认失败时记录。
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_id(JobId::next(), name)
    }

    pub fn with_id(id: JobId, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id,
            name: name.into(),
            log_on_error: true,
        }
    }

    /// 设置失败时是否记录。
    pub fn log_on_error(mut self, enabled: bool) -> Self {
        self.log_on_error = enabled;
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_log_on_error(&self) -> bool {
        self.log_on_error
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.id)
    }
}

/// 作业事件种类。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobEventKind {
    /// 作业进入阻塞（例如等待锁或外部条件）。
    Blocked,
    /// 阻塞条件解除，作业等待重新获得执行权。
    Unblocked,
    /// 作业恢复运行。
    Resumed,
}

/// 一条作业事件，时间戳来自单调时钟。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobEvent {
    kind: JobEventKind,
    job: JobId,
    timestamp: MonotonicTimePoint,
}

impl JobEvent {
    pub fn new(kind: JobEventKind, job: JobId, timestamp: MonotonicTimePoint) -> Self {
        Self {
            kind,
            job,
            timestamp,
        }
    }

    pub fn kind(&self) -> JobEventKind {
        self.kind
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    pub fn timestamp(&self) -> MonotonicTimePoint {
        self.timestamp
    }
}

/// 作业事件监听器，可能在任意线程上被调用。
pub trait JobListener: Send + Sync + 'static {
    fn on_event(&self, event: &JobEvent);
}

impl<F> JobListener for F
where
    F: Fn(&JobEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: &JobEvent) {
        self(event)
    }
}

/// 订阅句柄，`unsubscribe` 之后监听器不再收到事件。
pub trait Subscription: Send {
    fn unsubscribe(self: Box<Self>);
}

/// 作业事件源：按作业订阅阻塞/解除阻塞/恢复通知。
pub trait JobEventSource: Send + Sync + 'static {
    fn subscribe(&self, job: JobId, listener: Arc<dyn JobListener>) -> Box<dyn Subscription>;
}

/// 失败上报协作者。
///
/// 上报自身的失败不会影响原始失败的传播，异常处理层会记录后吞掉它。
pub trait ExceptionReporter: Send + Sync + 'static {
    fn report(&self, job: &JobDescriptor, failure: &CoreError) -> CoreResult<()>;
}

/// 失败翻译协作者：把任意失败映射为向调用方抛出的失败。
pub trait ExceptionTranslator: Send + Sync + 'static {
    fn translate(&self, failure: CoreError) -> CoreError;
}

/// 以 `tracing` 事件上报失败的默认上报器。
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingExceptionReporter;

impl ExceptionReporter for TracingExceptionReporter {
    fn report(&self, job: &JobDescriptor, failure: &CoreError) -> CoreResult<()> {
        tracing::error!(
            target: targets::PIPELINE_EXCEPTION,
            { job.name = job.name(), job.id = job.id().get(), error.code = failure.code() },
            "job failed: {failure}"
        );
        Ok(())
    }
}

/// 把非 `pipeline.processing` 的失败包装为处理失败的翻译器，原始失败作为根因保留。
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessingExceptionTranslator;

impl ExceptionTranslator for ProcessingExceptionTranslator {
    fn translate(&self, failure: CoreError) -> CoreError {
        if failure.code() == codes::PIPELINE_PROCESSING {
            return failure;
        }
        let message = failure.message().to_owned();
        CoreError::new(codes::PIPELINE_PROCESSING, message).with_cause(failure)
    }
}

/// 原样返回失败的翻译器。
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityTranslator;

impl ExceptionTranslator for IdentityTranslator {
    fn translate(&self, failure: CoreError) -> CoreError {
        failure
    }
}
