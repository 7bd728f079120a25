//! 记录型测试桩：上报器、事件源、监听器与执行上下文。
//!
//! # 使用方式（How）
//! - 所有桩对象内部以 `Arc<Mutex<..>>` 保存记录，克隆体共享同一份记录，可交给被测对象后继续断言；
//! - 桩对象只用于测试或示例环境，生产代码若依赖应显式说明原因。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::{
    CoreError, CoreResult,
    context::{ContextScope, ExecutionContext},
    error::codes,
    job::{
        ExceptionReporter, JobDescriptor, JobEvent, JobEventSource, JobId, JobListener,
        Subscription,
    },
};

/// 一次上报的记录。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRecord {
    pub job: JobDescriptor,
    pub code: &'static str,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReportOutcome {
    Accept,
    Fail,
    Panic,
}

/// 记录每次上报的上报器，可配置为上报后失败或 panic。
#[derive(Clone, Debug)]
pub struct RecordingReporter {
    records: Arc<Mutex<Vec<ReportRecord>>>,
    outcome: ReportOutcome,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::with_outcome(ReportOutcome::Accept)
    }

    /// 记录后返回 `pipeline.processing` 失败。
    pub fn failing() -> Self {
        Self::with_outcome(ReportOutcome::Fail)
    }

    /// 记录后 panic。
    pub fn panicking() -> Self {
        Self::with_outcome(ReportOutcome::Panic)
    }

    fn with_outcome(outcome: ReportOutcome) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            outcome,
        }
    }

    pub fn records(&self) -> Vec<ReportRecord> {
        self.records.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.records.lock().len()
    }
}

impl Default for RecordingReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionReporter for RecordingReporter {
    fn report(&self, job: &JobDescriptor, failure: &CoreError) -> CoreResult<()> {
        self.records.lock().push(ReportRecord {
            job: job.clone(),
            code: failure.code(),
            message: failure.message().to_owned(),
        });
        match self.outcome {
            ReportOutcome::Accept => Ok(()),
            ReportOutcome::Fail => Err(CoreError::new(
                codes::PIPELINE_PROCESSING,
                "reporter backend unavailable",
            )),
            ReportOutcome::Panic => panic!("reporter crashed while reporting `{}`", job.name()),
        }
    }
}

/// 记录收到的全部事件的监听器。
#[derive(Clone, Debug, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<JobEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().clone()
    }
}

impl JobListener for RecordingListener {
    fn on_event(&self, event: &JobEvent) {
        self.events.lock().push(event.clone());
    }
}

struct Registered {
    token: u64,
    job: JobId,
    listener: Arc<dyn JobListener>,
}

#[derive(Default)]
struct SourceState {
    active: Vec<Registered>,
    subscribed: usize,
    unsubscribed: usize,
}

/// 内存事件源：记录订阅情况，并允许测试在任意线程上投递事件。
#[derive(Clone, Default)]
pub struct InMemoryEventSource {
    state: Arc<Mutex<SourceState>>,
    tokens: Arc<AtomicU64>,
}

impl InMemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把事件投递给订阅了该作业的全部监听器，返回收到事件的监听器数量。
    pub fn fire(&self, event: &JobEvent) -> usize {
        let listeners: Vec<Arc<dyn JobListener>> = self
            .state
            .lock()
            .active
            .iter()
            .filter(|registered| registered.job == event.job())
            .map(|registered| Arc::clone(&registered.listener))
            .collect();
        for listener in &listeners {
            listener.on_event(event);
        }
        listeners.len()
    }

    /// 当前仍有效的订阅数量。
    pub fn active_subscriptions(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn subscribe_count(&self) -> usize {
        self.state.lock().subscribed
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.state.lock().unsubscribed
    }
}

impl std::fmt::Debug for InMemoryEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryEventSource")
            .field("active", &state.active.len())
            .field("subscribed", &state.subscribed)
            .field("unsubscribed", &state.unsubscribed)
            .finish()
    }
}

impl JobEventSource for InMemoryEventSource {
    fn subscribe(&self, job: JobId, listener: Arc<dyn JobListener>) -> Box<dyn Subscription> {
        let token = self.tokens.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        state.active.push(Registered {
            token,
            job,
            listener,
        });
        state.subscribed += 1;
        Box::new(InMemorySubscription {
            state: Arc::clone(&self.state),
            token,
        })
    }
}

struct InMemorySubscription {
    state: Arc<Mutex<SourceState>>,
    token: u64,
}

impl Subscription for InMemorySubscription {
    fn unsubscribe(self: Box<Self>) {
        let mut state = self.state.lock();
        state.active.retain(|registered| registered.token != self.token);
        state.unsubscribed += 1;
    }
}

/// 记录进入/拆除次数的执行上下文，可配置为进入失败。
#[derive(Clone, Debug, Default)]
pub struct RecordingContext {
    log: Arc<Mutex<Vec<&'static str>>>,
    fail_on_enter: bool,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进入时返回 `pipeline.context` 失败。
    pub fn failing() -> Self {
        Self {
            fail_on_enter: true,
            ..Self::default()
        }
    }

    /// 依次记录的 `"enter"`/`"exit"` 事件。
    pub fn log(&self) -> Vec<&'static str> {
        self.log.lock().clone()
    }
}

impl ExecutionContext for RecordingContext {
    fn enter(&self) -> CoreResult<ContextScope> {
        if self.fail_on_enter {
            return Err(CoreError::new(
                codes::PIPELINE_CONTEXT,
                "context could not be established",
            ));
        }
        self.log.lock().push("enter");
        let log = Arc::clone(&self.log);
        Ok(ContextScope::new(move || log.lock().push("exit")))
    }
}
