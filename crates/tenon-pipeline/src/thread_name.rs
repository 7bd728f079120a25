use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::Mutex;
use tenon_core::observability::targets;
use tenon_core::thread_info::DEFAULT_WORKER_PREFIX;
use tenon_core::{
    BoxCallable, Callable, Chainable, CoreResult, JobDescriptor, JobEvent, JobEventKind,
    JobEventSource, JobId, JobListener, LayerDescriptor, MonotonicClock, MonotonicTimePoint,
    Subscription, WorkerInfo, WorkerSnapshot, WorkerState,
};

/// 线程命名层：在内层执行期间维护工作线程的诊断名，并跟随作业事件更新状态。
///
/// # 教案式说明
/// - **意图（Why）**：排障时需要从线程诊断信息直接看出线程正在执行哪个作业、是否阻塞；
///   阻塞/恢复事件由作业管理器在其他线程异步投递，可能乱序到达。
/// - **逻辑（How）**：
///   1. 记录当前线程的原始诊断信息，标记为 `Running` 并附上作业名；
///   2. 以单调时钟的当前时间作为“最近事件时间”，订阅该作业的事件；
///   3. 事件到达时，在同一把锁内比较时间戳并更新状态，过期事件被丢弃；
///   4. 无论内层成功、失败还是 panic，清理守卫都会取消订阅并恢复原始诊断信息，且只执行一次。
/// - **契约（What）**：
///   - 状态机：`Idle → Running → {Blocked ⇄ Resuming → Running}* → Idle`；
///   - 时间戳不早于最近事件时间的事件才会生效，重复投递是幂等的；
///   - 清理之后到达的事件不会再修改诊断信息。
pub struct ThreadNameLayer<R> {
    job: JobDescriptor,
    events: Option<Arc<dyn JobEventSource>>,
    clock: Arc<dyn MonotonicClock>,
    worker_prefix: Cow<'static, str>,
    next: BoxCallable<R>,
}

impl<R> ThreadNameLayer<R> {
    pub fn new(
        job: JobDescriptor,
        events: Option<Arc<dyn JobEventSource>>,
        clock: Arc<dyn MonotonicClock>,
        next: BoxCallable<R>,
    ) -> Self {
        Self {
            job,
            events,
            clock,
            worker_prefix: Cow::Borrowed(DEFAULT_WORKER_PREFIX),
            next,
        }
    }

    /// 设置匿名工作线程的名称前缀。
    pub fn with_worker_prefix(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.worker_prefix = prefix.into();
        self
    }
}

impl<R> Callable<R> for ThreadNameLayer<R> {
    fn call(&self) -> CoreResult<R> {
        let worker = WorkerInfo::current_with_prefix(&self.worker_prefix);
        let mut cleanup = Cleanup {
            worker: worker.clone(),
            original: Some(worker.snapshot()),
            tracker: None,
            subscription: None,
        };
        worker.begin_job(self.job.name());
        tracing::debug!(
            target: targets::PIPELINE_THREAD_NAME,
            worker = %worker,
            job.id = self.job.id().get(),
            "worker picked up job"
        );

        let tracker = Arc::new(EventTracker {
            job: self.job.id(),
            worker,
            state: Mutex::new(TrackerState {
                last_event_time: self.clock.now(),
                active: true,
            }),
        });
        cleanup.tracker = Some(Arc::clone(&tracker));
        if let Some(source) = &self.events {
            cleanup.subscription =
                Some(source.subscribe(self.job.id(), tracker as Arc<dyn JobListener>));
        }

        self.next.call()
    }

    fn as_chainable(&self) -> Option<&dyn Chainable<R>> {
        Some(self)
    }
}

impl<R> Chainable<R> for ThreadNameLayer<R> {
    fn next(&self) -> &dyn Callable<R> {
        &self.next
    }

    fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::new(
            "tenon.thread_name",
            "diagnostic",
            "tags the worker with the running job and follows block/resume events",
        )
    }
}

struct TrackerState {
    last_event_time: MonotonicTimePoint,
    active: bool,
}

/// 作业事件监听器，所有状态变更都在 `state` 锁内完成。
struct EventTracker {
    job: JobId,
    worker: WorkerInfo,
    state: Mutex<TrackerState>,
}

impl EventTracker {
    /// 停止接收事件并恢复原始诊断信息。
    fn finish(&self, original: WorkerSnapshot) {
        let mut state = self.state.lock();
        state.active = false;
        self.worker.restore(original);
    }
}

impl JobListener for EventTracker {
    fn on_event(&self, event: &JobEvent) {
        let mut state = self.state.lock();
        if !state.active || event.job() != self.job {
            return;
        }
        if event.timestamp() < state.last_event_time {
            tracing::debug!(
                target: targets::PIPELINE_THREAD_NAME,
                { job.id = self.job.get(), kind = ?event.kind() },
                "discarding stale job event"
            );
            return;
        }
        state.last_event_time = event.timestamp();
        let next = match event.kind() {
            JobEventKind::Blocked => WorkerState::Blocked,
            JobEventKind::Unblocked => WorkerState::Resuming,
            JobEventKind::Resumed => WorkerState::Running,
        };
        self.worker.set_state(next);
    }
}

/// 清理守卫：在 `begin_job` 之前建立，任何一步 panic 都会恢复原始诊断信息。
struct Cleanup {
    worker: WorkerInfo,
    original: Option<WorkerSnapshot>,
    tracker: Option<Arc<EventTracker>>,
    subscription: Option<Box<dyn Subscription>>,
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        let Some(original) = self.original.take() else {
            return;
        };
        match &self.tracker {
            Some(tracker) => tracker.finish(original),
            None => self.worker.restore(original),
        }
    }
}
