//! 工作线程诊断信息。
//!
//! # 设计背景（Why）
//! - 排障时需要从线程列表一眼看出“这个线程正在跑哪个作业、是否被阻塞”；
//!   运行中的操作系统线程无法在 Rust 中改名，因此以每线程一份的 [`WorkerInfo`] 记录承载
//!   “线程显示名”，任何线程都可以读取它。
//!
//! # 契约说明（What）
//! - 显示名格式：空闲时为基础名；执行作业时为 `"{base} ({state}) {job}"`；
//! - [`WorkerInfo::current`] 在同一线程上总是返回同一份记录（共享 `Arc`）。

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// 匿名工作线程的默认名称前缀。
pub const DEFAULT_WORKER_PREFIX: &str = "tenon-worker";

/// 工作线程状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerState {
    Idle,
    Running,
    Blocked,
    Resuming,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Idle => "Idle",
            WorkerState::Running => "Running",
            WorkerState::Blocked => "Blocked",
            WorkerState::Resuming => "Resuming",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 某一时刻的线程诊断信息。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub base_name: String,
    pub state: WorkerState,
    pub job: Option<String>,
}

impl WorkerSnapshot {
    fn idle(base_name: String) -> Self {
        Self {
            base_name,
            state: WorkerState::Idle,
            job: None,
        }
    }
}

impl fmt::Display for WorkerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.job {
            Some(job) => write!(f, "{} ({}) {}", self.base_name, self.state, job),
            None => f.write_str(&self.base_name),
        }
    }
}

thread_local! {
    static CURRENT_WORKER: RefCell<Option<WorkerInfo>> = const { RefCell::new(None) };
}

/// 工作线程的共享诊断记录。
#[derive(Clone)]
pub struct WorkerInfo {
    inner: Arc<Mutex<WorkerSnapshot>>,
}

impl WorkerInfo {
    /// 以基础名构造空闲记录（不与任何线程绑定）。
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WorkerSnapshot::idle(base_name.into()))),
        }
    }

    /// 当前线程的记录，首次访问时以默认前缀创建。
    pub fn current() -> Self {
        Self::current_with_prefix(DEFAULT_WORKER_PREFIX)
    }

    /// 当前线程的记录；首次访问时，基础名取线程名，匿名线程取 `"{prefix}-{序号}"`。
    pub fn current_with_prefix(prefix: &str) -> Self {
        CURRENT_WORKER.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(|| Self::new(default_base_name(prefix)))
                .clone()
        })
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        self.inner.lock().clone()
    }

    /// 当前显示名。
    pub fn display_name(&self) -> String {
        self.inner.lock().to_string()
    }

    pub fn base_name(&self) -> String {
        self.inner.lock().base_name.clone()
    }

    pub fn state(&self) -> WorkerState {
        self.inner.lock().state
    }

    /// 标记开始执行作业。
    pub fn begin_job(&self, job: impl Into<String>) {
        let mut guard = self.inner.lock();
        guard.state = WorkerState::Running;
        guard.job = Some(job.into());
    }

    /// 更新状态，作业名保持不变。
    pub fn set_state(&self, state: WorkerState) {
        self.inner.lock().state = state;
    }

    /// 整体恢复为给定快照。
    pub fn restore(&self, snapshot: WorkerSnapshot) {
        *self.inner.lock() = snapshot;
    }
}

impl fmt::Debug for WorkerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WorkerInfo").field(&*self.inner.lock()).finish()
    }
}

impl fmt::Display for WorkerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner.lock(), f)
    }
}

fn default_base_name(prefix: &str) -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(1);
    match std::thread::current().name() {
        Some(name) => name.to_owned(),
        None => format!("{prefix}-{}", SEQUENCE.fetch_add(1, Ordering::Relaxed)),
    }
}
