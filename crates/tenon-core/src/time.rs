use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// 单调时间点，以“自进程内某个固定原点起的偏移”表示。
///
/// # 设计背景（Why）
/// - 作业事件由外部线程异步投递，线程命名层需要比较事件的先后；使用偏移量而非 `Instant`
///   可以在测试中直接构造任意时间点，而不依赖真实时钟。
///
/// # 契约说明（What）
/// - 同一时钟产生的时间点满足全序；不同时钟之间的比较没有意义。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicTimePoint(Duration);

impl MonotonicTimePoint {
    /// 以原点偏移构造时间点。
    pub const fn from_offset(offset: Duration) -> Self {
        Self(offset)
    }

    /// 以纳秒偏移构造时间点。
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(Duration::from_nanos(nanos))
    }

    /// 返回原点偏移。
    pub const fn offset(&self) -> Duration {
        self.0
    }
}

/// 可注入的单调时钟。
///
/// # 接口约束（What）
/// - `now` 必须单调不减；
/// - 实现需 `Send + Sync`，以便在事件监听线程与工作线程之间共享。
pub trait MonotonicClock: Send + Sync + 'static {
    /// 返回当前单调时间点。
    fn now(&self) -> MonotonicTimePoint;
}

/// 基于 [`Instant`] 的系统时钟，原点为进程内首次取时的瞬间。
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl MonotonicClock for SystemClock {
    fn now(&self) -> MonotonicTimePoint {
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        let origin = *ORIGIN.get_or_init(Instant::now);
        MonotonicTimePoint::from_offset(origin.elapsed())
    }
}

/// 手动推进的虚拟时钟，供测试精确控制事件时间。
///
/// - `advance` 只会让时间前进；
/// - 克隆体共享同一时间线。
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// 创建起点为零的虚拟时钟。
    pub fn new() -> Self {
        Self::default()
    }

    /// 以指定偏移作为起点。
    pub fn starting_at(offset: Duration) -> Self {
        Self {
            elapsed: Arc::new(Mutex::new(offset)),
        }
    }

    /// 推进虚拟时间。
    pub fn advance(&self, delta: Duration) {
        let mut guard = self.elapsed.lock();
        *guard = guard.saturating_add(delta);
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> MonotonicTimePoint {
        MonotonicTimePoint::from_offset(*self.elapsed.lock())
    }
}
