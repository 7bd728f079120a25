use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use proptest::prelude::*;
use tenon_core::test_stubs::InMemoryEventSource;
use tenon_core::{
    Callable, JobEvent, JobEventKind, JobEventSource, JobId, JobListener, ManualClock,
    MonotonicTimePoint, Subscription, WorkerInfo, WorkerState, callable_fn,
};
use tenon_pipeline::ThreadNameLayer;

use super::{failing_work, job};

const BASE: Duration = Duration::from_secs(5);

fn event_at(kind: JobEventKind, job: JobId, nanos: u64) -> JobEvent {
    JobEvent::new(
        kind,
        job,
        MonotonicTimePoint::from_offset(BASE + Duration::from_nanos(nanos)),
    )
}

fn kind_of(index: u8) -> JobEventKind {
    match index % 3 {
        0 => JobEventKind::Blocked,
        1 => JobEventKind::Unblocked,
        _ => JobEventKind::Resumed,
    }
}

fn state_after(kind: JobEventKind) -> WorkerState {
    match kind {
        JobEventKind::Blocked => WorkerState::Blocked,
        JobEventKind::Unblocked => WorkerState::Resuming,
        JobEventKind::Resumed => WorkerState::Running,
    }
}

#[test]
fn failure_still_restores_the_name_and_unsubscribes() {
    let source = InMemoryEventSource::new();
    let events: Arc<dyn JobEventSource> = Arc::new(source.clone());
    let layer: ThreadNameLayer<u32> = ThreadNameLayer::new(
        job("ledger"),
        Some(events),
        Arc::new(ManualClock::starting_at(BASE)),
        Box::new(callable_fn(failing_work)),
    );

    let before = WorkerInfo::current().display_name();
    layer.call().expect_err("work fails");

    assert_eq!(WorkerInfo::current().display_name(), before);
    assert_eq!(WorkerInfo::current().state(), WorkerState::Idle);
    assert_eq!(source.subscribe_count(), 1);
    assert_eq!(source.unsubscribe_count(), 1);
    assert_eq!(source.active_subscriptions(), 0);
}

#[test]
fn panic_still_restores_the_name_and_unsubscribes() {
    let source = InMemoryEventSource::new();
    let events: Arc<dyn JobEventSource> = Arc::new(source.clone());
    let layer: ThreadNameLayer<()> = ThreadNameLayer::new(
        job("ledger"),
        Some(events),
        Arc::new(ManualClock::starting_at(BASE)),
        Box::new(callable_fn(|| panic!("inner unit crashed"))),
    );

    let before = WorkerInfo::current().display_name();
    let outcome = catch_unwind(AssertUnwindSafe(|| layer.call()));

    assert!(outcome.is_err());
    assert_eq!(WorkerInfo::current().display_name(), before);
    assert_eq!(source.active_subscriptions(), 0);
}

/// 订阅时直接崩溃的事件源。
struct CrashingEventSource;

impl JobEventSource for CrashingEventSource {
    fn subscribe(&self, _job: JobId, _listener: Arc<dyn JobListener>) -> Box<dyn Subscription> {
        panic!("event bus unavailable")
    }
}

#[test]
fn crashing_event_source_still_restores_the_worker() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let events: Arc<dyn JobEventSource> = Arc::new(CrashingEventSource);
    let layer: ThreadNameLayer<()> = ThreadNameLayer::new(
        job("leak"),
        Some(events),
        Arc::new(ManualClock::starting_at(BASE)),
        Box::new(callable_fn(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })),
    );

    let before = WorkerInfo::current().display_name();
    let outcome = catch_unwind(AssertUnwindSafe(|| layer.call()));

    assert!(outcome.is_err());
    assert!(!ran.load(Ordering::SeqCst), "work never starts");
    assert_eq!(WorkerInfo::current().display_name(), before);
    assert_eq!(WorkerInfo::current().state(), WorkerState::Idle);
}

#[test]
fn events_from_other_threads_are_applied_in_timestamp_order() {
    let source = InMemoryEventSource::new();
    let events: Arc<dyn JobEventSource> = Arc::new(source.clone());
    let job = job("replicate");
    let job_id = job.id();
    let firing = source.clone();

    let layer: ThreadNameLayer<Vec<String>> = ThreadNameLayer::new(
        job,
        Some(events),
        Arc::new(ManualClock::starting_at(BASE)),
        Box::new(callable_fn(move || {
            let worker = WorkerInfo::current();
            let mut seen = vec![worker.display_name()];
            let script = [
                (JobEventKind::Blocked, 200),
                (JobEventKind::Unblocked, 100),
                (JobEventKind::Unblocked, 300),
                (JobEventKind::Resumed, 300),
            ];
            for (kind, nanos) in script {
                let source = firing.clone();
                let delivered =
                    thread::spawn(move || source.fire(&event_at(kind, job_id, nanos)))
                        .join()
                        .expect("event thread");
                assert_eq!(delivered, 1);
                seen.push(worker.display_name());
            }
            Ok(seen)
        })),
    );

    let base = WorkerInfo::current().base_name();
    let seen = layer.call().expect("work succeeds");
    let expected: Vec<String> = ["Running", "Blocked", "Blocked", "Resuming", "Running"]
        .iter()
        .map(|state| format!("{base} ({state}) replicate"))
        .collect();
    assert_eq!(seen, expected);

    assert_eq!(
        source.fire(&event_at(JobEventKind::Blocked, job_id, 400)),
        0,
        "no listener after the layer returns"
    );
    assert_eq!(WorkerInfo::current().state(), WorkerState::Idle);
}

#[test]
fn events_for_other_jobs_are_not_delivered() {
    let source = InMemoryEventSource::new();
    let events: Arc<dyn JobEventSource> = Arc::new(source.clone());
    let firing = source.clone();

    let layer: ThreadNameLayer<(usize, WorkerState)> = ThreadNameLayer::new(
        job("primary"),
        Some(events),
        Arc::new(ManualClock::starting_at(BASE)),
        Box::new(callable_fn(move || {
            let stranger = JobId::next();
            let delivered = firing.fire(&event_at(JobEventKind::Blocked, stranger, 10));
            Ok((delivered, WorkerInfo::current().state()))
        })),
    );

    assert_eq!(layer.call().expect("runs"), (0, WorkerState::Running));
}

#[test]
fn anonymous_threads_take_the_configured_prefix() {
    let name = thread::Builder::new()
        .spawn(|| {
            let layer: ThreadNameLayer<String> = ThreadNameLayer::new(
                job("etl"),
                None,
                Arc::new(ManualClock::new()),
                Box::new(callable_fn(|| Ok(WorkerInfo::current().display_name()))),
            )
            .with_worker_prefix("etl-worker");
            layer.call()
        })
        .expect("spawn")
        .join()
        .expect("worker thread")
        .expect("work succeeds");

    assert!(name.starts_with("etl-worker-"), "unexpected name {name}");
    assert!(name.ends_with("(Running) etl"), "unexpected name {name}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn final_state_follows_the_latest_accepted_event(
        script in prop::collection::vec((0u8..3, 0u64..1_000), 0..16)
    ) {
        let source = InMemoryEventSource::new();
        let events: Arc<dyn JobEventSource> = Arc::new(source.clone());
        let job = job("property");
        let job_id = job.id();
        let firing = source.clone();
        let replay = script.clone();

        let layer: ThreadNameLayer<WorkerState> = ThreadNameLayer::new(
            job,
            Some(events),
            Arc::new(ManualClock::starting_at(BASE)),
            Box::new(callable_fn(move || {
                for (kind, nanos) in &replay {
                    firing.fire(&event_at(kind_of(*kind), job_id, *nanos));
                }
                Ok(WorkerInfo::current().state())
            })),
        );

        let mut expected = WorkerState::Running;
        let mut last = 0u64;
        for (kind, nanos) in &script {
            if *nanos >= last {
                last = *nanos;
                expected = state_after(kind_of(*kind));
            }
        }

        prop_assert_eq!(layer.call().expect("runs"), expected);
        prop_assert_eq!(source.active_subscriptions(), 0);
    }
}
