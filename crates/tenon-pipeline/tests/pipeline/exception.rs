use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tenon_core::error::codes;
use tenon_core::test_stubs::RecordingReporter;
use tenon_core::{
    Callable, CoreError, ProcessingExceptionTranslator, TracingExceptionReporter, callable_fn,
};
use tenon_pipeline::ExceptionHandlerLayer;
use tracing_test::traced_test;

use super::{RenamingTranslator, TRANSLATED, failing_work, job};

/// 上报器自身失败时，调用方仍看到原始失败的翻译结果，且只上报一次。
#[traced_test]
#[test]
fn reporter_failure_never_masks_the_original_failure() {
    let reporter = RecordingReporter::failing();
    let layer: ExceptionHandlerLayer<u32> = ExceptionHandlerLayer::new(
        job("billing"),
        Arc::new(reporter.clone()),
        Arc::new(RenamingTranslator),
        Box::new(callable_fn(failing_work)),
    );

    let err = layer.call().expect_err("work fails");
    assert_eq!(err.code(), TRANSLATED);
    assert_eq!(err.message(), "X");
    assert!(err.find_code(codes::PIPELINE_PROCESSING).is_some());

    let records = reporter.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "boom");
    assert_eq!(records[0].job.name(), "billing");
    assert!(logs_contain("exception reporter failed"));
}

#[test]
fn reporter_panic_is_contained() {
    let reporter = RecordingReporter::panicking();
    let layer: ExceptionHandlerLayer<u32> = ExceptionHandlerLayer::new(
        job("billing"),
        Arc::new(reporter.clone()),
        Arc::new(ProcessingExceptionTranslator),
        Box::new(callable_fn(|| -> Result<u32, CoreError> {
            Err(CoreError::new(codes::PIPELINE_CONTEXT, "no tenant"))
        })),
    );

    let err = layer.call().expect_err("work fails");
    assert_eq!(err.code(), codes::PIPELINE_PROCESSING);
    assert_eq!(err.message(), "no tenant");
    assert!(err.find_code(codes::PIPELINE_CONTEXT).is_some());
    assert_eq!(reporter.count(), 1);
}

#[test]
fn disabled_reporting_still_translates() {
    let reporter = RecordingReporter::new();
    let layer: ExceptionHandlerLayer<u32> = ExceptionHandlerLayer::new(
        job("quiet").log_on_error(false),
        Arc::new(reporter.clone()),
        Arc::new(RenamingTranslator),
        Box::new(callable_fn(failing_work)),
    );

    assert_eq!(layer.call().expect_err("work fails").code(), TRANSLATED);
    assert_eq!(reporter.count(), 0);
}

#[test]
fn success_passes_through_untouched() {
    let reporter = RecordingReporter::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let layer: ExceptionHandlerLayer<usize> = ExceptionHandlerLayer::new(
        job("happy"),
        Arc::new(reporter.clone()),
        Arc::new(RenamingTranslator),
        Box::new(callable_fn(move || {
            Ok(counter.fetch_add(1, Ordering::SeqCst) + 10)
        })),
    );

    assert_eq!(layer.call().expect("first run"), 10);
    assert_eq!(layer.call().expect("second run"), 11);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(reporter.count(), 0);
}

#[traced_test]
#[test]
fn default_reporter_logs_the_failure() {
    let layer: ExceptionHandlerLayer<u32> = ExceptionHandlerLayer::new(
        job("nightly-export"),
        Arc::new(TracingExceptionReporter),
        Arc::new(ProcessingExceptionTranslator),
        Box::new(callable_fn(failing_work)),
    );

    let err = layer.call().expect_err("work fails");
    assert_eq!(err.code(), codes::PIPELINE_PROCESSING, "already a processing failure");
    assert!(err.cause().is_none());
    assert!(logs_contain("job failed"));
    assert!(logs_contain("nightly-export"));
}
