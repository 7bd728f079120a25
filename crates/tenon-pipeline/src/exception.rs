use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tenon_core::observability::targets;
use tenon_core::{
    BoxCallable, Callable, Chainable, CoreError, CoreResult, ExceptionReporter,
    ExceptionTranslator, JobDescriptor, LayerDescriptor,
};

/// 异常处理层：上报并翻译内层失败。
///
/// # 教案式说明
/// - **意图（Why）**：作业失败需要被记录（日志、告警、审计），但记录本身的故障绝不能掩盖或替换
///   原始失败；向外抛出的失败统一经过翻译，使调用方只面对稳定的错误形态。
/// - **逻辑（How）**：
///   1. 执行内层，成功时原样返回；
///   2. 失败且作业描述开启“失败时记录”时，把原始失败交给上报器；上报器返回的失败或 panic
///      都被记录为告警后吞掉；
///   3. 把原始失败交给翻译器，抛出翻译结果。
/// - **契约（What）**：每次失败至多上报一次；调用方看到的永远是“原始失败的翻译”。
/// - **风险提示（Trade-offs）**：内层的 panic 不属于业务失败，会穿透本层继续展开，不会被上报。
pub struct ExceptionHandlerLayer<R> {
    job: JobDescriptor,
    reporter: Arc<dyn ExceptionReporter>,
    translator: Arc<dyn ExceptionTranslator>,
    next: BoxCallable<R>,
}

impl<R> ExceptionHandlerLayer<R> {
    pub fn new(
        job: JobDescriptor,
        reporter: Arc<dyn ExceptionReporter>,
        translator: Arc<dyn ExceptionTranslator>,
        next: BoxCallable<R>,
    ) -> Self {
        Self {
            job,
            reporter,
            translator,
            next,
        }
    }

    pub fn job(&self) -> &JobDescriptor {
        &self.job
    }

    fn report(&self, failure: &CoreError) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.reporter.report(&self.job, failure)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(secondary)) => tracing::warn!(
                target: targets::PIPELINE_EXCEPTION,
                job = self.job.name(),
                original = failure.code(),
                secondary = secondary.code(),
                "exception reporter failed, original failure is propagated: {secondary}"
            ),
            Err(_) => tracing::warn!(
                target: targets::PIPELINE_EXCEPTION,
                job = self.job.name(),
                original = failure.code(),
                "exception reporter panicked, original failure is propagated"
            ),
        }
    }
}

impl<R> Callable<R> for ExceptionHandlerLayer<R> {
    fn call(&self) -> CoreResult<R> {
        self.next.call().map_err(|failure| {
            if self.job.is_log_on_error() {
                self.report(&failure);
            }
            self.translator.translate(failure)
        })
    }

    fn as_chainable(&self) -> Option<&dyn Chainable<R>> {
        Some(self)
    }
}

impl<R> Chainable<R> for ExceptionHandlerLayer<R> {
    fn next(&self) -> &dyn Callable<R> {
        &self.next
    }

    fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::new(
            "tenon.exception",
            "exception",
            "reports and translates failures of the inner unit",
        )
    }
}
