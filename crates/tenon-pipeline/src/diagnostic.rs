use tenon_core::observability::targets;
use tenon_core::{BoxCallable, Callable, Chainable, CoreResult, JobDescriptor, LayerDescriptor};

/// 诊断 span 层：在携带作业名与作业标识的 `tracing` span 中运行内层。
///
/// 内层产生的所有日志事件都会继承该 span 的字段，便于按作业聚合日志。
pub struct DiagnosticSpanLayer<R> {
    job: JobDescriptor,
    next: BoxCallable<R>,
}

impl<R> DiagnosticSpanLayer<R> {
    pub fn new(job: JobDescriptor, next: BoxCallable<R>) -> Self {
        Self { job, next }
    }
}

impl<R> Callable<R> for DiagnosticSpanLayer<R> {
    fn call(&self) -> CoreResult<R> {
        let span = tracing::info_span!(
            target: targets::PIPELINE_DIAGNOSTIC,
            "job",
            job.name = self.job.name(),
            job.id = self.job.id().get()
        );
        let _entered = span.enter();
        self.next.call()
    }

    fn as_chainable(&self) -> Option<&dyn Chainable<R>> {
        Some(self)
    }
}

impl<R> Chainable<R> for DiagnosticSpanLayer<R> {
    fn next(&self) -> &dyn Callable<R> {
        &self.next
    }

    fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::new(
            "tenon.diagnostic",
            "diagnostic",
            "runs the inner unit inside a job tracing span",
        )
    }
}
