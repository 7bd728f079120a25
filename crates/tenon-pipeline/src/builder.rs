//! 链路装配。
//!
//! # 教案式概览
//! - **意图（Why）**：包装层的嵌套顺序决定语义（例如线程诊断名必须覆盖异常上报期间），
//!   顺序应集中在一处声明，而不是散落在各调用点；
//! - **结构（How）**：[`PipelineBuilder`] 按“由外向内”收集层构造器，`build` 时从最内层开始逐层包裹；
//!   [`StandardPipeline`] 在其上按 [`PipelineSettings`] 装配标准链路；
//! - **契约（What）**：标准链路由外向内为
//!   `tenon.thread_name → tenon.diagnostic → tenon.exception → tenon.context → 业务逻辑`，
//!   被配置关闭或缺少协作者的层不会出现在链上。

use std::sync::Arc;

use tenon_core::{
    BoxCallable, Callable, CoreResult, ExceptionReporter, ExceptionTranslator, ExecutionContext,
    JobDescriptor, JobEventSource, MonotonicClock, ProcessingExceptionTranslator, SystemClock,
    TracingExceptionReporter, callable_fn,
};

use crate::{
    ContextLayer, DiagnosticSpanLayer, ExceptionHandlerLayer, PipelineSettings, ThreadNameLayer,
};

type WrapFn<R> = Box<dyn FnOnce(BoxCallable<R>) -> BoxCallable<R>>;

/// 由外向内登记包装层，最后包裹业务逻辑。
///
/// ```rust
/// use tenon_core::{callable_fn, Callable};
/// use tenon_pipeline::{ContextLayer, PipelineBuilder};
///
/// let chain = PipelineBuilder::<u8>::new()
///     .layer(|next| Box::new(ContextLayer::new(None, next)))
///     .build(Box::new(callable_fn(|| Ok(7))));
/// assert_eq!(chain.call().unwrap(), 7);
/// ```
pub struct PipelineBuilder<R> {
    layers: Vec<WrapFn<R>>,
}

impl<R: 'static> PipelineBuilder<R> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// 登记一层；先登记的层位于外侧。
    pub fn layer<F>(mut self, wrap: F) -> Self
    where
        F: FnOnce(BoxCallable<R>) -> BoxCallable<R> + 'static,
    {
        self.layers.push(Box::new(wrap));
        self
    }

    /// 条件成立时登记一层。
    pub fn layer_if<F>(self, enabled: bool, wrap: F) -> Self
    where
        F: FnOnce(BoxCallable<R>) -> BoxCallable<R> + 'static,
    {
        if enabled { self.layer(wrap) } else { self }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// 以 `work` 为最内层构建整条链。
    pub fn build(self, work: BoxCallable<R>) -> BoxCallable<R> {
        self.layers
            .into_iter()
            .rev()
            .fold(work, |inner, wrap| wrap(inner))
    }
}

impl<R: 'static> Default for PipelineBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// 标准链路装配器：持有各层共享的协作者，可为多个作业重复装配。
///
/// 默认协作者为 [`SystemClock`]、[`TracingExceptionReporter`] 与
/// [`ProcessingExceptionTranslator`]，未配置事件源与执行上下文。
#[derive(Clone)]
pub struct StandardPipeline {
    settings: PipelineSettings,
    events: Option<Arc<dyn JobEventSource>>,
    clock: Arc<dyn MonotonicClock>,
    reporter: Arc<dyn ExceptionReporter>,
    translator: Arc<dyn ExceptionTranslator>,
    context: Option<Arc<dyn ExecutionContext>>,
}

impl StandardPipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            events: None,
            clock: Arc::new(SystemClock),
            reporter: Arc::new(TracingExceptionReporter),
            translator: Arc::new(ProcessingExceptionTranslator),
            context: None,
        }
    }

    pub fn with_event_source(mut self, events: Arc<dyn JobEventSource>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn MonotonicClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ExceptionReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn ExceptionTranslator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_context(mut self, context: Arc<dyn ExecutionContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// 为 `job` 装配完整链路，`work` 位于最内层。
    pub fn assemble<R: 'static>(&self, job: &JobDescriptor, work: BoxCallable<R>) -> BoxCallable<R> {
        let thread_name = {
            let job = job.clone();
            let events = self.events.clone();
            let clock = Arc::clone(&self.clock);
            let prefix = self.settings.worker_prefix.clone();
            move |next: BoxCallable<R>| -> BoxCallable<R> {
                Box::new(ThreadNameLayer::new(job, events, clock, next).with_worker_prefix(prefix))
            }
        };
        let diagnostic = {
            let job = job.clone();
            move |next: BoxCallable<R>| -> BoxCallable<R> {
                Box::new(DiagnosticSpanLayer::new(job, next))
            }
        };
        let exception = {
            let job = job.clone();
            let reporter = Arc::clone(&self.reporter);
            let translator = Arc::clone(&self.translator);
            move |next: BoxCallable<R>| -> BoxCallable<R> {
                Box::new(ExceptionHandlerLayer::new(job, reporter, translator, next))
            }
        };
        let context = self.context.clone();
        let has_context = context.is_some();

        PipelineBuilder::new()
            .layer_if(self.settings.thread_naming, thread_name)
            .layer_if(self.settings.diagnostic_span, diagnostic)
            .layer(exception)
            .layer_if(has_context, move |next: BoxCallable<R>| -> BoxCallable<R> {
                Box::new(ContextLayer::new(context, next))
            })
            .build(work)
    }

    /// 装配并立即执行一次。
    pub fn run<R, F>(&self, job: &JobDescriptor, work: F) -> CoreResult<R>
    where
        R: 'static,
        F: Fn() -> CoreResult<R> + Send + Sync + 'static,
    {
        self.assemble(job, Box::new(callable_fn(work))).call()
    }
}

impl Default for StandardPipeline {
    fn default() -> Self {
        Self::new(PipelineSettings::default())
    }
}
