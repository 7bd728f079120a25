//! Bean 装饰集成测试。
//!
//! # 测试目标（Why）
//! - 验证拦截器可以读取调用信息、改写参数、短路或继续执行；
//! - 验证多个拦截器按登记顺序嵌套，第一个登记者位于最外层；
//! - 验证短路只跳过真实调用本身；
//! - 验证必需 Bean 缺少实例时报告 `bean.instance_unavailable` 且可重试。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tenon_core::bean::{
    Bean, BeanDecorationFactory, BeanInterceptor, BeanInvocationContext, SimpleBean,
    interceptor_fn,
};
use tenon_core::error::codes;
use tenon_core::proxy::Value;
use tenon_core::{CoreResult, capability};

capability! {
    /// 报价服务。
    pub trait Quotes {
        fn quote(&self, symbol: String) -> CoreResult<u64>;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct QuoteService {
    base: u64,
}

impl fmt::Display for QuoteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuoteService(base={})", self.base)
    }
}

impl Quotes for QuoteService {
    fn quote(&self, symbol: String) -> CoreResult<u64> {
        Ok(self.base + symbol.len() as u64)
    }
}

fn eager_bean() -> Arc<dyn Bean<QuoteService>> {
    Arc::new(SimpleBean::eager("quotes", QuoteService { base: 100 }))
}

#[test]
fn interceptors_nest_in_registration_order() {
    let trail = Arc::new(Mutex::new(Vec::new()));
    let outer_trail = Arc::clone(&trail);
    let inner_trail = Arc::clone(&trail);

    let factory = BeanDecorationFactory::new()
        .with_interceptor(interceptor_fn(
            move |context: &mut BeanInvocationContext<'_, QuoteService>| {
                outer_trail.lock().push("outer:before");
                let result = context.proceed();
                outer_trail.lock().push("outer:after");
                result
            },
        ))
        .with_interceptor(interceptor_fn(
            move |context: &mut BeanInvocationContext<'_, QuoteService>| {
                inner_trail.lock().push("inner:before");
                let result = context.proceed();
                inner_trail.lock().push("inner:after");
                result
            },
        ));

    let proxy = factory.decorate::<dyn Quotes>(eager_bean());
    assert_eq!(proxy.proxy().quote("ACME".to_owned()).expect("quoted"), 104);
    assert_eq!(
        *trail.lock(),
        ["outer:before", "inner:before", "inner:after", "outer:after"]
    );
}

#[test]
fn interceptor_sees_the_call_and_rewrites_arguments() {
    let seen = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&seen);

    let factory = BeanDecorationFactory::new().with_interceptor(interceptor_fn(
        move |context: &mut BeanInvocationContext<'_, QuoteService>| {
            *recorder.lock() = Some((
                context.target_bean().descriptor().name().to_owned(),
                context.target_call().method(),
                context.target_object().map(|service| service.base),
            ));
            let symbol = context.target_args().get::<String>(0)?.clone();
            context
                .target_args_mut()
                .set(0, format!("{symbol}-EXTENDED"))?;
            context.proceed()
        },
    ));

    let proxy = factory.decorate::<dyn Quotes>(eager_bean());
    assert_eq!(proxy.proxy().quote("AB".to_owned()).expect("quoted"), 111);
    assert_eq!(
        *seen.lock(),
        Some(("quotes".to_owned(), "quote", Some(100)))
    );
}

#[test]
fn short_circuit_skips_the_real_call() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let bean: Arc<dyn Bean<QuoteService>> = Arc::new(SimpleBean::lazy("quotes", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some(QuoteService { base: 1 }))
    }));

    let factory = BeanDecorationFactory::new().with_interceptor(interceptor_fn(
        |_: &mut BeanInvocationContext<'_, QuoteService>| Ok(Box::new(7_u64) as Value),
    ));
    let proxy = factory.decorate::<dyn Quotes>(bean);

    assert_eq!(proxy.proxy().quote("ACME".to_owned()).expect("cached"), 7);
    // 目标在首次非身份调用时解析，短路只跳过真实调用本身。
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn interceptor_can_substitute_a_failure() {
    let factory = BeanDecorationFactory::new().with_interceptor(interceptor_fn(
        |context: &mut BeanInvocationContext<'_, QuoteService>| {
            Err(tenon_core::CoreError::new(
                "audit.denied",
                format!("`{}` denied", context.target_call()),
            ))
        },
    ));
    let proxy = factory.decorate::<dyn Quotes>(eager_bean());

    let err = proxy
        .proxy()
        .quote("ACME".to_owned())
        .expect_err("denied");
    assert_eq!(err.code(), "audit.denied");
    assert_eq!(err.message(), "`Quotes::quote` denied");
}

#[test]
fn lazily_absent_bean_reaches_the_interceptor_without_target() {
    let bean: Arc<dyn Bean<QuoteService>> = Arc::new(SimpleBean::lazy("quotes", || Ok(None)));
    let observed = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&observed);

    let factory = BeanDecorationFactory::new().with_interceptor(interceptor_fn(
        move |context: &mut BeanInvocationContext<'_, QuoteService>| {
            *recorder.lock() = Some(context.target_object().is_none());
            context.proceed()
        },
    ));
    let proxy = factory.decorate::<dyn Quotes>(bean);

    let err = proxy
        .proxy()
        .quote("ACME".to_owned())
        .expect_err("no instance to call");
    assert_eq!(err.code(), codes::PROXY_TARGET_ABSENT);
    assert_eq!(*observed.lock(), Some(true));
}

#[test]
fn decorated_bean_keeps_the_target_identity() {
    let proxy = BeanDecorationFactory::new().decorate::<dyn Quotes>(eager_bean());
    assert_eq!(
        proxy.proxy().to_string(),
        "{proxy} QuoteService(base=100)"
    );
    assert!(proxy.is_instance_equal_to(
        tenon_core::proxy::Operand::Value(&QuoteService { base: 100 }),
        proxy.target().expect("eager bean resolves"),
    ));
}

#[test]
fn required_bean_reports_missing_instance_and_retries() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let bean: Arc<dyn Bean<QuoteService>> = Arc::new(SimpleBean::required("quotes", move || {
        (counter.fetch_add(1, Ordering::SeqCst) > 0).then_some(QuoteService { base: 50 })
    }));
    let proxy = BeanDecorationFactory::new().decorate::<dyn Quotes>(bean);

    let err = proxy
        .proxy()
        .quote("ACME".to_owned())
        .expect_err("first attempt has no instance");
    assert_eq!(err.code(), codes::BEAN_INSTANCE_UNAVAILABLE);
    assert!(err.message().contains("quotes"));

    assert_eq!(proxy.proxy().quote("ACME".to_owned()).expect("retried"), 54);
    assert_eq!(proxy.proxy().quote("AB".to_owned()).expect("cached"), 52);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn shared_interceptor_serves_several_factories() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let audit: Arc<dyn BeanInterceptor<QuoteService>> = Arc::new(interceptor_fn(
        move |context: &mut BeanInvocationContext<'_, QuoteService>| {
            counter.fetch_add(1, Ordering::SeqCst);
            context.proceed()
        },
    ));

    let first = BeanDecorationFactory::new()
        .with_shared_interceptor(Arc::clone(&audit))
        .decorate::<dyn Quotes>(eager_bean());
    let second = BeanDecorationFactory::new()
        .with_shared_interceptor(audit)
        .decorate::<dyn Quotes>(eager_bean());

    assert_eq!(first.proxy().quote("A".to_owned()).expect("quoted"), 101);
    assert_eq!(second.proxy().quote("BB".to_owned()).expect("quoted"), 102);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
