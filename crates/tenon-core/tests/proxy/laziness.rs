use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tenon_core::CoreError;
use tenon_core::interfaces;
use tenon_core::proxy::{DecoratingProxy, DispatchTable};

use super::{Greeter, Person};

fn counted_proxy(
    failures_before_success: usize,
) -> (DecoratingProxy<Person>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let proxy = DecoratingProxy::with_target(
        DispatchTable::<Person>::forwarding::<dyn Greeter>(),
        move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            if attempt < failures_before_success {
                Err(CoreError::new("registry.unavailable", "bean registry is warming up"))
            } else {
                Ok(Some(Person::named("ada")))
            }
        },
        interfaces![dyn Greeter],
    );
    (proxy, calls)
}

#[test]
fn target_is_resolved_lazily_and_once() {
    let (proxy, calls) = counted_proxy(0);

    let _ = proxy.proxy();
    assert_eq!(calls.load(Ordering::SeqCst), 0, "creating the stand-in must not resolve");

    for _ in 0..3 {
        proxy
            .proxy()
            .greet("grace".to_owned())
            .expect("target resolves");
    }
    let _ = proxy.proxy().to_string();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn resolution_failure_propagates_and_is_retried() {
    let (proxy, calls) = counted_proxy(1);

    let err = proxy
        .proxy()
        .greet("grace".to_owned())
        .expect_err("first resolution fails");
    assert_eq!(err.code(), "registry.unavailable");

    let greeting = proxy
        .proxy()
        .greet("grace".to_owned())
        .expect("second resolution succeeds");
    assert_eq!(greeting, "ada greets grace");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    proxy.target().expect("cached");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn identity_traits_fall_back_when_resolution_fails() {
    let (proxy, calls) = counted_proxy(usize::MAX);

    assert_eq!(proxy.proxy().to_string(), "{proxy} [Greeter]");
    assert!(proxy.target().is_err());
    assert!(calls.load(Ordering::SeqCst) >= 2, "failures are never cached");
}
