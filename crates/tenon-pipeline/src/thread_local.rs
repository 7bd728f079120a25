use std::cell::RefCell;
use std::thread::LocalKey;

use tenon_core::{BoxCallable, Callable, Chainable, CoreResult, LayerDescriptor};

/// 线程局部值的存储槽类型。
pub type ThreadLocalSlot<T> = RefCell<Option<T>>;

/// 线程局部安装层：内层执行期间，把给定值安装到线程局部槽中。
///
/// # 契约说明（What）
/// - 进入时安装值并记住旧值，离开时（含失败与 panic）恢复旧值，嵌套安装按栈语义还原；
/// - 每次执行安装的是值的克隆，层本身可重复执行。
///
/// ```rust
/// use std::cell::RefCell;
/// use tenon_core::{callable_fn, Callable};
/// use tenon_pipeline::ThreadLocalLayer;
///
/// thread_local! {
///     static TENANT: RefCell<Option<String>> = const { RefCell::new(None) };
/// }
///
/// let layer: ThreadLocalLayer<String, Option<String>> = ThreadLocalLayer::new(
///     &TENANT,
///     "acme".to_owned(),
///     Box::new(callable_fn(|| Ok(TENANT.with(|slot| slot.borrow().clone())))),
/// );
/// assert_eq!(layer.call().unwrap().as_deref(), Some("acme"));
/// assert!(TENANT.with(|slot| slot.borrow().is_none()));
/// ```
pub struct ThreadLocalLayer<T: 'static, R> {
    key: &'static LocalKey<ThreadLocalSlot<T>>,
    value: T,
    next: BoxCallable<R>,
}

impl<T, R> ThreadLocalLayer<T, R>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(key: &'static LocalKey<ThreadLocalSlot<T>>, value: T, next: BoxCallable<R>) -> Self {
        Self { key, value, next }
    }
}

struct RestoreSlot<T: 'static> {
    key: &'static LocalKey<ThreadLocalSlot<T>>,
    previous: Option<T>,
}

impl<T: 'static> Drop for RestoreSlot<T> {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // 线程退出阶段槽可能已被销毁，此时无需恢复。
        let _ = self.key.try_with(|slot| *slot.borrow_mut() = previous);
    }
}

impl<T, R> Callable<R> for ThreadLocalLayer<T, R>
where
    T: Clone + Send + Sync + 'static,
{
    fn call(&self) -> CoreResult<R> {
        let previous = self
            .key
            .with(|slot| slot.replace(Some(self.value.clone())));
        let _restore = RestoreSlot {
            key: self.key,
            previous,
        };
        self.next.call()
    }

    fn as_chainable(&self) -> Option<&dyn Chainable<R>> {
        Some(self)
    }
}

impl<T, R> Chainable<R> for ThreadLocalLayer<T, R>
where
    T: Clone + Send + Sync + 'static,
{
    fn next(&self) -> &dyn Callable<R> {
        &self.next
    }

    fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::new(
            "tenon.thread_local",
            "context",
            "installs a thread-local value around the inner unit",
        )
    }
}
