use proptest::prelude::*;
use tenon_core::interfaces;
use tenon_core::proxy::{DecoratingProxy, DispatchTable};

use super::{Counter, Greeter, Person, hash_of};

fn proxy_over(name: String, with_counter: bool) -> DecoratingProxy<Person> {
    let table =
        DispatchTable::<Person>::forwarding::<dyn Greeter>().with_capability::<dyn Counter>();
    if with_counter {
        DecoratingProxy::with_target(
            table,
            move || Ok(Some(Person { name: name.clone() })),
            interfaces![dyn Greeter, dyn Counter],
        )
    } else {
        DecoratingProxy::with_target(
            table,
            move || Ok(Some(Person { name: name.clone() })),
            interfaces![dyn Greeter],
        )
    }
}

proptest! {
    /// 目标相等的代理必然相等且哈希一致，与接口集合无关。
    #[test]
    fn equal_targets_imply_equal_stand_ins(
        name in "[a-z]{0,12}",
        left_counter in any::<bool>(),
        right_counter in any::<bool>()
    ) {
        let left = proxy_over(name.clone(), left_counter);
        let right = proxy_over(name, right_counter);
        prop_assert_eq!(left.proxy(), right.proxy());
        prop_assert_eq!(hash_of(left.proxy()), hash_of(right.proxy()));
    }

    /// 目标不同的代理不相等。
    #[test]
    fn different_targets_imply_different_stand_ins(left in "[a-z]{1,8}", right in "[a-z]{1,8}") {
        prop_assume!(left != right);
        let left = proxy_over(left, false);
        let right = proxy_over(right, false);
        prop_assert_ne!(left.proxy(), right.proxy());
    }
}
