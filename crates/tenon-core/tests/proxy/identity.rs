use std::any::Any;

use tenon_core::{Interface, interfaces};
use tenon_core::proxy::{
    Arguments, CallHandle, DECORATING_MECHANISM, DecoratingProxy, DispatchTable, IdentityKind,
    NoTarget, Operand, StandInObject, handler_fn,
};

use super::{Counter, Greeter, Person, hash_of};

fn untargeted(interfaces: impl IntoIterator<Item = tenon_core::Interface>) -> DecoratingProxy {
    DecoratingProxy::new(
        handler_fn(|_: Option<&NoTarget>, call: &CallHandle, _: Arguments| {
            Err(tenon_core::CoreError::new(
                "test.unexpected",
                format!("`{call}` must not reach the handler"),
            ))
        }),
        interfaces,
    )
}

fn targeted(name: &'static str) -> DecoratingProxy<Person> {
    DecoratingProxy::with_target(
        DispatchTable::<Person>::forwarding::<dyn Greeter>(),
        move || Ok(Some(Person::named(name))),
        interfaces![dyn Greeter],
    )
}

struct ForeignStandIn;

impl StandInObject for ForeignStandIn {
    fn mechanism(&self) -> &'static str {
        "test.foreign"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn proxy_is_memoized() {
    let proxy = targeted("ada");
    assert!(std::ptr::eq(proxy.proxy(), proxy.proxy()));
    assert!(proxy.proxy().same_stand_in(&proxy.proxy().clone()));
    assert!(!proxy.proxy().same_stand_in(targeted("ada").proxy()));
    assert_eq!(proxy.proxy().mechanism(), DECORATING_MECHANISM);
}

#[test]
fn untargeted_proxies_compare_by_interface_set() {
    let left = untargeted(interfaces![dyn Greeter, dyn Counter]);
    let right = untargeted(interfaces![dyn Counter, dyn Greeter]);
    let narrower = untargeted(interfaces![dyn Greeter]);

    assert_eq!(left.proxy(), right.proxy());
    assert_eq!(hash_of(left.proxy()), hash_of(right.proxy()));
    assert_ne!(left.proxy(), narrower.proxy());
    assert_eq!(left.proxy().to_string(), "{proxy} [Greeter, Counter]");
}

#[test]
fn display_names_do_not_affect_untargeted_identity() {
    let renamed = untargeted([
        Interface::named::<dyn Greeter>("Zeta"),
        Interface::of::<dyn Counter>(),
    ]);
    let plain = untargeted(interfaces![dyn Greeter, dyn Counter]);

    assert_eq!(renamed.proxy(), plain.proxy());
    assert_eq!(hash_of(renamed.proxy()), hash_of(plain.proxy()));
    assert_eq!(renamed.proxy().to_string(), "{proxy} [Zeta, Counter]");
}

#[test]
fn identity_follows_the_target() {
    let ada = targeted("ada");
    let twin = targeted("ada");
    let grace = targeted("grace");

    assert_eq!(ada.proxy().to_string(), "{proxy} Person(ada)");
    assert_eq!(ada.proxy(), twin.proxy());
    assert_eq!(hash_of(ada.proxy()), hash_of(twin.proxy()));
    assert_ne!(ada.proxy(), grace.proxy());

    let hash = ada
        .invoke_impl(&CallHandle::identity(IdentityKind::HashCode), Arguments::new())
        .expect("hash never fails with a resolvable target");
    assert_eq!(
        *hash.downcast::<u64>().expect("hash is a u64"),
        hash_of(&Person::named("ada"))
    );
}

#[test]
fn equality_against_plain_values_and_foreign_stand_ins() {
    let proxy = targeted("ada");
    let target = proxy.target().expect("resolvable");
    let ada = Person::named("ada");
    let grace = Person::named("grace");

    assert!(!proxy.is_instance_equal_to(Operand::Absent, target));
    assert!(proxy.is_instance_equal_to(Operand::Value(&ada), target));
    assert!(!proxy.is_instance_equal_to(Operand::Value(&grace), target));
    assert!(!proxy.is_instance_equal_to(Operand::Value(&"ada"), target));
    assert!(!proxy.is_instance_equal_to(Operand::StandIn(&ForeignStandIn), target));
    assert!(proxy.is_instance_equal_to(Operand::StandIn(proxy.proxy()), target));
    assert!(proxy.is_instance_equal_to(Operand::StandIn(proxy.proxy()), None));
}

#[test]
fn equals_call_handle_goes_through_the_identity_surface() {
    let proxy = targeted("ada");
    let equals = CallHandle::identity(IdentityKind::Equals);

    let absent = proxy
        .invoke_impl(&equals, Arguments::new())
        .expect("equals never fails");
    assert!(!*absent.downcast::<bool>().expect("bool"));

    let own = proxy
        .invoke_impl(&equals, Arguments::new().with(proxy.proxy().clone()))
        .expect("equals never fails");
    assert!(*own.downcast::<bool>().expect("bool"));

    let twin = targeted("ada");
    let other = proxy
        .invoke_impl(&equals, Arguments::new().with(twin.proxy().clone()))
        .expect("equals never fails");
    assert!(*other.downcast::<bool>().expect("bool"));

    let description = proxy
        .invoke_impl(&CallHandle::identity(IdentityKind::ToString), Arguments::new())
        .expect("to_string never fails");
    assert_eq!(
        *description.downcast::<String>().expect("string"),
        "{proxy} Person(ada)"
    );
}

#[test]
fn targeted_and_untargeted_stand_ins_differ() {
    let with_target = targeted("ada");
    let without_target = DecoratingProxy::with_target(
        DispatchTable::<Person>::forwarding::<dyn Greeter>(),
        || Ok(None),
        interfaces![dyn Greeter],
    );

    assert_ne!(with_target.proxy(), without_target.proxy());
    assert_eq!(without_target.proxy().to_string(), "{proxy} [Greeter]");
}
