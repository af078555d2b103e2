use std::sync::Arc;

use service_loom::{
    AdHoc, Args, Loom, LoomError, LoomOptions, LoomResult, ServiceEntry, ServiceValue,
};

fn passthrough(dep: &str) -> ServiceEntry {
    ServiceEntry::factory([dep], |args: Args| -> LoomResult<String> {
        args.get::<String>(0).map(|s| (*s).clone())
    })
}

#[test]
fn test_adhoc_resolves_against_supplied_context() {
    let loom = Loom::new();
    loom.define(vec![(
        "breakfast",
        ServiceEntry::factory(["meat", "egg", "juice"], |args: Args| -> LoomResult<String> {
            Ok(format!(
                "{} {} eggs {} juice",
                args.get::<String>(0)?,
                args.get::<String>(1)?,
                args.get::<String>(2)?
            ))
        }),
    )])
    .unwrap();

    let builder = loom
        .construct_with(vec![
            ("meat", ServiceValue::ready("ham".to_string())),
            ("egg", ServiceValue::ready("scrambled".to_string())),
            ("juice", ServiceValue::ready("orange".to_string())),
        ])
        .expect_builder();

    let value = builder.resolve(passthrough("breakfast")).unwrap();
    assert_eq!(
        &*value.downcast::<String>().unwrap(),
        "ham scrambled eggs orange juice"
    );
}

#[test]
fn test_adhoc_with_empty_registry() {
    let loom = Loom::new();
    let builder = loom
        .construct_with(vec![("meat", ServiceValue::ready("ham".to_string()))])
        .expect_builder();

    let value = builder.resolve(passthrough("meat")).unwrap();
    assert_eq!(&*value.downcast::<String>().unwrap(), "ham");
}

#[test]
fn test_adhoc_multiple_dependencies() {
    let loom = Loom::new();
    let builder = loom
        .construct_with(vec![
            ("meat", ServiceValue::ready("ham".to_string())),
            ("egg", ServiceValue::ready("scrambled".to_string())),
            ("juice", ServiceValue::ready("orange".to_string())),
        ])
        .expect_builder();

    let value = builder
        .resolve(ServiceEntry::factory(
            ["meat", "egg", "juice"],
            |args: Args| -> LoomResult<String> {
                Ok(format!(
                    "{}{}{}",
                    args.get::<String>(0)?,
                    args.get::<String>(1)?,
                    args.get::<String>(2)?
                ))
            },
        ))
        .unwrap();
    assert_eq!(&*value.downcast::<String>().unwrap(), "hamscrambledorange");
}

#[test]
fn test_dollar_injects_the_adhoc_resolver() {
    let loom = Loom::new();
    loom.define(vec![
        (
            "foo",
            ServiceEntry::factory(["$"], |args: Args| -> LoomResult<String> {
                let resolver = args.get::<AdHoc>(0)?;
                let bar = resolver.resolve(passthrough("bar"))?;
                Ok((*bar.downcast::<String>()?).clone())
            }),
        ),
        ("bar", ServiceEntry::supplier(|| "bar".to_string())),
    ])
    .unwrap();

    let builder = loom.construct().expect_builder();
    // "$" never shows up as a setter even though foo depends on it.
    assert!(builder.setters().is_empty());
    assert_eq!(&*builder.get_as::<String>("foo").unwrap(), "bar");
}

#[test]
fn test_dollar_sees_services_defined_after_construct() {
    let loom = Loom::new();
    loom.define(vec![(
        "foo",
        ServiceEntry::factory(["$"], |args: Args| -> LoomResult<String> {
            let resolver = args.get::<AdHoc>(0)?;
            let bar = resolver.resolve(passthrough("bar"))?;
            Ok((*bar.downcast::<String>()?).clone())
        }),
    )])
    .unwrap();

    let builder = loom.construct().expect_builder();
    loom.define(vec![("bar", ServiceEntry::value("bar".to_string()))])
        .unwrap();

    assert_eq!(&*builder.get_as::<String>("foo").unwrap(), "bar");
}

#[test]
fn test_adhoc_extends_through_new_definitions() {
    let loom = Loom::new();
    loom.define(vec![("foo", ServiceEntry::value("foo".to_string()))])
        .unwrap();

    let builder = loom.construct().expect_builder();
    loom.define(vec![("bar", passthrough("foo"))]).unwrap();

    let value = builder.resolve(passthrough("bar")).unwrap();
    assert_eq!(&*value.downcast::<String>().unwrap(), "foo");
}

#[test]
fn test_no_dsl_construction_returns_resolver() {
    let loom = Loom::with_options(LoomOptions { dsl: false });
    loom.define(vec![("foo", ServiceEntry::value("foo".to_string()))])
        .unwrap();

    let resolver = loom.construct().expect_resolver();
    let value = resolver.resolve(passthrough("foo")).unwrap();
    assert_eq!(&*value.downcast::<String>().unwrap(), "foo");
}

#[test]
fn test_no_dsl_resolver_still_recurses() {
    let loom = Loom::with_options(LoomOptions { dsl: false });
    loom.define(vec![
        (
            "foo",
            ServiceEntry::factory(["$"], |args: Args| -> LoomResult<String> {
                let resolver = args.get::<AdHoc>(0)?;
                let bar = resolver.resolve(passthrough("bar"))?;
                Ok((*bar.downcast::<String>()?).clone())
            }),
        ),
        ("bar", ServiceEntry::supplier(|| "bar".to_string())),
    ])
    .unwrap();

    let constructed = loom.construct();
    let value = constructed.resolve(passthrough("foo")).unwrap();
    assert_eq!(&*value.downcast::<String>().unwrap(), "bar");
}

#[test]
fn test_adhoc_is_not_memoized() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = Arc::new(AtomicUsize::new(0));
    let loom = Loom::new();
    let builder = loom.construct().expect_builder();

    for _ in 0..2 {
        let counter = calls.clone();
        let value = builder
            .resolve(ServiceEntry::supplier(move || {
                counter.fetch_add(1, Ordering::SeqCst) + 1
            }))
            .unwrap();
        value.downcast::<usize>().unwrap();
    }
    // Each ad-hoc application runs its provider anew.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_adhoc_unresolved_error_chain_starts_at_dollar() {
    let loom = Loom::new();
    let builder = loom.construct().expect_builder();

    let err = builder.resolve(passthrough("meat")).unwrap_err();
    match err {
        LoomError::Unresolved {
            dependency, chain, ..
        } => {
            assert_eq!(dependency, "meat");
            assert_eq!(chain, vec!["$"]);
        }
        other => panic!("expected Unresolved, got {other}"),
    }
}
