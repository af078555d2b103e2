use service_loom::{Args, Loom, LoomError, LoomResult, ServiceEntry};

fn passthrough(dep: &str) -> ServiceEntry {
    ServiceEntry::factory([dep], |args: Args| -> LoomResult<String> {
        args.get::<String>(0).map(|s| (*s).clone())
    })
}

#[test]
fn test_three_service_cycle_chain() {
    let loom = Loom::new();
    loom.define(vec![
        ("a", passthrough("b")),
        ("b", passthrough("c")),
        ("c", passthrough("a")),
    ])
    .unwrap();

    let builder = loom.construct().expect_builder();
    let err = builder.get("a").unwrap_err();

    match err {
        LoomError::Circular { service, chain } => {
            assert_eq!(service, "a");
            // The chain grows by prepending the entered name: a recursed
            // into b, then c, then re-requested a.
            assert_eq!(chain, vec!["a", "c", "b", "a"]);
        }
        other => panic!("expected Circular, got {other}"),
    }
}

#[test]
fn test_cycle_error_message() {
    let loom = Loom::new();
    loom.define(vec![
        ("a", passthrough("b")),
        ("b", passthrough("c")),
        ("c", passthrough("a")),
    ])
    .unwrap();

    let builder = loom.construct().expect_builder();
    let message = builder.get("a").unwrap_err().to_string();
    assert!(
        message.contains("Circular dependency error with a at a => c => b"),
        "unexpected message: {message}"
    );
    assert_eq!(
        message,
        "Circular dependency error with a at a => c => b => a"
    );
}

#[test]
fn test_self_cycle() {
    let loom = Loom::new();
    loom.define(vec![("a", passthrough("a"))]).unwrap();

    let builder = loom.construct().expect_builder();
    match builder.get("a").unwrap_err() {
        LoomError::Circular { service, chain } => {
            assert_eq!(service, "a");
            assert_eq!(chain, vec!["a", "a"]);
        }
        other => panic!("expected Circular, got {other}"),
    }
}

#[test]
fn test_sibling_branches_do_not_share_loading_state() {
    // A diamond is not a cycle: left and right both need base, and base is
    // no longer loading by the time right resolves.
    let loom = Loom::new();
    loom.define(vec![
        ("base", ServiceEntry::supplier(|| "b".to_string())),
        ("left", passthrough("base")),
        ("right", passthrough("base")),
        (
            "top",
            ServiceEntry::factory(["left", "right"], |args: Args| -> LoomResult<String> {
                Ok(format!(
                    "{}{}",
                    args.get::<String>(0)?,
                    args.get::<String>(1)?
                ))
            }),
        ),
    ])
    .unwrap();

    let builder = loom.construct().expect_builder();
    assert_eq!(&*builder.get_as::<String>("top").unwrap(), "bb");
}

#[test]
fn test_loading_flags_reset_after_cycle_error() {
    let loom = Loom::new();
    loom.define(vec![
        ("a", passthrough("b")),
        ("b", passthrough("c")),
        ("c", passthrough("a")),
    ])
    .unwrap();

    let builder = loom.construct().expect_builder();
    assert!(builder.get("a").is_err());

    // Supplying one member from the outside breaks the cycle; the earlier
    // failure must not leave any definition marked as loading.
    let builder = builder.with_value("a", "x".to_string()).unwrap();
    assert_eq!(&*builder.get_as::<String>("b").unwrap(), "x");
    assert_eq!(&*builder.get_as::<String>("c").unwrap(), "x");
}

#[test]
fn test_cycle_detected_through_adhoc_resolution() {
    let loom = Loom::new();
    loom.define(vec![("a", passthrough("b")), ("b", passthrough("a"))])
        .unwrap();

    let builder = loom.construct().expect_builder();
    let err = builder.resolve(passthrough("a")).unwrap_err();
    match err {
        LoomError::Circular { service, chain } => {
            assert_eq!(service, "a");
            assert_eq!(chain, vec!["a", "b", "a", "$"]);
        }
        other => panic!("expected Circular, got {other}"),
    }
}
