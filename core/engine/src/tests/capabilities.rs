use super::{run_test_actions_with, TestAction};
use crate::{
    value::VibeMap, CallOptions, CancelToken, Capability, CapabilityBinding, CapabilityExports,
    Engine, ErrorKind, MethodContract, RuntimeError, Value,
};
use indoc::indoc;
use std::{cell::RefCell, rc::Rc};

/// A toy datastore capability: `db.find`, `db.update`, and a factory
/// method `db.collection` whose result lazily publishes `db.insert`.
struct TestDb {
    store: Rc<RefCell<Value>>,
}

impl TestDb {
    fn new() -> Self {
        let mut profile = VibeMap::new();
        profile.insert("name", Value::string("host"));
        let mut record = VibeMap::new();
        record.insert("profile", Value::hash(profile));
        Self {
            store: Rc::new(RefCell::new(Value::hash(record))),
        }
    }
}

impl Capability for TestDb {
    fn bind(
        &self,
        binding: &mut CapabilityBinding<'_>,
    ) -> Result<CapabilityExports, RuntimeError> {
        let mut surface = VibeMap::new();

        let store = self.store.clone();
        surface.insert(
            "find",
            binding.builtin("db.find", move |_, _inv| Ok(store.borrow().clone())),
        );

        let store = self.store.clone();
        surface.insert(
            "update",
            binding.builtin("db.update", move |_, inv| {
                if let Some(value) = inv.kwargs.first().map(|(_, v)| v) {
                    *store.borrow_mut() = value.clone();
                }
                Ok(Value::Bool(true))
            }),
        );

        // Factory: returns an object whose `insert` builtin only exists
        // after this call — the post-call rescan must bind its contract.
        surface.insert(
            "collection",
            binding.builtin("db.collection", |_, _inv| {
                let mut collection = VibeMap::new();
                collection.insert(
                    "insert",
                    Value::builtin("db.insert", false, |_, _inv| Ok(Value::Bool(true))),
                );
                Ok(Value::object(collection))
            }),
        );

        Ok(vec![("db".to_string(), Value::object(surface))])
    }

    fn contracts(&self) -> Vec<(String, MethodContract)> {
        vec![
            ("db.update".to_string(), MethodContract::data_only()),
            ("db.insert".to_string(), MethodContract::data_only()),
        ]
    }
}

fn db_options() -> CallOptions {
    CallOptions {
        capabilities: vec![Box::new(TestDb::new())],
        ..CallOptions::default()
    }
}

fn eval_with_db(source: &str) -> Result<Value, RuntimeError> {
    let engine = Engine::new();
    let script = engine.compile(source).expect("compile failed");
    script.eval(&CancelToken::new(), db_options())
}

#[test]
fn contracts_reject_callable_attributes() {
    // `helper` takes a parameter, so the bare reference stays a function
    // value instead of auto-invoking.
    let err = eval_with_db(indoc! {r#"
        def helper(event)
          event
        end

        db.update("players", "p-1", attributes: { callback: helper })
    "#})
    .unwrap_err();
    assert!(
        err.message()
            .contains("db.update attributes must be data-only"),
        "got: {}",
        err.message()
    );
}

#[test]
fn contract_clean_calls_pass() {
    let result = eval_with_db(indoc! {r#"
        db.update("players", "p-1", attributes: { name: "x" })
    "#})
    .expect("update failed");
    assert_eq!(result, Value::Bool(true));
}

#[test]
fn script_mutations_do_not_reach_the_host() {
    // Scenario: the host returns `{ profile: { name: "host" } }`; the
    // script mutates its copy; the host's value must be untouched.
    let engine = Engine::new();
    let db = TestDb::new();
    let store = db.store.clone();
    let script = engine
        .compile(indoc! {r#"
            player = db.find("players", "p-1")
            player[:profile][:name] = "script"
            player[:profile][:name]
        "#})
        .expect("compile failed");
    let result = script
        .eval(
            &CancelToken::new(),
            CallOptions {
                capabilities: vec![Box::new(db)],
                ..CallOptions::default()
            },
        )
        .expect("eval failed");
    assert_eq!(result, Value::string("script"));

    let host_value = store.borrow();
    let Value::Hash(record) = &*host_value else {
        panic!("store changed kind");
    };
    let record = record.borrow();
    let Some(Value::Hash(profile)) = record.get("profile") else {
        panic!("profile missing");
    };
    assert_eq!(
        profile.borrow().get("name").cloned(),
        Some(Value::string("host"))
    );
}

#[test]
fn host_values_handed_to_scripts_are_independent() {
    // The same store object fetched twice gives two independent copies.
    let result = eval_with_db(indoc! {r#"
        a = db.find("players", "p-1")
        b = db.find("players", "p-1")
        a[:profile][:name] = "changed"
        b[:profile][:name]
    "#})
    .expect("eval failed");
    assert_eq!(result, Value::string("host"));
}

#[test]
fn lazily_published_builtins_get_their_contracts() {
    // `db.insert` does not exist at bind time; it appears on the object
    // returned by `db.collection`. The post-call rescan must still bind
    // the declared contract to it.
    let err = eval_with_db(indoc! {r#"
        def helper(event)
          event
        end

        items = db.collection("items")
        items.insert({ callback: helper })
    "#})
    .unwrap_err();
    assert!(
        err.message()
            .contains("db.insert attributes must be data-only"),
        "got: {}",
        err.message()
    );
}

#[test]
fn duplicate_contract_names_fail_the_call() {
    struct Dup;
    impl Capability for Dup {
        fn bind(
            &self,
            _binding: &mut CapabilityBinding<'_>,
        ) -> Result<CapabilityExports, RuntimeError> {
            Ok(vec![])
        }
        fn contracts(&self) -> Vec<(String, MethodContract)> {
            vec![("db.update".to_string(), MethodContract::data_only())]
        }
    }

    let engine = Engine::new();
    let script = engine.compile("1").expect("compile failed");
    let err = script
        .eval(
            &CancelToken::new(),
            CallOptions {
                capabilities: vec![Box::new(TestDb::new()), Box::new(Dup)],
                ..CallOptions::default()
            },
        )
        .unwrap_err();
    assert!(err
        .message()
        .contains("duplicate capability contract `db.update`"));
}

#[test]
fn capability_names_must_not_collide_with_globals() {
    let engine = Engine::new();
    let script = engine.compile("1").expect("compile failed");
    let err = script
        .eval(
            &CancelToken::new(),
            CallOptions {
                globals: vec![("db".to_string(), Value::Int(1))],
                capabilities: vec![Box::new(TestDb::new())],
                ..CallOptions::default()
            },
        )
        .unwrap_err();
    assert!(err.message().contains("capability name `db` already defined"));
}

#[test]
fn strict_effects_requires_data_only_globals() {
    let engine = Engine::builder()
        .strict_effects(true)
        .build()
        .expect("engine config");
    let script = engine.compile("1").expect("compile failed");

    let mut poisoned = VibeMap::new();
    poisoned.insert(
        "callback",
        Value::builtin("callback", false, |_, _| Ok(Value::Nil)),
    );
    let err = script
        .eval(
            &CancelToken::new(),
            CallOptions {
                globals: vec![("config".to_string(), Value::hash(poisoned))],
                ..CallOptions::default()
            },
        )
        .unwrap_err();
    assert!(err.message().contains("global `config` must be data-only"));
}

#[test]
fn keywords_are_visible_to_adapters_at_bind_time() {
    struct Who;
    impl Capability for Who {
        fn bind(
            &self,
            binding: &mut CapabilityBinding<'_>,
        ) -> Result<CapabilityExports, RuntimeError> {
            let user = binding
                .keyword("user")
                .cloned()
                .unwrap_or(Value::Nil);
            let mut surface = VibeMap::new();
            surface.insert(
                "user",
                binding.getter("ctx.user", move |_, _| Ok(user.clone())),
            );
            Ok(vec![("ctx".to_string(), Value::object(surface))])
        }
    }

    let engine = Engine::new();
    let script = engine.compile("ctx.user").expect("compile failed");
    let result = script
        .eval(
            &CancelToken::new(),
            CallOptions {
                capabilities: vec![Box::new(Who)],
                keywords: vec![("user".to_string(), Value::string("ada"))],
                ..CallOptions::default()
            },
        )
        .expect("eval failed");
    assert_eq!(result, Value::string("ada"));
}

#[test]
fn iteration_capabilities_observe_cancellation_per_round() {
    struct Rows;
    impl Capability for Rows {
        fn bind(
            &self,
            binding: &mut CapabilityBinding<'_>,
        ) -> Result<CapabilityExports, RuntimeError> {
            let mut surface = VibeMap::new();
            surface.insert(
                "each",
                binding.builtin("rows.each", |exec, inv| {
                    let block = inv.block.ok_or_else(|| {
                        RuntimeError::runtime("method `rows.each` requires a block")
                    })?;
                    for n in 0..1_000_000 {
                        exec.call_block(block, &[Value::Int(n)])?;
                    }
                    Ok(Value::Nil)
                }),
            );
            Ok(vec![("rows".to_string(), Value::object(surface))])
        }
    }

    let engine = Engine::builder()
        .step_quota(500)
        .build()
        .expect("engine config");
    let script = engine
        .compile("rows.each do |n|\n  n\nend")
        .expect("compile failed");
    let err = script
        .eval(
            &CancelToken::new(),
            CallOptions {
                capabilities: vec![Box::new(Rows)],
                ..CallOptions::default()
            },
        )
        .unwrap_err();
    assert!(err.message().contains("step quota exceeded (500)"));
}

#[test]
fn break_from_a_capability_callback_is_a_boundary_error() {
    struct Rows;
    impl Capability for Rows {
        fn bind(
            &self,
            binding: &mut CapabilityBinding<'_>,
        ) -> Result<CapabilityExports, RuntimeError> {
            let mut surface = VibeMap::new();
            surface.insert(
                "each",
                binding.builtin("rows.each", |exec, inv| {
                    let block = inv.block.ok_or_else(|| {
                        RuntimeError::runtime("method `rows.each` requires a block")
                    })?;
                    exec.call_block(block, &[Value::Int(1)])?;
                    Ok(Value::Nil)
                }),
            );
            Ok(vec![("rows".to_string(), Value::object(surface))])
        }
    }

    let engine = Engine::new();
    let script = engine
        .compile("rows.each do |n|\n  break\nend")
        .expect("compile failed");
    let err = script
        .eval(
            &CancelToken::new(),
            CallOptions {
                capabilities: vec![Box::new(Rows)],
                ..CallOptions::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert!(err.message().contains("break cannot cross call boundary"));
}

#[test]
fn host_capability_results_must_pass_return_contracts() {
    struct Leaky;
    impl Capability for Leaky {
        fn bind(
            &self,
            binding: &mut CapabilityBinding<'_>,
        ) -> Result<CapabilityExports, RuntimeError> {
            let mut surface = VibeMap::new();
            surface.insert(
                "fetch",
                binding.builtin("leaky.fetch", |_, _| {
                    let mut out = VibeMap::new();
                    out.insert(
                        "callback",
                        Value::builtin("oops", false, |_, _| Ok(Value::Nil)),
                    );
                    Ok(Value::hash(out))
                }),
            );
            Ok(vec![("leaky".to_string(), Value::object(surface))])
        }
        fn contracts(&self) -> Vec<(String, MethodContract)> {
            vec![("leaky.fetch".to_string(), MethodContract::data_only())]
        }
    }

    let engine = Engine::new();
    let script = engine.compile("leaky.fetch()").expect("compile failed");
    let err = script
        .eval(
            &CancelToken::new(),
            CallOptions {
                capabilities: vec![Box::new(Leaky)],
                ..CallOptions::default()
            },
        )
        .unwrap_err();
    assert!(
        err.message()
            .contains("leaky.fetch return value must be data-only"),
        "got: {}",
        err.message()
    );
}

#[test]
fn host_errors_are_wrapped_with_the_method_name() {
    struct Disk;
    impl Capability for Disk {
        fn bind(
            &self,
            binding: &mut CapabilityBinding<'_>,
        ) -> Result<CapabilityExports, RuntimeError> {
            let mut surface = VibeMap::new();
            surface.insert(
                "read",
                binding.host_builtin("disk.read", |_, _| {
                    Err(std::io::Error::other("volume offline").into())
                }),
            );
            // An error that already is a RuntimeError passes through
            // without the method qualification.
            surface.insert(
                "stat",
                binding.host_builtin("disk.stat", |_, _| {
                    Err(Box::new(RuntimeError::runtime("stat failed")))
                }),
            );
            Ok(vec![("disk".to_string(), Value::object(surface))])
        }
    }

    let engine = Engine::new();
    let options = || CallOptions {
        capabilities: vec![Box::new(Disk)],
        ..CallOptions::default()
    };

    let err = engine
        .compile("disk.read()")
        .expect("compile failed")
        .eval(&CancelToken::new(), options())
        .unwrap_err();
    assert_eq!(err.message(), "disk.read: volume offline");

    let err = engine
        .compile("disk.stat()")
        .expect("compile failed")
        .eval(&CancelToken::new(), options())
        .unwrap_err();
    assert_eq!(err.message(), "stat failed");
}

#[test]
fn test_actions_still_run_without_capabilities() {
    run_test_actions_with(
        &Engine::new(),
        [TestAction::assert_eq("1 + 1", 2)],
    );
}
