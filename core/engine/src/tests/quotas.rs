use super::{run_test_actions_with, TestAction};
use crate::{CallOptions, CancelToken, Engine, ErrorKind, Value};
use indoc::indoc;

#[test]
fn step_quota_stops_infinite_loops() {
    let engine = Engine::builder()
        .step_quota(50)
        .build()
        .expect("engine config");
    let script = engine
        .compile("def spin\n  while true\n    1\n  end\nend")
        .expect("compile failed");
    let err = script
        .call(&CancelToken::new(), "spin", &[], CallOptions::default())
        .unwrap_err();
    assert!(
        err.message().contains("step quota exceeded (50)"),
        "got: {}",
        err.message()
    );
}

#[test]
fn recursion_limit_is_independent_of_the_step_quota() {
    let engine = Engine::builder()
        .recursion_limit(3)
        .build()
        .expect("engine config");
    let script = engine
        .compile(indoc! {r#"
            def r(n)
              if n <= 0
                "done"
              else
                r(n - 1)
              end
            end
        "#})
        .expect("compile failed");
    let err = script
        .call(
            &CancelToken::new(),
            "r",
            &[Value::Int(5)],
            CallOptions::default(),
        )
        .unwrap_err();
    assert!(
        err.message().contains("recursion depth exceeded (limit 3)"),
        "got: {}",
        err.message()
    );

    // Shallow recursion within the limit still succeeds.
    let ok = script
        .call(
            &CancelToken::new(),
            "r",
            &[Value::Int(1)],
            CallOptions::default(),
        )
        .expect("shallow call failed");
    assert_eq!(ok, Value::string("done"));
}

#[test]
fn memory_quota_catches_runaway_growth() {
    let engine = Engine::builder()
        .memory_quota_bytes(4 * 1024)
        .build()
        .expect("engine config");
    run_test_actions_with(
        &engine,
        [TestAction::assert_error(
            indoc! {r#"
                data = []
                while true
                  data.push("xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx")
                end
            "#},
            ErrorKind::Runtime,
            "memory quota exceeded",
        )],
    );
}

#[test]
fn cancellation_is_observed_at_the_step_gate() {
    let engine = Engine::new();
    let script = engine
        .compile("def spin\n  while true\n    1\n  end\nend")
        .expect("compile failed");
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = script
        .call(&cancel, "spin", &[], CallOptions::default())
        .unwrap_err();
    assert!(err.message().contains("context cancelled"));
}

#[test]
fn deadlines_surface_as_runtime_errors() {
    let engine = Engine::new();
    let script = engine
        .compile("def spin\n  while true\n    1\n  end\nend")
        .expect("compile failed");
    let cancel = CancelToken::with_timeout(std::time::Duration::from_millis(0));
    let err = script
        .call(&cancel, "spin", &[], CallOptions::default())
        .unwrap_err();
    assert!(err.message().contains("deadline exceeded"));
}

#[test]
fn quota_errors_carry_stack_frames() {
    let engine = Engine::builder()
        .step_quota(100)
        .build()
        .expect("engine config");
    let script = engine
        .compile(indoc! {"
            def inner
              while true
                1
              end
            end

            def outer
              inner()
            end
        "})
        .expect("compile failed");
    let err = script
        .call(&CancelToken::new(), "outer", &[], CallOptions::default())
        .unwrap_err();
    let rendered = err.render(Some(script.source()));
    assert!(rendered.contains("at inner"));
    assert!(rendered.contains("at outer"));
}

#[test]
fn zero_limits_are_rejected_at_build_time() {
    assert!(Engine::builder().step_quota(0).build().is_err());
    assert!(Engine::builder().recursion_limit(0).build().is_err());
}
