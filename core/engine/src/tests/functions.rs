use super::{run_test_actions, TestAction};
use crate::{CallOptions, CancelToken, Engine, ErrorKind, Value};
use indoc::indoc;

#[test]
fn call_by_name_from_the_host() {
    let engine = Engine::new();
    let script = engine
        .compile("def add(a, b)\n  a + b\nend")
        .expect("compile failed");
    let result = script
        .call(
            &CancelToken::new(),
            "add",
            &[Value::Int(2), Value::Int(3)],
            CallOptions::default(),
        )
        .expect("call failed");
    assert_eq!(result, Value::Int(5));
}

#[test]
fn keyword_arguments_from_the_host() {
    let engine = Engine::new();
    let script = engine
        .compile("def greet(name, greeting = \"hi\")\n  greeting + \" \" + name\nend")
        .expect("compile failed");
    let result = script
        .call(
            &CancelToken::new(),
            "greet",
            &[Value::string("ada")],
            CallOptions {
                keywords: vec![("greeting".into(), Value::string("hello"))],
                ..CallOptions::default()
            },
        )
        .expect("call failed");
    assert_eq!(result, Value::string("hello ada"));
}

#[test]
fn undefined_function_is_reported() {
    let engine = Engine::new();
    let script = engine.compile("def a\n  1\nend").expect("compile failed");
    let err = script
        .call(&CancelToken::new(), "missing", &[], CallOptions::default())
        .unwrap_err();
    assert!(err.message().contains("undefined function `missing`"));
}

#[test]
fn defaults_and_keyword_binding() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {"
                def total(base, bonus = 10)
                  base + bonus
                end

                total(5)
            "},
            15,
        ),
        TestAction::assert_eq(
            indoc! {"
                def total(base, bonus = 10)
                  base + bonus
                end

                total(5, bonus: 1)
            "},
            6,
        ),
        TestAction::assert_error(
            indoc! {"
                def f(a)
                  a
                end

                f(1, 2)
            "},
            ErrorKind::Runtime,
            "too many arguments",
        ),
        TestAction::assert_error(
            indoc! {"
                def f(a)
                  a
                end

                f()
            "},
            ErrorKind::Runtime,
            "missing argument `a`",
        ),
        TestAction::assert_error(
            indoc! {"
                def f(a)
                  a
                end

                f(1, b: 2)
            "},
            ErrorKind::Runtime,
            "unknown keyword argument `b`",
        ),
    ]);
}

#[test]
fn parameter_and_return_types_are_enforced() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {"
                def double(n : Integer) : Integer
                  n * 2
                end

                double(21)
            "},
            42,
        ),
        TestAction::assert_error(
            indoc! {r#"
                def double(n : Integer)
                  n * 2
                end

                double("x")
            "#},
            ErrorKind::Runtime,
            "parameter `n` of `double` expected Integer, got string",
        ),
        TestAction::assert_error(
            indoc! {r#"
                def bad : Integer
                  "nope"
                end

                bad()
            "#},
            ErrorKind::Runtime,
            "return value of `bad` expected Integer, got string",
        ),
    ]);
}

#[test]
fn implicit_and_explicit_returns() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {"
                def implicit
                  1 + 1
                end

                implicit()
            "},
            2,
        ),
        TestAction::assert_eq(
            indoc! {"
                def explicit(n)
                  if n > 0
                    return :positive
                  end
                  :other
                end

                explicit(5)
            "},
            Value::symbol("positive"),
        ),
    ]);
}

#[test]
fn auto_invoke_for_zero_arity_functions() {
    // For a zero-arity `f`, `f` and `f()` evaluate to the same value.
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            def answer
              42
            end

            a = answer
            b = answer()
            a + b
        "},
        84,
    )]);
}

#[test]
fn yield_drives_the_supplied_block() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {"
                def twice
                  yield(1) + yield(2)
                end

                twice do |n|
                  n * 10
                end
            "},
            30,
        ),
        TestAction::assert_error(
            indoc! {"
                def no_block
                  yield
                end

                no_block()
            "},
            ErrorKind::Runtime,
            "no block given",
        ),
    ]);
}

#[test]
fn blocks_enforce_declared_parameter_types() {
    run_test_actions([TestAction::assert_error(
        indoc! {r#"
            def run
              yield("text")
            end

            run do |n : Integer|
              n
            end
        "#},
        ErrorKind::Runtime,
        "block parameter `n` expected Integer, got string",
    )]);
}

#[test]
fn return_inside_a_block_ends_the_block() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            def once
              yield(3)
            end

            once do |n|
              return n * 2
            end
        "},
        6,
    )]);
}

#[test]
fn fresh_names_assigned_in_functions_stay_local() {
    run_test_actions([TestAction::assert_eq(
        indoc! {r#"
            def bump
              temp = 99
              temp
            end

            bump()
            try
              temp
            rescue => e
              e.message
            end
        "#},
        "undefined variable `temp`",
    )]);
}

#[test]
fn assignment_reaches_existing_outer_bindings() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            counter = 0

            def bump
              counter = counter + 1
            end

            bump()
            bump()
            counter
        "},
        2,
    )]);
}

#[test]
fn functions_close_over_their_environment() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            base = 10

            def offset(n)
              base + n
            end

            offset(5)
        "},
        15,
    )]);
}

#[test]
fn callable_return_values_are_rejected_at_the_boundary() {
    let engine = Engine::new();
    let err = engine
        .compile("assert")
        .expect("compile failed")
        .eval(&CancelToken::new(), CallOptions::default())
        .unwrap_err();
    assert!(err.message().contains("data-only"));
}
