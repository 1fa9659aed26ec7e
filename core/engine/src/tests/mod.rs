//! Engine test harness and suites.

mod capabilities;
mod classes;
mod control_flow;
mod functions;
mod quotas;
mod values;

use crate::{CallOptions, CancelToken, Engine, ErrorKind, Value};

/// One step of an engine test: evaluate a source snippet and check the
/// outcome.
pub(crate) enum TestAction {
    /// The snippet must evaluate without error.
    Run(&'static str),
    /// The snippet must evaluate to the expected value.
    AssertEq(&'static str, Value),
    /// The snippet must fail with the given kind and a message containing
    /// the fragment.
    AssertError {
        source: &'static str,
        kind: ErrorKind,
        contains: &'static str,
    },
}

impl TestAction {
    pub(crate) fn run(source: &'static str) -> Self {
        Self::Run(source)
    }

    pub(crate) fn assert_eq(source: &'static str, expected: impl Into<Value>) -> Self {
        Self::AssertEq(source, expected.into())
    }

    pub(crate) fn assert(source: &'static str) -> Self {
        Self::AssertEq(source, Value::Bool(true))
    }

    pub(crate) fn assert_error(
        source: &'static str,
        kind: ErrorKind,
        contains: &'static str,
    ) -> Self {
        Self::AssertError {
            source,
            kind,
            contains,
        }
    }
}

/// Runs actions against a default engine; each action evaluates in a
/// fresh call, since calls share no state by design.
pub(crate) fn run_test_actions(actions: impl IntoIterator<Item = TestAction>) {
    run_test_actions_with(&Engine::new(), actions);
}

pub(crate) fn run_test_actions_with(
    engine: &Engine,
    actions: impl IntoIterator<Item = TestAction>,
) {
    let cancel = CancelToken::new();
    for action in actions {
        match action {
            TestAction::Run(source) => {
                let script = engine.compile(source).expect("compile failed");
                script
                    .eval(&cancel, CallOptions::default())
                    .unwrap_or_else(|err| panic!("unexpected error: {err}\nsource:\n{source}"));
            }
            TestAction::AssertEq(source, expected) => {
                let script = engine.compile(source).expect("compile failed");
                let value = script
                    .eval(&cancel, CallOptions::default())
                    .unwrap_or_else(|err| panic!("unexpected error: {err}\nsource:\n{source}"));
                assert_eq!(value, expected, "source:\n{source}");
            }
            TestAction::AssertError {
                source,
                kind,
                contains,
            } => {
                let script = engine.compile(source).expect("compile failed");
                let err = script
                    .eval(&cancel, CallOptions::default())
                    .expect_err(&format!("expected an error\nsource:\n{source}"));
                assert_eq!(err.kind(), kind, "source:\n{source}");
                assert!(
                    err.message().contains(contains),
                    "error `{}` does not contain `{contains}`\nsource:\n{source}",
                    err.message()
                );
            }
        }
    }
}
