use super::{run_test_actions, TestAction};
use crate::{ErrorKind, Value};
use indoc::indoc;

#[test]
fn if_elsif_else_chains() {
    run_test_actions([
        TestAction::assert_eq("if true then 1 else 2 end", 1),
        TestAction::assert_eq("if false then 1 else 2 end", 2),
        TestAction::assert_eq(
            indoc! {"
                n = 7
                if n > 10
                  :big
                elsif n > 5
                  :medium
                else
                  :small
                end
            "},
            Value::symbol("medium"),
        ),
        TestAction::assert_eq("if false then 1 end", Value::Nil),
    ]);
}

#[test]
fn while_and_until_loops() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {"
                n = 0
                while n < 5
                  n = n + 1
                end
                n
            "},
            5,
        ),
        TestAction::assert_eq(
            indoc! {"
                n = 0
                until n >= 3
                  n = n + 1
                end
                n
            "},
            3,
        ),
    ]);
}

#[test]
fn for_iterates_arrays_and_ranges() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {"
                total = 0
                for n in [1, 2, 3]
                  total = total + n
                end
                total
            "},
            6,
        ),
        TestAction::assert_eq(
            indoc! {"
                total = 0
                for n in 1..4
                  total = total + n
                end
                total
            "},
            10,
        ),
        TestAction::assert_error(
            "for n in 42\n  n\nend",
            ErrorKind::Runtime,
            "cannot iterate over int",
        ),
    ]);
}

#[test]
fn break_and_next_stay_in_their_loop() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {"
                n = 0
                while true
                  n = n + 1
                  if n == 3
                    break
                  end
                end
                n
            "},
            3,
        ),
        TestAction::assert_eq(
            indoc! {"
                total = 0
                for n in 1..5
                  if n % 2 == 0
                    next
                  end
                  total = total + n
                end
                total
            "},
            9,
        ),
    ]);
}

#[test]
fn break_cannot_cross_a_call_boundary() {
    run_test_actions([
        TestAction::assert_error(
            indoc! {"
                def leaky
                  break
                end

                while true
                  leaky()
                end
            "},
            ErrorKind::Runtime,
            "break cannot cross call boundary",
        ),
        TestAction::assert_error(
            indoc! {"
                [1, 2, 3].each do |x|
                  break
                end
            "},
            ErrorKind::Runtime,
            "break cannot cross call boundary",
        ),
    ]);
}

#[test]
fn case_matches_first_equal_when() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {r#"
                status = :trial
                case status
                when :active, :trial then "ok"
                when :banned then "no"
                else "unknown"
                end
            "#},
            "ok",
        ),
        TestAction::assert_eq(
            indoc! {r#"
                case 99
                when 1 then "one"
                end
            "#},
            Value::Nil,
        ),
    ]);
}

#[test]
fn rescue_catches_runtime_errors() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {r#"
                try
                  raise "boom"
                rescue
                  "caught"
                end
            "#},
            "caught",
        ),
        TestAction::assert_eq(
            indoc! {r#"
                try
                  1 / 0
                rescue RuntimeError => e
                  e.message
                end
            "#},
            "division by zero",
        ),
    ]);
}

#[test]
fn rescue_type_matching_distinguishes_assertions() {
    run_test_actions([
        // AssertionError clause does not catch plain runtime errors.
        TestAction::assert_error(
            indoc! {r#"
                try
                  raise "boom"
                rescue AssertionError
                  "wrong"
                end
            "#},
            ErrorKind::Runtime,
            "boom",
        ),
        TestAction::assert_eq(
            indoc! {r#"
                try
                  assert(false, "nope")
                rescue AssertionError => e
                  e.type
                end
            "#},
            "AssertionError",
        ),
        // RuntimeError is the universal matcher.
        TestAction::assert_eq(
            indoc! {r#"
                try
                  assert(false)
                rescue RuntimeError
                  "caught"
                end
            "#},
            "caught",
        ),
        TestAction::assert_eq(
            indoc! {r#"
                try
                  assert(false)
                rescue RuntimeError | AssertionError => e
                  e.type
                end
            "#},
            "AssertionError",
        ),
    ]);
}

#[test]
fn bare_raise_reraises_the_rescued_error() {
    run_test_actions([
        TestAction::assert_error(
            indoc! {r#"
                try
                  raise "original"
                rescue
                  raise
                end
            "#},
            ErrorKind::Runtime,
            "original",
        ),
        TestAction::assert_error(
            "raise",
            ErrorKind::Runtime,
            "only valid inside rescue",
        ),
    ]);
}

#[test]
fn ensure_runs_on_both_paths() {
    run_test_actions([
        TestAction::assert_eq(
            indoc! {r#"
                log = []
                try
                  log.push(:body)
                rescue
                  log.push(:rescue)
                ensure
                  log.push(:ensure)
                end
                log.length
            "#},
            2,
        ),
        TestAction::assert_eq(
            indoc! {r#"
                log = []
                try
                  raise "boom"
                rescue
                  log.push(:rescue)
                ensure
                  log.push(:ensure)
                end
                log.length
            "#},
            2,
        ),
    ]);
}

#[test]
fn ensure_outcomes_replace_prior_ones() {
    run_test_actions([
        // An exception inside ensure replaces the body's outcome.
        TestAction::assert_error(
            indoc! {r#"
                try
                  raise "first"
                rescue
                  "rescued"
                ensure
                  raise "second"
                end
            "#},
            ErrorKind::Runtime,
            "second",
        ),
        // A return inside ensure wins over a prior successful return.
        TestAction::assert_eq(
            indoc! {r#"
                def pick
                  try
                    return 1
                  ensure
                    return 2
                  end
                end

                pick()
            "#},
            2,
        ),
    ]);
}

#[test]
fn unmatched_errors_propagate_after_ensure() {
    run_test_actions([TestAction::assert_error(
        indoc! {r#"
            try
              assert(false, "inner")
            rescue AssertionError
              raise "outer"
            end
        "#},
        ErrorKind::Runtime,
        "outer",
    )]);
}
