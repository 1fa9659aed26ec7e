use super::{run_test_actions, TestAction};
use crate::Value;
use indoc::indoc;

#[test]
fn literals_evaluate_to_themselves() {
    run_test_actions([
        TestAction::assert_eq("42", 42),
        TestAction::assert_eq("2.5", 2.5),
        TestAction::assert_eq("\"hello\"", "hello"),
        TestAction::assert_eq("true", true),
        TestAction::assert_eq("nil", Value::Nil),
    ]);
}

#[test]
fn arithmetic_follows_the_numeric_bridge() {
    run_test_actions([
        TestAction::assert_eq("1 + 2 * 3", 7),
        TestAction::assert_eq("7 / 2", 3),
        TestAction::assert_eq("7.0 / 2", 3.5),
        TestAction::assert_eq("7 % 3", 1),
        TestAction::assert_eq("1 + 0.5", 1.5),
        TestAction::assert_eq("-(3)", -3),
    ]);
}

#[test]
fn string_concat_accepts_either_side() {
    run_test_actions([
        TestAction::assert_eq(r#""n=" + 3"#, "n=3"),
        TestAction::assert_eq(r#"3 + "!""#, "3!"),
    ]);
}

#[test]
fn hash_keys_are_sorted_lexicographically() {
    // `{ b: 2, a: 1 }.keys` == `[:a, :b]`
    run_test_actions([
        TestAction::assert("{ b: 2, a: 1 }.keys == [:a, :b]"),
        TestAction::assert("{ b: 2, a: 1 }.values == [1, 2]"),
    ]);
}

#[test]
fn hash_each_iterates_in_key_order() {
    run_test_actions([TestAction::assert_eq(
        indoc! {r#"
            order = []
            { c: 3, a: 1, b: 2 }.each do |k, v|
              order.push(k.to_s + v.to_s)
            end
            order.join(",")
        "#},
        "a1,b2,c3",
    )]);
}

#[test]
fn arrays_are_reference_shared_within_a_script() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            a = [1, 2]
            b = a
            b.push(3)
            a.length
        "},
        3,
    )]);
}

#[test]
fn array_difference_preserves_left_order() {
    run_test_actions([TestAction::assert(
        "[3, 1, 2, 1] - [1] == [3, 2]",
    )]);
}

#[test]
fn array_iterators() {
    run_test_actions([
        TestAction::assert("[1, 2, 3].map do |x| x * 2 end == [2, 4, 6]"),
        TestAction::assert("[1, 2, 3, 4].select do |x| x % 2 == 0 end == [2, 4]"),
        TestAction::assert("[1, 2, 3, 4].reject do |x| x % 2 == 0 end == [1, 3]"),
        TestAction::assert_eq("[1, 2, 3].sum", 6),
        TestAction::assert("[3, 1, 2].sort == [1, 2, 3]"),
        TestAction::assert("[1, 2, 2, 3, 1].uniq == [1, 2, 3]"),
        TestAction::assert_eq(r#"["a", "b"].join("-")"#, "a-b"),
    ]);
}

#[test]
fn ranges_iterate_inclusively_and_descending() {
    run_test_actions([
        TestAction::assert("(1..4).to_a == [1, 2, 3, 4]"),
        TestAction::assert("(3..1).to_a == [3, 2, 1]"),
        TestAction::assert_eq("(1..10).sum", 55),
        TestAction::assert("(1..5).include?(5)"),
    ]);
}

#[test]
fn string_methods() {
    run_test_actions([
        TestAction::assert_eq(r#""hello".length"#, 5),
        TestAction::assert_eq(r#""hello".upcase"#, "HELLO"),
        TestAction::assert_eq(r#""  x  ".strip"#, "x"),
        TestAction::assert(r#""a,b,c".split(",") == ["a", "b", "c"]"#),
        TestAction::assert(r#""hello".include?("ell")"#),
        TestAction::assert_eq(r#""42".to_i"#, 42),
        TestAction::assert_eq(r#":name.to_s"#, "name"),
        TestAction::assert_eq(r#""name".to_sym.to_s"#, "name"),
    ]);
}

#[test]
fn durations_from_numeric_methods() {
    run_test_actions([
        TestAction::assert("5.minutes == 300.seconds"),
        TestAction::assert("2.hours + 30.minutes == 150.minutes"),
        TestAction::assert("1.days - 1.hours == 23.hours"),
        TestAction::assert_eq("90.seconds.in_minutes", 1.5),
        TestAction::assert_eq("(1.days + 2.hours).humanize", "1d 2h"),
    ]);
}

#[test]
fn money_arithmetic_preserves_currency() {
    run_test_actions([
        TestAction::assert(r#"money(150, "USD") + money(75, "USD") == money(225, "USD")"#),
        TestAction::assert(r#"money(100, "USD").amount == 100"#),
        TestAction::assert_error(
            r#"money(100, "USD") + money(100, "EUR")"#,
            crate::ErrorKind::Runtime,
            "cannot add money",
        ),
        TestAction::assert_error(
            r#"money(1, "USD") < money(1, "EUR")"#,
            crate::ErrorKind::Runtime,
            "cannot compare money",
        ),
    ]);
}

#[test]
fn division_by_zero_fails() {
    run_test_actions([
        TestAction::assert_error("1 / 0", crate::ErrorKind::Runtime, "division by zero"),
        TestAction::assert_error("1 % 0", crate::ErrorKind::Runtime, "modulo by zero"),
    ]);
}

#[test]
fn abs_detects_integer_minimum() {
    run_test_actions([
        TestAction::assert_eq("(-5).abs", 5),
        TestAction::assert_error(
            "(-9223372036854775807 - 1).abs",
            crate::ErrorKind::Runtime,
            "integer overflow",
        ),
    ]);
}

#[test]
fn float_to_int_rejects_non_finite() {
    run_test_actions([
        TestAction::assert_eq("2.9.to_i", 2),
        TestAction::assert_error(
            "(1.0 / 0.0000000001 * 10000000000.0 * 10000000000.0).to_i",
            crate::ErrorKind::Runtime,
            "out of int range",
        ),
    ]);
}

#[test]
fn cross_kind_comparison_fails() {
    run_test_actions([TestAction::assert_error(
        r#"1 < "2""#,
        crate::ErrorKind::Runtime,
        "cannot compare int and string",
    )]);
}

#[test]
fn hash_methods() {
    run_test_actions([
        TestAction::assert_eq("{ a: 1, b: 2 }.length", 2),
        TestAction::assert("{ a: 1 }.key?(:a)"),
        TestAction::assert_eq("{ a: 1 }.fetch(:a)", 1),
        TestAction::assert_eq("{ a: 1 }.fetch(:b, 0)", 0),
        TestAction::assert_error(
            "{ a: 1 }.fetch(:b)",
            crate::ErrorKind::Runtime,
            "key not found",
        ),
        TestAction::assert("{ a: 1 }.merge({ b: 2 }).keys == [:a, :b]"),
        TestAction::assert(
            "{ a: 1, b: 2 }.transform_values do |v| v * 10 end == { a: 10, b: 20 }",
        ),
    ]);
}

#[test]
fn index_access_and_assignment() {
    run_test_actions([
        TestAction::assert_eq("[10, 20, 30][1]", 20),
        TestAction::assert_eq("[10, 20, 30][-1]", 30),
        TestAction::assert_eq("[10, 20, 30][9]", Value::Nil),
        TestAction::assert_eq("h = { a: 1 }\nh[:a]", 1),
        TestAction::assert_eq("h = { a: 1 }\nh[:missing]", Value::Nil),
        TestAction::assert_eq("a = [1]\na[1] = 2\na.length", 2),
        TestAction::assert_error(
            "a = [1]\na[5] = 2",
            crate::ErrorKind::Runtime,
            "out of bounds",
        ),
        TestAction::assert_eq("h = {}\nh[:k] = 9\nh[:k]", 9),
    ]);
}
