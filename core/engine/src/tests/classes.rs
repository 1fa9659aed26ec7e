use super::{run_test_actions, TestAction};
use crate::{ErrorKind, Value};
use indoc::indoc;

#[test]
fn instances_carry_ivars() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            class Counter
              def initialize(start)
                @value = start
              end

              def value
                @value
              end

              def bump
                @value = @value + 1
              end
            end

            c = Counter.new(10)
            c.bump
            c.bump
            c.value
        "},
        12,
    )]);
}

#[test]
fn new_without_parens_auto_invokes() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            class Flag
              def initialize
                @set = true
              end

              def set?
                @set
              end
            end

            Flag.new.set?
        "},
        true,
    )]);
}

#[test]
fn class_methods_and_class_vars() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            class Registry
              @@count = 0

              def self.record
                @@count = @@count + 1
              end

              def self.count
                @@count
              end
            end

            Registry.record
            Registry.record
            Registry.count
        "},
        2,
    )]);
}

#[test]
fn setter_methods_win_over_direct_ivar_writes() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            class Account
              def initialize
                @balance = 0
              end

              def balance
                @balance
              end

              def balance=(value)
                if value < 0
                  raise \"negative balance\"
                end
                @balance = value
              end
            end

            a = Account.new
            a.balance = 50
            a.balance
        "},
        50,
    )]);
}

#[test]
fn getter_only_properties_are_read_only() {
    run_test_actions([TestAction::assert_error(
        indoc! {"
            class Config
              def initialize
                @frozen = true
              end

              def frozen
                @frozen
              end
            end

            c = Config.new
            c.frozen = false
        "},
        ErrorKind::Runtime,
        "cannot assign to read-only property",
    )]);
}

#[test]
fn writes_without_any_accessor_go_to_the_ivar() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            class Bag
            end

            b = Bag.new
            b.weight = 3
            b.weight
        "},
        3,
    )]);
}

#[test]
fn methods_call_each_other_through_self() {
    run_test_actions([TestAction::assert_eq(
        indoc! {"
            class Greeter
              def initialize(name)
                @name = name
              end

              def name
                @name
              end

              def greet
                \"hi \" + name
              end
            end

            Greeter.new(\"ada\").greet
        "},
        "hi ada",
    )]);
}

#[test]
fn undefined_method_is_reported_with_the_class_name() {
    run_test_actions([TestAction::assert_error(
        indoc! {"
            class Empty
            end

            Empty.new.missing
        "},
        ErrorKind::Runtime,
        "undefined method `missing` for Empty",
    )]);
}

#[test]
fn setter_validation_failures_propagate() {
    run_test_actions([TestAction::assert_eq(
        indoc! {r#"
            class Account
              def balance
                @balance
              end

              def balance=(value)
                if value < 0
                  raise "negative balance"
                end
                @balance = value
              end
            end

            a = Account.new
            try
              a.balance = -1
            rescue => e
              e.message
            end
        "#},
        "negative balance",
    )]);
}

#[test]
fn ivars_outside_instances_fail() {
    run_test_actions([
        TestAction::assert_error(
            "@name",
            ErrorKind::Runtime,
            "outside of an instance method",
        ),
        TestAction::assert_eq(
            indoc! {"
                class Ghost
                  def missing_ivar
                    @never_set
                  end
                end

                Ghost.new.missing_ivar
            "},
            Value::Nil,
        ),
    ]);
}
