//! Always-available global builtins.

use crate::{
    environment::Environment,
    error::RuntimeError,
    value::{operations, Currency, Money, Value},
};
use std::rc::Rc;

/// Installs the default globals into a call's root environment.
pub(crate) fn install(env: &Rc<Environment>) {
    env.define(
        "assert",
        Value::builtin("assert", false, |_, inv| {
            let condition = inv.expect_arg("assert", 0)?;
            inv.expect_max_args("assert", 2)?;
            if condition.is_truthy() {
                return Ok(Value::Nil);
            }
            let message = match inv.args.get(1) {
                Some(Value::String(message)) => message.to_string(),
                Some(other) => other.to_string(),
                None => "assertion failed".to_string(),
            };
            Err(RuntimeError::assertion(message))
        }),
    );

    env.define(
        "assert_eq",
        Value::builtin("assert_eq", false, |_, inv| {
            let left = inv.expect_arg("assert_eq", 0)?;
            let right = inv.expect_arg("assert_eq", 1)?;
            inv.expect_max_args("assert_eq", 2)?;
            if operations::values_equal(left, right) {
                Ok(Value::Nil)
            } else {
                Err(RuntimeError::assertion(format!(
                    "assertion failed: {left} != {right}"
                )))
            }
        }),
    );

    env.define(
        "money",
        Value::builtin("money", false, |_, inv| {
            inv.expect_max_args("money", 2)?;
            let amount = match inv.expect_arg("money", 0)? {
                Value::Int(amount) => *amount,
                other => {
                    return Err(RuntimeError::runtime(format!(
                        "money amount must be an integer of minor units, got {}",
                        other.kind()
                    )));
                }
            };
            let currency = match inv.expect_arg("money", 1)? {
                Value::String(code) | Value::Symbol(code) => Currency::new(code.clone()),
                other => {
                    return Err(RuntimeError::runtime(format!(
                        "money currency must be a string, got {}",
                        other.kind()
                    )));
                }
            };
            Ok(Value::Money(Money::new(amount, currency)))
        }),
    );
}
