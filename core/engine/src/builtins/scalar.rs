//! Symbol and money member methods.

use super::builtin;
use crate::{
    error::RuntimeError,
    exec::Invocation,
    value::{BuiltinFunction, Money, Value},
};
use std::rc::Rc;

fn symbol_recv<'a>(inv: &Invocation<'a>, method: &str) -> Result<&'a Rc<str>, RuntimeError> {
    match inv.expect_receiver(method)? {
        Value::Symbol(name) => Ok(name),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a symbol receiver, got {}",
            other.kind()
        ))),
    }
}

pub(crate) fn symbol_method(name: &str) -> Option<Rc<BuiltinFunction>> {
    Some(match name {
        "to_s" => builtin("to_s", true, |_, inv| {
            Ok(Value::String(symbol_recv(&inv, "to_s")?.clone()))
        }),
        "length" => builtin("length", true, |_, inv| {
            Ok(Value::Int(
                symbol_recv(&inv, "length")?.chars().count() as i64
            ))
        }),
        _ => return None,
    })
}

fn money_recv(inv: &Invocation<'_>, method: &str) -> Result<Money, RuntimeError> {
    match inv.expect_receiver(method)? {
        Value::Money(money) => Ok(money.clone()),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a money receiver, got {}",
            other.kind()
        ))),
    }
}

pub(crate) fn money_method(name: &str) -> Option<Rc<BuiltinFunction>> {
    Some(match name {
        "amount" => builtin("amount", true, |_, inv| {
            Ok(Value::Int(money_recv(&inv, "amount")?.amount()))
        }),
        "currency" => builtin("currency", true, |_, inv| {
            Ok(Value::string(
                money_recv(&inv, "currency")?.currency().code().to_string(),
            ))
        }),
        "abs" => builtin("abs", true, |_, inv| {
            money_recv(&inv, "abs")?.checked_abs().map(Value::Money)
        }),
        "to_s" => builtin("to_s", true, |_, inv| {
            Ok(Value::string(money_recv(&inv, "to_s")?.to_string()))
        }),
        _ => return None,
    })
}
