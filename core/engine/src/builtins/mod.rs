//! The built-in member-method surface.
//!
//! One module per receiver kind. Dispatch goes through [`method`], which
//! returns a builtin value capturing nothing — the receiver arrives through
//! the invocation, and zero-arity getters are marked `auto_invoke` so the
//! evaluator calls them on bare reference.

pub(crate) mod array;
pub(crate) mod global;
pub(crate) mod hash;
pub(crate) mod number;
pub(crate) mod range;
pub(crate) mod scalar;
pub(crate) mod string;
pub(crate) mod timekind;

use crate::{
    environment::Environment,
    error::RuntimeError,
    exec::{Execution, Invocation},
    value::{BuiltinFunction, Value},
};
use std::rc::Rc;

/// Looks up a member method for a receiver kind.
pub(crate) fn method(receiver: &Value, name: &str) -> Option<Rc<BuiltinFunction>> {
    match receiver {
        Value::String(_) => string::method(name),
        Value::Array(_) => array::method(name),
        Value::Hash(_) | Value::Object(_) => hash::method(name),
        Value::Int(_) | Value::Float(_) => number::method(name),
        Value::Range(_) => range::method(name),
        Value::Symbol(_) => scalar::symbol_method(name),
        Value::Money(_) => scalar::money_method(name),
        Value::Duration(_) => timekind::duration_method(name),
        Value::Time(_) => timekind::time_method(name),
        _ => None,
    }
}

/// Defines the always-available globals (`assert`, `assert_eq`, `money`)
/// into a call's root environment.
pub(crate) fn install_globals(env: &Rc<Environment>) {
    global::install(env);
}

/// Constructs a builtin value. `auto` marks zero-arity getters invoked on
/// bare reference.
pub(crate) fn builtin<F>(name: &str, auto: bool, f: F) -> Rc<BuiltinFunction>
where
    F: Fn(&mut Execution, Invocation<'_>) -> Result<Value, RuntimeError> + 'static,
{
    Rc::new(BuiltinFunction {
        name: Rc::from(name),
        auto_invoke: auto,
        func: Rc::new(f),
    })
}

/// A block argument, or the canonical error for iteration methods.
pub(crate) fn expect_block<'a>(
    inv: &Invocation<'a>,
    method: &str,
) -> Result<&'a Value, RuntimeError> {
    inv.block
        .ok_or_else(|| RuntimeError::runtime(format!("method `{method}` requires a block")))
}
