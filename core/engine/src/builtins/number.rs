//! Integer and float member methods, including the duration constructors
//! (`5.minutes`, `2.days`) behind the scheduling-flavoured script idiom.

use super::builtin;
use crate::{
    error::RuntimeError,
    exec::Invocation,
    value::{operations, BuiltinFunction, Value},
};
use std::rc::Rc;
use time::Duration;

enum Num {
    Int(i64),
    Float(f64),
}

fn recv(inv: &Invocation<'_>, method: &str) -> Result<Num, RuntimeError> {
    match inv.expect_receiver(method)? {
        Value::Int(v) => Ok(Num::Int(*v)),
        Value::Float(v) => Ok(Num::Float(*v)),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a numeric receiver, got {}",
            other.kind()
        ))),
    }
}

/// Builds a duration from `n` units of `seconds_per_unit` seconds.
fn duration(num: Num, seconds_per_unit: i64) -> Result<Value, RuntimeError> {
    match num {
        Num::Int(n) => n
            .checked_mul(seconds_per_unit)
            .map(|secs| Value::Duration(Duration::seconds(secs)))
            .ok_or_else(|| RuntimeError::runtime("duration overflow")),
        Num::Float(n) => {
            let secs = n * seconds_per_unit as f64;
            if !secs.is_finite() {
                return Err(RuntimeError::runtime("duration overflow"));
            }
            Ok(Value::Duration(Duration::seconds_f64(secs)))
        }
    }
}

pub(crate) fn method(name: &str) -> Option<Rc<BuiltinFunction>> {
    Some(match name {
        "abs" => builtin("abs", true, |_, inv| match recv(&inv, "abs")? {
            // `i64::MIN.abs()` has no representation; fail, never wrap.
            Num::Int(v) => v
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::runtime("integer overflow")),
            Num::Float(v) => Ok(Value::Float(v.abs())),
        }),
        "zero?" => builtin("zero?", true, |_, inv| match recv(&inv, "zero?")? {
            Num::Int(v) => Ok(Value::Bool(v == 0)),
            Num::Float(v) => Ok(Value::Bool(v == 0.0)),
        }),
        "to_i" => builtin("to_i", true, |_, inv| match recv(&inv, "to_i")? {
            Num::Int(v) => Ok(Value::Int(v)),
            Num::Float(v) => operations::float_to_int(v).map(Value::Int),
        }),
        "to_f" => builtin("to_f", true, |_, inv| match recv(&inv, "to_f")? {
            Num::Int(v) => Ok(Value::Float(v as f64)),
            Num::Float(v) => Ok(Value::Float(v)),
        }),
        "to_s" => builtin("to_s", true, |_, inv| {
            Ok(Value::string(inv.expect_receiver("to_s")?.to_string()))
        }),
        "floor" => builtin("floor", true, |_, inv| match recv(&inv, "floor")? {
            Num::Int(v) => Ok(Value::Int(v)),
            Num::Float(v) => operations::float_to_int(v.floor()).map(Value::Int),
        }),
        "ceil" => builtin("ceil", true, |_, inv| match recv(&inv, "ceil")? {
            Num::Int(v) => Ok(Value::Int(v)),
            Num::Float(v) => operations::float_to_int(v.ceil()).map(Value::Int),
        }),
        "round" => builtin("round", true, |_, inv| match recv(&inv, "round")? {
            Num::Int(v) => Ok(Value::Int(v)),
            Num::Float(v) => operations::float_to_int(v.round()).map(Value::Int),
        }),
        "seconds" => builtin("seconds", true, |_, inv| {
            duration(recv(&inv, "seconds")?, 1)
        }),
        "minutes" => builtin("minutes", true, |_, inv| {
            duration(recv(&inv, "minutes")?, 60)
        }),
        "hours" => builtin("hours", true, |_, inv| {
            duration(recv(&inv, "hours")?, 60 * 60)
        }),
        "days" => builtin("days", true, |_, inv| {
            duration(recv(&inv, "days")?, 24 * 60 * 60)
        }),
        "weeks" => builtin("weeks", true, |_, inv| {
            duration(recv(&inv, "weeks")?, 7 * 24 * 60 * 60)
        }),
        _ => return None,
    })
}
