//! String member methods.

use super::builtin;
use crate::{
    error::RuntimeError,
    exec::Invocation,
    value::{BuiltinFunction, Value},
};
use std::rc::Rc;

fn recv<'a>(inv: &Invocation<'a>, method: &str) -> Result<&'a Rc<str>, RuntimeError> {
    match inv.expect_receiver(method)? {
        Value::String(s) => Ok(s),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a string receiver, got {}",
            other.kind()
        ))),
    }
}

fn str_arg<'a>(inv: &Invocation<'a>, method: &str, index: usize) -> Result<&'a str, RuntimeError> {
    match inv.expect_arg(method, index)? {
        Value::String(s) => Ok(s),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a string argument, got {}",
            other.kind()
        ))),
    }
}

pub(crate) fn method(name: &str) -> Option<Rc<BuiltinFunction>> {
    Some(match name {
        "length" => builtin("length", true, |_, inv| {
            Ok(Value::Int(recv(&inv, "length")?.chars().count() as i64))
        }),
        "empty?" => builtin("empty?", true, |_, inv| {
            Ok(Value::Bool(recv(&inv, "empty?")?.is_empty()))
        }),
        "upcase" => builtin("upcase", true, |_, inv| {
            Ok(Value::string(recv(&inv, "upcase")?.to_uppercase()))
        }),
        "downcase" => builtin("downcase", true, |_, inv| {
            Ok(Value::string(recv(&inv, "downcase")?.to_lowercase()))
        }),
        "strip" => builtin("strip", true, |_, inv| {
            Ok(Value::string(recv(&inv, "strip")?.trim()))
        }),
        "reverse" => builtin("reverse", true, |_, inv| {
            Ok(Value::string(
                recv(&inv, "reverse")?.chars().rev().collect::<String>(),
            ))
        }),
        "chars" => builtin("chars", true, |_, inv| {
            let items = recv(&inv, "chars")?
                .chars()
                .map(|c| Value::string(c.to_string()))
                .collect();
            Ok(Value::array(items))
        }),
        "to_sym" => builtin("to_sym", true, |_, inv| {
            Ok(Value::symbol(recv(&inv, "to_sym")?.clone()))
        }),
        "to_i" => builtin("to_i", true, |_, inv| {
            let s = recv(&inv, "to_i")?;
            s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                RuntimeError::runtime(format!("cannot convert `{s}` to an integer"))
            })
        }),
        "to_f" => builtin("to_f", true, |_, inv| {
            let s = recv(&inv, "to_f")?;
            s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                RuntimeError::runtime(format!("cannot convert `{s}` to a float"))
            })
        }),
        "split" => builtin("split", false, |_, inv| {
            inv.expect_max_args("split", 1)?;
            let s = recv(&inv, "split")?;
            let parts: Vec<Value> = match inv.args.first() {
                Some(Value::String(sep)) if !sep.is_empty() => {
                    s.split(&**sep).map(Value::string).collect()
                }
                Some(other) if !matches!(other, Value::String(_)) => {
                    return Err(RuntimeError::runtime(format!(
                        "method `split` expects a string separator, got {}",
                        other.kind()
                    )));
                }
                _ => s.split_whitespace().map(Value::string).collect(),
            };
            Ok(Value::array(parts))
        }),
        "include?" => builtin("include?", false, |_, inv| {
            let s = recv(&inv, "include?")?;
            Ok(Value::Bool(s.contains(str_arg(&inv, "include?", 0)?)))
        }),
        "start_with?" => builtin("start_with?", false, |_, inv| {
            let s = recv(&inv, "start_with?")?;
            Ok(Value::Bool(s.starts_with(str_arg(&inv, "start_with?", 0)?)))
        }),
        "end_with?" => builtin("end_with?", false, |_, inv| {
            let s = recv(&inv, "end_with?")?;
            Ok(Value::Bool(s.ends_with(str_arg(&inv, "end_with?", 0)?)))
        }),
        "to_s" => builtin("to_s", true, |_, inv| {
            Ok(Value::String(recv(&inv, "to_s")?.clone()))
        }),
        _ => return None,
    })
}
