//! Hash and object member methods.
//!
//! Every iterator here visits keys in lexicographic order so script
//! results are deterministic across runs; keys surface as symbols.

use super::{builtin, expect_block};
use crate::{
    error::RuntimeError,
    exec::Invocation,
    value::{BuiltinFunction, VMap, Value, VibeMap},
};
use std::rc::Rc;

fn recv<'a>(inv: &Invocation<'a>, method: &str) -> Result<&'a VMap, RuntimeError> {
    match inv.expect_receiver(method)? {
        Value::Hash(map) | Value::Object(map) => Ok(map),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a hash receiver, got {}",
            other.kind()
        ))),
    }
}

fn key_arg<'a>(inv: &Invocation<'a>, method: &str, index: usize) -> Result<&'a Rc<str>, RuntimeError> {
    match inv.expect_arg(method, index)? {
        Value::String(key) | Value::Symbol(key) => Ok(key),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a string or symbol key, got {}",
            other.kind()
        ))),
    }
}

/// Sorted entries snapshot; callbacks may mutate the receiver freely.
fn sorted(inv: &Invocation<'_>, method: &str) -> Result<Vec<(Rc<str>, Value)>, RuntimeError> {
    Ok(recv(inv, method)?.borrow().sorted_entries())
}

pub(crate) fn method(name: &str) -> Option<Rc<BuiltinFunction>> {
    Some(match name {
        "length" => builtin("length", true, |_, inv| {
            Ok(Value::Int(recv(&inv, "length")?.borrow().len() as i64))
        }),
        "empty?" => builtin("empty?", true, |_, inv| {
            Ok(Value::Bool(recv(&inv, "empty?")?.borrow().is_empty()))
        }),
        "keys" => builtin("keys", true, |_, inv| {
            let keys = recv(&inv, "keys")?
                .borrow()
                .sorted_keys()
                .into_iter()
                .map(Value::Symbol)
                .collect();
            Ok(Value::array(keys))
        }),
        "values" => builtin("values", true, |_, inv| {
            let values = sorted(&inv, "values")?
                .into_iter()
                .map(|(_, value)| value)
                .collect();
            Ok(Value::array(values))
        }),
        "key?" => builtin("key?", false, |_, inv| {
            let key = key_arg(&inv, "key?", 0)?;
            Ok(Value::Bool(recv(&inv, "key?")?.borrow().contains_key(key)))
        }),
        "fetch" => builtin("fetch", false, |_, inv| {
            inv.expect_max_args("fetch", 2)?;
            let key = key_arg(&inv, "fetch", 0)?;
            match recv(&inv, "fetch")?.borrow().get(key) {
                Some(value) => Ok(value.clone()),
                None => match inv.args.get(1) {
                    Some(default) => Ok(default.clone()),
                    None => Err(RuntimeError::runtime(format!("key not found: `{key}`"))),
                },
            }
        }),
        "delete" => builtin("delete", false, |_, inv| {
            let key = key_arg(&inv, "delete", 0)?;
            Ok(recv(&inv, "delete")?
                .borrow_mut()
                .remove(key)
                .unwrap_or(Value::Nil))
        }),
        "merge" => builtin("merge", false, |_, inv| {
            let other = match inv.expect_arg("merge", 0)? {
                Value::Hash(map) | Value::Object(map) => map.clone(),
                other => {
                    return Err(RuntimeError::runtime(format!(
                        "method `merge` expects a hash argument, got {}",
                        other.kind()
                    )));
                }
            };
            let mut merged = recv(&inv, "merge")?.borrow().clone();
            for (key, value) in other.borrow().iter() {
                merged.insert(key.clone(), value.clone());
            }
            Ok(Value::hash(merged))
        }),
        "each" => builtin("each", false, |exec, inv| {
            let block = expect_block(&inv, "each")?.clone();
            let receiver = inv.expect_receiver("each")?.clone();
            for (key, value) in sorted(&inv, "each")? {
                exec.call_block(&block, &[Value::Symbol(key), value])?;
            }
            Ok(receiver)
        }),
        "transform_values" => builtin("transform_values", false, |exec, inv| {
            let block = expect_block(&inv, "transform_values")?.clone();
            let mut out = VibeMap::new();
            for (key, value) in sorted(&inv, "transform_values")? {
                let transformed = exec.call_block(&block, &[value])?;
                out.insert(key, transformed);
            }
            Ok(Value::hash(out))
        }),
        "transform_keys" => builtin("transform_keys", false, |exec, inv| {
            let block = expect_block(&inv, "transform_keys")?.clone();
            let mut out = VibeMap::new();
            for (key, value) in sorted(&inv, "transform_keys")? {
                let new_key = match exec.call_block(&block, &[Value::Symbol(key)])? {
                    Value::String(key) | Value::Symbol(key) => key,
                    other => {
                        return Err(RuntimeError::runtime(format!(
                            "transform_keys block must return a string or symbol, got {}",
                            other.kind()
                        )));
                    }
                };
                out.insert(new_key, value);
            }
            Ok(Value::hash(out))
        }),
        _ => return None,
    })
}
