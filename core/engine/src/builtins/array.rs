//! Array member methods.
//!
//! The block-driving iterators (`each`, `map`, `select`, `reject`) run
//! their callbacks through [`Execution::call_block`], so the step gate and
//! cancellation are observed once per element and `break`/`next` cannot
//! escape the callback.

use super::{builtin, expect_block};
use crate::{
    error::RuntimeError,
    exec::Invocation,
    value::{operations, BuiltinFunction, VArray, Value},
};
use std::rc::Rc;

fn recv<'a>(inv: &Invocation<'a>, method: &str) -> Result<&'a VArray, RuntimeError> {
    match inv.expect_receiver(method)? {
        Value::Array(items) => Ok(items),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects an array receiver, got {}",
            other.kind()
        ))),
    }
}

/// Snapshot of the elements, so callbacks that mutate the receiver do not
/// invalidate iteration.
fn snapshot(inv: &Invocation<'_>, method: &str) -> Result<Vec<Value>, RuntimeError> {
    Ok(recv(inv, method)?.borrow().clone())
}

pub(crate) fn method(name: &str) -> Option<Rc<BuiltinFunction>> {
    Some(match name {
        "length" => builtin("length", true, |_, inv| {
            Ok(Value::Int(recv(&inv, "length")?.borrow().len() as i64))
        }),
        "empty?" => builtin("empty?", true, |_, inv| {
            Ok(Value::Bool(recv(&inv, "empty?")?.borrow().is_empty()))
        }),
        "first" => builtin("first", true, |_, inv| {
            Ok(recv(&inv, "first")?
                .borrow()
                .first()
                .cloned()
                .unwrap_or(Value::Nil))
        }),
        "last" => builtin("last", true, |_, inv| {
            Ok(recv(&inv, "last")?
                .borrow()
                .last()
                .cloned()
                .unwrap_or(Value::Nil))
        }),
        "push" => builtin("push", false, |_, inv| {
            let value = inv.expect_arg("push", 0)?;
            let receiver = inv.expect_receiver("push")?;
            recv(&inv, "push")?.borrow_mut().push(value.clone());
            Ok(receiver.clone())
        }),
        "pop" => builtin("pop", false, |_, inv| {
            Ok(recv(&inv, "pop")?.borrow_mut().pop().unwrap_or(Value::Nil))
        }),
        "include?" => builtin("include?", false, |_, inv| {
            let needle = inv.expect_arg("include?", 0)?;
            let found = recv(&inv, "include?")?
                .borrow()
                .iter()
                .any(|item| operations::values_equal(item, needle));
            Ok(Value::Bool(found))
        }),
        "join" => builtin("join", false, |_, inv| {
            inv.expect_max_args("join", 1)?;
            let sep = match inv.args.first() {
                Some(Value::String(sep)) => sep.to_string(),
                Some(other) => {
                    return Err(RuntimeError::runtime(format!(
                        "method `join` expects a string separator, got {}",
                        other.kind()
                    )));
                }
                None => String::new(),
            };
            let joined = recv(&inv, "join")?
                .borrow()
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(&sep);
            Ok(Value::string(joined))
        }),
        "sort" => builtin("sort", false, |_, inv| {
            let mut items = snapshot(&inv, "sort")?;
            let mut failure = None;
            items.sort_by(|a, b| match operations::compare(a, b) {
                Ok(order) => order,
                Err(err) => {
                    failure.get_or_insert(err);
                    std::cmp::Ordering::Equal
                }
            });
            match failure {
                Some(err) => Err(err),
                None => Ok(Value::array(items)),
            }
        }),
        "uniq" => builtin("uniq", false, |_, inv| {
            let items = snapshot(&inv, "uniq")?;
            let mut unique: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if !unique.iter().any(|seen| operations::values_equal(seen, &item)) {
                    unique.push(item);
                }
            }
            Ok(Value::array(unique))
        }),
        "reverse" => builtin("reverse", false, |_, inv| {
            let mut items = snapshot(&inv, "reverse")?;
            items.reverse();
            Ok(Value::array(items))
        }),
        "sum" => builtin("sum", true, |_, inv| {
            let items = snapshot(&inv, "sum")?;
            let mut total = Value::Int(0);
            for (index, item) in items.iter().enumerate() {
                total = if index == 0 {
                    item.clone()
                } else {
                    operations::binary(vibe_ast::BinaryOp::Add, &total, item)?
                };
            }
            Ok(total)
        }),
        "each" => builtin("each", false, |exec, inv| {
            let block = expect_block(&inv, "each")?.clone();
            let receiver = inv.expect_receiver("each")?.clone();
            for item in snapshot(&inv, "each")? {
                exec.call_block(&block, &[item])?;
            }
            Ok(receiver)
        }),
        "map" => builtin("map", false, |exec, inv| {
            let block = expect_block(&inv, "map")?.clone();
            let items = snapshot(&inv, "map")?;
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(exec.call_block(&block, &[item])?);
            }
            Ok(Value::array(mapped))
        }),
        "select" => builtin("select", false, |exec, inv| {
            let block = expect_block(&inv, "select")?.clone();
            let mut kept = Vec::new();
            for item in snapshot(&inv, "select")? {
                if exec.call_block(&block, &[item.clone()])?.is_truthy() {
                    kept.push(item);
                }
            }
            Ok(Value::array(kept))
        }),
        "reject" => builtin("reject", false, |exec, inv| {
            let block = expect_block(&inv, "reject")?.clone();
            let mut kept = Vec::new();
            for item in snapshot(&inv, "reject")? {
                if !exec.call_block(&block, &[item.clone()])?.is_truthy() {
                    kept.push(item);
                }
            }
            Ok(Value::array(kept))
        }),
        _ => return None,
    })
}
