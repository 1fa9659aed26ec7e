//! Range member methods.

use super::{builtin, expect_block};
use crate::{
    error::RuntimeError,
    exec::Invocation,
    value::{BuiltinFunction, RangeValue, Value},
};
use std::rc::Rc;

fn recv(inv: &Invocation<'_>, method: &str) -> Result<Rc<RangeValue>, RuntimeError> {
    match inv.expect_receiver(method)? {
        Value::Range(range) => Ok(range.clone()),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a range receiver, got {}",
            other.kind()
        ))),
    }
}

pub(crate) fn method(name: &str) -> Option<Rc<BuiltinFunction>> {
    Some(match name {
        "first" => builtin("first", true, |_, inv| {
            Ok(Value::Int(recv(&inv, "first")?.start))
        }),
        "last" => builtin("last", true, |_, inv| {
            Ok(Value::Int(recv(&inv, "last")?.end))
        }),
        "to_a" => builtin("to_a", true, |_, inv| {
            let items = recv(&inv, "to_a")?.iter().map(Value::Int).collect();
            Ok(Value::array(items))
        }),
        "include?" => builtin("include?", false, |_, inv| {
            let range = recv(&inv, "include?")?;
            match inv.expect_arg("include?", 0)? {
                Value::Int(v) => Ok(Value::Bool(range.contains(*v))),
                _ => Ok(Value::Bool(false)),
            }
        }),
        "sum" => builtin("sum", true, |_, inv| {
            let range = recv(&inv, "sum")?;
            let total: i128 = range.iter().map(i128::from).sum();
            i64::try_from(total)
                .map(Value::Int)
                .map_err(|_| RuntimeError::runtime("integer overflow"))
        }),
        "each" => builtin("each", false, |exec, inv| {
            let block = expect_block(&inv, "each")?.clone();
            let range = recv(&inv, "each")?;
            for value in range.iter() {
                exec.call_block(&block, &[Value::Int(value)])?;
            }
            Ok(Value::Range(range))
        }),
        _ => return None,
    })
}
