//! Heuristic live-memory accounting.
//!
//! The quota is enforced against an approximate byte cost of the values
//! reachable from the current environment chain plus any extra roots the
//! caller supplies (capability scope roots, call arguments). Shared
//! containers are counted once, by pointer identity, which also guards
//! against reference cycles.

use crate::{environment::Environment, value::Value};
use rustc_hash::FxHashSet;
use std::rc::Rc;

const SCALAR_COST: usize = 16;
const CONTAINER_COST: usize = 48;
const ENTRY_COST: usize = 16;
const CALLABLE_COST: usize = 64;

/// Estimates the byte cost of everything reachable from `env` and the
/// given roots.
#[must_use]
pub(crate) fn estimate(env: &Rc<Environment>, roots: &[Value], extra: &[&Value]) -> usize {
    let mut visited: FxHashSet<usize> = FxHashSet::default();
    let mut total = 0usize;

    let mut frame = Some(env.clone());
    while let Some(current) = frame {
        if visited.insert(Rc::as_ptr(&current) as usize) {
            current.for_each_local(|name, value| {
                total += name.len() + ENTRY_COST;
                total += value_cost(value, &mut visited);
            });
        }
        frame = current.parent().cloned();
    }

    for value in roots {
        total += value_cost(value, &mut visited);
    }
    for value in extra {
        total += value_cost(value, &mut visited);
    }
    total
}

fn value_cost(value: &Value, visited: &mut FxHashSet<usize>) -> usize {
    match value {
        Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Float(_) => SCALAR_COST,
        Value::String(s) | Value::Symbol(s) => SCALAR_COST + s.len(),
        Value::Range(_) => SCALAR_COST * 2,
        Value::Money(_) | Value::Duration(_) => SCALAR_COST + 8,
        Value::Time(_) => SCALAR_COST * 2,
        Value::Array(items) => {
            if !visited.insert(Rc::as_ptr(items) as usize) {
                return 0;
            }
            let items = items.borrow();
            CONTAINER_COST
                + items
                    .iter()
                    .map(|item| ENTRY_COST + value_cost(item, visited))
                    .sum::<usize>()
        }
        Value::Hash(map) | Value::Object(map) => {
            if !visited.insert(Rc::as_ptr(map) as usize) {
                return 0;
            }
            let map = map.borrow();
            CONTAINER_COST
                + map
                    .iter()
                    .map(|(key, item)| key.len() + ENTRY_COST + value_cost(item, visited))
                    .sum::<usize>()
        }
        Value::Instance(instance) => {
            if !visited.insert(Rc::as_ptr(instance) as usize) {
                return 0;
            }
            let ivars = instance.ivars.borrow();
            CONTAINER_COST
                + ivars
                    .iter()
                    .map(|(key, item)| key.len() + ENTRY_COST + value_cost(item, visited))
                    .sum::<usize>()
        }
        Value::Class(class) => {
            if !visited.insert(Rc::as_ptr(class) as usize) {
                return 0;
            }
            let vars = class.class_vars.borrow();
            CONTAINER_COST
                + vars
                    .iter()
                    .map(|(key, item)| key.len() + ENTRY_COST + value_cost(item, visited))
                    .sum::<usize>()
        }
        // Captured environments are already reachable through the chain
        // walk when they matter; charge a flat cost for the closure itself.
        Value::Block(_) | Value::Builtin(_) | Value::Function(_) => CALLABLE_COST,
    }
}
