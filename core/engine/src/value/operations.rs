//! Binary and unary operator semantics.
//!
//! Numeric coercion follows one rule: int op int stays int, any float
//! participation makes the result float. Everything else is kind-specific
//! and mismatches fail rather than coerce.

use super::Value;
use crate::error::RuntimeError;
use num_traits::ToPrimitive;
use std::cmp::Ordering;
use vibe_ast::{BinaryOp, UnaryOp};

/// Applies a non-short-circuit binary operator. `&&`/`||` are handled by
/// the evaluator so the right-hand side stays unevaluated.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub => sub(lhs, rhs),
        BinaryOp::Mul => mul(lhs, rhs),
        BinaryOp::Div => div(lhs, rhs),
        BinaryOp::Rem => rem(lhs, rhs),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(lhs, rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(lhs, rhs))),
        BinaryOp::Lt => Ok(Value::Bool(compare(lhs, rhs)? == Ordering::Less)),
        BinaryOp::LtEq => Ok(Value::Bool(compare(lhs, rhs)? != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(compare(lhs, rhs)? == Ordering::Greater)),
        BinaryOp::GtEq => Ok(Value::Bool(compare(lhs, rhs)? != Ordering::Less)),
        BinaryOp::And | BinaryOp::Or => Err(RuntimeError::runtime(
            "logical operators must be evaluated by the interpreter",
        )),
    }
}

/// Applies a unary operator.
pub fn unary(op: UnaryOp, value: &Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Int(v) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::runtime("integer overflow")),
            Value::Float(v) => Ok(Value::Float(-v)),
            Value::Duration(d) => Ok(Value::Duration(-*d)),
            Value::Money(m) => m.checked_neg().map(Value::Money),
            other => Err(unsupported_unary("-", other)),
        },
    }
}

fn add(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::runtime("integer overflow")),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),

        // Strings concatenate if either operand is a string.
        (Value::String(a), b) => Ok(Value::string(format!("{a}{b}"))),
        (a, Value::String(b)) => Ok(Value::string(format!("{a}{b}"))),

        (Value::Array(a), Value::Array(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::array(items))
        }

        (Value::Money(a), Value::Money(b)) => a.checked_add(b).map(Value::Money),

        (Value::Duration(a), Value::Duration(b)) => a
            .checked_add(*b)
            .map(Value::Duration)
            .ok_or_else(|| RuntimeError::runtime("duration overflow")),
        (Value::Time(t), Value::Duration(d)) => t
            .checked_add(*d)
            .map(Value::Time)
            .ok_or_else(|| RuntimeError::runtime("time out of range")),
        (Value::Duration(d), Value::Time(t)) => t
            .checked_add(*d)
            .map(Value::Time)
            .ok_or_else(|| RuntimeError::runtime("time out of range")),

        _ => Err(unsupported_binary("+", lhs, rhs)),
    }
}

fn sub(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::runtime("integer overflow")),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 - b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a - *b as f64)),

        // Set difference preserving left order.
        (Value::Array(a), Value::Array(b)) => {
            let b = b.borrow();
            let items: Vec<Value> = a
                .borrow()
                .iter()
                .filter(|item| !b.iter().any(|other| values_equal(item, other)))
                .cloned()
                .collect();
            Ok(Value::array(items))
        }

        (Value::Money(a), Value::Money(b)) => a.checked_sub(b).map(Value::Money),

        (Value::Duration(a), Value::Duration(b)) => a
            .checked_sub(*b)
            .map(Value::Duration)
            .ok_or_else(|| RuntimeError::runtime("duration overflow")),
        (Value::Time(t), Value::Duration(d)) => t
            .checked_sub(*d)
            .map(Value::Time)
            .ok_or_else(|| RuntimeError::runtime("time out of range")),
        (Value::Time(a), Value::Time(b)) => Ok(Value::Duration(*a - *b)),

        _ => Err(unsupported_binary("-", lhs, rhs)),
    }
}

fn mul(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::runtime("integer overflow")),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 * b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a * *b as f64)),
        _ => Err(unsupported_binary("*", lhs, rhs)),
    }
}

fn div(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(RuntimeError::runtime("division by zero"));
            }
            a.checked_div(*b)
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::runtime("integer overflow"))
        }
        (Value::Float(_) | Value::Int(_), Value::Float(b)) if *b == 0.0 => {
            Err(RuntimeError::runtime("division by zero"))
        }
        (Value::Float(_), Value::Int(0)) => Err(RuntimeError::runtime("division by zero")),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 / b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a / *b as f64)),
        _ => Err(unsupported_binary("/", lhs, rhs)),
    }
}

fn rem(lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(RuntimeError::runtime("modulo by zero"));
            }
            a.checked_rem(*b)
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::runtime("integer overflow"))
        }
        (Value::Float(_) | Value::Int(_), Value::Float(b)) if *b == 0.0 => {
            Err(RuntimeError::runtime("modulo by zero"))
        }
        (Value::Float(_), Value::Int(0)) => Err(RuntimeError::runtime("modulo by zero")),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a % b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 % b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a % *b as f64)),
        _ => Err(unsupported_binary("%", lhs, rhs)),
    }
}

/// Orders two values. Defined for like kinds, the int/float bridge, and
/// durations, times and same-currency money.
pub fn compare(lhs: &Value, rhs: &Value) -> Result<Ordering, RuntimeError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => float_cmp(*a, *b),
        (Value::Int(a), Value::Float(b)) => float_cmp(*a as f64, *b),
        (Value::Float(a), Value::Int(b)) => float_cmp(*a, *b as f64),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Duration(a), Value::Duration(b)) => Ok(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Ok(a.cmp(b)),
        (Value::Money(a), Value::Money(b)) => a.compare(b),
        _ => Err(RuntimeError::runtime(format!(
            "cannot compare {} and {}",
            lhs.kind(),
            rhs.kind()
        ))),
    }
}

fn float_cmp(a: f64, b: f64) -> Result<Ordering, RuntimeError> {
    a.partial_cmp(&b)
        .ok_or_else(|| RuntimeError::runtime("cannot compare NaN"))
}

/// Structural equality: deep for containers, value-wise for scalars with
/// the int/float bridge, identity for callables, classes and instances.
#[must_use]
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Symbol(a), Value::Symbol(b)) => a == b,
        (Value::Range(a), Value::Range(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            if std::rc::Rc::ptr_eq(a, b) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Hash(a), Value::Hash(b)) | (Value::Object(a), Value::Object(b)) => {
            if std::rc::Rc::ptr_eq(a, b) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        (Value::Money(a), Value::Money(b)) => a == b,
        (Value::Duration(a), Value::Duration(b)) => a == b,
        (Value::Time(a), Value::Time(b)) => a == b,
        (Value::Instance(a), Value::Instance(b)) => std::rc::Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => std::rc::Rc::ptr_eq(a, b),
        (Value::Block(a), Value::Block(b)) => std::rc::Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => std::rc::Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => std::rc::Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Converts a float to an int, rejecting NaN, infinities and values outside
/// the i64 range rather than wrapping.
pub fn float_to_int(value: f64) -> Result<i64, RuntimeError> {
    if value.is_nan() {
        return Err(RuntimeError::runtime("cannot convert NaN to int"));
    }
    if value.is_infinite() {
        return Err(RuntimeError::runtime("cannot convert infinity to int"));
    }
    value
        .trunc()
        .to_i64()
        .ok_or_else(|| RuntimeError::runtime("float out of int range"))
}

fn unsupported_binary(op: &str, lhs: &Value, rhs: &Value) -> RuntimeError {
    RuntimeError::runtime(format!(
        "unsupported operands for `{op}`: {} and {}",
        lhs.kind(),
        rhs.kind()
    ))
}

fn unsupported_unary(op: &str, value: &Value) -> RuntimeError {
    RuntimeError::runtime(format!(
        "unsupported operand for `{op}`: {}",
        value.kind()
    ))
}

// Value equality for tests and case/when goes through `values_equal`; a
// PartialEq impl keeps assertions terse.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}
