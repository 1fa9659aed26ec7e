//! Human-readable value formatting.

use super::Value;
use std::fmt;
use time::format_description::well_known::Rfc3339;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Self::String(s) => f.write_str(s),
            Self::Symbol(s) => write!(f, ":{s}"),
            Self::Range(r) => write!(f, "{}..{}", r.start, r.end),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", Inspect(item))?;
                }
                f.write_str("]")
            }
            Self::Hash(map) | Self::Object(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.borrow().sorted_entries().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {}", Inspect(value))?;
                }
                f.write_str("}")
            }
            Self::Money(money) => write!(f, "{money}"),
            Self::Duration(duration) => {
                let seconds = duration.as_seconds_f64();
                if seconds.fract() == 0.0 {
                    write!(f, "{}s", seconds as i64)
                } else {
                    write!(f, "{seconds}s")
                }
            }
            Self::Time(time) => match time.format(&Rfc3339) {
                Ok(formatted) => f.write_str(&formatted),
                Err(_) => f.write_str("<time>"),
            },
            Self::Instance(instance) => write!(f, "#<{}>", instance.class.name),
            Self::Class(class) => f.write_str(&class.name),
            Self::Block(_) => f.write_str("#<block>"),
            Self::Builtin(builtin) => write!(f, "#<builtin {}>", builtin.name),
            Self::Function(func) => write!(f, "#<function {}>", func.def.name),
        }
    }
}

/// Container-element formatting: like `Display`, but strings are quoted so
/// `["a", "b"]` round-trips visually.
struct Inspect<'a>(&'a Value);

impl fmt::Display for Inspect<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(s) => write!(f, "\"{s}\""),
            other => write!(f, "{other}"),
        }
    }
}
