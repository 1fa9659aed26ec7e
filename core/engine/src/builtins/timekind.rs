//! Duration and time member methods.

use super::builtin;
use crate::{
    error::RuntimeError,
    exec::Invocation,
    value::{BuiltinFunction, Value},
};
use std::rc::Rc;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

fn duration_recv(inv: &Invocation<'_>, method: &str) -> Result<Duration, RuntimeError> {
    match inv.expect_receiver(method)? {
        Value::Duration(duration) => Ok(*duration),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a duration receiver, got {}",
            other.kind()
        ))),
    }
}

pub(crate) fn duration_method(name: &str) -> Option<Rc<BuiltinFunction>> {
    Some(match name {
        "in_seconds" => builtin("in_seconds", true, |_, inv| {
            Ok(Value::Float(duration_recv(&inv, "in_seconds")?.as_seconds_f64()))
        }),
        "in_minutes" => builtin("in_minutes", true, |_, inv| {
            Ok(Value::Float(
                duration_recv(&inv, "in_minutes")?.as_seconds_f64() / 60.0,
            ))
        }),
        "in_hours" => builtin("in_hours", true, |_, inv| {
            Ok(Value::Float(
                duration_recv(&inv, "in_hours")?.as_seconds_f64() / 3600.0,
            ))
        }),
        "in_days" => builtin("in_days", true, |_, inv| {
            Ok(Value::Float(
                duration_recv(&inv, "in_days")?.as_seconds_f64() / 86_400.0,
            ))
        }),
        "humanize" => builtin("humanize", true, |_, inv| {
            Ok(Value::string(humanize(duration_recv(&inv, "humanize")?)))
        }),
        _ => return None,
    })
}

/// Renders the two most significant whole units, `"2d 4h"` style.
fn humanize(duration: Duration) -> String {
    let negative = duration.is_negative();
    let mut seconds = duration.whole_seconds().unsigned_abs();
    const UNITS: [(&str, u64); 5] = [
        ("w", 7 * 24 * 3600),
        ("d", 24 * 3600),
        ("h", 3600),
        ("m", 60),
        ("s", 1),
    ];

    let mut parts: Vec<String> = Vec::with_capacity(2);
    for (suffix, size) in UNITS {
        if parts.len() == 2 {
            break;
        }
        let count = seconds / size;
        if count > 0 || (suffix == "s" && parts.is_empty()) {
            parts.push(format!("{count}{suffix}"));
            seconds %= size;
        }
    }
    let body = parts.join(" ");
    if negative {
        format!("-{body}")
    } else {
        body
    }
}

fn time_recv(inv: &Invocation<'_>, method: &str) -> Result<OffsetDateTime, RuntimeError> {
    match inv.expect_receiver(method)? {
        Value::Time(time) => Ok(*time),
        other => Err(RuntimeError::runtime(format!(
            "method `{method}` expects a time receiver, got {}",
            other.kind()
        ))),
    }
}

pub(crate) fn time_method(name: &str) -> Option<Rc<BuiltinFunction>> {
    Some(match name {
        "year" => builtin("year", true, |_, inv| {
            Ok(Value::Int(i64::from(time_recv(&inv, "year")?.year())))
        }),
        "month" => builtin("month", true, |_, inv| {
            Ok(Value::Int(i64::from(u8::from(
                time_recv(&inv, "month")?.month(),
            ))))
        }),
        "day" => builtin("day", true, |_, inv| {
            Ok(Value::Int(i64::from(time_recv(&inv, "day")?.day())))
        }),
        "hour" => builtin("hour", true, |_, inv| {
            Ok(Value::Int(i64::from(time_recv(&inv, "hour")?.hour())))
        }),
        "minute" => builtin("minute", true, |_, inv| {
            Ok(Value::Int(i64::from(time_recv(&inv, "minute")?.minute())))
        }),
        "second" => builtin("second", true, |_, inv| {
            Ok(Value::Int(i64::from(time_recv(&inv, "second")?.second())))
        }),
        "unix" => builtin("unix", true, |_, inv| {
            Ok(Value::Int(time_recv(&inv, "unix")?.unix_timestamp()))
        }),
        "iso8601" => builtin("iso8601", true, |_, inv| {
            time_recv(&inv, "iso8601")?
                .format(&Rfc3339)
                .map(Value::string)
                .map_err(|err| RuntimeError::runtime(format!("cannot format time: {err}")))
        }),
        _ => return None,
    })
}
