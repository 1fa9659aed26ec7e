//! The module policy filter.

use crate::{engine::EngineInner, error::RuntimeError};

/// Checks a normalized module name against the engine's deny and allow
/// glob lists. Deny is evaluated first; when an allow list is configured
/// the name must match at least one allow pattern.
pub(crate) fn check(engine: &EngineInner, name: &str) -> Result<(), RuntimeError> {
    if let Some(pattern) = engine
        .module_deny
        .iter()
        .find(|pattern| pattern.matches(name))
    {
        return Err(RuntimeError::runtime(format!(
            "module `{name}` is denied by policy (`{pattern}`)"
        )));
    }
    if !engine.module_allow.is_empty()
        && !engine
            .module_allow
            .iter()
            .any(|pattern| pattern.matches(name))
    {
        return Err(RuntimeError::runtime(format!(
            "module `{name}` is not allowed by policy"
        )));
    }
    Ok(())
}
