//! Module name resolution and filesystem escape checks.

use super::ModuleContext;
use crate::{engine::EngineInner, error::RuntimeError};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// The default module file extension.
pub(crate) const MODULE_EXTENSION: &str = "vibe";

/// A fully resolved require request.
#[derive(Debug)]
pub(crate) struct Resolved {
    /// Cache key: `cleaned_root::cleaned_relative`.
    pub key: Arc<str>,
    /// The module file on disk.
    pub path: PathBuf,
    /// The module's directory, for its own relative requires.
    pub dir: PathBuf,
    /// The module root the file lives under.
    pub root: PathBuf,
    /// The normalized module name (slashes, no extension) used by the
    /// policy filter and cycle messages.
    pub name: String,
}

pub(crate) fn resolve(
    engine: &EngineInner,
    context: &ModuleContext,
    request: &str,
) -> Result<Resolved, RuntimeError> {
    if Path::new(request).is_absolute() {
        return Err(RuntimeError::runtime(format!(
            "module path `{request}` must be relative"
        )));
    }

    let with_ext = if Path::new(request).extension().is_none() {
        format!("{request}.{MODULE_EXTENSION}")
    } else {
        request.to_string()
    };

    if request.starts_with("./") || request.starts_with("../") {
        resolve_relative(context, request, &with_ext)
    } else {
        resolve_bare(engine, request, &with_ext)
    }
}

/// Resolves a `./`/`../` request against the requiring module's directory,
/// checking — both lexically and after resolving symlinks — that the
/// target stays within the caller's module root.
fn resolve_relative(
    context: &ModuleContext,
    request: &str,
    with_ext: &str,
) -> Result<Resolved, RuntimeError> {
    let root = context.root.as_ref().clone();
    let candidate = context.dir.join(with_ext);

    let cleaned = normalize(&candidate);
    let cleaned_root = normalize(&root);
    if !cleaned.starts_with(&cleaned_root) {
        return Err(RuntimeError::runtime(format!(
            "module path `{request}` escapes the module root"
        )));
    }

    let resolved = canonicalize_allowing_missing(&cleaned).map_err(|err| {
        RuntimeError::runtime(format!("cannot resolve module `{request}`: {err}"))
    })?;
    let resolved_root = canonicalize_allowing_missing(&cleaned_root).map_err(|err| {
        RuntimeError::runtime(format!("cannot resolve module root: {err}"))
    })?;
    if !resolved.starts_with(&resolved_root) {
        return Err(RuntimeError::runtime(format!(
            "module path `{request}` escapes the module root"
        )));
    }

    if !cleaned.is_file() {
        return Err(RuntimeError::runtime(format!(
            "module `{request}` not found"
        )));
    }

    let name = module_name(&cleaned, &cleaned_root);
    Ok(build(cleaned, cleaned_root, name))
}

/// Resolves a bare request by searching the engine's configured module
/// paths in order. Bare names must not climb out of their root.
fn resolve_bare(
    engine: &EngineInner,
    request: &str,
    with_ext: &str,
) -> Result<Resolved, RuntimeError> {
    let has_parent_segment = Path::new(request)
        .components()
        .any(|c| matches!(c, Component::ParentDir));
    if has_parent_segment {
        return Err(RuntimeError::runtime(format!(
            "module name `{request}` must not contain `..`"
        )));
    }

    for root in &engine.module_paths {
        let candidate = root.join(with_ext);
        if candidate.is_file() {
            let cleaned_root = normalize(root);
            let cleaned = normalize(&candidate);
            let name = module_name(&cleaned, &cleaned_root);
            return Ok(build(cleaned, cleaned_root, name));
        }
    }
    Err(RuntimeError::runtime(format!(
        "module `{request}` not found"
    )))
}

fn build(path: PathBuf, root: PathBuf, name: String) -> Resolved {
    let key: Arc<str> = Arc::from(format!("{}::{name}", root.display()).as_str());
    let dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Resolved {
        key,
        path,
        dir,
        root,
        name,
    }
}

/// The policy-facing module name: path relative to the root, forward
/// slashes, no extension.
fn module_name(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let no_ext = relative.with_extension("");
    let mut name = String::new();
    for component in no_ext.components() {
        if let Component::Normal(part) = component {
            if !name.is_empty() {
                name.push('/');
            }
            name.push_str(&part.to_string_lossy());
        }
    }
    name
}

/// Lexically normalizes a path: strips `.` segments and folds `..` into
/// their parent.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Canonicalizes a path that may not exist yet: walks up to the nearest
/// existing ancestor, resolves that, then re-appends the missing suffix.
fn canonicalize_allowing_missing(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut suffix: Vec<std::ffi::OsString> = Vec::new();
    loop {
        if existing.exists() {
            break;
        }
        match existing.file_name() {
            Some(name) => {
                suffix.push(name.to_os_string());
                existing.pop();
            }
            None => break,
        }
        if existing.as_os_str().is_empty() {
            existing = PathBuf::from(".");
            break;
        }
    }
    let mut resolved = existing.canonicalize()?;
    for part in suffix.iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_dot_segments() {
        assert_eq!(
            normalize(Path::new("a/./b/../c")),
            PathBuf::from("a/c")
        );
    }

    #[test]
    fn module_name_strips_root_and_extension() {
        assert_eq!(
            module_name(Path::new("/mods/net/http.vibe"), Path::new("/mods")),
            "net/http"
        );
    }
}
