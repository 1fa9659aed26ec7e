//! Module loading: resolution, caching, cycle detection and export
//! binding.
//!
//! Compiled modules are cached on the engine for its whole lifetime; the
//! exports *objects* built from them live per call, so repeat requires
//! within one call return the same object identity while separate calls
//! never share state.

pub(crate) mod policy;
pub(crate) mod resolve;

use crate::{
    engine::CompiledModule,
    environment::Environment,
    error::{CompileError, RuntimeError},
    exec::{Execution, Signal},
    value::{Value, VibeMap},
};
use log::debug;
use std::{
    path::PathBuf,
    rc::Rc,
    sync::Arc,
};
use vibe_ast::{Expression, Statement};

/// The `{key, path, root}` triple threaded through calls and blocks so
/// `require("./x")` resolves relative to the requiring source.
#[derive(Clone, Debug)]
pub struct ModuleContext {
    /// Cache key of the module, `None` for the main script.
    pub(crate) key: Option<Arc<str>>,
    /// Short display name for cycle messages.
    pub(crate) name: Arc<str>,
    /// Directory relative requires resolve against.
    pub(crate) dir: Arc<PathBuf>,
    /// The module root escape checks confine to.
    pub(crate) root: Arc<PathBuf>,
    /// The module's source text, so errors raised while its code runs
    /// render their code frame against the right file.
    pub(crate) source: Arc<str>,
}

impl ModuleContext {
    /// The context of a script compiled directly by the engine.
    pub(crate) fn for_script(root: PathBuf, source: Arc<str>) -> Self {
        Self {
            key: None,
            name: Arc::from("(main)"),
            dir: Arc::new(root.clone()),
            root: Arc::new(root),
            source,
        }
    }

    /// A context with no filesystem anchor.
    pub(crate) fn detached() -> Self {
        Self::for_script(PathBuf::from("."), Arc::from(""))
    }
}

/// Handles a `require(name, as: alias)` expression.
pub(crate) fn require(
    exec: &mut Execution,
    request: &str,
    alias: Option<&Value>,
) -> Result<Value, RuntimeError> {
    if exec.engine.strict_effects && !exec.allow_require {
        return Err(RuntimeError::runtime(
            "require is not allowed in this context",
        ));
    }

    let context = exec.current_module();
    let resolved = resolve::resolve(&exec.engine, &context, request)?;
    policy::check(&exec.engine, &resolved.name)?;

    // Idempotent re-require: same exports object identity within a call.
    if let Some(exports) = exec.modules.get(&resolved.key).cloned() {
        bind_alias(exec, alias, &exports)?;
        return Ok(exports);
    }

    check_cycles(exec, &resolved)?;

    let compiled = compile_cached(exec, &resolved)?;
    let exports = execute_module(exec, &resolved, &compiled)?;

    exec.modules.insert(resolved.key.clone(), exports.clone());
    bind_exports(exec, &exports);
    bind_alias(exec, alias, &exports)?;
    Ok(exports)
}

/// Two-layer cycle detection: the load stack catches requires that recurse
/// during initial binding; the call-frame module keys catch a module
/// re-required while one of its functions is executing.
fn check_cycles(exec: &Execution, resolved: &resolve::Resolved) -> Result<(), RuntimeError> {
    if let Some(first) = exec
        .module_load_stack
        .iter()
        .position(|(key, _)| *key == resolved.key)
    {
        let mut chain: Vec<&str> = exec.module_load_stack[first..]
            .iter()
            .map(|(_, name)| name.as_str())
            .collect();
        chain.push(&resolved.name);
        return Err(RuntimeError::runtime(format!(
            "circular dependency detected: {}",
            chain.join(" -> ")
        )));
    }

    let executing = exec
        .call_stack
        .iter()
        .any(|frame| frame.module_key.as_deref() == Some(&*resolved.key));
    if executing {
        let mut chain: Vec<&str> = Vec::new();
        if let Some(first) = exec
            .module_stack
            .iter()
            .position(|ctx| ctx.key.as_deref() == Some(&*resolved.key))
        {
            chain.extend(exec.module_stack[first..].iter().map(|ctx| &*ctx.name));
        } else {
            chain.push(&resolved.name);
        }
        chain.push(&resolved.name);
        return Err(RuntimeError::runtime(format!(
            "circular dependency detected: {}",
            chain.join(" -> ")
        )));
    }
    Ok(())
}

/// Fetches the compiled module from the engine cache, compiling and
/// inserting on a miss. The cache is bounded: at capacity, new inserts
/// fail rather than evict.
fn compile_cached(
    exec: &Execution,
    resolved: &resolve::Resolved,
) -> Result<Arc<CompiledModule>, RuntimeError> {
    if let Some(hit) = exec
        .engine
        .module_cache
        .read()
        .expect("module cache poisoned")
        .get(&resolved.key)
    {
        return Ok(hit.clone());
    }

    let source = std::fs::read_to_string(&resolved.path).map_err(|err| {
        RuntimeError::runtime(format!("cannot load module `{}`: {err}", resolved.name))
    })?;
    let program = vibe_parser::parse(&source)
        .map_err(CompileError::from)
        .and_then(|program| {
            validate_module_toplevel(&program)?;
            Ok(program)
        })
        .map_err(|err| {
            RuntimeError::runtime(format!("cannot compile module `{}`: {err}", resolved.name))
        })?;

    let compiled = Arc::new(CompiledModule {
        source: Arc::from(source.as_str()),
        program: Arc::new(program),
    });

    let mut cache = exec
        .engine
        .module_cache
        .write()
        .expect("module cache poisoned");
    if let Some(hit) = cache.get(&resolved.key) {
        return Ok(hit.clone());
    }
    let max = exec.engine.max_cached_modules;
    if cache.len() >= max {
        return Err(RuntimeError::runtime(format!(
            "module cache limit reached ({max} modules)"
        )));
    }
    debug!("compiled module `{}`", resolved.name);
    cache.insert(resolved.key.clone(), compiled.clone());
    Ok(compiled)
}

/// Module files may only define functions and classes and require other
/// modules at the top level.
fn validate_module_toplevel(program: &vibe_ast::Program) -> Result<(), CompileError> {
    for statement in program.statements() {
        match statement {
            Statement::FunctionDecl(_) | Statement::ClassDecl(_) => {}
            Statement::Expression(Expression::Require { .. }) => {}
            other => return Err(CompileError::UnsupportedTopLevel(other.position())),
        }
    }
    Ok(())
}

/// Runs the module body in a fresh environment over the call's root env
/// and builds the exports object from its non-private functions.
fn execute_module(
    exec: &mut Execution,
    resolved: &resolve::Resolved,
    compiled: &Arc<CompiledModule>,
) -> Result<Value, RuntimeError> {
    let module_env = Environment::with_parent(exec.root_env().clone());
    let context = ModuleContext {
        key: Some(resolved.key.clone()),
        name: Arc::from(resolved.name.as_str()),
        dir: Arc::new(resolved.dir.clone()),
        root: Arc::new(resolved.root.clone()),
        source: compiled.source.clone(),
    };

    exec.module_load_stack
        .push((resolved.key.clone(), resolved.name.clone()));
    exec.module_stack.push(context);
    let saved_env = std::mem::replace(&mut exec.env, module_env.clone());

    let mut result = Ok(());
    for statement in compiled.program.statements() {
        if let Err(signal) = exec.eval_statement(statement) {
            result = Err(match signal {
                Signal::Error(err) => err,
                _ => RuntimeError::runtime(format!(
                    "invalid control flow at top level of module `{}`",
                    resolved.name
                )),
            });
            break;
        }
    }

    exec.env = saved_env;
    exec.module_stack.pop();
    exec.module_load_stack.pop();
    result?;

    // Exported functions keep the module environment they were defined
    // in, which sees every module function (including private ones).
    let mut exports = VibeMap::new();
    let mut names: Vec<(Rc<str>, Value)> = Vec::new();
    module_env.for_each_local(|name, value| {
        if let Value::Function(func) = value {
            if !func.def.private {
                names.push((name.clone(), value.clone()));
            }
        }
    });
    names.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in names {
        exports.insert(name, value);
    }
    debug!(
        "module `{}` exported {} function(s)",
        resolved.name,
        exports.len()
    );
    Ok(Value::object(exports))
}

/// Defines the bare names of exported functions in the requiring
/// environment, never overwriting existing bindings.
fn bind_exports(exec: &Execution, exports: &Value) {
    let Value::Object(map) = exports else {
        return;
    };
    for (name, value) in map.borrow().iter() {
        if !exec.root_env().has_local(name) {
            exec.root_env().define(name.clone(), value.clone());
        }
    }
}

/// Binds the `as:` alias, requiring that a collision is with the same
/// exports object (idempotent re-require).
fn bind_alias(
    exec: &Execution,
    alias: Option<&Value>,
    exports: &Value,
) -> Result<(), RuntimeError> {
    let Some(alias) = alias else {
        return Ok(());
    };
    let name = match alias {
        Value::String(name) | Value::Symbol(name) => name.clone(),
        other => {
            return Err(RuntimeError::runtime(format!(
                "require alias must be a string or symbol, got {}",
                other.kind()
            )));
        }
    };

    if let Some(existing) = exec.root_env().get(&name) {
        let same = match (&existing, exports) {
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        if !same {
            return Err(RuntimeError::runtime(format!(
                "alias `{name}` is already defined"
            )));
        }
        return Ok(());
    }
    exec.root_env().define(name, exports.clone());
    Ok(())
}
