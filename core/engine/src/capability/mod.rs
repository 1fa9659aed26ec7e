//! The capability contract system.
//!
//! Adapters are the only doorway between host functionality and scripts: an
//! adapter publishes top-level names whose members are builtins, and may
//! declare a [`MethodContract`] per method. Contracts run before arguments
//! cross the boundary and after returns cross back, and the data-only rule
//! keeps callable values from leaking in either direction.
//!
//! Contracts are declared by *name* but enforced by *builtin identity*: at
//! bind time (and again after every contracted call, via the post-call
//! rescan) the published value graphs are walked and every builtin whose
//! name matches a declared contract is bound by pointer. The rescan is what
//! covers builtins that capability methods publish lazily at runtime —
//! factory objects, mutable receiver graphs.

use crate::{
    environment::Environment,
    error::RuntimeError,
    exec::{Execution, Invocation},
    value::{self, BuiltinFunction, ClassValue, FunctionValue, Value},
};
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

/// Named values published by a capability adapter, in publication order.
pub type CapabilityExports = Vec<(String, Value)>;

/// The argument shape a contract's argument validator sees.
#[derive(Clone, Copy)]
pub struct ContractArgs<'a> {
    /// Positional arguments.
    pub args: &'a [Value],
    /// Keyword arguments in source order.
    pub kwargs: &'a [(Rc<str>, Value)],
    /// The trailing block, if any.
    pub block: Option<&'a Value>,
}

/// Validator for a contracted method's arguments.
pub type ArgsValidator = Rc<dyn Fn(ContractArgs<'_>) -> Result<(), String>>;
/// Validator for a contracted method's return value.
pub type ReturnValidator = Rc<dyn Fn(&Value) -> Result<(), String>>;

/// A per-method boundary contract.
///
/// Validator failures surface as runtime errors at the call site, prefixed
/// with the capability-qualified method name.
#[derive(Clone, Default)]
pub struct MethodContract {
    validate_args: Option<ArgsValidator>,
    validate_return: Option<ReturnValidator>,
}

impl MethodContract {
    /// A contract with no validators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument validator.
    #[must_use]
    pub fn with_args<F>(mut self, f: F) -> Self
    where
        F: Fn(ContractArgs<'_>) -> Result<(), String> + 'static,
    {
        self.validate_args = Some(Rc::new(f));
        self
    }

    /// Adds a return validator.
    #[must_use]
    pub fn with_return<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + 'static,
    {
        self.validate_return = Some(Rc::new(f));
        self
    }

    /// The standard data-only contract: arguments and return value must be
    /// free of callables at any depth, and hash-shaped arguments must
    /// actually be hashes.
    #[must_use]
    pub fn data_only() -> Self {
        Self::new()
            .with_args(|args| {
                for value in args.args.iter().chain(args.kwargs.iter().map(|(_, v)| v)) {
                    if value::find_callable(value).is_some() {
                        return Err("attributes must be data-only".into());
                    }
                }
                Ok(())
            })
            .with_return(|value| {
                if value::find_callable(value).is_some() {
                    return Err("return value must be data-only".into());
                }
                Ok(())
            })
    }

    /// A contract for methods declaring a hash payload in the named
    /// keyword argument: the payload must be present, hash-shaped at the
    /// top level, and data-only at any depth. The return side applies the
    /// standard data-only rule.
    #[must_use]
    pub fn hash_payload(keyword: &str) -> Self {
        let keyword = keyword.to_string();
        Self::new()
            .with_args(move |args| {
                let Some(payload) = args
                    .kwargs
                    .iter()
                    .find(|(name, _)| **name == *keyword)
                    .map(|(_, value)| value)
                else {
                    return Err(format!("requires a `{keyword}:` argument"));
                };
                if !matches!(payload, Value::Hash(_) | Value::Object(_)) {
                    return Err(format!(
                        "{keyword} must be a hash, got {}",
                        payload.kind()
                    ));
                }
                if value::find_callable(payload).is_some() {
                    return Err(format!("{keyword} must be data-only"));
                }
                Ok(())
            })
            .with_return(|value| {
                if value::find_callable(value).is_some() {
                    return Err("return value must be data-only".into());
                }
                Ok(())
            })
    }

    pub(crate) fn check_args(
        &self,
        method: &str,
        args: &[Value],
        kwargs: &[(Rc<str>, Value)],
        block: Option<&Value>,
    ) -> Result<(), RuntimeError> {
        if let Some(validate) = &self.validate_args {
            validate(ContractArgs {
                args,
                kwargs,
                block,
            })
            .map_err(|msg| RuntimeError::runtime(format!("{method} {msg}")))?;
        }
        Ok(())
    }

    pub(crate) fn check_return(&self, method: &str, value: &Value) -> Result<(), RuntimeError> {
        if let Some(validate) = &self.validate_return {
            validate(value).map_err(|msg| RuntimeError::runtime(format!("{method} {msg}")))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for MethodContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodContract")
            .field("validate_args", &self.validate_args.is_some())
            .field("validate_return", &self.validate_return.is_some())
            .finish()
    }
}

/// Call-scoped context handed to [`Capability::bind`].
pub struct CapabilityBinding<'a> {
    keywords: &'a [(String, Value)],
}

impl CapabilityBinding<'_> {
    /// A keyword supplied by the host in the call options, if present.
    #[must_use]
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Builds a capability method builtin with the boundary clone rule
    /// applied: arguments are deep-cloned before `f` sees them and the
    /// result is deep-cloned before the script sees it, so neither side
    /// can mutate the other's structures.
    ///
    /// `name` should be the capability-qualified method name (`db.find`)
    /// so contract lookup and error messages line up.
    pub fn builtin<F>(&self, name: impl Into<Rc<str>>, f: F) -> Value
    where
        F: Fn(&mut Execution, Invocation<'_>) -> Result<Value, RuntimeError> + 'static,
    {
        boundary_builtin(name.into(), false, f)
    }

    /// Like [`CapabilityBinding::builtin`], but marked auto-invoke for
    /// zero-arity getter methods (`ctx.user`).
    pub fn getter<F>(&self, name: impl Into<Rc<str>>, f: F) -> Value
    where
        F: Fn(&mut Execution, Invocation<'_>) -> Result<Value, RuntimeError> + 'static,
    {
        boundary_builtin(name.into(), true, f)
    }

    /// Like [`CapabilityBinding::builtin`], for host closures whose
    /// failures are arbitrary host errors rather than runtime errors.
    ///
    /// An error that is already a [`RuntimeError`] surfaces unchanged;
    /// anything else is wrapped via [`RuntimeError::from_host`], so the
    /// script sees the capability-qualified method name with the host
    /// message preserved.
    pub fn host_builtin<F>(&self, name: impl Into<Rc<str>>, f: F) -> Value
    where
        F: Fn(&mut Execution, Invocation<'_>) -> Result<Value, Box<dyn std::error::Error>>
            + 'static,
    {
        let name: Rc<str> = name.into();
        let method = name.clone();
        boundary_builtin(name, false, move |exec, inv| {
            f(exec, inv).map_err(|err| match err.downcast::<RuntimeError>() {
                Ok(already) => *already,
                Err(err) => RuntimeError::from_host(&method, err),
            })
        })
    }
}

/// Wraps a host closure with the host↔script deep-clone discipline.
fn boundary_builtin<F>(name: Rc<str>, auto_invoke: bool, f: F) -> Value
where
    F: Fn(&mut Execution, Invocation<'_>) -> Result<Value, RuntimeError> + 'static,
{
    Value::builtin(name, auto_invoke, move |exec, inv| {
        let args: Vec<Value> = inv.args.iter().map(value::deep_clone).collect();
        let kwargs: Vec<(Rc<str>, Value)> = inv
            .kwargs
            .iter()
            .map(|(key, val)| (key.clone(), value::deep_clone(val)))
            .collect();
        let cloned = Invocation {
            receiver: inv.receiver,
            args: &args,
            kwargs: &kwargs,
            block: inv.block,
        };
        let result = f(exec, cloned)?;
        Ok(value::deep_clone(&result))
    })
}

/// An adapter exposing host functionality to scripts.
pub trait Capability {
    /// Publishes the adapter's top-level names for one call.
    ///
    /// # Errors
    ///
    /// Failing the bind fails the whole call.
    fn bind(&self, binding: &mut CapabilityBinding<'_>)
        -> Result<CapabilityExports, RuntimeError>;

    /// Declares per-method contracts, keyed by capability-qualified method
    /// name (`db.update`). Names must be unique across all adapters of a
    /// call.
    fn contracts(&self) -> Vec<(String, MethodContract)> {
        Vec::new()
    }
}

/// The per-call contract registry: declared contracts by name, enforced
/// contracts by builtin identity, and the published scope roots.
#[derive(Default)]
pub(crate) struct ContractScope {
    declared: FxHashMap<Rc<str>, Rc<MethodContract>>,
    bound: FxHashMap<usize, Rc<MethodContract>>,
    roots: Vec<Value>,
}

impl ContractScope {
    pub(crate) fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub(crate) fn roots(&self) -> &[Value] {
        &self.roots
    }

    pub(crate) fn contract_for(&self, builtin: &Rc<BuiltinFunction>) -> Option<Rc<MethodContract>> {
        self.bound.get(&builtin_id(builtin)).cloned()
    }

    fn register_tree(&mut self, value: &Value) {
        let mut visited = FxHashSet::default();
        let mut found: Vec<(usize, Rc<MethodContract>)> = Vec::new();
        walk_builtins(value, &mut visited, &mut |builtin| {
            if let Some(contract) = self.declared.get(&builtin.name) {
                found.push((builtin_id(builtin), contract.clone()));
            }
        });
        for (id, contract) in found {
            self.bound.insert(id, contract);
        }
    }
}

fn builtin_id(builtin: &Rc<BuiltinFunction>) -> usize {
    Rc::as_ptr(builtin) as usize
}

/// Binds every adapter for one call: declares contracts (duplicate names
/// fail the call), publishes exports into the root environment, rebinds
/// function and class references to the call's root env, and registers
/// contracts against builtin identities.
pub(crate) fn bind_all(
    exec: &mut Execution,
    capabilities: &[Box<dyn Capability>],
    keywords: &[(String, Value)],
) -> Result<(), RuntimeError> {
    for capability in capabilities {
        for (name, contract) in capability.contracts() {
            let name: Rc<str> = Rc::from(name.as_str());
            if exec.contracts.declared.contains_key(&name) {
                return Err(RuntimeError::runtime(format!(
                    "duplicate capability contract `{name}`"
                )));
            }
            exec.contracts.declared.insert(name, Rc::new(contract));
        }
    }

    let root = exec.root_env().clone();
    for capability in capabilities {
        let mut binding = CapabilityBinding { keywords };
        let exports = capability.bind(&mut binding)?;
        for (name, value) in exports {
            if root.has_local(&name) {
                return Err(RuntimeError::runtime(format!(
                    "capability name `{name}` already defined"
                )));
            }
            let value = rebind_to_root(&value, &root);
            exec.contracts.register_tree(&value);
            debug!("capability published `{name}`");
            root.define(name.as_str(), value.clone());
            exec.contracts.roots.push(value);
        }
    }
    Ok(())
}

/// Rebinds function and class references inside a published value graph to
/// the call's root environment, so module-scoped captures compose.
/// Containers are rewritten in place to preserve identity.
fn rebind_to_root(value: &Value, root: &Rc<Environment>) -> Value {
    let mut visited = FxHashSet::default();
    rebind_inner(value, root, &mut visited)
}

fn rebind_inner(value: &Value, root: &Rc<Environment>, visited: &mut FxHashSet<usize>) -> Value {
    match value {
        Value::Function(func) => Value::Function(Rc::new(FunctionValue {
            def: func.def.clone(),
            env: root.clone(),
            module: func.module.clone(),
        })),
        Value::Class(class) => Value::Class(Rc::new(ClassValue {
            name: class.name.clone(),
            methods: class.methods.clone(),
            class_methods: class.class_methods.clone(),
            class_vars: class.class_vars.clone(),
            env: root.clone(),
            module: class.module.clone(),
        })),
        Value::Array(items) => {
            if visited.insert(Rc::as_ptr(items) as usize) {
                let mut items = items.borrow_mut();
                for item in items.iter_mut() {
                    *item = rebind_inner(item, root, visited);
                }
            }
            value.clone()
        }
        Value::Hash(map) | Value::Object(map) => {
            if visited.insert(Rc::as_ptr(map) as usize) {
                let snapshot: Vec<(Rc<str>, Value)> = map
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let mut map = map.borrow_mut();
                for (key, item) in snapshot {
                    map.insert(key, rebind_inner(&item, root, visited));
                }
            }
            value.clone()
        }
        other => other.clone(),
    }
}

/// Collects the identities of every builtin reachable from the call shape
/// and the published scope roots.
pub(crate) fn snapshot_builtins(
    scope: &ContractScope,
    receiver: Option<&Value>,
    args: &[Value],
    kwargs: &[(Rc<str>, Value)],
) -> FxHashSet<usize> {
    let mut snapshot = FxHashSet::default();
    let mut visited = FxHashSet::default();
    let mut collect = |builtin: &Rc<BuiltinFunction>| {
        snapshot.insert(builtin_id(builtin));
    };
    if let Some(receiver) = receiver {
        walk_builtins(receiver, &mut visited, &mut collect);
    }
    for root in &scope.roots {
        walk_builtins(root, &mut visited, &mut collect);
    }
    for value in args.iter().chain(kwargs.iter().map(|(_, v)| v)) {
        walk_builtins(value, &mut visited, &mut collect);
    }
    snapshot
}

/// Binds declared contracts to builtins that appeared during a contracted
/// call — the lazily-published method surface of factory objects.
pub(crate) fn rescan_builtins(
    scope: &mut ContractScope,
    snapshot: &FxHashSet<usize>,
    receiver: Option<&Value>,
    args: &[Value],
    kwargs: &[(Rc<str>, Value)],
    result: Option<&Value>,
) {
    let mut visited = FxHashSet::default();
    let mut fresh: Vec<(usize, Rc<str>)> = Vec::new();
    {
        let mut collect = |builtin: &Rc<BuiltinFunction>| {
            let id = builtin_id(builtin);
            if !snapshot.contains(&id) {
                fresh.push((id, builtin.name.clone()));
            }
        };
        if let Some(receiver) = receiver {
            walk_builtins(receiver, &mut visited, &mut collect);
        }
        for root in &scope.roots {
            walk_builtins(root, &mut visited, &mut collect);
        }
        for value in args.iter().chain(kwargs.iter().map(|(_, v)| v)) {
            walk_builtins(value, &mut visited, &mut collect);
        }
        if let Some(result) = result {
            walk_builtins(result, &mut visited, &mut collect);
        }
    }
    for (id, name) in fresh {
        if let Some(contract) = scope.declared.get(&name) {
            debug!("late-bound contract `{name}`");
            scope.bound.insert(id, contract.clone());
        }
    }
}

/// Walks a value graph, calling `f` for every builtin. Containers are
/// visited once by identity.
fn walk_builtins<F: FnMut(&Rc<BuiltinFunction>)>(
    value: &Value,
    visited: &mut FxHashSet<usize>,
    f: &mut F,
) {
    match value {
        Value::Builtin(builtin) => f(builtin),
        Value::Array(items) => {
            if visited.insert(Rc::as_ptr(items) as usize) {
                for item in items.borrow().iter() {
                    walk_builtins(item, visited, f);
                }
            }
        }
        Value::Hash(map) | Value::Object(map) => {
            if visited.insert(Rc::as_ptr(map) as usize) {
                for (_, item) in map.borrow().iter() {
                    walk_builtins(item, visited, f);
                }
            }
        }
        Value::Instance(instance) => {
            if visited.insert(Rc::as_ptr(instance) as usize) {
                for (_, item) in instance.ivars.borrow().iter() {
                    walk_builtins(item, visited, f);
                }
            }
        }
        _ => {}
    }
}

/// Fails when a value crossing the host boundary contains a callable.
pub(crate) fn ensure_data_only(value: &Value, what: &str) -> Result<(), RuntimeError> {
    if let Some(kind) = value::find_callable(value) {
        return Err(RuntimeError::runtime(format!(
            "{what} must be data-only ({kind} value found)"
        )));
    }
    Ok(())
}
