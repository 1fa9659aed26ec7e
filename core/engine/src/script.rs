//! Compiled scripts and the per-call entry points.

use crate::{
    builtins,
    cancel::CancelToken,
    capability::{self, Capability},
    engine::EngineInner,
    error::RuntimeError,
    exec::Execution,
    module::ModuleContext,
    value::{self, FunctionValue, Value},
};
use rustc_hash::FxHashMap;
use std::{rc::Rc, sync::Arc};
use vibe_ast::{ClassDef, FunctionDef, Position, Program};

/// Per-call options supplied by the host.
#[derive(Default)]
pub struct CallOptions {
    /// Host values defined as top-level names. Hashes and arrays are
    /// deep-cloned before the script sees them; under strict effects they
    /// must be data-only.
    pub globals: Vec<(String, Value)>,
    /// Capability adapters bound for this call.
    pub capabilities: Vec<Box<dyn Capability>>,
    /// Keyword arguments for the called function, also visible to
    /// capability adapters at bind time.
    pub keywords: Vec<(String, Value)>,
    /// Permits `require` under a strict-effects engine.
    pub allow_require: bool,
}

/// A compiled program: functions, classes, source and module identity.
///
/// A script is immutable and callable repeatedly; every [`Script::call`]
/// builds a fresh [`Execution`] and discards it on return, so no state
/// leaks between calls.
pub struct Script {
    engine: Arc<EngineInner>,
    source: Arc<str>,
    program: Arc<Program>,
    functions: FxHashMap<String, Arc<FunctionDef>>,
    classes: FxHashMap<String, Arc<ClassDef>>,
    module: ModuleContext,
}

impl Script {
    pub(crate) fn new(
        engine: Arc<EngineInner>,
        source: Arc<str>,
        program: Arc<Program>,
        functions: FxHashMap<String, Arc<FunctionDef>>,
        classes: FxHashMap<String, Arc<ClassDef>>,
        module: ModuleContext,
    ) -> Self {
        Self {
            engine,
            source,
            program,
            functions,
            classes,
            module,
        }
    }

    /// The source text the script was compiled from, for error rendering.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The names of the script's top-level functions, sorted.
    #[must_use]
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether the script defines a top-level function with this name.
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Calls a named top-level function.
    ///
    /// Arguments and keywords cross the host→script boundary: they are
    /// rejected if they contain callables and deep-cloned so the script
    /// cannot mutate host-owned structures. The return value crosses back
    /// under the same rule.
    ///
    /// # Errors
    ///
    /// Any compile-surviving failure is reported as a [`RuntimeError`]:
    /// quota and recursion exhaustion, cancellation, type errors,
    /// capability contract violations and module problems.
    pub fn call(
        &self,
        cancel: &CancelToken,
        function: &str,
        args: &[Value],
        options: CallOptions,
    ) -> Result<Value, RuntimeError> {
        let mut exec = self.setup_execution(cancel, &options)?;

        let callee = match exec.root_env().get(function) {
            Some(Value::Function(func)) => func,
            Some(_) => {
                return Err(RuntimeError::runtime(format!(
                    "`{function}` is not a callable function"
                )));
            }
            None => {
                return Err(RuntimeError::runtime(format!(
                    "undefined function `{function}`"
                )));
            }
        };

        let mut call_args = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            capability::ensure_data_only(arg, &format!("argument {}", index + 1))?;
            call_args.push(value::deep_clone(arg));
        }
        let mut kwargs: Vec<(Rc<str>, Value)> = Vec::with_capacity(options.keywords.len());
        for (name, val) in &options.keywords {
            capability::ensure_data_only(val, &format!("keyword `{name}`"))?;
            kwargs.push((Rc::from(name.as_str()), value::deep_clone(val)));
        }

        let result = exec.call_function(
            &callee,
            None,
            call_args,
            kwargs,
            None,
            Position::new(1, 1),
        )?;
        Self::cross_out(result)
    }

    /// Evaluates the script's top-level statements, returning the value of
    /// the last one. Used by hosts that treat a script as an expression
    /// rather than a function library.
    ///
    /// # Errors
    ///
    /// See [`Script::call`].
    pub fn eval(&self, cancel: &CancelToken, options: CallOptions) -> Result<Value, RuntimeError> {
        let mut exec = self.setup_execution(cancel, &options)?;
        let result = exec.run_toplevel(self.program.statements())?;
        Self::cross_out(result)
    }

    /// Applies the boundary rule to a value leaving the script.
    fn cross_out(result: Value) -> Result<Value, RuntimeError> {
        capability::ensure_data_only(&result, "return value")?;
        Ok(value::deep_clone(&result))
    }

    /// Builds the per-call interpreter state: root environment with engine
    /// builtins, default globals, host globals, the script's functions and
    /// classes, and bound capabilities.
    fn setup_execution(
        &self,
        cancel: &CancelToken,
        options: &CallOptions,
    ) -> Result<Execution, RuntimeError> {
        let mut exec = Execution::new(
            self.engine.clone(),
            self.source.clone(),
            self.module.clone(),
            cancel.clone(),
            options.allow_require,
        );

        {
            let registered = self
                .engine
                .builtins
                .read()
                .expect("builtin registry poisoned");
            for (name, builtin) in registered.iter() {
                let host = builtin.func.clone();
                let value = Value::Builtin(Rc::new(crate::value::BuiltinFunction {
                    name: Rc::from(name.as_str()),
                    auto_invoke: builtin.auto_invoke,
                    func: Rc::new(move |exec, inv| host(exec, inv)),
                }));
                exec.root_env().define(name.as_str(), value);
            }
        }

        builtins::install_globals(exec.root_env());

        for (name, val) in &options.globals {
            if self.engine.strict_effects {
                capability::ensure_data_only(val, &format!("global `{name}`"))?;
            }
            exec.root_env()
                .define(name.as_str(), value::deep_clone(val));
        }

        for (name, def) in &self.functions {
            let func = FunctionValue {
                def: def.clone(),
                env: exec.root_env().clone(),
                module: self.module.clone(),
            };
            exec.root_env()
                .define(name.as_str(), Value::Function(Rc::new(func)));
        }

        let mut class_names: Vec<&String> = self.classes.keys().collect();
        class_names.sort_unstable();
        for name in class_names {
            let def = &self.classes[name];
            exec.define_class(def)
                .map_err(crate::exec::Signal::into_runtime)?;
        }

        capability::bind_all(&mut exec, &options.capabilities, &options.keywords)?;
        Ok(exec)
    }
}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("functions", &self.functions.len())
            .field("classes", &self.classes.len())
            .finish_non_exhaustive()
    }
}
