//! The process-lifetime engine: configuration, registered builtins and the
//! shared module cache.

use crate::{
    error::{CompileError, RuntimeError},
    exec::{Execution, Invocation},
    limits::RuntimeLimits,
    module::ModuleContext,
    script::Script,
    value::Value,
};
use rustc_hash::FxHashMap;
use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
};
use vibe_ast::{Program, Statement};

/// Default bound on the module cache.
const DEFAULT_MAX_CACHED_MODULES: usize = 128;

/// The type of builtins registered on the engine itself. The engine is
/// shared across threads, so these must be `Send + Sync`; they are wrapped
/// into per-call [`NativeFn`](crate::value::NativeFn)s at call setup.
pub type HostFn =
    Arc<dyn Fn(&mut Execution, Invocation<'_>) -> Result<Value, RuntimeError> + Send + Sync>;

/// A builtin registered on the engine, instantiated into every call's root
/// environment.
pub(crate) struct RegisteredBuiltin {
    pub(crate) auto_invoke: bool,
    pub(crate) func: HostFn,
}

/// A compiled module held in the engine cache. The source rides along so
/// module-origin errors can render code frames against the module file.
pub(crate) struct CompiledModule {
    pub(crate) source: Arc<str>,
    pub(crate) program: Arc<Program>,
}

pub(crate) struct EngineInner {
    pub(crate) limits: RuntimeLimits,
    pub(crate) strict_effects: bool,
    pub(crate) module_paths: Vec<PathBuf>,
    pub(crate) module_allow: Vec<glob::Pattern>,
    pub(crate) module_deny: Vec<glob::Pattern>,
    pub(crate) max_cached_modules: usize,
    pub(crate) builtins: RwLock<FxHashMap<String, RegisteredBuiltin>>,
    pub(crate) module_cache: RwLock<FxHashMap<Arc<str>, Arc<CompiledModule>>>,
}

/// An engine configuration problem reported by [`EngineBuilder::build`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A module policy glob failed to parse.
    #[error("invalid module policy pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        source: glob::PatternError,
    },
    /// A limit that must be positive was zero.
    #[error("{0} must be positive")]
    ZeroLimit(&'static str),
}

/// Builder for [`Engine`].
#[derive(Debug)]
pub struct EngineBuilder {
    limits: RuntimeLimits,
    strict_effects: bool,
    module_paths: Vec<PathBuf>,
    module_allow: Vec<String>,
    module_deny: Vec<String>,
    max_cached_modules: usize,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            limits: RuntimeLimits::default(),
            strict_effects: false,
            module_paths: Vec::new(),
            module_allow: Vec::new(),
            module_deny: Vec::new(),
            max_cached_modules: DEFAULT_MAX_CACHED_MODULES,
        }
    }
}

impl EngineBuilder {
    /// Sets the step quota.
    #[must_use]
    pub fn step_quota(mut self, quota: u64) -> Self {
        self.limits.step_quota = quota;
        self
    }

    /// Sets the memory quota in bytes.
    #[must_use]
    pub fn memory_quota_bytes(mut self, bytes: usize) -> Self {
        self.limits.memory_quota_bytes = bytes;
        self
    }

    /// Sets the recursion limit.
    #[must_use]
    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.limits.recursion_limit = limit;
        self
    }

    /// Enables strict effects: host globals must be data-only and
    /// `require` needs per-call opt-in.
    #[must_use]
    pub fn strict_effects(mut self, strict: bool) -> Self {
        self.strict_effects = strict;
        self
    }

    /// Appends a module search root.
    #[must_use]
    pub fn module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_paths.push(path.into());
        self
    }

    /// Appends an allow-list glob. When any allow pattern is configured,
    /// module names must match at least one.
    #[must_use]
    pub fn module_allow(mut self, pattern: impl Into<String>) -> Self {
        self.module_allow.push(pattern.into());
        self
    }

    /// Appends a deny-list glob. Deny patterns are checked first.
    #[must_use]
    pub fn module_deny(mut self, pattern: impl Into<String>) -> Self {
        self.module_deny.push(pattern.into());
        self
    }

    /// Bounds the module cache. At capacity, loading a new module fails.
    #[must_use]
    pub fn max_cached_modules(mut self, max: usize) -> Self {
        self.max_cached_modules = max;
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Fails on invalid glob patterns or zero limits.
    pub fn build(self) -> Result<Engine, ConfigError> {
        if self.limits.step_quota == 0 {
            return Err(ConfigError::ZeroLimit("step quota"));
        }
        if self.limits.memory_quota_bytes == 0 {
            return Err(ConfigError::ZeroLimit("memory quota"));
        }
        if self.limits.recursion_limit == 0 {
            return Err(ConfigError::ZeroLimit("recursion limit"));
        }
        if self.max_cached_modules == 0 {
            return Err(ConfigError::ZeroLimit("module cache size"));
        }

        let compile_patterns = |patterns: Vec<String>| {
            patterns
                .into_iter()
                .map(|pattern| {
                    glob::Pattern::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Engine {
            inner: Arc::new(EngineInner {
                limits: self.limits,
                strict_effects: self.strict_effects,
                module_paths: self.module_paths,
                module_allow: compile_patterns(self.module_allow)?,
                module_deny: compile_patterns(self.module_deny)?,
                max_cached_modules: self.max_cached_modules,
                builtins: RwLock::new(FxHashMap::default()),
                module_cache: RwLock::new(FxHashMap::default()),
            }),
        })
    }
}

/// The embeddable runtime host.
///
/// One engine lives for the host process; it is cheap to clone and safe to
/// share across threads — per-call interpreter state never leaves
/// [`Script::call`].
#[derive(Clone)]
pub struct Engine {
    pub(crate) inner: Arc<EngineInner>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        EngineBuilder::default()
            .build()
            .expect("default configuration is valid")
    }

    /// Starts building a configured engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Registers a global builtin available to every script.
    pub fn register_builtin<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&mut Execution, Invocation<'_>) -> Result<Value, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.inner
            .builtins
            .write()
            .expect("builtin registry poisoned")
            .insert(
                name.into(),
                RegisteredBuiltin {
                    auto_invoke: false,
                    func: Arc::new(func),
                },
            );
    }

    /// The names of all registered global builtins, sorted.
    #[must_use]
    pub fn builtins(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .builtins
            .read()
            .expect("builtin registry poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }

    /// Compiles source text into a callable [`Script`].
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] on syntax errors or duplicate
    /// definitions.
    pub fn compile(&self, source: &str) -> Result<Script, CompileError> {
        let program = vibe_parser::parse(source)?;
        let mut functions = FxHashMap::default();
        let mut classes = FxHashMap::default();

        for statement in program.statements() {
            match statement {
                Statement::FunctionDecl(def) => {
                    if functions
                        .insert(def.name.clone(), Arc::new(def.clone()))
                        .is_some()
                    {
                        return Err(CompileError::DuplicateFunction(def.name.clone()));
                    }
                }
                Statement::ClassDecl(def) => {
                    // Instance and class methods live in separate tables;
                    // duplicates are only an error within each.
                    let mut method_names = rustc_hash::FxHashSet::default();
                    for method in &def.methods {
                        if !method_names.insert(method.name.as_str()) {
                            return Err(CompileError::DuplicateFunction(format!(
                                "{}#{}",
                                def.name, method.name
                            )));
                        }
                    }
                    let mut class_method_names = rustc_hash::FxHashSet::default();
                    for method in &def.class_methods {
                        if !class_method_names.insert(method.name.as_str()) {
                            return Err(CompileError::DuplicateFunction(format!(
                                "{}.{}",
                                def.name, method.name
                            )));
                        }
                    }
                    if classes
                        .insert(def.name.clone(), Arc::new(def.clone()))
                        .is_some()
                    {
                        return Err(CompileError::DuplicateClass(def.name.clone()));
                    }
                }
                _ => {}
            }
        }

        let root = self
            .inner
            .module_paths
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        let source: Arc<str> = Arc::from(source);

        Ok(Script::new(
            self.inner.clone(),
            source.clone(),
            Arc::new(program),
            functions,
            classes,
            ModuleContext::for_script(root, source),
        ))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("limits", &self.inner.limits)
            .field("strict_effects", &self.inner.strict_effects)
            .field("module_paths", &self.inner.module_paths)
            .finish_non_exhaustive()
    }
}
