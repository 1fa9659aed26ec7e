//! The runtime value model.
//!
//! [`Value`] is a tagged sum over every kind a script can touch. Containers
//! (array, hash, object) are `Rc`-shared with interior mutability: within a
//! script, mutation through one alias is visible through all others. The
//! host boundary is where that sharing stops — see [`deep_clone`] and the
//! capability layer's data-only checks.

mod display;
pub mod map;
pub mod money;
pub mod operations;

pub use map::VibeMap;
pub use money::{Currency, Money};

use crate::{
    environment::Environment,
    error::RuntimeError,
    exec::{Execution, Invocation},
    module::ModuleContext,
};
use rustc_hash::FxHashMap;
use std::{cell::RefCell, rc::Rc, sync::Arc};
use time::{Duration, OffsetDateTime};
use vibe_ast::{BlockLiteral, FunctionDef};

/// A shared, mutable array payload.
pub type VArray = Rc<RefCell<Vec<Value>>>;
/// A shared, mutable hash/object payload.
pub type VMap = Rc<RefCell<VibeMap>>;

/// The type of host-implemented functions exposed to scripts.
///
/// Builtins live in per-call values, so they may capture non-`Send` host
/// handles. Builtins registered on the [`Engine`](crate::Engine) itself use
/// the `Send + Sync` [`HostFn`](crate::engine::HostFn) and are wrapped into
/// this type per call.
pub type NativeFn = Rc<dyn Fn(&mut Execution, Invocation<'_>) -> Result<Value, RuntimeError>>;

/// An inclusive integer range. Iterates descending when `start > end`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RangeValue {
    /// The first bound.
    pub start: i64,
    /// The last bound, inclusive.
    pub end: i64,
}

impl RangeValue {
    /// The number of values the range produces.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.start.abs_diff(self.end) + 1
    }

    /// Whether the range is empty. Inclusive ranges never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates the range, descending when `start > end`.
    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let (start, end, descending) = if self.start <= self.end {
            (self.start, self.end, false)
        } else {
            (self.end, self.start, true)
        };
        let mut values: Vec<i64> = (start..=end).collect();
        if descending {
            values.reverse();
        }
        values.into_iter()
    }

    /// Whether the range contains `value`.
    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        let (lo, hi) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        (lo..=hi).contains(&value)
    }
}

/// A user-defined class: its methods, class methods and class variables.
#[derive(Debug)]
pub struct ClassValue {
    /// The class name.
    pub name: Rc<str>,
    /// Instance methods by name.
    pub methods: FxHashMap<Rc<str>, Arc<FunctionDef>>,
    /// Class methods by name.
    pub class_methods: FxHashMap<Rc<str>, Arc<FunctionDef>>,
    /// Class variable storage, shared by all instances.
    pub class_vars: RefCell<VibeMap>,
    /// The environment the class was defined in.
    pub env: Rc<Environment>,
    /// The module the class was defined in.
    pub module: ModuleContext,
}

/// An instance of a user-defined class.
#[derive(Debug)]
pub struct Instance {
    /// The instance's class.
    pub class: Rc<ClassValue>,
    /// Instance variable storage.
    pub ivars: RefCell<VibeMap>,
}

/// A user-defined function value: the definition plus its captured
/// environment and module context.
#[derive(Debug)]
pub struct FunctionValue {
    /// The parsed definition.
    pub def: Arc<FunctionDef>,
    /// The lexical environment the function closes over.
    pub env: Rc<Environment>,
    /// The module the function belongs to.
    pub module: ModuleContext,
}

/// A first-class block: only invocable through `yield` or the host-facing
/// [`Execution::call_block`].
#[derive(Debug)]
pub struct BlockValue {
    /// The block literal.
    pub literal: Rc<BlockLiteral>,
    /// The environment captured at the definition site.
    pub env: Rc<Environment>,
    /// The module context captured at the definition site.
    pub module: ModuleContext,
}

/// A host-implemented function.
pub struct BuiltinFunction {
    /// The (possibly capability-qualified) name, used for contract lookup
    /// and error messages.
    pub name: Rc<str>,
    /// When set, a bare reference to the builtin invokes it zero-arity —
    /// the getter-method idiom behind `str.length`.
    pub auto_invoke: bool,
    /// The implementation.
    pub func: NativeFn,
}

impl std::fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinFunction")
            .field("name", &self.name)
            .field("auto_invoke", &self.auto_invoke)
            .finish_non_exhaustive()
    }
}

/// A script value.
#[derive(Clone, Debug)]
pub enum Value {
    /// `nil`
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Immutable string.
    String(Rc<str>),
    /// Symbol.
    Symbol(Rc<str>),
    /// Inclusive integer range.
    Range(Rc<RangeValue>),
    /// Shared mutable array.
    Array(VArray),
    /// Shared mutable hash.
    Hash(VMap),
    /// Shared mutable attribute bag (module exports, capability surfaces,
    /// rescue bindings).
    Object(VMap),
    /// Currency-tagged amount.
    Money(Money),
    /// Signed span of time.
    Duration(Duration),
    /// A point in time.
    Time(OffsetDateTime),
    /// Instance of a user-defined class.
    Instance(Rc<Instance>),
    /// A user-defined class.
    Class(Rc<ClassValue>),
    /// A block value.
    Block(Rc<BlockValue>),
    /// A host-implemented function.
    Builtin(Rc<BuiltinFunction>),
    /// A user-defined function.
    Function(Rc<FunctionValue>),
}

impl Value {
    /// Creates a string value.
    pub fn string(value: impl Into<Rc<str>>) -> Self {
        Self::String(value.into())
    }

    /// Creates a symbol value.
    pub fn symbol(value: impl Into<Rc<str>>) -> Self {
        Self::Symbol(value.into())
    }

    /// Creates an array value from elements.
    #[must_use]
    pub fn array(elements: Vec<Value>) -> Self {
        Self::Array(Rc::new(RefCell::new(elements)))
    }

    /// Creates a hash value from a map.
    #[must_use]
    pub fn hash(map: VibeMap) -> Self {
        Self::Hash(Rc::new(RefCell::new(map)))
    }

    /// Creates an object (attribute bag) value from a map.
    #[must_use]
    pub fn object(map: VibeMap) -> Self {
        Self::Object(Rc::new(RefCell::new(map)))
    }

    /// Creates a builtin value.
    pub fn builtin<F>(name: impl Into<Rc<str>>, auto_invoke: bool, func: F) -> Self
    where
        F: Fn(&mut Execution, Invocation<'_>) -> Result<Value, RuntimeError> + 'static,
    {
        Self::Builtin(Rc::new(BuiltinFunction {
            name: name.into(),
            auto_invoke,
            func: Rc::new(func),
        }))
    }

    /// The kind name used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Range(_) => "range",
            Self::Array(_) => "array",
            Self::Hash(_) => "hash",
            Self::Object(_) => "object",
            Self::Money(_) => "money",
            Self::Duration(_) => "duration",
            Self::Time(_) => "time",
            Self::Instance(_) => "instance",
            Self::Class(_) => "class",
            Self::Block(_) => "block",
            Self::Builtin(_) => "builtin",
            Self::Function(_) => "function",
        }
    }

    /// Ruby truthiness: everything but `nil` and `false` is true.
    #[must_use]
    pub const fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    /// Whether the value is one of the callable kinds that must never cross
    /// the host boundary.
    #[must_use]
    pub const fn is_callable(&self) -> bool {
        matches!(self, Self::Block(_) | Self::Builtin(_) | Self::Function(_))
    }

    /// Whether a value of this kind satisfies a type annotation.
    #[must_use]
    pub fn matches_annotation(&self, annotation: vibe_ast::TypeAnnotation) -> bool {
        use vibe_ast::TypeAnnotation as T;
        match annotation {
            T::Integer => matches!(self, Self::Int(_)),
            // Integers widen to float parameters.
            T::Float => matches!(self, Self::Float(_) | Self::Int(_)),
            T::String => matches!(self, Self::String(_)),
            T::Symbol => matches!(self, Self::Symbol(_)),
            T::Bool => matches!(self, Self::Bool(_)),
            T::Array => matches!(self, Self::Array(_)),
            T::Hash => matches!(self, Self::Hash(_) | Self::Object(_)),
            T::Duration => matches!(self, Self::Duration(_)),
            T::Money => matches!(self, Self::Money(_)),
            T::Time => matches!(self, Self::Time(_)),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

/// Deep-clones a value for a host↔script boundary crossing.
///
/// Arrays, hashes and objects become fresh, independent structures; every
/// other kind is already immutable or host-opaque and is shared as-is.
#[must_use]
pub fn deep_clone(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let cloned: Vec<Value> = items.borrow().iter().map(deep_clone).collect();
            Value::array(cloned)
        }
        Value::Hash(map) => Value::hash(deep_clone_map(&map.borrow())),
        Value::Object(map) => Value::object(deep_clone_map(&map.borrow())),
        other => other.clone(),
    }
}

fn deep_clone_map(map: &VibeMap) -> VibeMap {
    map.iter()
        .map(|(k, v)| (k.clone(), deep_clone(v)))
        .collect()
}

/// Searches a value graph for a callable, returning the kind name of the
/// first one found. Used by the boundary's data-only checks.
#[must_use]
pub fn find_callable(value: &Value) -> Option<&'static str> {
    match value {
        Value::Block(_) | Value::Builtin(_) | Value::Function(_) => Some(value.kind()),
        Value::Array(items) => items.borrow().iter().find_map(find_callable),
        Value::Hash(map) | Value::Object(map) => {
            map.borrow().iter().find_map(|(_, v)| find_callable(v))
        }
        Value::Instance(instance) => instance
            .ivars
            .borrow()
            .iter()
            .find_map(|(_, v)| find_callable(v)),
        _ => None,
    }
}
