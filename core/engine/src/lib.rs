//! An embeddable, sandboxed scripting runtime for a small Ruby-flavoured
//! language.
//!
//! The crate centres on four pieces:
//!
//! - the **evaluator** ([`exec`]): a tree-walking interpreter whose step
//!   gate enforces deterministic resource bounds — step quota, heuristic
//!   memory quota, recursion cap and cooperative cancellation;
//! - the **capability layer** ([`capability`]): the only doorway between
//!   host functionality and scripts, with per-method contracts and a
//!   data-only rule that keeps callables from leaking across the boundary;
//! - the **module loader** ([`module`]): cached `.vibe` modules with a
//!   glob policy filter, symlink-safe path containment and two-layer cycle
//!   detection;
//! - the **value model** ([`value`]): a tagged sum with reference-shared
//!   containers inside a script and deep clones at every host boundary.
//!
//! # Example
//!
//! ```
//! use vibe_engine::{CallOptions, CancelToken, Engine, Value};
//!
//! let engine = Engine::builder().step_quota(10_000).build().unwrap();
//! let script = engine
//!     .compile("def double(n)\n  n * 2\nend")
//!     .unwrap();
//! let result = script
//!     .call(&CancelToken::new(), "double", &[Value::Int(21)], CallOptions::default())
//!     .unwrap();
//! assert_eq!(result, Value::Int(42));
//! ```

pub mod cancel;
pub mod capability;
pub mod engine;
pub mod environment;
pub mod error;
pub mod exec;
pub mod limits;
pub mod module;
pub mod script;
pub mod value;

mod builtins;
mod memory;

#[cfg(test)]
mod tests;

pub use cancel::CancelToken;
pub use capability::{
    Capability, CapabilityBinding, CapabilityExports, ContractArgs, MethodContract,
};
pub use engine::{ConfigError, Engine, EngineBuilder};
pub use error::{CompileError, ErrorKind, Frame, RuntimeError};
pub use exec::{Execution, Invocation};
pub use limits::RuntimeLimits;
pub use script::{CallOptions, Script};
pub use value::{Currency, Money, Value, VibeMap};
