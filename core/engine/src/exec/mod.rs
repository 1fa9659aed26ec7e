//! The tree-walking evaluator.
//!
//! [`Execution`] is the per-call interpreter state: the step counter, the
//! environment and call-frame stacks, module context, rescued errors and the
//! capability contract scope. Everything in here is created by
//! [`Script::call`](crate::script::Script::call) and discarded when the call
//! returns.
//!
//! Control flow inside the walker rides on [`Signal`]: `break`/`next` are
//! consumed by the innermost loop, `return` by the nearest function or
//! block boundary, and errors bubble all the way out. A `break` or `next`
//! that reaches a function or block boundary is reclassified as a runtime
//! error there — control signals never cross a call boundary.

mod call;
mod expression;
mod statement;

use crate::{
    cancel::CancelToken,
    capability::ContractScope,
    engine::EngineInner,
    environment::Environment,
    error::{ErrorKind, Frame, RuntimeError},
    memory,
    module::ModuleContext,
    value::{BlockValue, Value},
};
use rustc_hash::FxHashMap;
use std::{rc::Rc, sync::Arc};
use vibe_ast::{Position, Statement};

/// Memory is sampled on every sixteenth step.
const MEMORY_SAMPLE_INTERVAL: u64 = 16;

/// Non-local control flow bubbling through the walker.
#[derive(Debug)]
pub(crate) enum Signal {
    /// `break`, consumed by the innermost loop.
    Break(Position),
    /// `next`, consumed by the innermost loop.
    Next(Position),
    /// `return`, consumed by the nearest function or block boundary.
    Return(Value),
    /// A runtime error.
    Error(RuntimeError),
}

impl Signal {
    /// Extracts the error, reclassifying control signals that reached a
    /// boundary they may not cross.
    pub(crate) fn into_runtime(self) -> RuntimeError {
        match self {
            Self::Error(err) => err,
            Self::Break(_) => RuntimeError::runtime("break cannot cross call boundary"),
            Self::Next(_) => RuntimeError::runtime("next cannot cross call boundary"),
            Self::Return(_) => RuntimeError::runtime("return cannot cross call boundary"),
        }
    }
}

impl From<RuntimeError> for Signal {
    fn from(err: RuntimeError) -> Self {
        Self::Error(err)
    }
}

pub(crate) type Eval<T> = Result<T, Signal>;

/// One interpreter call frame.
#[derive(Clone, Debug)]
pub(crate) struct CallFrame {
    /// The function name, for stack dumps.
    pub name: Rc<str>,
    /// The call-site position in the caller's source.
    pub call_position: Option<Position>,
    /// The module whose function is executing, for require-cycle checks.
    pub module_key: Option<Arc<str>>,
}

/// The argument shape handed to host-implemented builtins.
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    /// The receiver the builtin was invoked on, if any.
    pub receiver: Option<&'a Value>,
    /// Positional arguments.
    pub args: &'a [Value],
    /// Keyword arguments in source order.
    pub kwargs: &'a [(Rc<str>, Value)],
    /// The trailing block, if one was supplied.
    pub block: Option<&'a Value>,
}

impl<'a> Invocation<'a> {
    /// The receiver, or an error naming the method when it is missing.
    pub fn expect_receiver(&self, method: &str) -> Result<&'a Value, RuntimeError> {
        self.receiver
            .ok_or_else(|| RuntimeError::runtime(format!("method `{method}` requires a receiver")))
    }

    /// Positional argument `index`, or an error naming the method.
    pub fn expect_arg(&self, method: &str, index: usize) -> Result<&'a Value, RuntimeError> {
        self.args.get(index).ok_or_else(|| {
            RuntimeError::runtime(format!(
                "method `{method}` expects at least {} argument(s)",
                index + 1
            ))
        })
    }

    /// Keyword argument by name.
    #[must_use]
    pub fn kwarg(&self, name: &str) -> Option<&'a Value> {
        self.kwargs
            .iter()
            .find(|(key, _)| &**key == name)
            .map(|(_, value)| value)
    }

    /// Fails when more positionals than `max` were supplied.
    pub fn expect_max_args(&self, method: &str, max: usize) -> Result<(), RuntimeError> {
        if self.args.len() > max {
            return Err(RuntimeError::runtime(format!(
                "method `{method}` expects at most {max} argument(s), got {}",
                self.args.len()
            )));
        }
        Ok(())
    }
}

/// Per-call interpreter state.
pub struct Execution {
    pub(crate) engine: Arc<EngineInner>,
    pub(crate) source: Arc<str>,
    pub(crate) cancel: CancelToken,
    pub(crate) steps: u64,
    pub(crate) position: Position,
    pub(crate) call_stack: Vec<CallFrame>,
    pub(crate) env: Rc<Environment>,
    pub(crate) root_env: Rc<Environment>,
    pub(crate) module_stack: Vec<ModuleContext>,
    pub(crate) rescued: Vec<RuntimeError>,
    /// Per-call module exports, by cache key. Repeat requires return the
    /// same object identity.
    pub(crate) modules: FxHashMap<Arc<str>, Value>,
    /// Modules currently undergoing initial binding in this call.
    pub(crate) module_load_stack: Vec<(Arc<str>, String)>,
    pub(crate) contracts: ContractScope,
    pub(crate) allow_require: bool,
}

impl Execution {
    pub(crate) fn new(
        engine: Arc<EngineInner>,
        source: Arc<str>,
        module: ModuleContext,
        cancel: CancelToken,
        allow_require: bool,
    ) -> Self {
        let root_env = Environment::new_root();
        let module_key = module.key.clone();
        Self {
            engine,
            source,
            cancel,
            steps: 0,
            position: Position::new(1, 1),
            call_stack: vec![CallFrame {
                name: Rc::from("(main)"),
                call_position: None,
                module_key,
            }],
            env: root_env.clone(),
            root_env,
            module_stack: vec![module],
            rescued: Vec::new(),
            modules: FxHashMap::default(),
            module_load_stack: Vec::new(),
            contracts: ContractScope::default(),
            allow_require,
        }
    }

    /// The source of the script this call is executing, for error rendering.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The current call's root environment.
    #[must_use]
    pub fn root_env(&self) -> &Rc<Environment> {
        &self.root_env
    }

    /// The quota/cancellation gate, executed once per AST node and per
    /// iteration-callback round.
    pub(crate) fn step(&mut self, position: Position) -> Result<(), RuntimeError> {
        self.position = position;
        self.steps += 1;
        let quota = self.engine.limits.step_quota;
        if self.steps > quota {
            return Err(self.anchored(RuntimeError::runtime(format!(
                "step quota exceeded ({quota})"
            ))));
        }
        if self.steps % MEMORY_SAMPLE_INTERVAL == 0 {
            self.check_memory(&[])?;
        }
        self.cancel.check().map_err(|err| self.anchored(err))?;
        Ok(())
    }

    /// Walks the live roots (environment chain, capability scope roots and
    /// any extra call-boundary roots) and fails when the heuristic byte
    /// estimate exceeds the quota.
    pub(crate) fn check_memory(&self, extra: &[&Value]) -> Result<(), RuntimeError> {
        let quota = self.engine.limits.memory_quota_bytes;
        let estimate = memory::estimate(&self.env, self.contracts.roots(), extra);
        if estimate > quota {
            return Err(self.anchored(RuntimeError::runtime("memory quota exceeded")));
        }
        Ok(())
    }

    /// Builds the stack for an error raised at the current position: the
    /// top frame gets the current position, the rest unwind with the call
    /// positions recorded at each push.
    pub(crate) fn capture_frames(&self) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(self.call_stack.len());
        let mut iter = self.call_stack.iter().rev();
        if let Some(top) = iter.next() {
            frames.push(Frame {
                function: top.name.to_string(),
                position: Some(self.position),
            });
            let mut caller_position = top.call_position;
            for frame in iter {
                frames.push(Frame {
                    function: frame.name.to_string(),
                    position: caller_position,
                });
                caller_position = frame.call_position;
            }
        }
        frames
    }

    /// Anchors an error at the current position unless it already carries
    /// one (no double-wrapping). The source of the module whose code is
    /// executing rides along so code frames render against the right file.
    pub(crate) fn anchored(&self, err: RuntimeError) -> RuntimeError {
        if err.is_anchored() {
            err
        } else {
            let source = self.module_stack.last().map(|ctx| ctx.source.clone());
            err.anchor(self.position, self.capture_frames(), source)
        }
    }

    /// The module context of the code currently executing.
    pub(crate) fn current_module(&self) -> ModuleContext {
        self.module_stack
            .last()
            .cloned()
            .unwrap_or_else(ModuleContext::detached)
    }

    /// Host-facing block invocation, used by iteration builtins and
    /// capability adapters to drive script callbacks.
    ///
    /// Runs the quota/cancellation gate once per invocation, so per-row
    /// callbacks observe cancellation promptly.
    ///
    /// # Errors
    ///
    /// Fails if `block` is not a block value, or with whatever the block
    /// body raises. `break`/`next` escaping the block are reported as
    /// boundary-crossing errors.
    pub fn call_block(&mut self, block: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        self.step(self.position)?;
        let Value::Block(block) = block else {
            return Err(self.anchored(RuntimeError::runtime(format!(
                "expected a block, got {}",
                block.kind()
            ))));
        };
        self.invoke_block(&block.clone(), args)
    }

    /// Runs a block body with `args` bound to its parameters.
    pub(crate) fn invoke_block(
        &mut self,
        block: &Rc<BlockValue>,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let env = Environment::with_parent(block.env.clone());
        for (index, param) in block.literal.params.iter().enumerate() {
            let value = args.get(index).cloned().unwrap_or(Value::Nil);
            if let Some(annotation) = param.type_annotation {
                if !value.matches_annotation(annotation) {
                    return Err(self.anchored(RuntimeError::runtime(format!(
                        "block parameter `{}` expected {}, got {}",
                        param.name,
                        annotation.as_str(),
                        value.kind()
                    ))));
                }
            }
            env.define(param.name.as_str(), value);
        }

        let saved_env = std::mem::replace(&mut self.env, env);
        self.module_stack.push(block.module.clone());
        let result = self.eval_statements(&block.literal.body);
        self.module_stack.pop();
        self.env = saved_env;

        match result {
            Ok(value) => Ok(value),
            // A `return` inside a block ends the block, yielding its value.
            Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Break(_)) => Err(self
                .anchored(RuntimeError::runtime("break cannot cross call boundary"))),
            Err(Signal::Next(_)) => Err(self
                .anchored(RuntimeError::runtime("next cannot cross call boundary"))),
            Err(Signal::Error(err)) => Err(self.anchored(err)),
        }
    }

    /// Invokes `yield`'s target: the `__block__` binding of the current
    /// function.
    pub(crate) fn do_yield(&mut self, args: &[Value]) -> Result<Value, RuntimeError> {
        match self.env.get("__block__") {
            Some(Value::Block(block)) => self.invoke_block(&block, args),
            _ => Err(self.anchored(RuntimeError::runtime("no block given (yield)"))),
        }
    }

    /// Runs top-level statements, converting leftover control signals.
    pub(crate) fn run_toplevel(&mut self, statements: &[Statement]) -> Result<Value, RuntimeError> {
        match self.eval_statements(statements) {
            Ok(value) | Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Break(pos)) | Err(Signal::Next(pos)) => {
                self.position = pos;
                Err(self.anchored(RuntimeError::new(
                    ErrorKind::Runtime,
                    "break or next used outside of loop",
                )))
            }
            Err(Signal::Error(err)) => Err(self.anchored(err)),
        }
    }
}
