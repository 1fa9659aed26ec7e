//! Call evaluation and dispatch.
//!
//! Resolution captures the receiver for member callees, arguments evaluate
//! left-to-right with keywords in source order, and the memory roots of the
//! whole call shape are walked before dispatch so quota overruns surface
//! before the callee runs.

use super::{expression::MemberCallable, CallFrame, Eval, Execution, Invocation, Signal};
use crate::{
    capability,
    environment::Environment,
    error::RuntimeError,
    value::{BlockValue, BuiltinFunction, FunctionValue, Value},
};
use std::rc::Rc;
use vibe_ast::{CallExpr, Expression, Position};

impl Execution {
    pub(crate) fn eval_call(&mut self, call: &CallExpr) -> Eval<Value> {
        // Resolve the callee, capturing the receiver of member calls.
        let resolved = match &*call.callee {
            Expression::Member { target, name, .. } => {
                let receiver = self.eval_expression(target)?;
                self.resolve_member_callable(&receiver, name)
                    .map_err(Signal::from)?
            }
            Expression::Identifier(name, _) => self.resolve_identifier_callable(name)?,
            other => {
                let value = self.eval_expression(other)?;
                match value {
                    Value::Function(func) => MemberCallable::Function(func, None),
                    Value::Builtin(builtin) => MemberCallable::Builtin(builtin, None),
                    _ => {
                        return Err(RuntimeError::runtime(
                            "attempted to call non-callable value",
                        )
                        .into());
                    }
                }
            }
        };

        // Positional arguments, then keywords, in source order.
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.eval_expression(arg)?);
        }
        let mut kwargs: Vec<(Rc<str>, Value)> = Vec::with_capacity(call.kwargs.len());
        for (name, expr) in &call.kwargs {
            let value = self.eval_expression(expr)?;
            kwargs.push((Rc::from(name.as_str()), value));
        }

        // The block literal captures its environment and the module context
        // in effect at the call site.
        let block = call.block.as_ref().map(|literal| {
            Value::Block(Rc::new(BlockValue {
                literal: Rc::new(literal.clone()),
                env: self.env.clone(),
                module: self.current_module(),
            }))
        });

        let position = call.position;
        match resolved {
            MemberCallable::Function(func, receiver) => {
                Ok(self.call_function(&func, receiver, args, kwargs, block, position)?)
            }
            MemberCallable::Builtin(builtin, receiver) => {
                Ok(self.call_builtin(&builtin, receiver, args, kwargs, block)?)
            }
            MemberCallable::Constructor(class) => {
                Ok(self.construct_instance(class, args, kwargs, block)?)
            }
        }
    }

    fn resolve_identifier_callable(&mut self, name: &str) -> Eval<MemberCallable> {
        if let Some(value) = self.env.get(name) {
            return match value {
                Value::Function(func) => Ok(MemberCallable::Function(func, None)),
                Value::Builtin(builtin) => Ok(MemberCallable::Builtin(builtin, None)),
                // `Foo(…)` is not a constructor call; `Foo.new(…)` stays
                // the one way in.
                Value::Class(_) => Err(RuntimeError::runtime(
                    "attempted to call non-callable value",
                )
                .into()),
                Value::Block(_) => Err(RuntimeError::runtime(
                    "blocks can only be invoked with yield",
                )
                .into()),
                _ => Err(RuntimeError::runtime(
                    "attempted to call non-callable value",
                )
                .into()),
            };
        }
        // Fall back to a method on `self`, mirroring identifier reads.
        match self.env.get("self") {
            Some(receiver @ (Value::Instance(_) | Value::Class(_))) => self
                .resolve_member_callable(&receiver, name)
                .map_err(Signal::from),
            _ => Err(RuntimeError::runtime(format!("undefined function `{name}`")).into()),
        }
    }

    /// Invokes a user-defined function: fresh environment over the
    /// function's lexical parent, `self` and `__block__` bindings,
    /// parameter binding with defaults and type enforcement, and the
    /// recursion-cap check before the frame is pushed.
    pub(crate) fn call_function(
        &mut self,
        func: &FunctionValue,
        receiver: Option<Value>,
        args: Vec<Value>,
        kwargs: Vec<(Rc<str>, Value)>,
        block: Option<Value>,
        call_position: Position,
    ) -> Result<Value, RuntimeError> {
        let limit = self.engine.limits.recursion_limit;
        if self.call_stack.len() >= limit {
            return Err(self.anchored(RuntimeError::runtime(format!(
                "recursion depth exceeded (limit {limit})"
            ))));
        }

        // Call-boundary memory walk over the whole call shape.
        {
            let mut roots: Vec<&Value> = Vec::with_capacity(args.len() + kwargs.len() + 2);
            roots.extend(receiver.as_ref());
            roots.extend(args.iter());
            roots.extend(kwargs.iter().map(|(_, v)| v));
            roots.extend(block.as_ref());
            self.check_memory(&roots)?;
        }

        let def = &func.def;
        let env = Environment::with_parent(func.env.clone());
        if let Some(receiver) = receiver {
            env.define("self", receiver);
        }
        env.define("__block__", block.unwrap_or(Value::Nil));

        if args.len() > def.params.len() {
            return Err(self.anchored(RuntimeError::runtime(format!(
                "too many arguments for `{}` (expected {}, got {})",
                def.name,
                def.params.len(),
                args.len()
            ))));
        }
        for (name, _) in &kwargs {
            if !def.params.iter().any(|param| param.name == **name) {
                return Err(self.anchored(RuntimeError::runtime(format!(
                    "unknown keyword argument `{name}` for `{}`",
                    def.name
                ))));
            }
        }

        // Bind parameters; defaults evaluate inside the new environment.
        let saved_env = std::mem::replace(&mut self.env, env);
        let bound = self.bind_params(def, &args, &kwargs);
        if let Err(err) = bound {
            self.env = saved_env;
            return Err(self.anchored(err));
        }

        self.call_stack.push(CallFrame {
            name: Rc::from(def.name.as_str()),
            call_position: Some(call_position),
            module_key: func.module.key.clone(),
        });
        self.module_stack.push(func.module.clone());

        let result = self.eval_statements(&def.body);

        self.module_stack.pop();
        self.call_stack.pop();
        self.env = saved_env;

        let value = match result {
            Ok(value) | Err(Signal::Return(value)) => value,
            Err(Signal::Break(_)) => {
                return Err(self
                    .anchored(RuntimeError::runtime("break cannot cross call boundary")));
            }
            Err(Signal::Next(_)) => {
                return Err(
                    self.anchored(RuntimeError::runtime("next cannot cross call boundary"))
                );
            }
            Err(Signal::Error(err)) => return Err(self.anchored(err)),
        };

        if let Some(annotation) = def.return_type {
            if !value.matches_annotation(annotation) {
                return Err(self.anchored(RuntimeError::runtime(format!(
                    "return value of `{}` expected {}, got {}",
                    def.name,
                    annotation.as_str(),
                    value.kind()
                ))));
            }
        }
        Ok(value)
    }

    fn bind_params(
        &mut self,
        def: &vibe_ast::FunctionDef,
        args: &[Value],
        kwargs: &[(Rc<str>, Value)],
    ) -> Result<(), RuntimeError> {
        for (index, param) in def.params.iter().enumerate() {
            let value = if let Some(arg) = args.get(index) {
                arg.clone()
            } else if let Some((_, value)) =
                kwargs.iter().find(|(name, _)| **name == *param.name)
            {
                value.clone()
            } else if let Some(default) = &param.default {
                match self.eval_expression(default) {
                    Ok(value) => value,
                    Err(signal) => return Err(signal.into_runtime()),
                }
            } else {
                return Err(RuntimeError::runtime(format!(
                    "missing argument `{}` for `{}`",
                    param.name, def.name
                )));
            };

            if let Some(annotation) = param.type_annotation {
                if !value.matches_annotation(annotation) {
                    return Err(RuntimeError::runtime(format!(
                        "parameter `{}` of `{}` expected {}, got {}",
                        param.name,
                        def.name,
                        annotation.as_str(),
                        value.kind()
                    )));
                }
            }
            self.env.define(param.name.as_str(), value);
        }
        Ok(())
    }

    /// Invokes a builtin, running the capability contract machinery around
    /// it when the call scope declares contracts.
    pub(crate) fn call_builtin(
        &mut self,
        builtin: &Rc<BuiltinFunction>,
        receiver: Option<Value>,
        args: Vec<Value>,
        kwargs: Vec<(Rc<str>, Value)>,
        block: Option<Value>,
    ) -> Result<Value, RuntimeError> {
        // Call-boundary memory walk.
        {
            let mut roots: Vec<&Value> = Vec::with_capacity(args.len() + kwargs.len() + 2);
            roots.extend(receiver.as_ref());
            roots.extend(args.iter());
            roots.extend(kwargs.iter().map(|(_, v)| v));
            roots.extend(block.as_ref());
            self.check_memory(&roots)?;
        }

        let scoped = !self.contracts.is_empty();
        let snapshot = if scoped {
            Some(capability::snapshot_builtins(
                &self.contracts,
                receiver.as_ref(),
                &args,
                &kwargs,
            ))
        } else {
            None
        };

        if let Some(contract) = self.contracts.contract_for(builtin) {
            contract
                .check_args(&builtin.name, &args, &kwargs, block.as_ref())
                .map_err(|err| self.anchored(err))?;
        }

        let func = builtin.func.clone();
        let invocation = Invocation {
            receiver: receiver.as_ref(),
            args: &args,
            kwargs: &kwargs,
            block: block.as_ref(),
        };
        let result = func(self, invocation).map_err(|err| self.anchored(err))?;

        if let Some(contract) = self.contracts.contract_for(builtin) {
            contract
                .check_return(&builtin.name, &result)
                .map_err(|err| self.anchored(err))?;
        }

        // Post-call rescan: bind declared contracts to any builtins this
        // call published (factory objects, mutated receiver graphs).
        if let Some(snapshot) = snapshot {
            capability::rescan_builtins(
                &mut self.contracts,
                &snapshot,
                receiver.as_ref(),
                &args,
                &kwargs,
                Some(&result),
            );
        }

        Ok(result)
    }
}

