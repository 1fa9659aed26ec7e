//! Expression evaluation, including member access and auto-invoke.

use super::{Eval, Execution, Signal};
use crate::{
    builtins,
    error::RuntimeError,
    module,
    value::{operations, BuiltinFunction, ClassValue, FunctionValue, RangeValue, Value, VibeMap},
};
use std::rc::Rc;
use vibe_ast::{BinaryOp, CaseExpr, Expression};

/// A callable resolved from a member access, together with its receiver.
pub(crate) enum MemberCallable {
    /// A user-defined function or method.
    Function(Rc<FunctionValue>, Option<Value>),
    /// A host-implemented builtin.
    Builtin(Rc<BuiltinFunction>, Option<Value>),
    /// `Class.new`.
    Constructor(Rc<ClassValue>),
}

impl Execution {
    pub(crate) fn eval_expression(&mut self, expr: &Expression) -> Eval<Value> {
        self.step(expr.position())?;
        match self.eval_expression_inner(expr) {
            Err(Signal::Error(err)) => Err(Signal::Error(self.anchored(err))),
            other => other,
        }
    }

    fn eval_expression_inner(&mut self, expr: &Expression) -> Eval<Value> {
        match expr {
            Expression::Nil(_) => Ok(Value::Nil),
            Expression::Bool(value, _) => Ok(Value::Bool(*value)),
            Expression::Int(value, _) => Ok(Value::Int(*value)),
            Expression::Float(value, _) => Ok(Value::Float(*value)),
            Expression::StringLit(value, _) => Ok(Value::string(value.as_str())),
            Expression::SymbolLit(value, _) => Ok(Value::symbol(value.as_str())),
            Expression::Identifier(name, _) => self.eval_identifier(name),
            Expression::IVar(name, _) => self.eval_ivar(name),
            Expression::ClassVar(name, _) => self.eval_class_var(name),
            Expression::SelfExpr(_) => Ok(self.env.get("self").unwrap_or(Value::Nil)),
            Expression::ArrayLit(elements, _) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval_expression(element)?);
                }
                Ok(Value::array(items))
            }
            Expression::HashLit(entries, _) => {
                let mut map = VibeMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.eval_expression(value)?;
                    map.insert(key.as_str(), value);
                }
                Ok(Value::hash(map))
            }
            Expression::Range { start, end, .. } => {
                let start_value = self.eval_expression(start)?;
                let end_value = self.eval_expression(end)?;
                match (start_value, end_value) {
                    (Value::Int(start), Value::Int(end)) => {
                        Ok(Value::Range(Rc::new(RangeValue { start, end })))
                    }
                    (a, b) => Err(RuntimeError::runtime(format!(
                        "range bounds must be integers, got {} and {}",
                        a.kind(),
                        b.kind()
                    ))
                    .into()),
                }
            }
            Expression::Unary { op, operand, .. } => {
                let value = self.eval_expression(operand)?;
                Ok(operations::unary(*op, &value)?)
            }
            Expression::Binary { op, lhs, rhs, .. } => match op {
                BinaryOp::And => {
                    let lhs = self.eval_expression(lhs)?;
                    if !lhs.is_truthy() {
                        return Ok(lhs);
                    }
                    self.eval_expression(rhs)
                }
                BinaryOp::Or => {
                    let lhs = self.eval_expression(lhs)?;
                    if lhs.is_truthy() {
                        return Ok(lhs);
                    }
                    self.eval_expression(rhs)
                }
                _ => {
                    let lhs = self.eval_expression(lhs)?;
                    let rhs = self.eval_expression(rhs)?;
                    Ok(operations::binary(*op, &lhs, &rhs)?)
                }
            },
            Expression::Member { target, name, .. } => {
                let receiver = self.eval_expression(target)?;
                self.member_read(receiver, name)
            }
            Expression::Index { target, index, .. } => {
                let target = self.eval_expression(target)?;
                let index = self.eval_expression(index)?;
                Ok(self.index_read(&target, &index)?)
            }
            Expression::Call(call) => self.eval_call(call),
            Expression::Yield(args, _) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expression(arg)?);
                }
                Ok(self.do_yield(&values)?)
            }
            Expression::Case(case) => self.eval_case(case),
            Expression::Require { name, alias, .. } => {
                let name_value = self.eval_expression(name)?;
                let Value::String(module_name) = name_value else {
                    return Err(RuntimeError::runtime(format!(
                        "require expects a string module name, got {}",
                        name_value.kind()
                    ))
                    .into());
                };
                let alias_value = match alias {
                    Some(alias) => Some(self.eval_expression(alias)?),
                    None => None,
                };
                Ok(module::require(self, &module_name, alias_value.as_ref())?)
            }
        }
    }

    /// Identifier lookup: the lexical environment first, then the members
    /// of `self` when it is an instance or class.
    fn eval_identifier(&mut self, name: &str) -> Eval<Value> {
        if let Some(value) = self.env.get(name) {
            return self.auto_invoke(value, None);
        }
        match self.env.get("self") {
            Some(receiver @ (Value::Instance(_) | Value::Class(_))) => {
                self.member_read(receiver, name)
            }
            _ => Err(RuntimeError::runtime(format!("undefined variable `{name}`")).into()),
        }
    }

    fn eval_ivar(&mut self, name: &str) -> Eval<Value> {
        match self.env.get("self") {
            Some(Value::Instance(instance)) => Ok(instance
                .ivars
                .borrow()
                .get(name)
                .cloned()
                .unwrap_or(Value::Nil)),
            _ => Err(RuntimeError::runtime(format!(
                "instance variable `@{name}` used outside of an instance method"
            ))
            .into()),
        }
    }

    fn eval_class_var(&mut self, name: &str) -> Eval<Value> {
        let class = match self.env.get("self") {
            Some(Value::Instance(instance)) => instance.class.clone(),
            Some(Value::Class(class)) => class,
            _ => {
                return Err(RuntimeError::runtime(format!(
                    "class variable `@@{name}` used outside of a class"
                ))
                .into());
            }
        };
        let value = class.class_vars.borrow().get(name).cloned();
        Ok(value.unwrap_or(Value::Nil))
    }

    /// Member access in value position, applying the auto-invoke rule: a
    /// zero-parameter function or an auto-invoke builtin is called on mere
    /// reference.
    pub(crate) fn member_read(&mut self, receiver: Value, name: &str) -> Eval<Value> {
        match &receiver {
            Value::Instance(instance) => {
                if let Some(def) = instance.class.methods.get(name) {
                    if !def.params.is_empty() {
                        return Err(RuntimeError::runtime(format!(
                            "method `{name}` of {} expects arguments",
                            instance.class.name
                        ))
                        .into());
                    }
                    let func = FunctionValue {
                        def: def.clone(),
                        env: instance.class.env.clone(),
                        module: instance.class.module.clone(),
                    };
                    return Ok(self.call_function(
                        &func,
                        Some(receiver.clone()),
                        Vec::new(),
                        Vec::new(),
                        None,
                        self.position,
                    )?);
                }
                if let Some(value) = instance.ivars.borrow().get(name) {
                    return Ok(value.clone());
                }
                Err(RuntimeError::runtime(format!(
                    "undefined method `{name}` for {}",
                    instance.class.name
                ))
                .into())
            }
            Value::Class(class) => {
                if name == "new" {
                    return Ok(self.construct_instance(
                        class.clone(),
                        Vec::new(),
                        Vec::new(),
                        None,
                    )?);
                }
                if let Some(def) = class.class_methods.get(name) {
                    if !def.params.is_empty() {
                        return Err(RuntimeError::runtime(format!(
                            "class method `{name}` of {} expects arguments",
                            class.name
                        ))
                        .into());
                    }
                    let func = FunctionValue {
                        def: def.clone(),
                        env: class.env.clone(),
                        module: class.module.clone(),
                    };
                    return Ok(self.call_function(
                        &func,
                        Some(receiver.clone()),
                        Vec::new(),
                        Vec::new(),
                        None,
                        self.position,
                    )?);
                }
                if let Some(value) = class.class_vars.borrow().get(name) {
                    return Ok(value.clone());
                }
                Err(RuntimeError::runtime(format!(
                    "undefined method `{name}` for class {}",
                    class.name
                ))
                .into())
            }
            Value::Object(map) => {
                if let Some(value) = map.borrow().get(name).cloned() {
                    return self.auto_invoke(value, Some(receiver.clone()));
                }
                if let Some(builtin) = builtins::method(&receiver, name) {
                    return self.auto_invoke_builtin(builtin, receiver.clone());
                }
                Err(RuntimeError::runtime(format!("undefined attribute `{name}`")).into())
            }
            _ => {
                if let Some(builtin) = builtins::method(&receiver, name) {
                    return self.auto_invoke_builtin(builtin, receiver.clone());
                }
                Err(RuntimeError::runtime(format!(
                    "undefined method `{name}` for {}",
                    receiver.kind()
                ))
                .into())
            }
        }
    }

    /// Resolves a member access in call position without auto-invoking.
    pub(crate) fn resolve_member_callable(
        &mut self,
        receiver: &Value,
        name: &str,
    ) -> Result<MemberCallable, RuntimeError> {
        match receiver {
            Value::Instance(instance) => {
                if let Some(def) = instance.class.methods.get(name) {
                    let func = Rc::new(FunctionValue {
                        def: def.clone(),
                        env: instance.class.env.clone(),
                        module: instance.class.module.clone(),
                    });
                    return Ok(MemberCallable::Function(func, Some(receiver.clone())));
                }
                Err(RuntimeError::runtime(format!(
                    "undefined method `{name}` for {}",
                    instance.class.name
                )))
            }
            Value::Class(class) => {
                if name == "new" {
                    return Ok(MemberCallable::Constructor(class.clone()));
                }
                if let Some(def) = class.class_methods.get(name) {
                    let func = Rc::new(FunctionValue {
                        def: def.clone(),
                        env: class.env.clone(),
                        module: class.module.clone(),
                    });
                    return Ok(MemberCallable::Function(func, Some(receiver.clone())));
                }
                Err(RuntimeError::runtime(format!(
                    "undefined method `{name}` for class {}",
                    class.name
                )))
            }
            Value::Object(map) => {
                let attr = map.borrow().get(name).cloned();
                match attr {
                    Some(Value::Function(func)) => Ok(MemberCallable::Function(func, None)),
                    Some(Value::Builtin(builtin)) => {
                        Ok(MemberCallable::Builtin(builtin, Some(receiver.clone())))
                    }
                    Some(_) => Err(RuntimeError::runtime(
                        "attempted to call non-callable value",
                    )),
                    None => {
                        if let Some(builtin) = builtins::method(receiver, name) {
                            Ok(MemberCallable::Builtin(builtin, Some(receiver.clone())))
                        } else {
                            Err(RuntimeError::runtime(format!(
                                "undefined attribute `{name}`"
                            )))
                        }
                    }
                }
            }
            _ => {
                if let Some(builtin) = builtins::method(receiver, name) {
                    Ok(MemberCallable::Builtin(builtin, Some(receiver.clone())))
                } else {
                    Err(RuntimeError::runtime(format!(
                        "undefined method `{name}` for {}",
                        receiver.kind()
                    )))
                }
            }
        }
    }

    /// The auto-invoke rule for values reached by bare reference.
    pub(crate) fn auto_invoke(&mut self, value: Value, receiver: Option<Value>) -> Eval<Value> {
        match &value {
            Value::Function(func) if func.def.params.is_empty() => Ok(self.call_function(
                &func.clone(),
                receiver,
                Vec::new(),
                Vec::new(),
                None,
                self.position,
            )?),
            Value::Builtin(builtin) if builtin.auto_invoke => Ok(self.call_builtin(
                &builtin.clone(),
                receiver,
                Vec::new(),
                Vec::new(),
                None,
            )?),
            _ => Ok(value),
        }
    }

    fn auto_invoke_builtin(
        &mut self,
        builtin: Rc<BuiltinFunction>,
        receiver: Value,
    ) -> Eval<Value> {
        if builtin.auto_invoke {
            Ok(self.call_builtin(&builtin, Some(receiver), Vec::new(), Vec::new(), None)?)
        } else {
            Ok(Value::Builtin(builtin))
        }
    }

    pub(crate) fn index_read(
        &mut self,
        target: &Value,
        index: &Value,
    ) -> Result<Value, RuntimeError> {
        match target {
            Value::Array(items) => {
                let items = items.borrow();
                let Some(idx) = array_index(index, items.len())? else {
                    return Ok(Value::Nil);
                };
                Ok(items.get(idx).cloned().unwrap_or(Value::Nil))
            }
            Value::Hash(map) | Value::Object(map) => {
                let key = hash_key(index)?;
                Ok(map.borrow().get(&key).cloned().unwrap_or(Value::Nil))
            }
            other => Err(RuntimeError::runtime(format!(
                "cannot index {}",
                other.kind()
            ))),
        }
    }

    fn eval_case(&mut self, case: &CaseExpr) -> Eval<Value> {
        let subject = self.eval_expression(&case.subject)?;
        for clause in &case.whens {
            for candidate in &clause.values {
                let value = self.eval_expression(candidate)?;
                if operations::values_equal(&subject, &value) {
                    return self.eval_statements(&clause.body);
                }
            }
        }
        match &case.else_body {
            Some(body) => self.eval_statements(body),
            None => Ok(Value::Nil),
        }
    }
}

/// Resolves an array index value, supporting negative indices from the
/// end. Returns `None` for an out-of-range index.
pub(crate) fn array_index(index: &Value, len: usize) -> Result<Option<usize>, RuntimeError> {
    let Value::Int(raw) = index else {
        return Err(RuntimeError::runtime(format!(
            "array index must be an integer, got {}",
            index.kind()
        )));
    };
    let idx = if *raw < 0 {
        let from_end = raw.unsigned_abs() as usize;
        if from_end > len {
            return Ok(None);
        }
        len - from_end
    } else {
        *raw as usize
    };
    if idx >= len {
        return Ok(None);
    }
    Ok(Some(idx))
}

/// Converts an index value to a hash key.
pub(crate) fn hash_key(index: &Value) -> Result<Rc<str>, RuntimeError> {
    match index {
        Value::String(key) | Value::Symbol(key) => Ok(key.clone()),
        other => Err(RuntimeError::runtime(format!(
            "hash keys must be strings or symbols, got {}",
            other.kind()
        ))),
    }
}
