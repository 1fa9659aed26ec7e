//! Statement evaluation: control flow, loops, exception handling and
//! assignment targets.

use super::{Eval, Execution, Signal};
use crate::{
    error::{ErrorKind, RuntimeError},
    value::{ClassValue, FunctionValue, Instance, Value, VibeMap},
};
use rustc_hash::FxHashMap;
use std::{cell::RefCell, rc::Rc, sync::Arc};
use vibe_ast::{
    AssignTarget, ClassDef, Expression, FunctionDef, IfStatement, RescueClause, RescueType,
    Statement, TryStatement,
};

impl Execution {
    /// Evaluates a statement list, producing the value of the last
    /// statement (or nil for an empty list).
    pub(crate) fn eval_statements(&mut self, statements: &[Statement]) -> Eval<Value> {
        let mut last = Value::Nil;
        for statement in statements {
            last = self.eval_statement(statement)?;
        }
        Ok(last)
    }

    pub(crate) fn eval_statement(&mut self, statement: &Statement) -> Eval<Value> {
        self.step(statement.position())?;
        match statement {
            Statement::Expression(expr) => self.eval_expression(expr),
            Statement::Return(value, _) => {
                let value = match value {
                    Some(expr) => self.eval_expression(expr)?,
                    None => Value::Nil,
                };
                Err(Signal::Return(value))
            }
            Statement::Raise(value, position) => {
                self.position = *position;
                self.eval_raise(value.as_ref())
            }
            Statement::Assign { target, value, .. } => {
                let value = self.eval_expression(value)?;
                self.eval_assign(target, value.clone())?;
                Ok(value)
            }
            Statement::If(stmt) => self.eval_if(stmt),
            Statement::While {
                condition, body, ..
            } => self.eval_loop(condition, body, false),
            Statement::Until {
                condition, body, ..
            } => self.eval_loop(condition, body, true),
            Statement::For {
                variable,
                iterable,
                body,
                ..
            } => self.eval_for(variable, iterable, body),
            Statement::Break(position) => Err(Signal::Break(*position)),
            Statement::Next(position) => Err(Signal::Next(*position)),
            Statement::Try(stmt) => self.eval_try(stmt),
            Statement::FunctionDecl(def) => {
                self.define_function(def);
                Ok(Value::Nil)
            }
            Statement::ClassDecl(def) => {
                self.define_class(def)?;
                Ok(Value::Nil)
            }
        }
    }

    pub(crate) fn define_function(&mut self, def: &FunctionDef) {
        let func = FunctionValue {
            def: Arc::new(def.clone()),
            env: self.env.clone(),
            module: self.current_module(),
        };
        self.env
            .define(def.name.as_str(), Value::Function(Rc::new(func)));
    }

    pub(crate) fn define_class(&mut self, def: &ClassDef) -> Eval<Value> {
        let mut methods = FxHashMap::default();
        for method in &def.methods {
            methods.insert(Rc::from(method.name.as_str()), Arc::new(method.clone()));
        }
        let mut class_methods = FxHashMap::default();
        for method in &def.class_methods {
            class_methods.insert(Rc::from(method.name.as_str()), Arc::new(method.clone()));
        }

        let mut class_vars = VibeMap::with_capacity(def.class_vars.len());
        for (name, init) in &def.class_vars {
            let value = self.eval_expression(init)?;
            class_vars.insert(name.as_str(), value);
        }

        let class = ClassValue {
            name: Rc::from(def.name.as_str()),
            methods,
            class_methods,
            class_vars: RefCell::new(class_vars),
            env: self.env.clone(),
            module: self.current_module(),
        };
        self.env
            .define(def.name.as_str(), Value::Class(Rc::new(class)));
        Ok(Value::Nil)
    }

    fn eval_raise(&mut self, value: Option<&Expression>) -> Eval<Value> {
        match value {
            Some(expr) => {
                let value = self.eval_expression(expr)?;
                Err(Signal::Error(self.error_from_value(&value)))
            }
            // A bare `raise` re-raises the error currently being rescued.
            None => match self.rescued.last() {
                Some(err) => Err(Signal::Error(err.clone())),
                None => Err(Signal::Error(self.anchored(RuntimeError::runtime(
                    "raise with no arguments is only valid inside rescue",
                )))),
            },
        }
    }

    /// Builds a runtime error from a raised value. Raising an error object
    /// caught by a rescue binding preserves its classification.
    fn error_from_value(&self, value: &Value) -> RuntimeError {
        let err = match value {
            Value::String(message) => RuntimeError::runtime(message.to_string()),
            Value::Object(map) => {
                let map = map.borrow();
                let message = map
                    .get("message")
                    .map(Value::to_string)
                    .unwrap_or_else(|| "runtime error".to_string());
                let kind = match map.get("type") {
                    Some(Value::String(t)) if &**t == ErrorKind::Assertion.name() => {
                        ErrorKind::Assertion
                    }
                    _ => ErrorKind::Runtime,
                };
                RuntimeError::new(kind, message)
            }
            other => RuntimeError::runtime(other.to_string()),
        };
        self.anchored(err)
    }

    fn eval_if(&mut self, stmt: &IfStatement) -> Eval<Value> {
        if self.eval_expression(&stmt.condition)?.is_truthy() {
            return self.eval_statements(&stmt.body);
        }
        for clause in &stmt.elsifs {
            if self.eval_expression(&clause.condition)?.is_truthy() {
                return self.eval_statements(&clause.body);
            }
        }
        match &stmt.else_body {
            Some(body) => self.eval_statements(body),
            None => Ok(Value::Nil),
        }
    }

    /// `while` and `until`: the condition is re-evaluated (and stepped)
    /// every round.
    fn eval_loop(&mut self, condition: &Expression, body: &[Statement], until: bool) -> Eval<Value> {
        loop {
            let test = self.eval_expression(condition)?.is_truthy();
            if test == until {
                return Ok(Value::Nil);
            }
            match self.eval_statements(body) {
                Ok(_) => {}
                Err(Signal::Break(_)) => return Ok(Value::Nil),
                Err(Signal::Next(_)) => {}
                Err(signal) => return Err(signal),
            }
        }
    }

    fn eval_for(&mut self, variable: &str, iterable: &Expression, body: &[Statement]) -> Eval<Value> {
        let iterable_value = self.eval_expression(iterable)?;
        let items: Vec<Value> = match &iterable_value {
            Value::Array(items) => items.borrow().clone(),
            Value::Range(range) => range.iter().map(Value::Int).collect(),
            other => {
                return Err(RuntimeError::runtime(format!(
                    "cannot iterate over {}",
                    other.kind()
                ))
                .into());
            }
        };

        for item in items {
            self.step(self.position)?;
            self.env.define(variable, item);
            match self.eval_statements(body) {
                Ok(_) => {}
                Err(Signal::Break(_)) => break,
                Err(Signal::Next(_)) => {}
                Err(signal) => return Err(signal),
            }
        }
        Ok(Value::Nil)
    }

    /// The try/rescue/ensure machine. An exception inside `ensure` replaces
    /// any prior outcome; a `return` inside `ensure` wins over a prior
    /// successful return.
    fn eval_try(&mut self, stmt: &TryStatement) -> Eval<Value> {
        let mut outcome = self.eval_statements(&stmt.body);

        if let Err(Signal::Error(err)) = &outcome {
            if let Some(clause) = find_rescue(&stmt.rescues, err.kind()) {
                let err = err.clone();
                outcome = self.eval_rescue(clause, err);
            }
        }

        if let Some(ensure_body) = &stmt.ensure {
            match self.eval_statements(ensure_body) {
                Ok(_) => {}
                ensure_outcome @ Err(_) => return ensure_outcome,
            }
        }
        outcome
    }

    fn eval_rescue(&mut self, clause: &RescueClause, err: RuntimeError) -> Eval<Value> {
        if let Some(binding) = &clause.binding {
            let mut map = VibeMap::with_capacity(2);
            map.insert("message", Value::string(err.message()));
            map.insert("type", Value::string(err.kind().name()));
            self.env.define(binding.as_str(), Value::object(map));
        }
        self.rescued.push(err);
        let result = self.eval_statements(&clause.body);
        self.rescued.pop();
        result
    }

    fn eval_assign(&mut self, target: &AssignTarget, value: Value) -> Eval<()> {
        match target {
            AssignTarget::Identifier(name, _) => {
                self.env.assign(name, value);
                Ok(())
            }
            AssignTarget::IVar(name, position) => {
                self.position = *position;
                match self.env.get("self") {
                    Some(Value::Instance(instance)) => {
                        instance.ivars.borrow_mut().insert(name.as_str(), value);
                        Ok(())
                    }
                    _ => Err(RuntimeError::runtime(format!(
                        "instance variable `@{name}` used outside of an instance method"
                    ))
                    .into()),
                }
            }
            AssignTarget::ClassVar(name, position) => {
                self.position = *position;
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
                class.class_vars.borrow_mut().insert(name.as_str(), value);
                Ok(())
            }
            AssignTarget::Member {
                target: target_expr,
                name,
                position,
            } => {
                let receiver = self.eval_expression(target_expr)?;
                self.position = *position;
                Ok(self.member_write(&receiver, name, value)?)
            }
            AssignTarget::Index {
                target: target_expr,
                index,
                position,
            } => {
                let receiver = self.eval_expression(target_expr)?;
                let index = self.eval_expression(index)?;
                self.position = *position;
                Ok(self.index_write(&receiver, &index, value)?)
            }
        }
    }

    /// Member writes on instances and classes prefer a `name=` setter; a
    /// getter without a setter makes the property read-only; otherwise the
    /// write goes straight to the variable storage.
    fn member_write(
        &mut self,
        receiver: &Value,
        name: &str,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let setter = format!("{name}=");
        match receiver {
            Value::Instance(instance) => {
                if let Some(def) = instance.class.methods.get(setter.as_str()) {
                    let func = FunctionValue {
                        def: def.clone(),
                        env: instance.class.env.clone(),
                        module: instance.class.module.clone(),
                    };
                    self.call_function(
                        &func,
                        Some(receiver.clone()),
                        vec![value],
                        Vec::new(),
                        None,
                        self.position,
                    )?;
                    return Ok(());
                }
                if instance.class.methods.contains_key(name) {
                    return Err(RuntimeError::runtime("cannot assign to read-only property"));
                }
                instance.ivars.borrow_mut().insert(name, value);
                Ok(())
            }
            Value::Class(class) => {
                if let Some(def) = class.class_methods.get(setter.as_str()) {
                    let func = FunctionValue {
                        def: def.clone(),
                        env: class.env.clone(),
                        module: class.module.clone(),
                    };
                    self.call_function(
                        &func,
                        Some(receiver.clone()),
                        vec![value],
                        Vec::new(),
                        None,
                        self.position,
                    )?;
                    return Ok(());
                }
                if class.class_methods.contains_key(name) {
                    return Err(RuntimeError::runtime("cannot assign to read-only property"));
                }
                class.class_vars.borrow_mut().insert(name, value);
                Ok(())
            }
            Value::Hash(map) | Value::Object(map) => {
                map.borrow_mut().insert(name, value);
                Ok(())
            }
            other => Err(RuntimeError::runtime(format!(
                "cannot assign member of {}",
                other.kind()
            ))),
        }
    }

    fn index_write(
        &mut self,
        receiver: &Value,
        index: &Value,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match receiver {
            Value::Array(items) => {
                let mut items = items.borrow_mut();
                let len = items.len();
                match super::expression::array_index(index, len)? {
                    Some(idx) => {
                        items[idx] = value;
                        Ok(())
                    }
                    None => {
                        // Appending one past the end is a push; anything
                        // further is a hole and fails.
                        if let Value::Int(raw) = index {
                            if *raw == len as i64 {
                                items.push(value);
                                return Ok(());
                            }
                        }
                        Err(RuntimeError::runtime(format!(
                            "index {index} out of bounds for array of length {len}"
                        )))
                    }
                }
            }
            Value::Hash(map) | Value::Object(map) => {
                let key = super::expression::hash_key(index)?;
                map.borrow_mut().insert(key, value);
                Ok(())
            }
            other => Err(RuntimeError::runtime(format!(
                "cannot index-assign {}",
                other.kind()
            ))),
        }
    }

    /// Builds an instance of `class` and runs its `initialize` method.
    pub(crate) fn construct_instance(
        &mut self,
        class: Rc<ClassValue>,
        args: Vec<Value>,
        kwargs: Vec<(Rc<str>, Value)>,
        block: Option<Value>,
    ) -> Result<Value, RuntimeError> {
        let instance = Value::Instance(Rc::new(Instance {
            class: class.clone(),
            ivars: RefCell::new(VibeMap::new()),
        }));
        if let Some(init) = class.methods.get("initialize") {
            let func = FunctionValue {
                def: init.clone(),
                env: class.env.clone(),
                module: class.module.clone(),
            };
            self.call_function(
                &func,
                Some(instance.clone()),
                args,
                kwargs,
                block,
                self.position,
            )?;
        } else if !args.is_empty() || !kwargs.is_empty() {
            return Err(RuntimeError::runtime(format!(
                "class {} has no initialize method but arguments were given",
                class.name
            )));
        }
        Ok(instance)
    }
}

fn find_rescue<'a>(
    rescues: &'a [RescueClause],
    kind: ErrorKind,
) -> Option<&'a RescueClause> {
    rescues.iter().find(|clause| {
        clause.types.is_empty()
            || clause.types.iter().any(|ty| match ty {
                RescueType::Runtime => true,
                RescueType::Assertion => kind == ErrorKind::Assertion,
            })
    })
}
