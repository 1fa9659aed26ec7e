//! Lexical environments.
//!
//! An environment is one frame of a parent-linked chain of name→value
//! bindings. Frames are shared (`Rc`) because closures and module exports
//! capture them; interior mutability keeps `define` usable through the
//! shared handle.

use crate::value::Value;
use rustc_hash::FxHashMap;
use std::{cell::RefCell, rc::Rc};

/// One frame of the lexical chain.
#[derive(Debug, Default)]
pub struct Environment {
    parent: Option<Rc<Environment>>,
    bindings: RefCell<FxHashMap<Rc<str>, Value>>,
}

impl Environment {
    /// Creates a root frame with no parent.
    #[must_use]
    pub fn new_root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Creates a child frame.
    #[must_use]
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(parent),
            bindings: RefCell::default(),
        })
    }

    /// The parent frame, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Rc<Environment>> {
        self.parent.as_ref()
    }

    /// Creates or replaces a binding in this frame.
    pub fn define(&self, name: impl Into<Rc<str>>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Looks a name up, walking parent frames.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Whether a binding exists in this frame only.
    #[must_use]
    pub fn has_local(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Whether a binding exists anywhere in the chain.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.has_local(name) || self.parent.as_ref().is_some_and(|p| p.has(name))
    }

    /// Assigns to the nearest existing binding; on a complete miss, defines
    /// the name in this frame. Assignment inside a function body therefore
    /// creates a function-local binding rather than reaching the top level.
    pub fn assign(&self, name: &str, value: Value) {
        if self.try_assign(name, &value) {
            return;
        }
        self.define(name, value);
    }

    fn try_assign(&self, name: &str, value: &Value) -> bool {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(name) {
            *slot = value.clone();
            return true;
        }
        self.parent
            .as_ref()
            .is_some_and(|parent| parent.try_assign(name, value))
    }

    /// Visits every binding in this frame (not parents), for root walks.
    pub fn for_each_local<F: FnMut(&Rc<str>, &Value)>(&self, mut f: F) {
        for (name, value) in self.bindings.borrow().iter() {
            f(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_up_the_chain() {
        let root = Environment::new_root();
        root.define("a", Value::Int(1));
        let child = Environment::with_parent(root);
        assert_eq!(child.get("a"), Some(Value::Int(1)));
        assert_eq!(child.get("b"), None);
    }

    #[test]
    fn assign_updates_the_defining_frame() {
        let root = Environment::new_root();
        root.define("a", Value::Int(1));
        let child = Environment::with_parent(root.clone());
        child.assign("a", Value::Int(2));
        assert_eq!(root.get("a"), Some(Value::Int(2)));
        assert!(!child.has_local("a"));
    }

    #[test]
    fn assign_falls_through_to_a_local_define() {
        let root = Environment::new_root();
        let child = Environment::with_parent(root.clone());
        child.assign("fresh", Value::Int(3));
        assert!(child.has_local("fresh"));
        assert!(!root.has("fresh"));
    }
}
