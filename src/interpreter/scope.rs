//! Scope Store
//!
//! A chain of binding frames. Each store's bindings live in an ordinary
//! object so that `with` can push an arbitrary object as a scope. The
//! outermost store's object is the global container.

use std::rc::Rc;

use super::types::{ObjectRef, Value};

pub struct VarStore {
    parent: Option<Rc<VarStore>>,
    vars: ObjectRef,
}

impl VarStore {
    /// Root store over the global container
    pub fn global(global: ObjectRef) -> Rc<Self> {
        Rc::new(Self {
            parent: None,
            vars: global,
        })
    }

    /// New innermost store whose bindings container is `vars`
    pub fn child(self: &Rc<Self>, vars: ObjectRef) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(self.clone()),
            vars,
        })
    }

    /// Child store with a fresh, empty bindings container
    pub fn activation(self: &Rc<Self>) -> Rc<Self> {
        self.child(ObjectRef::plain())
    }

    pub fn vars(&self) -> &ObjectRef {
        &self.vars
    }

    pub fn parent(&self) -> Option<&Rc<VarStore>> {
        self.parent.as_ref()
    }

    /// The global container at the end of the chain
    pub fn global_container(&self) -> &ObjectRef {
        let mut store = self;
        while let Some(parent) = &store.parent {
            store = parent;
        }
        &store.vars
    }

    /// First store in the chain that owns `name`
    fn owner(&self, name: &str) -> Option<&VarStore> {
        let mut store = self;
        loop {
            if store.vars.has_own(name) {
                return Some(store);
            }
            store = store.parent.as_deref()?;
        }
    }

    /// Read a binding; unresolved names fall through to the global container
    /// (including anything it inherits). `None` means bound nowhere.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self.owner(name) {
            Some(store) => store.vars.get_own(name),
            None => self.global_container().get(name),
        }
    }

    /// Write a binding in the first store that owns it.
    ///
    /// A name no store owns becomes a new binding on the global container
    /// (implicit global).
    pub fn assign(&self, name: &str, value: Value) {
        match self.owner(name) {
            Some(store) => store.vars.set(name, value),
            None => self.global_container().set(name, value),
        }
    }

    /// Create or overwrite an own binding in this store
    pub fn declare(&self, name: &str, value: Value) {
        self.vars.set(name, value);
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.vars.has_own(name)
    }

    pub fn own(&self, name: &str) -> Option<Value> {
        self.vars.get_own(name)
    }

    pub fn remove_own(&self, name: &str) -> Option<Value> {
        let previous = self.vars.get_own(name);
        self.vars.delete(name);
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outward() {
        let global = ObjectRef::plain();
        global.set("g", Value::Number(1.0));
        let root = VarStore::global(global);
        let outer = root.activation();
        outer.declare("x", Value::Number(2.0));
        let inner = outer.activation();

        assert_eq!(inner.lookup("x"), Some(Value::Number(2.0)));
        assert_eq!(inner.lookup("g"), Some(Value::Number(1.0)));
        assert_eq!(inner.lookup("missing"), None);
    }

    #[test]
    fn test_assign_mutates_owning_store() {
        let root = VarStore::global(ObjectRef::plain());
        let outer = root.activation();
        outer.declare("x", Value::Number(1.0));
        let inner = outer.activation();

        inner.assign("x", Value::Number(5.0));
        assert_eq!(outer.own("x"), Some(Value::Number(5.0)));
        assert!(!inner.has_own("x"));
    }

    #[test]
    fn test_unresolved_assignment_creates_global() {
        let global = ObjectRef::plain();
        let root = VarStore::global(global.clone());
        let inner = root.activation().activation();

        inner.assign("leaked", Value::from("yes"));
        assert_eq!(global.get_own("leaked"), Some(Value::from("yes")));
        assert_eq!(inner.lookup("leaked"), Some(Value::from("yes")));
    }

    #[test]
    fn test_shadowing_declaration() {
        let root = VarStore::global(ObjectRef::plain());
        root.declare("x", Value::Number(1.0));
        let inner = root.activation();
        inner.declare("x", Value::Number(2.0));

        assert_eq!(inner.lookup("x"), Some(Value::Number(2.0)));
        assert_eq!(root.lookup("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_object_as_scope() {
        let root = VarStore::global(ObjectRef::plain());
        let target = ObjectRef::plain();
        target.set("hp", Value::Number(10.0));
        let with_scope = root.child(target.clone());

        with_scope.assign("hp", Value::Number(9.0));
        assert_eq!(target.get_own("hp"), Some(Value::Number(9.0)));
    }
}
