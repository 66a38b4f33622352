//! Declaration & Hot-Reload Manager
//!
//! Hoisting is install-if-absent: when a body is entered, each name it
//! declares gets a binding in the current store unless that store already
//! owns one. This is what lets a reloaded script keep the state of variables
//! it declared on an earlier load.
//!
//! The [`ScriptRegistry`] remembers which script class installed which global
//! function, so a class can be swapped out wholesale on reload.

use std::collections::HashMap;
use std::rc::Rc;

use super::compiler::Frame;
use super::types::Value;

/// Produces the value a declaration installs (a fresh closure for functions)
pub type Factory = Rc<dyn Fn(&Frame) -> Value>;

/* ===================== Declaration Table ===================== */

#[derive(Clone)]
enum Declared {
    Var,
    Function(Factory),
}

/// Names declared directly in one body, in declaration order
#[derive(Clone, Default)]
pub struct DeclarationTable {
    entries: Vec<(Rc<str>, Declared)>,
}

impl DeclarationTable {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| &**n == name)
    }

    /// Record a function declaration; a later one with the same name wins
    pub fn declare_function(&mut self, name: &str, factory: Factory) {
        match self.position(name) {
            Some(index) => self.entries[index].1 = Declared::Function(factory),
            None => self
                .entries
                .push((Rc::from(name), Declared::Function(factory))),
        }
    }

    /// Record a `var`; never displaces a function of the same name
    pub fn declare_var(&mut self, name: &str) {
        if self.position(name).is_none() {
            self.entries.push((Rc::from(name), Declared::Var));
        }
    }

    /// Install every entry the frame's store does not already own.
    ///
    /// Vars start as `undefined`; functions are instantiated as closures over
    /// the frame's store. Returns the names that were installed.
    pub fn install(&self, frame: &Frame) -> Vec<Rc<str>> {
        let mut installed = Vec::new();
        for (name, declared) in &self.entries {
            if frame.store.has_own(name) {
                continue;
            }
            let value = match declared {
                Declared::Var => Value::Undefined,
                Declared::Function(factory) => factory(frame),
            };
            frame.store.declare(name, value);
            installed.push(name.clone());
        }
        if !installed.is_empty() {
            tracing::trace!(count = installed.len(), "installed declarations");
        }
        installed
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| &**name)
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.position(name)
            .is_some_and(|index| matches!(self.entries[index].1, Declared::Function(_)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/* ===================== Script Registry ===================== */

/// Global functions installed by hot-reloadable scripts, keyed by name
#[derive(Default)]
pub struct ScriptRegistry {
    entries: HashMap<String, (Value, Rc<str>)>,
}

impl ScriptRegistry {
    /// Remember that `function` was installed under `name` by `label`
    pub fn tag(&mut self, name: &str, function: Value, label: &str) {
        self.entries
            .insert(name.to_string(), (function, Rc::from(label)));
    }

    pub fn label_of(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|(_, label)| &**label)
    }

    /// Names currently tagged with `label`, sorted
    pub fn names_in(&self, label: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, (_, l))| &**l == label)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Forget every entry tagged with `label` and hand them back
    pub fn take_class(&mut self, label: &str) -> Vec<(String, Value)> {
        let names = self.names_in(label);
        names
            .into_iter()
            .filter_map(|name| {
                self.entries
                    .remove(&name)
                    .map(|(function, _)| (name, function))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::Engine;

    fn factory(value: f64) -> Factory {
        Rc::new(move |_: &Frame| Value::Number(value))
    }

    #[test]
    fn test_later_function_overrides_earlier() {
        let mut table = DeclarationTable::default();
        table.declare_function("f", factory(1.0));
        table.declare_var("f");
        table.declare_function("f", factory(2.0));

        let engine = Engine::new();
        let frame = engine.root_frame();
        table.install(&frame);
        assert_eq!(engine.global().get_own("f"), Some(Value::Number(2.0)));
        assert_eq!(table.len(), 1);
        assert!(table.is_function("f"));
    }

    #[test]
    fn test_install_skips_owned_names() {
        let engine = Engine::new();
        engine.global().set("hp", Value::Number(42.0));

        let mut table = DeclarationTable::default();
        table.declare_var("hp");
        table.declare_var("mana");
        let installed = table.install(&engine.root_frame());

        assert_eq!(installed, vec![Rc::<str>::from("mana")]);
        assert_eq!(engine.global().get_own("hp"), Some(Value::Number(42.0)));
        assert_eq!(engine.global().get_own("mana"), Some(Value::Undefined));
    }

    #[test]
    fn test_registry_take_class() {
        let mut registry = ScriptRegistry::default();
        registry.tag("open", Value::Null, "shop");
        registry.tag("close", Value::Null, "shop");
        registry.tag("greet", Value::Null, "npc");

        assert_eq!(registry.names_in("shop"), vec!["close", "open"]);
        let taken = registry.take_class("shop");
        assert_eq!(taken.len(), 2);
        assert_eq!(registry.label_of("open"), None);
        assert_eq!(registry.label_of("greet"), Some("npc"));
    }
}
