//! Script library
//!
//! Loads script classes into an [`Engine`] through hot reload, keyed by class
//! name. A SHA-256 of the source is kept per class so reloading identical
//! source is a no-op.

use std::collections::HashMap;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::interpreter::types::NodeKind;
use crate::interpreter::{Engine, Node, Thunk};

/// Outcome of loading one class
#[derive(Clone)]
pub struct Loaded {
    /// Program thunk; running it executes the script's top-level statements
    pub program: Thunk,
    /// `false` when the source matched the previous load and nothing was recompiled
    pub changed: bool,
}

struct Entry {
    hash: String,
    program: Thunk,
}

pub struct ScriptLibrary {
    engine: Engine,
    scripts: HashMap<String, Entry>,
}

impl ScriptLibrary {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            scripts: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Load (or reload) `class` from ESTree JSON source
    pub fn load(&mut self, class: &str, source: &str) -> Result<Loaded> {
        let hash = content_hash(source);
        if let Some(entry) = self.scripts.get(class) {
            if entry.hash == hash {
                tracing::debug!(class, "script unchanged, skipping reload");
                return Ok(Loaded {
                    program: entry.program.clone(),
                    changed: false,
                });
            }
        }

        let tree = Node::from_json(source)?;
        let program = self.engine.compile_and_retag(&tree, class);
        self.scripts.insert(
            class.to_string(),
            Entry {
                hash,
                program: program.clone(),
            },
        );
        Ok(Loaded {
            program,
            changed: true,
        })
    }

    pub fn load_file(&mut self, class: &str, path: &Path) -> Result<Loaded> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load(class, &source)
    }

    /// Remove every global function `class` installed
    pub fn unload(&mut self, class: &str) -> bool {
        let empty = Node::new(NodeKind::Program { body: Vec::new() });
        self.engine.compile_and_retag(&empty, class);
        self.scripts.remove(class).is_some()
    }

    pub fn hash_of(&self, class: &str) -> Option<&str> {
        self.scripts.get(class).map(|entry| entry.hash.as_str())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }
}

fn content_hash(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Value;
    use serde_json::json;

    fn greeting_program(text: &str) -> String {
        json!({
            "type": "Program",
            "body": [{
                "type": "FunctionDeclaration",
                "id": {"type": "Identifier", "name": "greet"},
                "params": [],
                "body": {"type": "BlockStatement", "body": [{
                    "type": "ReturnStatement",
                    "argument": {"type": "Literal", "value": text}
                }]}
            }]
        })
        .to_string()
    }

    fn call_greet(engine: &Engine) -> Value {
        engine
            .call_global("greet", vec![])
            .run_until_done()
            .unwrap()
            .into_value()
    }

    #[test]
    fn test_unchanged_source_is_not_recompiled() {
        let mut library = ScriptLibrary::new(Engine::new());
        let source = greeting_program("hi");

        assert!(library.load("npc", &source).unwrap().changed);
        let first = library.engine().global().get_own("greet").unwrap();
        assert!(!library.load("npc", &source).unwrap().changed);
        let second = library.engine().global().get_own("greet").unwrap();
        assert!(first.strict_equals(&second));
    }

    #[test]
    fn test_changed_source_replaces_functions() {
        let mut library = ScriptLibrary::new(Engine::new());
        library.load("npc", &greeting_program("hi")).unwrap();
        assert_eq!(call_greet(library.engine()), Value::from("hi"));

        library.load("npc", &greeting_program("hello")).unwrap();
        assert_eq!(call_greet(library.engine()), Value::from("hello"));
        assert_eq!(library.engine().script_class_of("greet").as_deref(), Some("npc"));
    }

    #[test]
    fn test_unload_removes_class_functions() {
        let mut library = ScriptLibrary::new(Engine::new());
        library.load("npc", &greeting_program("hi")).unwrap();
        assert!(library.unload("npc"));
        assert!(library.engine().global().get_own("greet").is_none());
        assert_eq!(library.classes().count(), 0);
    }

    #[test]
    fn test_bad_json_is_a_syntax_error() {
        let mut library = ScriptLibrary::new(Engine::new());
        assert!(matches!(library.load("npc", "{not json"), Err(Error::Syntax(_))));
    }
}
