//! Soft error reporting
//!
//! Semantic errors (reading through `undefined`, calling something that is not
//! a function, ...) never abort a script. They are formatted, logged, handed to
//! the host's error callback, and evaluation continues with `undefined`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::types::{Node, NodeKind, Position};

/* ===================== Diagnostic Codes ===================== */

pub const UNDEFINED_PROPERTY: &str = "UNDEFINED_PROPERTY";
pub const NOT_CALLABLE: &str = "NOT_CALLABLE";
pub const INVALID_DELETE: &str = "INVALID_DELETE";
pub const INVALID_ASSIGNMENT: &str = "INVALID_ASSIGNMENT";
pub const UNSUPPORTED_PATTERN: &str = "UNSUPPORTED_PATTERN";
pub const UNSUPPORTED_SYNTAX: &str = "UNSUPPORTED_SYNTAX";

/* ===================== Diagnostic ===================== */

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    /// Reconstructed expression text such as `npc.shop.open()`
    pub path: Option<String>,
    pub position: Option<Position>,
}

impl Diagnostic {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            position: None,
        }
    }

    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.path = path;
        self
    }

    pub fn at(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path)?;
        }
        if let Some(position) = &self.position {
            write!(f, " at line {}, column {}", position.line, position.column)?;
        }
        Ok(())
    }
}

/* ===================== Reporter ===================== */

pub type ErrorCallback = Box<dyn Fn(&str)>;

/// Delivers diagnostics to the host callback, if one is installed
#[derive(Default)]
pub struct Diagnostics {
    callback: RefCell<Option<Rc<dyn Fn(&str)>>>,
}

impl Diagnostics {
    pub fn new(callback: Option<ErrorCallback>) -> Self {
        Self {
            callback: RefCell::new(callback.map(Rc::from)),
        }
    }

    pub fn set_callback(&self, callback: Option<ErrorCallback>) {
        *self.callback.borrow_mut() = callback.map(Rc::from);
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        let text = diagnostic.to_string();
        tracing::warn!(code = diagnostic.code, "{}", text);
        // The callback may install a different one while it runs
        let callback = self.callback.borrow().clone();
        if let Some(callback) = callback {
            callback(&text);
        }
    }
}

/* ===================== Object Paths ===================== */

/// Rebuild the source text of a simple identifier/member/call chain.
///
/// Returns `None` as soon as the chain contains anything else (a literal
/// receiver, an arithmetic sub-expression, ...).
pub fn object_path(node: &Node) -> Option<String> {
    match &node.kind {
        NodeKind::Identifier { name } => Some(name.clone()),
        NodeKind::ThisExpression => Some("this".to_string()),
        NodeKind::MemberExpression {
            object,
            property,
            computed,
            optional,
        } => {
            let base = object_path(object)?;
            let dot = if *optional { "?." } else { "." };
            if !computed {
                let name = property.identifier_name()?;
                return Some(format!("{}{}{}", base, dot, name));
            }
            let key = match &property.kind {
                NodeKind::Literal { value } => value.to_string(),
                NodeKind::Identifier { name } => name.clone(),
                _ => return None,
            };
            let open = if *optional { "?.[" } else { "[" };
            Some(format!("{}{}{}]", base, open, key))
        }
        NodeKind::CallExpression { callee, .. } => Some(format!("{}()", object_path(callee)?)),
        NodeKind::ChainExpression { expression } => object_path(expression),
        _ => None,
    }
}
