//! Binding patterns
//!
//! Parameters, `var` declarators, `for-in`/`for-of` heads, `catch` params and
//! destructuring assignments all bind through a [`Binding`]. Destructuring is
//! one level deep: elements of an object or array pattern must be plain
//! targets (optionally with a default). Anything deeper is reported and
//! skipped.

use std::rc::Rc;

use super::{evaluate, Compiler, Frame, Key, Site, Thunk};
use crate::interpreter::diagnostics;
use crate::interpreter::types::{Fault, Indexable, Iterable, Node, NodeKind, ObjectRef, Value};

/// Whether names are created in the current store or assigned through the
/// scope chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    Declare,
    Assign,
}

/// Single destination for a value
pub(crate) enum Target {
    Name(Rc<str>),
    Member { object: Thunk, key: Key, site: Site },
    /// Reported at compile time; binding is a no-op
    Skipped,
}

impl Target {
    pub(crate) async fn bind(&self, frame: &Frame, value: Value, mode: BindMode) -> Result<(), Fault> {
        match self {
            Target::Name(name) => {
                match mode {
                    BindMode::Declare => frame.store.declare(name, value),
                    BindMode::Assign => frame.store.assign(name, value),
                }
                Ok(())
            }
            Target::Member { object, key, site } => {
                let target = evaluate(object, frame).await?;
                let key = key.resolve(frame).await?;
                if !target.set_property(&key, value)? {
                    site.report(
                        frame,
                        diagnostics::INVALID_ASSIGNMENT,
                        format!("Cannot set property '{}' of {}", key, target),
                    );
                }
                Ok(())
            }
            Target::Skipped => Ok(()),
        }
    }

    fn name(&self) -> Option<&Rc<str>> {
        match self {
            Target::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Pattern element: a target plus its default
pub(crate) struct Element {
    target: Target,
    default: Option<Thunk>,
}

impl Element {
    async fn bind(&self, frame: &Frame, value: Value, mode: BindMode) -> Result<(), Fault> {
        let value = match (&self.default, value) {
            (Some(default), Value::Undefined) => evaluate(default, frame).await?,
            (_, value) => value,
        };
        self.target.bind(frame, value, mode).await
    }
}

pub(crate) enum Pattern {
    Target(Target),
    Object {
        properties: Vec<(Key, Element)>,
        rest: Option<Target>,
        site: Site,
    },
    Array {
        elements: Vec<Option<Element>>,
        rest: Option<Target>,
        site: Site,
    },
}

/// A compiled pattern with an optional top-level default
pub(crate) struct Binding {
    pattern: Pattern,
    default: Option<Thunk>,
}

impl Binding {
    pub(crate) async fn bind(
        &self,
        frame: &Frame,
        value: Value,
        mode: BindMode,
    ) -> Result<(), Fault> {
        let value = match (&self.default, value) {
            (Some(default), Value::Undefined) => evaluate(default, frame).await?,
            (_, value) => value,
        };

        match &self.pattern {
            Pattern::Target(target) => target.bind(frame, value, mode).await,
            Pattern::Object {
                properties,
                rest,
                site,
            } => {
                if value.is_nullish() {
                    site.report(
                        frame,
                        diagnostics::UNDEFINED_PROPERTY,
                        format!("Cannot destructure {}", value),
                    );
                }
                let mut used = Vec::with_capacity(properties.len());
                for (key, element) in properties {
                    let key = key.resolve(frame).await?;
                    let item = value.get_property(&key).unwrap_or_default();
                    element.bind(frame, item, mode).await?;
                    used.push(key);
                }
                if let Some(rest) = rest {
                    let remaining = ObjectRef::plain();
                    if let Some(source) = value.as_object() {
                        for key in source.own_keys() {
                            if !used.contains(&key) {
                                remaining.set(&key, source.get_own(&key).unwrap_or_default());
                            }
                        }
                    }
                    rest.bind(frame, Value::Object(remaining), mode).await?;
                }
                Ok(())
            }
            Pattern::Array {
                elements,
                rest,
                site,
            } => {
                let items = match value.iterate() {
                    Some(items) => items,
                    None => {
                        site.report(
                            frame,
                            diagnostics::UNDEFINED_PROPERTY,
                            format!("{} is not iterable", value),
                        );
                        Vec::new()
                    }
                };
                for (index, element) in elements.iter().enumerate() {
                    if let Some(element) = element {
                        let item = items.get(index).cloned().unwrap_or_default();
                        element.bind(frame, item, mode).await?;
                    }
                }
                if let Some(rest) = rest {
                    let tail = items.get(elements.len()..).unwrap_or_default().to_vec();
                    rest.bind(frame, Value::array(tail), mode).await?;
                }
                Ok(())
            }
        }
    }

    /// Names the pattern binds, in source order
    pub(crate) fn names(&self) -> Vec<Rc<str>> {
        let mut names = Vec::new();
        match &self.pattern {
            Pattern::Target(target) => names.extend(target.name().cloned()),
            Pattern::Object {
                properties, rest, ..
            } => {
                names.extend(properties.iter().filter_map(|(_, e)| e.target.name().cloned()));
                names.extend(rest.as_ref().and_then(Target::name).cloned());
            }
            Pattern::Array { elements, rest, .. } => {
                names.extend(
                    elements
                        .iter()
                        .flatten()
                        .filter_map(|e| e.target.name().cloned()),
                );
                names.extend(rest.as_ref().and_then(Target::name).cloned());
            }
        }
        names
    }
}

/* ===================== Compilation ===================== */

impl Compiler<'_> {
    pub(crate) fn compile_binding(&mut self, node: &Node) -> Binding {
        match &node.kind {
            NodeKind::AssignmentPattern { left, right } => {
                let pattern = self.compile_pattern(left);
                Binding {
                    pattern,
                    default: Some(self.compile(right)),
                }
            }
            _ => Binding {
                pattern: self.compile_pattern(node),
                default: None,
            },
        }
    }

    fn compile_pattern(&mut self, node: &Node) -> Pattern {
        match &node.kind {
            NodeKind::ObjectPattern { properties } => {
                let mut compiled = Vec::new();
                let mut rest = None;
                for property in properties {
                    match &property.kind {
                        NodeKind::Property {
                            key,
                            value,
                            computed,
                            ..
                        } => {
                            let key = self.compile_key(key, *computed);
                            compiled.push((key, self.compile_element(value)));
                        }
                        NodeKind::RestElement { argument } => {
                            rest = Some(self.compile_target(argument));
                        }
                        _ => self.report_nested(property),
                    }
                }
                Pattern::Object {
                    properties: compiled,
                    rest,
                    site: Site::of(node),
                }
            }
            NodeKind::ArrayPattern { elements } => {
                let mut compiled = Vec::new();
                let mut rest = None;
                for element in elements {
                    match element {
                        None => compiled.push(None),
                        Some(Node {
                            kind: NodeKind::RestElement { argument },
                            ..
                        }) => rest = Some(self.compile_target(argument)),
                        Some(element) => compiled.push(Some(self.compile_element(element))),
                    }
                }
                Pattern::Array {
                    elements: compiled,
                    rest,
                    site: Site::of(node),
                }
            }
            _ => Pattern::Target(self.compile_target(node)),
        }
    }

    fn compile_element(&mut self, node: &Node) -> Element {
        match &node.kind {
            NodeKind::AssignmentPattern { left, right } => Element {
                target: self.compile_target(left),
                default: Some(self.compile(right)),
            },
            _ => Element {
                target: self.compile_target(node),
                default: None,
            },
        }
    }

    pub(crate) fn compile_target(&mut self, node: &Node) -> Target {
        match &node.kind {
            NodeKind::Identifier { name } => Target::Name(Rc::from(name.as_str())),
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => Target::Member {
                object: self.compile(object),
                key: self.compile_key(property, *computed),
                site: Site::of(node),
            },
            _ => {
                self.report_nested(node);
                Target::Skipped
            }
        }
    }

    fn report_nested(&mut self, node: &Node) {
        self.report(
            node,
            diagnostics::UNSUPPORTED_PATTERN,
            format!(
                "Unsupported binding pattern '{}'; only one level of destructuring is supported",
                node.kind.type_name()
            ),
        );
    }
}
