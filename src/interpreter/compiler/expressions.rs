//! Expression builders
//!
//! Operands are evaluated left to right. Faults propagate with `?`; soft
//! errors are reported through the engine and evaluate to `undefined`.

use std::rc::Rc;

use super::patterns::{BindMode, Binding};
use super::{constant, evaluate, Compiler, Frame, Key, Site, Thunk};
use crate::interpreter::diagnostics;
use crate::interpreter::operators::{self, BinaryOp, LogicalOp};
use crate::interpreter::types::ast::TemplateElement;
use crate::interpreter::types::{Completion, Control, Fault, Indexable, Node, NodeKind, Value};

/* ===================== References ===================== */

/// Assignable location, compiled
pub(super) enum Reference {
    Name(Rc<str>),
    Member { object: Thunk, key: Key },
}

/// A reference after its object and key have been evaluated
pub(super) enum Resolved {
    Name(Rc<str>),
    Property(Value, String),
}

impl Reference {
    pub(super) async fn resolve(&self, frame: &Frame) -> Result<Resolved, Fault> {
        match self {
            Reference::Name(name) => Ok(Resolved::Name(name.clone())),
            Reference::Member { object, key } => {
                let target = evaluate(object, frame).await?;
                let key = key.resolve(frame).await?;
                Ok(Resolved::Property(target, key))
            }
        }
    }
}

impl Resolved {
    pub(super) fn get(&self, frame: &Frame, site: &Site) -> Value {
        match self {
            Resolved::Name(name) => frame.store.lookup(name).unwrap_or_default(),
            Resolved::Property(target, key) => {
                if target.is_nullish() {
                    site.report(
                        frame,
                        diagnostics::UNDEFINED_PROPERTY,
                        format!("Cannot read property '{}' of {}", key, target),
                    );
                    return Value::Undefined;
                }
                target.get_property(key).unwrap_or_default()
            }
        }
    }

    pub(super) fn set(&self, frame: &Frame, site: &Site, value: Value) -> Result<(), Fault> {
        match self {
            Resolved::Name(name) => frame.store.assign(name, value),
            Resolved::Property(target, key) => {
                if !target.set_property(key, value)? {
                    site.report(
                        frame,
                        diagnostics::INVALID_ASSIGNMENT,
                        format!("Cannot set property '{}' of {}", key, target),
                    );
                }
            }
        }
        Ok(())
    }
}

/// How an assignment combines the old value with the right-hand side
#[derive(Clone, Copy)]
enum AssignOp {
    Plain,
    Compound(BinaryOp),
    Logical(LogicalOp),
}

impl AssignOp {
    fn parse(operator: &str) -> Option<Self> {
        if operator == "=" {
            return Some(AssignOp::Plain);
        }
        if let Some(op) = operator.strip_suffix('=').and_then(LogicalOp::parse) {
            return Some(AssignOp::Logical(op));
        }
        operators::compound(operator).map(AssignOp::Compound)
    }
}

/* ===================== Builders ===================== */

impl Compiler<'_> {
    pub(super) fn compile_identifier(&mut self, name: &str) -> Thunk {
        let name: Rc<str> = Rc::from(name);
        // Unbound well-known names fall back to their usual values
        let fallback = match &*name {
            "NaN" => Value::Number(f64::NAN),
            "Infinity" => Value::Number(f64::INFINITY),
            _ => Value::Undefined,
        };
        Rc::new(move |frame: &Frame| {
            Completion::value(frame.store.lookup(&name).unwrap_or_else(|| fallback.clone()))
        })
    }

    pub(super) fn compile_literal(&mut self, node: &Node, value: &serde_json::Value) -> Thunk {
        if value.is_object() || value.is_array() {
            self.report(
                node,
                diagnostics::UNSUPPORTED_SYNTAX,
                "Regular expression and bigint literals are not supported",
            );
            return constant(Value::Undefined);
        }
        constant(Value::from_json(value))
    }

    pub(super) fn compile_template(
        &mut self,
        quasis: &[TemplateElement],
        expressions: &[Node],
    ) -> Thunk {
        let strings: Rc<Vec<String>> = Rc::new(
            quasis
                .iter()
                .map(|q| q.value.cooked.clone().unwrap_or_else(|| q.value.raw.clone()))
                .collect(),
        );
        let expressions: Rc<Vec<Thunk>> =
            Rc::new(expressions.iter().map(|e| self.compile(e)).collect());

        Rc::new(move |frame: &Frame| {
            let (strings, expressions, frame) = (strings.clone(), expressions.clone(), frame.clone());
            Completion::eager(async move {
                let mut text = String::new();
                for (index, chunk) in strings.iter().enumerate() {
                    text.push_str(chunk);
                    if let Some(expression) = expressions.get(index) {
                        text.push_str(&evaluate(expression, &frame).await?.to_display_string());
                    }
                }
                Ok(Control::Normal(Value::string(text)))
            })
        })
    }

    pub(super) fn compile_binary(
        &mut self,
        node: &Node,
        operator: &str,
        left: &Node,
        right: &Node,
    ) -> Thunk {
        if LogicalOp::parse(operator).is_some() {
            return self.compile_logical(node, operator, left, right);
        }
        let Some(op) = operators::binary(operator) else {
            self.report(
                node,
                diagnostics::UNSUPPORTED_SYNTAX,
                format!("Unsupported binary operator '{}'", operator),
            );
            return constant(Value::Undefined);
        };
        let left = self.compile(left);
        let right = self.compile(right);

        Rc::new(move |frame: &Frame| {
            let (left, right, frame) = (left.clone(), right.clone(), frame.clone());
            Completion::eager(async move {
                let l = evaluate(&left, &frame).await?;
                let r = evaluate(&right, &frame).await?;
                Ok(Control::Normal(op(&l, &r)?))
            })
        })
    }

    pub(super) fn compile_logical(
        &mut self,
        node: &Node,
        operator: &str,
        left: &Node,
        right: &Node,
    ) -> Thunk {
        let Some(op) = LogicalOp::parse(operator) else {
            self.report(
                node,
                diagnostics::UNSUPPORTED_SYNTAX,
                format!("Unsupported logical operator '{}'", operator),
            );
            return constant(Value::Undefined);
        };
        let left = self.compile(left);
        let right = self.compile(right);

        Rc::new(move |frame: &Frame| {
            let (left, right, frame) = (left.clone(), right.clone(), frame.clone());
            Completion::eager(async move {
                let l = evaluate(&left, &frame).await?;
                if op.short_circuits(&l) {
                    return Ok(Control::Normal(l));
                }
                Ok(Control::Normal(evaluate(&right, &frame).await?))
            })
        })
    }

    pub(super) fn compile_unary(&mut self, node: &Node, operator: &str, argument: &Node) -> Thunk {
        if operator == "delete" {
            return self.compile_delete(argument);
        }
        let Some(op) = operators::unary(operator) else {
            self.report(
                node,
                diagnostics::UNSUPPORTED_SYNTAX,
                format!("Unsupported unary operator '{}'", operator),
            );
            return constant(Value::Undefined);
        };
        let argument = self.compile(argument);

        Rc::new(move |frame: &Frame| {
            let (argument, frame) = (argument.clone(), frame.clone());
            Completion::eager(async move {
                let value = evaluate(&argument, &frame).await?;
                Ok(Control::Normal(op(&value)))
            })
        })
    }

    fn compile_delete(&mut self, argument: &Node) -> Thunk {
        match &argument.kind {
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                let site = Rc::new(Site::of(argument));
                let object = self.compile(object);
                let key = Rc::new(self.compile_key(property, *computed));

                Rc::new(move |frame: &Frame| {
                    let (object, key, site, frame) =
                        (object.clone(), key.clone(), site.clone(), frame.clone());
                    Completion::eager(async move {
                        let target = evaluate(&object, &frame).await?;
                        let key = key.resolve(&frame).await?;
                        if target.is_nullish() {
                            site.report(
                                &frame,
                                diagnostics::INVALID_DELETE,
                                format!("Cannot delete property '{}' of {}", key, target),
                            );
                            return Ok(Control::Normal(Value::Undefined));
                        }
                        Ok(Control::Normal(Value::Bool(target.delete_property(&key))))
                    })
                })
            }
            // Bindings cannot be deleted
            NodeKind::Identifier { .. } => constant(Value::Bool(false)),
            _ => {
                let argument = self.compile(argument);
                Rc::new(move |frame: &Frame| {
                    let (argument, frame) = (argument.clone(), frame.clone());
                    Completion::eager(async move {
                        evaluate(&argument, &frame).await?;
                        Ok(Control::Normal(Value::Bool(true)))
                    })
                })
            }
        }
    }

    pub(super) fn compile_update(
        &mut self,
        node: &Node,
        operator: &str,
        argument: &Node,
        prefix: bool,
    ) -> Thunk {
        let Some(delta) = operators::update_delta(operator) else {
            self.report(
                node,
                diagnostics::UNSUPPORTED_SYNTAX,
                format!("Unsupported update operator '{}'", operator),
            );
            return constant(Value::Undefined);
        };
        let Some(reference) = self.compile_reference(argument) else {
            return self.invalid_target(node);
        };
        let reference = Rc::new(reference);
        let site = Rc::new(Site::of(argument));

        Rc::new(move |frame: &Frame| {
            let (reference, site, frame) = (reference.clone(), site.clone(), frame.clone());
            Completion::eager(async move {
                let resolved = reference.resolve(&frame).await?;
                // Read-modify-write happens with no suspension in between
                let old = resolved.get(&frame, &site).to_number();
                let new = old + delta;
                resolved.set(&frame, &site, Value::Number(new))?;
                Ok(Control::Normal(Value::Number(if prefix { new } else { old })))
            })
        })
    }

    pub(super) fn compile_conditional(
        &mut self,
        test: &Node,
        consequent: &Node,
        alternate: &Node,
    ) -> Thunk {
        let test = self.compile(test);
        let consequent = self.compile(consequent);
        let alternate = self.compile(alternate);

        Rc::new(move |frame: &Frame| {
            let (test, consequent, alternate, frame) =
                (test.clone(), consequent.clone(), alternate.clone(), frame.clone());
            Completion::eager(async move {
                let branch = if evaluate(&test, &frame).await?.is_truthy() {
                    consequent
                } else {
                    alternate
                };
                Ok(Control::Normal(evaluate(&branch, &frame).await?))
            })
        })
    }

    pub(super) fn compile_sequence(&mut self, expressions: &[Node]) -> Thunk {
        let expressions: Rc<Vec<Thunk>> =
            Rc::new(expressions.iter().map(|e| self.compile(e)).collect());

        Rc::new(move |frame: &Frame| {
            let (expressions, frame) = (expressions.clone(), frame.clone());
            Completion::eager(async move {
                let mut last = Value::Undefined;
                for expression in expressions.iter() {
                    last = evaluate(expression, &frame).await?;
                }
                Ok(Control::Normal(last))
            })
        })
    }

    /* ===================== Member Access ===================== */

    /// Compile the object/callee of a chain link, keeping chain mode for
    /// nested member and call links.
    pub(super) fn compile_chain_link(&mut self, node: &Node, chain: bool) -> Thunk {
        if !chain {
            return self.compile(node);
        }
        match &node.kind {
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                optional,
            } => self.compile_member(node, object, property, *computed, *optional, true),
            NodeKind::CallExpression {
                callee,
                arguments,
                optional,
            } => self.compile_call(node, callee, arguments, *optional, true),
            _ => self.compile(node),
        }
    }

    pub(super) fn compile_member(
        &mut self,
        node: &Node,
        object: &Node,
        property: &Node,
        computed: bool,
        optional: bool,
        chain: bool,
    ) -> Thunk {
        let site = Rc::new(Site::of(node));
        let object = self.compile_chain_link(object, chain);
        let key = Rc::new(self.compile_key(property, computed));

        Rc::new(move |frame: &Frame| {
            let (object, key, site, frame) = (object.clone(), key.clone(), site.clone(), frame.clone());
            Completion::eager(async move {
                let target = evaluate(&object, &frame).await?;
                if optional && target.is_nullish() {
                    return short_circuit(chain);
                }
                let key = key.resolve(&frame).await?;
                let value = Resolved::Property(target, key).get(&frame, &site);
                Ok(Control::Normal(value))
            })
        })
    }

    pub(super) fn compile_chain(&mut self, expression: &Node) -> Thunk {
        let inner = self.compile_chain_link(expression, true);

        Rc::new(move |frame: &Frame| {
            let (inner, frame) = (inner.clone(), frame.clone());
            Completion::eager(async move {
                match inner(&frame).resolve().await {
                    Err(Fault::ShortCircuit) => Ok(Control::Normal(Value::Undefined)),
                    outcome => outcome,
                }
            })
        })
    }

    /* ===================== Assignment ===================== */

    pub(super) fn compile_assignment(
        &mut self,
        node: &Node,
        operator: &str,
        left: &Node,
        right: &Node,
    ) -> Thunk {
        let Some(op) = AssignOp::parse(operator) else {
            self.report(
                node,
                diagnostics::UNSUPPORTED_SYNTAX,
                format!("Unsupported assignment operator '{}'", operator),
            );
            return constant(Value::Undefined);
        };

        if let (AssignOp::Plain, NodeKind::ObjectPattern { .. } | NodeKind::ArrayPattern { .. }) =
            (op, &left.kind)
        {
            let binding = Rc::new(self.compile_binding(left));
            let right = self.compile(right);
            return destructuring_assignment(binding, right);
        }

        let Some(reference) = self.compile_reference(left) else {
            return self.invalid_target(node);
        };
        let reference = Rc::new(reference);
        let site = Rc::new(Site::of(left));
        let right = self.compile(right);

        Rc::new(move |frame: &Frame| {
            let (reference, site, right, frame) =
                (reference.clone(), site.clone(), right.clone(), frame.clone());
            Completion::eager(async move {
                let resolved = reference.resolve(&frame).await?;
                let value = match op {
                    AssignOp::Plain => evaluate(&right, &frame).await?,
                    AssignOp::Compound(op) => {
                        let old = resolved.get(&frame, &site);
                        let r = evaluate(&right, &frame).await?;
                        op(&old, &r)?
                    }
                    AssignOp::Logical(op) => {
                        let old = resolved.get(&frame, &site);
                        if op.short_circuits(&old) {
                            return Ok(Control::Normal(old));
                        }
                        evaluate(&right, &frame).await?
                    }
                };
                resolved.set(&frame, &site, value.clone())?;
                Ok(Control::Normal(value))
            })
        })
    }

    /// Identifier or member target; `None` for anything else
    pub(super) fn compile_reference(&mut self, node: &Node) -> Option<Reference> {
        match &node.kind {
            NodeKind::Identifier { name } => Some(Reference::Name(Rc::from(name.as_str()))),
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                let object = self.compile(object);
                let key = self.compile_key(property, *computed);
                Some(Reference::Member { object, key })
            }
            _ => None,
        }
    }

    fn invalid_target(&mut self, node: &Node) -> Thunk {
        self.report(
            node,
            diagnostics::INVALID_ASSIGNMENT,
            "Invalid assignment target",
        );
        constant(Value::Undefined)
    }
}

fn destructuring_assignment(binding: Rc<Binding>, right: Thunk) -> Thunk {
    Rc::new(move |frame: &Frame| {
        let (binding, right, frame) = (binding.clone(), right.clone(), frame.clone());
        Completion::eager(async move {
            let value = evaluate(&right, &frame).await?;
            binding.bind(&frame, value.clone(), BindMode::Assign).await?;
            Ok(Control::Normal(value))
        })
    })
}

/// Result of an optional link whose base is nullish
pub(super) fn short_circuit(chain: bool) -> Result<Control, Fault> {
    if chain {
        Err(Fault::ShortCircuit)
    } else {
        Ok(Control::Normal(Value::Undefined))
    }
}
