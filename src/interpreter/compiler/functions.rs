//! Script functions
//!
//! A function literal compiles once into a [`FunctionTemplate`]. Evaluating
//! the literal (or installing the declaration) instantiates the template as a
//! closure over the current store. Every call gets a fresh activation store.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use super::patterns::{BindMode, Binding, Target};
use super::{Compiler, Frame, Thunk};
use crate::interpreter::diagnostics;
use crate::interpreter::engine::Engine;
use crate::interpreter::scope::VarStore;
use crate::interpreter::types::{
    Arguments, Callable, Completion, Control, Fault, Node, NodeKind, ObjectRef, Outcome, Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Normal,
    Arrow,
    /// Arrow whose body is a bare expression
    ArrowExpression,
}

enum Parameter {
    Single(Binding),
    Rest(Target),
}

pub(crate) struct FunctionTemplate {
    name: Rc<str>,
    params: Vec<Parameter>,
    body: Thunk,
    kind: FunctionKind,
    /// Named function expressions can refer to themselves by name
    self_binding: bool,
}

impl FunctionTemplate {
    fn is_arrow(&self) -> bool {
        self.kind != FunctionKind::Normal
    }

    /// Create a closure over `frame`'s store
    pub(crate) fn instantiate(self: &Rc<Self>, frame: &Frame) -> Value {
        let scope = if self.self_binding {
            frame.store.activation()
        } else {
            frame.store.clone()
        };
        let function = ScriptFunction {
            template: self.clone(),
            scope: scope.clone(),
            this: self.is_arrow().then(|| frame.this.clone()),
        };
        let object = ObjectRef::function(Rc::new(function));
        if !self.is_arrow() {
            object.set("prototype", Value::object());
        }
        let value = Value::Object(object);
        if self.self_binding {
            scope.declare(&self.name, value.clone());
        }
        value
    }

    async fn bind_parameters(&self, frame: &Frame, args: &Arguments) -> Result<(), Fault> {
        for (index, param) in self.params.iter().enumerate() {
            match param {
                Parameter::Single(binding) => {
                    binding.bind(frame, args.get(index), BindMode::Declare).await?
                }
                Parameter::Rest(target) => {
                    target
                        .bind(frame, Value::array(args.rest(index)), BindMode::Declare)
                        .await?
                }
            }
        }
        Ok(())
    }
}

/* ===================== Script Function ===================== */

/// Callable closure produced from a function literal
pub struct ScriptFunction {
    template: Rc<FunctionTemplate>,
    scope: Rc<VarStore>,
    /// Captured receiver; arrows only
    this: Option<Value>,
}

impl Callable for ScriptFunction {
    fn name(&self) -> &str {
        &self.template.name
    }

    fn call(&self, engine: &Engine, this: Value, args: Arguments) -> Completion {
        if engine.call_depth_exceeded() {
            return Completion::fault(Fault::internal("Maximum call stack size exceeded"));
        }
        let template = self.template.clone();
        let frame = Frame::new(
            engine.clone(),
            self.scope.activation(),
            self.this.clone().unwrap_or(this),
        );
        if !template.is_arrow() {
            frame
                .store
                .declare("arguments", Value::array(args.as_slice().to_vec()));
        }

        let body = async move {
            template.bind_parameters(&frame, &args).await?;
            let result = (template.body)(&frame).resolve().await?;
            let value = match result {
                Control::Return(value) => value,
                Control::Normal(value) if template.kind == FunctionKind::ArrowExpression => value,
                _ => Value::Undefined,
            };
            Ok(Control::Normal(value))
        };
        Completion::eager(Nested {
            engine: engine.clone(),
            body: Box::pin(body),
        })
    }
}

/// A call body that counts toward the engine's call depth while it is polled
struct Nested {
    engine: Engine,
    body: Pin<Box<dyn Future<Output = Outcome>>>,
}

impl Future for Nested {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
        let this = self.get_mut();
        let _depth = this.engine.enter_call();
        this.body.as_mut().poll(cx)
    }
}

/* ===================== Builders ===================== */

impl Compiler<'_> {
    fn compile_function(
        &mut self,
        name: Option<&str>,
        params: &[Node],
        body: &Node,
        kind: FunctionKind,
        self_binding: bool,
    ) -> Rc<FunctionTemplate> {
        let params = params
            .iter()
            .map(|param| match &param.kind {
                NodeKind::RestElement { argument } => {
                    Parameter::Rest(self.compile_target(argument))
                }
                _ => Parameter::Single(self.compile_binding(param)),
            })
            .collect();
        let body = self.compile(body);

        Rc::new(FunctionTemplate {
            name: Rc::from(name.unwrap_or("anonymous")),
            params,
            body,
            kind,
            self_binding: self_binding && name.is_some(),
        })
    }

    pub(super) fn compile_function_declaration(
        &mut self,
        node: &Node,
        id: Option<&Node>,
        params: &[Node],
        body: &Node,
    ) -> Thunk {
        let Some(name) = id.and_then(Node::identifier_name) else {
            self.report(
                node,
                diagnostics::UNSUPPORTED_SYNTAX,
                "Function declaration without a name",
            );
            return super::noop();
        };
        let template = self.compile_function(Some(name), params, body, FunctionKind::Normal, false);
        self.current_declarations()
            .declare_function(name, Rc::new(move |frame: &Frame| template.instantiate(frame)));
        super::noop()
    }

    pub(super) fn compile_function_expression(
        &mut self,
        id: Option<&Node>,
        params: &[Node],
        body: &Node,
    ) -> Thunk {
        let name = id.and_then(Node::identifier_name);
        let template = self.compile_function(name, params, body, FunctionKind::Normal, true);
        Rc::new(move |frame: &Frame| Completion::value(template.instantiate(frame)))
    }

    pub(super) fn compile_arrow(
        &mut self,
        params: &[Node],
        body: &Node,
        expression: bool,
    ) -> Thunk {
        // Some parsers leave `expression` unset; the body kind decides
        let kind = if expression || !matches!(body.kind, NodeKind::BlockStatement { .. }) {
            FunctionKind::ArrowExpression
        } else {
            FunctionKind::Arrow
        };
        let template = self.compile_function(None, params, body, kind, false);
        Rc::new(move |frame: &Frame| Completion::value(template.instantiate(frame)))
    }
}
