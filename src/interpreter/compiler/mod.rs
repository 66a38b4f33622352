//! Node Compiler
//!
//! Turns a syntax tree into a tree of thunks, exactly once per script load.
//! Each node kind has a builder that compiles its children up front and closes
//! over them; running a thunk never looks at the syntax tree again.
//!
//! ## Execution protocol
//!
//! A thunk returns a [`Completion`]: either a final [`Outcome`] or a
//! [`Resumable`](super::resumable::Resumable) that suspended partway. Builders
//! with children run their logic inside [`Completion::eager`], consuming every
//! child result through [`evaluate`] (or `.resolve().await`), so a suspension
//! anywhere below surfaces to whoever drives the outermost computation, and
//! evaluation that never suspends stays synchronous.

mod calls;
mod expressions;
mod functions;
mod objects;
mod patterns;
mod statements;

use std::rc::Rc;

use super::declarations::DeclarationTable;
use super::diagnostics::{self, Diagnostic};
use super::engine::Engine;
use super::scope::VarStore;
use super::types::{Completion, Control, Fault, Node, NodeKind, Position, Value};

pub use functions::ScriptFunction;

/// Compiled, invocable unit for one syntax node
pub type Thunk = Rc<dyn Fn(&Frame) -> Completion>;

/* ===================== Frames ===================== */

/// Activation context a thunk runs in
#[derive(Clone)]
pub struct Frame {
    pub engine: Engine,
    pub store: Rc<VarStore>,
    pub this: Value,
}

impl Frame {
    pub fn new(engine: Engine, store: Rc<VarStore>, this: Value) -> Self {
        Self {
            engine,
            store,
            this,
        }
    }

    /// Same activation, different innermost store
    pub fn with_store(&self, store: Rc<VarStore>) -> Self {
        Self {
            engine: self.engine.clone(),
            store,
            this: self.this.clone(),
        }
    }
}

/// Run a sub-thunk and produce its value, delegating to it if it suspends
pub(crate) async fn evaluate(thunk: &Thunk, frame: &Frame) -> Result<Value, Fault> {
    Ok(thunk(frame).resolve().await?.into_value())
}

pub(crate) fn constant(value: Value) -> Thunk {
    Rc::new(move |_: &Frame| Completion::value(value.clone()))
}

pub(crate) fn noop() -> Thunk {
    constant(Value::Undefined)
}

/* ===================== Property Keys ===================== */

/// Member key: precomputed when static, compiled when computed
pub(crate) enum Key {
    Static(Rc<str>),
    Computed(Thunk),
}

impl Key {
    pub(crate) async fn resolve(&self, frame: &Frame) -> Result<String, Fault> {
        match self {
            Key::Static(name) => Ok(name.to_string()),
            Key::Computed(thunk) => Ok(evaluate(thunk, frame).await?.to_property_key()),
        }
    }
}

/* ===================== Diagnostic Sites ===================== */

/// Static facts about a node, kept for runtime diagnostics
pub(crate) struct Site {
    pub path: Option<String>,
    pub position: Option<Position>,
}

impl Site {
    pub(crate) fn of(node: &Node) -> Self {
        Self {
            path: diagnostics::object_path(node),
            position: node.position(),
        }
    }

    pub(crate) fn report(&self, frame: &Frame, code: &'static str, message: String) {
        frame.engine.report(
            Diagnostic::new(code, message)
                .with_path(self.path.clone())
                .at(self.position),
        );
    }
}

/* ===================== Compiler ===================== */

pub struct Compiler<'e> {
    engine: &'e Engine,
    /// Declaration tables of the bodies currently being compiled, innermost last
    declarations: Vec<DeclarationTable>,
}

impl<'e> Compiler<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            declarations: vec![DeclarationTable::default()],
        }
    }

    /// Compile a program (or any node) and hand back the declarations found
    /// directly in its body alongside the thunk.
    pub fn compile_program(&mut self, node: &Node) -> (Thunk, DeclarationTable) {
        match &node.kind {
            NodeKind::Program { body } | NodeKind::BlockStatement { body } => {
                self.declarations.push(DeclarationTable::default());
                let statements = self.compile_statements(body);
                let table = Rc::new(self.declarations.pop().unwrap_or_default());
                let thunk = statements::block(table.clone(), statements);
                (thunk, (*table).clone())
            }
            _ => {
                let thunk = self.compile(node);
                (thunk, DeclarationTable::default())
            }
        }
    }

    /// Dispatch on the node kind to its builder
    pub fn compile(&mut self, node: &Node) -> Thunk {
        match &node.kind {
            /* ----- statements ----- */
            NodeKind::Program { body } | NodeKind::BlockStatement { body } => {
                self.compile_block(body, true)
            }
            NodeKind::EmptyStatement => noop(),
            NodeKind::ExpressionStatement { expression } => self.compile(expression),
            NodeKind::ReturnStatement { argument } => self.compile_return(argument.as_deref()),
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => self.compile_if(test, consequent, alternate.as_deref()),
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => self.compile_for(init.as_deref(), test.as_deref(), update.as_deref(), body),
            NodeKind::WhileStatement { test, body } => self.compile_while(test, body),
            NodeKind::DoWhileStatement { body, test } => self.compile_do_while(body, test),
            NodeKind::ForInStatement { left, right, body } => {
                self.compile_for_each(left, right, body, statements::Iteration::Keys)
            }
            NodeKind::ForOfStatement { left, right, body } => {
                self.compile_for_each(left, right, body, statements::Iteration::Values)
            }
            NodeKind::WithStatement { object, body } => self.compile_with(object, body),
            NodeKind::ThrowStatement { argument } => self.compile_throw(argument),
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => self.compile_try(block, handler.as_ref(), finalizer.as_deref()),
            NodeKind::BreakStatement { .. } => {
                Rc::new(|_: &Frame| Completion::Ready(Ok(Control::Break)))
            }
            NodeKind::ContinueStatement { .. } => {
                Rc::new(|_: &Frame| Completion::Ready(Ok(Control::Continue)))
            }
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            } => self.compile_switch(discriminant, cases),
            NodeKind::VariableDeclaration { declarations, .. } => {
                self.compile_variable_declaration(declarations)
            }
            NodeKind::FunctionDeclaration { id, params, body } => {
                self.compile_function_declaration(node, id.as_deref(), params, body)
            }

            /* ----- expressions ----- */
            NodeKind::Identifier { name } => self.compile_identifier(name),
            NodeKind::Literal { value } => self.compile_literal(node, value),
            NodeKind::TemplateLiteral {
                quasis,
                expressions,
            } => self.compile_template(quasis, expressions),
            NodeKind::ThisExpression => Rc::new(|frame: &Frame| Completion::value(frame.this.clone())),
            NodeKind::ArrayExpression { elements } => self.compile_array(elements),
            NodeKind::ObjectExpression { properties } => self.compile_object(properties),
            NodeKind::FunctionExpression { id, params, body } => {
                self.compile_function_expression(id.as_deref(), params, body)
            }
            NodeKind::ArrowFunctionExpression {
                params,
                body,
                expression,
            } => self.compile_arrow(params, body, *expression),
            NodeKind::UnaryExpression {
                operator, argument, ..
            } => self.compile_unary(node, operator, argument),
            NodeKind::UpdateExpression {
                operator,
                argument,
                prefix,
            } => self.compile_update(node, operator, argument, *prefix),
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => self.compile_binary(node, operator, left, right),
            NodeKind::LogicalExpression {
                operator,
                left,
                right,
            } => self.compile_logical(node, operator, left, right),
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            } => self.compile_assignment(node, operator, left, right),
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => self.compile_conditional(test, consequent, alternate),
            NodeKind::CallExpression {
                callee,
                arguments,
                optional,
            } => self.compile_call(node, callee, arguments, *optional, false),
            NodeKind::NewExpression { callee, arguments } => {
                self.compile_new(node, callee, arguments)
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                optional,
            } => self.compile_member(node, object, property, *computed, *optional, false),
            NodeKind::ChainExpression { expression } => self.compile_chain(expression),
            NodeKind::SequenceExpression { expressions } => self.compile_sequence(expressions),

            // Spread is only meaningful inside array, call and object literals
            NodeKind::Property { .. }
            | NodeKind::SpreadElement { .. }
            | NodeKind::ObjectPattern { .. }
            | NodeKind::ArrayPattern { .. }
            | NodeKind::AssignmentPattern { .. }
            | NodeKind::RestElement { .. }
            | NodeKind::Unsupported => self.unsupported(node),
        }
    }

    fn compile_statements(&mut self, body: &[Node]) -> Rc<Vec<Thunk>> {
        Rc::new(body.iter().map(|statement| self.compile(statement)).collect())
    }

    fn compile_key(&mut self, property: &Node, computed: bool) -> Key {
        if !computed {
            if let Some(name) = property.identifier_name() {
                return Key::Static(Rc::from(name));
            }
        }
        match &property.kind {
            NodeKind::Literal { value } => {
                Key::Static(Rc::from(Value::from_json(value).to_property_key()))
            }
            _ => Key::Computed(self.compile(property)),
        }
    }

    fn current_declarations(&mut self) -> &mut DeclarationTable {
        if self.declarations.is_empty() {
            self.declarations.push(DeclarationTable::default());
        }
        let last = self.declarations.len() - 1;
        &mut self.declarations[last]
    }

    /// Compile-time soft error
    fn report(&self, node: &Node, code: &'static str, message: impl Into<String>) {
        self.engine
            .report(Diagnostic::new(code, message).at(node.position()));
    }

    fn unsupported(&self, node: &Node) -> Thunk {
        self.report(
            node,
            diagnostics::UNSUPPORTED_SYNTAX,
            format!("Unsupported syntax node '{}'", node.kind.type_name()),
        );
        noop()
    }
}
