//! Statement builders
//!
//! Sequencing constructs inspect each child's [`Control`] result: a block
//! stops at the first signal and hands it up, loops consume `Break` and
//! `Continue`, and function bodies consume `Return`.

use std::rc::Rc;

use super::patterns::{BindMode, Binding};
use super::{evaluate, noop, Compiler, Frame, Thunk};
use crate::interpreter::declarations::DeclarationTable;
use crate::interpreter::resumable::Suspend;
use crate::interpreter::types::ast::{CatchClause, SwitchCase, VariableDeclarator};
use crate::interpreter::types::{Completion, Control, Fault, Iterable, Node, NodeKind, Value};

/// What a `for-in`/`for-of` walks over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Iteration {
    Keys,
    Values,
}

/* ===================== Blocks ===================== */

/// Thunk for a statement list: install its declarations, then run in order
pub(super) fn block(table: Rc<DeclarationTable>, statements: Rc<Vec<Thunk>>) -> Thunk {
    Rc::new(move |frame: &Frame| {
        if !table.is_empty() {
            table.install(frame);
        }
        let (statements, frame) = (statements.clone(), frame.clone());
        Completion::eager(async move {
            let mut last = Value::Undefined;
            for statement in statements.iter() {
                match statement(&frame).resolve().await? {
                    Control::Normal(value) => last = value,
                    signal => return Ok(signal),
                }
            }
            Ok(Control::Normal(last))
        })
    })
}

/* ===================== Loop Helpers ===================== */

enum Flow {
    Next,
    Break,
    Exit(Control),
}

/// Fold one body result into the loop state
fn flow(control: Control, last: &mut Value) -> Flow {
    match control {
        Control::Normal(value) => {
            *last = value;
            Flow::Next
        }
        Control::Continue => Flow::Next,
        Control::Break => Flow::Break,
        signal @ Control::Return(_) => Flow::Exit(signal),
    }
}

/// Suspends a loop every `interval` iterations so a host budget can preempt it
struct Preemption {
    interval: usize,
    count: usize,
}

impl Preemption {
    fn new(frame: &Frame) -> Self {
        Self {
            interval: frame.engine.loop_yield_interval(),
            count: 0,
        }
    }

    async fn tick(&mut self) {
        if self.interval == 0 {
            return;
        }
        self.count += 1;
        if self.count % self.interval == 0 {
            Suspend::default().await;
        }
    }
}

/* ===================== Builders ===================== */

impl Compiler<'_> {
    /// Block with its own declaration table, or one whose declarations belong
    /// to the enclosing body
    pub(super) fn compile_block(&mut self, body: &[Node], own_table: bool) -> Thunk {
        if !own_table {
            let statements = self.compile_statements(body);
            return block(Rc::new(DeclarationTable::default()), statements);
        }
        self.declarations.push(DeclarationTable::default());
        let statements = self.compile_statements(body);
        let table = self.declarations.pop().unwrap_or_default();
        block(Rc::new(table), statements)
    }

    pub(super) fn compile_return(&mut self, argument: Option<&Node>) -> Thunk {
        let Some(argument) = argument else {
            return Rc::new(|_: &Frame| Completion::Ready(Ok(Control::Return(Value::Undefined))));
        };
        let argument = self.compile(argument);

        Rc::new(move |frame: &Frame| {
            let (argument, frame) = (argument.clone(), frame.clone());
            Completion::eager(async move {
                Ok(Control::Return(evaluate(&argument, &frame).await?))
            })
        })
    }

    pub(super) fn compile_if(
        &mut self,
        test: &Node,
        consequent: &Node,
        alternate: Option<&Node>,
    ) -> Thunk {
        let test = self.compile(test);
        let consequent = self.compile(consequent);
        let alternate = alternate.map(|node| self.compile(node));

        Rc::new(move |frame: &Frame| {
            let (test, consequent, alternate, frame) =
                (test.clone(), consequent.clone(), alternate.clone(), frame.clone());
            Completion::eager(async move {
                if evaluate(&test, &frame).await?.is_truthy() {
                    consequent(&frame).resolve().await
                } else if let Some(alternate) = alternate {
                    alternate(&frame).resolve().await
                } else {
                    Ok(Control::Normal(Value::Undefined))
                }
            })
        })
    }

    pub(super) fn compile_for(
        &mut self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> Thunk {
        let init = init.map(|node| self.compile(node));
        let test = test.map(|node| self.compile(node));
        let update = update.map(|node| self.compile(node));
        let body = self.compile(body);

        Rc::new(move |frame: &Frame| {
            let (init, test, update, body, frame) = (
                init.clone(),
                test.clone(),
                update.clone(),
                body.clone(),
                frame.clone(),
            );
            Completion::eager(async move {
                if let Some(init) = &init {
                    evaluate(init, &frame).await?;
                }
                let mut preemption = Preemption::new(&frame);
                let mut last = Value::Undefined;
                loop {
                    if let Some(test) = &test {
                        if !evaluate(test, &frame).await?.is_truthy() {
                            break;
                        }
                    }
                    match flow(body(&frame).resolve().await?, &mut last) {
                        Flow::Next => {}
                        Flow::Break => break,
                        Flow::Exit(signal) => return Ok(signal),
                    }
                    if let Some(update) = &update {
                        evaluate(update, &frame).await?;
                    }
                    preemption.tick().await;
                }
                Ok(Control::Normal(last))
            })
        })
    }

    pub(super) fn compile_while(&mut self, test: &Node, body: &Node) -> Thunk {
        let test = self.compile(test);
        let body = self.compile(body);

        Rc::new(move |frame: &Frame| {
            let (test, body, frame) = (test.clone(), body.clone(), frame.clone());
            Completion::eager(async move {
                let mut preemption = Preemption::new(&frame);
                let mut last = Value::Undefined;
                while evaluate(&test, &frame).await?.is_truthy() {
                    match flow(body(&frame).resolve().await?, &mut last) {
                        Flow::Next => {}
                        Flow::Break => break,
                        Flow::Exit(signal) => return Ok(signal),
                    }
                    preemption.tick().await;
                }
                Ok(Control::Normal(last))
            })
        })
    }

    pub(super) fn compile_do_while(&mut self, body: &Node, test: &Node) -> Thunk {
        let body = self.compile(body);
        let test = self.compile(test);

        Rc::new(move |frame: &Frame| {
            let (body, test, frame) = (body.clone(), test.clone(), frame.clone());
            Completion::eager(async move {
                let mut preemption = Preemption::new(&frame);
                let mut last = Value::Undefined;
                loop {
                    match flow(body(&frame).resolve().await?, &mut last) {
                        Flow::Next => {}
                        Flow::Break => break,
                        Flow::Exit(signal) => return Ok(signal),
                    }
                    if !evaluate(&test, &frame).await?.is_truthy() {
                        break;
                    }
                    preemption.tick().await;
                }
                Ok(Control::Normal(last))
            })
        })
    }

    pub(super) fn compile_for_each(
        &mut self,
        left: &Node,
        right: &Node,
        body: &Node,
        iteration: Iteration,
    ) -> Thunk {
        let binding = match &left.kind {
            NodeKind::VariableDeclaration { declarations, .. } => match declarations.first() {
                Some(declarator) => {
                    let binding = self.compile_binding(&declarator.id);
                    for name in binding.names() {
                        self.current_declarations().declare_var(&name);
                    }
                    binding
                }
                None => return self.unsupported(left),
            },
            _ => self.compile_binding(left),
        };
        let binding = Rc::new(binding);
        let right = self.compile(right);
        let body = self.compile(body);

        Rc::new(move |frame: &Frame| {
            let (binding, right, body, frame) =
                (binding.clone(), right.clone(), body.clone(), frame.clone());
            Completion::eager(async move {
                let source = evaluate(&right, &frame).await?;
                let items = match iteration {
                    Iteration::Keys => enumerable_keys(&source),
                    Iteration::Values => source.iterate().ok_or_else(|| {
                        Fault::internal(format!("{} is not iterable", source))
                    })?,
                };

                let mut preemption = Preemption::new(&frame);
                let mut last = Value::Undefined;
                for item in items {
                    binding.bind(&frame, item, BindMode::Assign).await?;
                    match flow(body(&frame).resolve().await?, &mut last) {
                        Flow::Next => {}
                        Flow::Break => break,
                        Flow::Exit(signal) => return Ok(signal),
                    }
                    preemption.tick().await;
                }
                Ok(Control::Normal(last))
            })
        })
    }

    pub(super) fn compile_with(&mut self, object: &Node, body: &Node) -> Thunk {
        let object = self.compile(object);
        // var declarations inside `with` belong to the enclosing body
        let body = match &body.kind {
            NodeKind::BlockStatement { body } => self.compile_block(body, false),
            _ => self.compile(body),
        };

        Rc::new(move |frame: &Frame| {
            let (object, body, frame) = (object.clone(), body.clone(), frame.clone());
            Completion::eager(async move {
                let target = evaluate(&object, &frame).await?;
                let Value::Object(scope) = target else {
                    return Err(Fault::internal(format!(
                        "Cannot use 'with' on {}",
                        target
                    )));
                };
                let inner = frame.with_store(frame.store.child(scope));
                body(&inner).resolve().await
            })
        })
    }

    pub(super) fn compile_throw(&mut self, argument: &Node) -> Thunk {
        let argument = self.compile(argument);

        Rc::new(move |frame: &Frame| {
            let (argument, frame) = (argument.clone(), frame.clone());
            Completion::eager(async move {
                let value = evaluate(&argument, &frame).await?;
                Err(Fault::Throw(value))
            })
        })
    }

    pub(super) fn compile_try(
        &mut self,
        block: &Node,
        handler: Option<&CatchClause>,
        finalizer: Option<&Node>,
    ) -> Thunk {
        let block = self.compile(block);
        let handler = handler.map(|clause| {
            Rc::new(Handler {
                param: clause.param.as_deref().map(|param| self.compile_binding(param)),
                body: self.compile(&clause.body),
            })
        });
        let finalizer = finalizer.map(|node| self.compile(node));

        Rc::new(move |frame: &Frame| {
            let (block, handler, finalizer, frame) =
                (block.clone(), handler.clone(), finalizer.clone(), frame.clone());
            Completion::eager(async move {
                let outcome = match (block(&frame).resolve().await, &handler) {
                    (Err(Fault::ShortCircuit), _) => Err(Fault::ShortCircuit),
                    (Err(fault), Some(handler)) => handler.run(&frame, fault.into_value()).await,
                    (outcome, _) => outcome,
                };
                if let Some(finalizer) = &finalizer {
                    // A signal or fault from `finally` replaces the pending result
                    match finalizer(&frame).resolve().await? {
                        Control::Normal(_) => {}
                        signal => return Ok(signal),
                    }
                }
                outcome
            })
        })
    }

    pub(super) fn compile_switch(&mut self, discriminant: &Node, cases: &[SwitchCase]) -> Thunk {
        let discriminant = self.compile(discriminant);

        self.declarations.push(DeclarationTable::default());
        let cases: Rc<Vec<Case>> = Rc::new(
            cases
                .iter()
                .map(|case| Case {
                    test: case.test.as_ref().map(|test| self.compile(test)),
                    body: case.consequent.iter().map(|s| self.compile(s)).collect(),
                })
                .collect(),
        );
        let table = Rc::new(self.declarations.pop().unwrap_or_default());

        Rc::new(move |frame: &Frame| {
            if !table.is_empty() {
                table.install(frame);
            }
            let (discriminant, cases, frame) = (discriminant.clone(), cases.clone(), frame.clone());
            Completion::eager(async move {
                let value = evaluate(&discriminant, &frame).await?;
                let mut start = None;
                for (index, case) in cases.iter().enumerate() {
                    if let Some(test) = &case.test {
                        if evaluate(test, &frame).await?.strict_equals(&value) {
                            start = Some(index);
                            break;
                        }
                    }
                }
                let Some(start) = start.or_else(|| cases.iter().position(|c| c.test.is_none()))
                else {
                    return Ok(Control::Normal(Value::Undefined));
                };

                let mut last = Value::Undefined;
                for case in &cases[start..] {
                    for statement in &case.body {
                        match statement(&frame).resolve().await? {
                            Control::Normal(value) => last = value,
                            Control::Break => return Ok(Control::Normal(last)),
                            signal => return Ok(signal),
                        }
                    }
                }
                Ok(Control::Normal(last))
            })
        })
    }

    pub(super) fn compile_variable_declaration(
        &mut self,
        declarations: &[VariableDeclarator],
    ) -> Thunk {
        let mut initializers = Vec::new();
        for declarator in declarations {
            let binding = self.compile_binding(&declarator.id);
            for name in binding.names() {
                self.current_declarations().declare_var(&name);
            }
            // Without an initializer the hoisted binding is all there is
            if let Some(init) = &declarator.init {
                let init = self.compile(init);
                initializers.push((binding, init));
            }
        }
        if initializers.is_empty() {
            return noop();
        }
        let initializers = Rc::new(initializers);

        Rc::new(move |frame: &Frame| {
            let (initializers, frame) = (initializers.clone(), frame.clone());
            Completion::eager(async move {
                for (binding, init) in initializers.iter() {
                    let value = evaluate(init, &frame).await?;
                    binding.bind(&frame, value, BindMode::Assign).await?;
                }
                Ok(Control::Normal(Value::Undefined))
            })
        })
    }
}

/* ===================== Try / Switch Parts ===================== */

struct Handler {
    param: Option<Binding>,
    body: Thunk,
}

impl Handler {
    /// Run the catch body with the exception bound, then put back whatever
    /// the param names were bound to before.
    async fn run(&self, frame: &Frame, exception: Value) -> Result<Control, Fault> {
        let Some(param) = &self.param else {
            return (self.body)(frame).resolve().await;
        };
        let saved: Vec<(Rc<str>, Option<Value>)> = param
            .names()
            .into_iter()
            .map(|name| {
                let prior = frame.store.own(&name);
                (name, prior)
            })
            .collect();

        let outcome = match param.bind(frame, exception, BindMode::Declare).await {
            Ok(()) => (self.body)(frame).resolve().await,
            Err(fault) => Err(fault),
        };

        for (name, prior) in saved {
            match prior {
                Some(value) => frame.store.declare(&name, value),
                None => {
                    frame.store.remove_own(&name);
                }
            }
        }
        outcome
    }
}

struct Case {
    test: Option<Thunk>,
    body: Vec<Thunk>,
}

/// Keys a `for-in` visits
fn enumerable_keys(source: &Value) -> Vec<Value> {
    match source {
        Value::Object(object) => object.enumerable_keys().into_iter().map(Value::from).collect(),
        Value::String(s) => (0..s.chars().count())
            .map(|index| Value::string(index.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}
