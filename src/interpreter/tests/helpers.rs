//! Test helpers for interpreter tests
//!
//! ESTree node builders (as `serde_json::Value`) and a harness that compiles
//! and drives programs while recording diagnostics.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{json, Value as J};

use crate::interpreter::{Completion, Engine, Node, Outcome, Resumable, Step, Value};

/* ===================== Node Builders ===================== */

pub fn program(body: Vec<J>) -> J {
    json!({"type": "Program", "body": body})
}

pub fn block(body: Vec<J>) -> J {
    json!({"type": "BlockStatement", "body": body})
}

pub fn expr(expression: J) -> J {
    json!({"type": "ExpressionStatement", "expression": expression})
}

pub fn ident(name: &str) -> J {
    json!({"type": "Identifier", "name": name})
}

pub fn num(n: f64) -> J {
    json!({"type": "Literal", "value": n})
}

pub fn string(s: &str) -> J {
    json!({"type": "Literal", "value": s})
}

pub fn boolean(b: bool) -> J {
    json!({"type": "Literal", "value": b})
}

pub fn null() -> J {
    json!({"type": "Literal", "value": null})
}

pub fn this() -> J {
    json!({"type": "ThisExpression"})
}

pub fn bin(operator: &str, left: J, right: J) -> J {
    json!({"type": "BinaryExpression", "operator": operator, "left": left, "right": right})
}

pub fn logical(operator: &str, left: J, right: J) -> J {
    json!({"type": "LogicalExpression", "operator": operator, "left": left, "right": right})
}

pub fn unary(operator: &str, argument: J) -> J {
    json!({"type": "UnaryExpression", "operator": operator, "argument": argument, "prefix": true})
}

pub fn update(operator: &str, argument: J, prefix: bool) -> J {
    json!({"type": "UpdateExpression", "operator": operator, "argument": argument, "prefix": prefix})
}

pub fn assign(target: J, value: J) -> J {
    assign_op("=", target, value)
}

pub fn assign_op(operator: &str, target: J, value: J) -> J {
    json!({"type": "AssignmentExpression", "operator": operator, "left": target, "right": value})
}

/// `name = value;` as a statement
pub fn set(name: &str, value: J) -> J {
    expr(assign(ident(name), value))
}

pub fn var(name: &str, init: Option<J>) -> J {
    var_pattern(ident(name), init)
}

pub fn var_pattern(id: J, init: Option<J>) -> J {
    json!({
        "type": "VariableDeclaration",
        "kind": "var",
        "declarations": [{"type": "VariableDeclarator", "id": id, "init": init}]
    })
}

pub fn member(object: J, property: &str) -> J {
    json!({"type": "MemberExpression", "object": object, "property": ident(property), "computed": false})
}

pub fn index(object: J, property: J) -> J {
    json!({"type": "MemberExpression", "object": object, "property": property, "computed": true})
}

pub fn optional_member(object: J, property: &str) -> J {
    json!({
        "type": "MemberExpression", "object": object, "property": ident(property),
        "computed": false, "optional": true
    })
}

pub fn chain(expression: J) -> J {
    json!({"type": "ChainExpression", "expression": expression})
}

pub fn call(callee: J, arguments: Vec<J>) -> J {
    json!({"type": "CallExpression", "callee": callee, "arguments": arguments})
}

pub fn optional_call(callee: J, arguments: Vec<J>) -> J {
    json!({"type": "CallExpression", "callee": callee, "arguments": arguments, "optional": true})
}

/// `name(args)`
pub fn call_named(name: &str, arguments: Vec<J>) -> J {
    call(ident(name), arguments)
}

/// `object.name(args)`
pub fn method(object: J, name: &str, arguments: Vec<J>) -> J {
    call(member(object, name), arguments)
}

pub fn new(callee: J, arguments: Vec<J>) -> J {
    json!({"type": "NewExpression", "callee": callee, "arguments": arguments})
}

pub fn spread(argument: J) -> J {
    json!({"type": "SpreadElement", "argument": argument})
}

pub fn array(elements: Vec<J>) -> J {
    json!({"type": "ArrayExpression", "elements": elements})
}

pub fn object(properties: Vec<(&str, J)>) -> J {
    let properties: Vec<J> = properties
        .into_iter()
        .map(|(key, value)| property(ident(key), value))
        .collect();
    json!({"type": "ObjectExpression", "properties": properties})
}

pub fn property(key: J, value: J) -> J {
    json!({"type": "Property", "key": key, "value": value, "computed": false, "kind": "init"})
}

pub fn params(names: &[&str]) -> Vec<J> {
    names.iter().map(|name| ident(name)).collect()
}

pub fn function(name: &str, params: Vec<J>, body: Vec<J>) -> J {
    json!({"type": "FunctionDeclaration", "id": ident(name), "params": params, "body": block(body)})
}

pub fn function_expr(name: Option<&str>, params: Vec<J>, body: Vec<J>) -> J {
    json!({
        "type": "FunctionExpression",
        "id": name.map(ident),
        "params": params,
        "body": block(body)
    })
}

pub fn arrow(params: Vec<J>, body: J) -> J {
    json!({"type": "ArrowFunctionExpression", "params": params, "body": body, "expression": true})
}

pub fn ret(argument: J) -> J {
    json!({"type": "ReturnStatement", "argument": argument})
}

pub fn if_(test: J, consequent: J, alternate: Option<J>) -> J {
    json!({"type": "IfStatement", "test": test, "consequent": consequent, "alternate": alternate})
}

pub fn while_(test: J, body: J) -> J {
    json!({"type": "WhileStatement", "test": test, "body": body})
}

pub fn for_(init: J, test: J, update: J, body: J) -> J {
    json!({"type": "ForStatement", "init": init, "test": test, "update": update, "body": body})
}

pub fn for_of(left: J, right: J, body: J) -> J {
    json!({"type": "ForOfStatement", "left": left, "right": right, "body": body})
}

pub fn for_in(left: J, right: J, body: J) -> J {
    json!({"type": "ForInStatement", "left": left, "right": right, "body": body})
}

pub fn brk() -> J {
    json!({"type": "BreakStatement", "label": null})
}

pub fn cont() -> J {
    json!({"type": "ContinueStatement", "label": null})
}

pub fn throw(argument: J) -> J {
    json!({"type": "ThrowStatement", "argument": argument})
}

pub fn try_catch(body: Vec<J>, param: Option<&str>, handler: Vec<J>) -> J {
    json!({
        "type": "TryStatement",
        "block": block(body),
        "handler": {"param": param.map(ident), "body": block(handler)},
        "finalizer": null
    })
}

pub fn try_finally(body: Vec<J>, finalizer: Vec<J>) -> J {
    json!({"type": "TryStatement", "block": block(body), "handler": null, "finalizer": block(finalizer)})
}

/// Attach a source location
pub fn at(mut node: J, line: u32, column: u32) -> J {
    node["loc"] = json!({"start": {"line": line, "column": column}, "end": {"line": line, "column": column}});
    node
}

/* ===================== Harness ===================== */

/// Engine plus a record of every diagnostic it reported
pub struct Harness {
    pub engine: Engine,
    messages: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    pub fn new() -> Self {
        let messages = Rc::new(RefCell::new(Vec::new()));
        let sink = messages.clone();
        let engine = Engine::with_error_callback(move |message| {
            sink.borrow_mut().push(message.to_string());
        });
        Self { engine, messages }
    }

    /// Harness whose global container starts with `globals`
    pub fn with_globals(globals: HashMap<&str, Value>) -> Self {
        let harness = Self::new();
        for (name, value) in globals {
            harness.define(name, value);
        }
        harness
    }

    pub fn node(tree: J) -> Node {
        serde_json::from_value(tree).expect("valid ESTree JSON")
    }

    /// Compile and run to completion without counting suspensions
    pub fn run(&self, tree: J) -> Outcome {
        let thunk = self.engine.compile(&Self::node(tree));
        self.engine.run(&thunk).run_until_done()
    }

    /// Run, expecting success, and return the completion value
    pub fn eval(&self, tree: J) -> Value {
        self.run(tree).expect("program faulted").into_value()
    }

    /// Run while counting how many times the host had to step
    pub fn run_counting(&self, tree: J) -> (Outcome, usize) {
        let thunk = self.engine.compile(&Self::node(tree));
        drive(self.engine.run(&thunk))
    }

    pub fn global(&self, name: &str) -> Value {
        self.engine.global().get_own(name).unwrap_or_default()
    }

    pub fn define(&self, name: &str, value: Value) {
        self.engine.define_global(name, value);
    }

    /// `pause()` suspends once and returns its first argument
    pub fn with_pause(self) -> Self {
        self.define(
            "pause",
            Value::native("pause", |_, _, args| Resumable::yield_then(1, args.get(0))),
        );
        self
    }

    /// `bump()` counts its invocations into the returned cell
    pub fn with_counter(&self, name: &str) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        self.define(
            name,
            Value::native(name, move |_, _, _| {
                counter.set(counter.get() + 1);
                Completion::value(Value::Number(counter.get() as f64))
            }),
        );
        count
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

/// Step a completion to the end; returns the outcome and the host step count
pub fn drive(completion: Completion) -> (Outcome, usize) {
    match completion {
        Completion::Ready(outcome) => (outcome, 0),
        Completion::Pending(mut resumable) => {
            let mut steps = 0;
            loop {
                steps += 1;
                if let Step::Done(outcome) = resumable.step() {
                    return (outcome, steps);
                }
            }
        }
    }
}

pub fn n(value: f64) -> Value {
    Value::Number(value)
}
