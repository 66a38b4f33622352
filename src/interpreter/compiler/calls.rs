//! Call and `new` builders
//!
//! Method calls pass the member's object as the receiver. Bare calls pass the
//! caller's own `this`. When a method is missing on the current receiver (or
//! the engine's root receiver), a global function of the same name is called
//! with that receiver instead, so scripts attached to a host object can call
//! shared helpers as if they were methods.

use std::rc::Rc;

use super::expressions::short_circuit;
use super::objects::{evaluate_elements, ElementThunk};
use super::{evaluate, Compiler, Frame, Key, Site, Thunk};
use crate::interpreter::diagnostics;
use crate::interpreter::types::{
    Arguments, Completion, Control, Indexable, Node, NodeKind, ObjectRef, Value,
};

enum Callee {
    Member {
        object: Thunk,
        key: Key,
        optional: bool,
        site: Site,
    },
    Plain(Thunk),
}

struct CallSite {
    callee: Callee,
    arguments: Vec<ElementThunk>,
    optional: bool,
    chain: bool,
    site: Site,
    /// Callee text for messages
    name: String,
}

impl Compiler<'_> {
    pub(super) fn compile_call(
        &mut self,
        node: &Node,
        callee: &Node,
        arguments: &[Node],
        optional: bool,
        chain: bool,
    ) -> Thunk {
        let name = diagnostics::object_path(callee).unwrap_or_else(|| "expression".to_string());
        let callee = match &callee.kind {
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                optional: member_optional,
            } => Callee::Member {
                object: self.compile_chain_link(object, chain),
                key: self.compile_key(property, *computed),
                optional: *member_optional,
                site: Site::of(callee),
            },
            _ => Callee::Plain(self.compile_chain_link(callee, chain)),
        };
        let call = Rc::new(CallSite {
            callee,
            arguments: self.compile_elements(arguments),
            optional,
            chain,
            site: Site::of(node),
            name,
        });

        Rc::new(move |frame: &Frame| {
            let (call, frame) = (call.clone(), frame.clone());
            Completion::eager(async move {
                let (function, this) = match &call.callee {
                    Callee::Member {
                        object,
                        key,
                        optional,
                        site,
                    } => {
                        let target = evaluate(object, &frame).await?;
                        if *optional && target.is_nullish() {
                            return short_circuit(call.chain);
                        }
                        let key = key.resolve(&frame).await?;
                        if target.is_nullish() {
                            site.report(
                                &frame,
                                diagnostics::UNDEFINED_PROPERTY,
                                format!("Cannot read property '{}' of {}", key, target),
                            );
                            return Ok(Control::Normal(Value::Undefined));
                        }
                        let function = target
                            .get_property(&key)
                            .filter(|f| !f.is_undefined())
                            .or_else(|| fallback_method(&frame, &target, &key))
                            .unwrap_or_default();
                        (function, target)
                    }
                    Callee::Plain(callee) => (evaluate(callee, &frame).await?, frame.this.clone()),
                };

                if call.optional && function.is_nullish() {
                    return short_circuit(call.chain);
                }
                let args = evaluate_elements(&call.arguments, &frame).await?;
                let Some(callable) = function.callable() else {
                    call.site.report(
                        &frame,
                        diagnostics::NOT_CALLABLE,
                        format!("{} is not a function", call.name),
                    );
                    return Ok(Control::Normal(Value::Undefined));
                };
                let result = callable
                    .call(&frame.engine, this, Arguments::new(args))
                    .resolve()
                    .await?;
                Ok(Control::Normal(result.into_value()))
            })
        })
    }

    pub(super) fn compile_new(&mut self, node: &Node, callee: &Node, arguments: &[Node]) -> Thunk {
        let name = diagnostics::object_path(callee).unwrap_or_else(|| "expression".to_string());
        let site = Rc::new(Site::of(node));
        let callee = self.compile(callee);
        let arguments = Rc::new(self.compile_elements(arguments));

        Rc::new(move |frame: &Frame| {
            let (callee, arguments, site, name, frame) = (
                callee.clone(),
                arguments.clone(),
                site.clone(),
                name.clone(),
                frame.clone(),
            );
            Completion::eager(async move {
                let constructor = evaluate(&callee, &frame).await?;
                let args = evaluate_elements(&arguments, &frame).await?;
                let Some(callable) = constructor.callable() else {
                    site.report(
                        &frame,
                        diagnostics::NOT_CALLABLE,
                        format!("{} is not a constructor", name),
                    );
                    return Ok(Control::Normal(Value::Undefined));
                };

                let prototype = constructor
                    .get_property("prototype")
                    .and_then(|p| p.as_object().cloned());
                let instance = ObjectRef::plain().with_proto(prototype);
                let result = callable
                    .call(&frame.engine, Value::Object(instance.clone()), Arguments::new(args))
                    .resolve()
                    .await?
                    .into_value();
                // A constructor returning an object replaces the instance
                Ok(Control::Normal(match result {
                    Value::Object(_) => result,
                    _ => Value::Object(instance),
                }))
            })
        })
    }
}

/// Global function standing in for a method the receiver lacks
fn fallback_method(frame: &Frame, target: &Value, key: &str) -> Option<Value> {
    let object = target.as_object()?;
    let is_receiver = |candidate: &Value| {
        candidate
            .as_object()
            .is_some_and(|candidate| candidate.ptr_eq(object))
    };
    if !is_receiver(&frame.this) && !is_receiver(&frame.engine.root_this()) {
        return None;
    }
    let function = frame.engine.global().get(key)?;
    function.is_callable().then_some(function)
}
