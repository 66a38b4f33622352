//! Object and array literal builders

use std::rc::Rc;

use super::{evaluate, Compiler, Frame, Key, Thunk};
use crate::interpreter::diagnostics;
use crate::interpreter::types::{Completion, Control, Fault, Iterable, Node, NodeKind, ObjectRef, Value};

/// Array element or call argument, possibly spread
pub(super) enum ElementThunk {
    Single(Thunk),
    Spread(Thunk),
    Hole,
}

/// Evaluate elements left to right, flattening spreads
pub(super) async fn evaluate_elements(
    elements: &[ElementThunk],
    frame: &Frame,
) -> Result<Vec<Value>, Fault> {
    let mut values = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            ElementThunk::Single(thunk) => values.push(evaluate(thunk, frame).await?),
            ElementThunk::Spread(thunk) => {
                let source = evaluate(thunk, frame).await?;
                let items = source
                    .iterate()
                    .ok_or_else(|| Fault::internal(format!("{} is not iterable", source)))?;
                values.extend(items);
            }
            ElementThunk::Hole => values.push(Value::Undefined),
        }
    }
    Ok(values)
}

enum PropertyThunk {
    Value { key: Key, value: Thunk },
    Spread(Thunk),
}

impl Compiler<'_> {
    pub(super) fn compile_elements(&mut self, nodes: &[Node]) -> Vec<ElementThunk> {
        nodes.iter().map(|node| self.compile_element_thunk(Some(node))).collect()
    }

    fn compile_element_thunk(&mut self, node: Option<&Node>) -> ElementThunk {
        match node {
            None => ElementThunk::Hole,
            Some(Node {
                kind: NodeKind::SpreadElement { argument },
                ..
            }) => ElementThunk::Spread(self.compile(argument)),
            Some(node) => ElementThunk::Single(self.compile(node)),
        }
    }

    pub(super) fn compile_array(&mut self, elements: &[Option<Node>]) -> Thunk {
        let elements: Rc<Vec<ElementThunk>> = Rc::new(
            elements
                .iter()
                .map(|element| self.compile_element_thunk(element.as_ref()))
                .collect(),
        );

        Rc::new(move |frame: &Frame| {
            let (elements, frame) = (elements.clone(), frame.clone());
            Completion::eager(async move {
                let items = evaluate_elements(&elements, &frame).await?;
                let array = ObjectRef::array(items);
                frame.engine.notify_array_created(&array);
                Ok(Control::Normal(Value::Object(array)))
            })
        })
    }

    pub(super) fn compile_object(&mut self, properties: &[Node]) -> Thunk {
        let mut compiled = Vec::with_capacity(properties.len());
        for property in properties {
            match &property.kind {
                NodeKind::Property {
                    key,
                    value,
                    computed,
                    kind,
                    ..
                } => {
                    if kind != "init" {
                        self.report(
                            property,
                            diagnostics::UNSUPPORTED_SYNTAX,
                            format!("Property accessors ('{}') are not supported", kind),
                        );
                        continue;
                    }
                    compiled.push(PropertyThunk::Value {
                        key: self.compile_key(key, *computed),
                        value: self.compile(value),
                    });
                }
                NodeKind::SpreadElement { argument } => {
                    compiled.push(PropertyThunk::Spread(self.compile(argument)))
                }
                _ => {
                    self.unsupported(property);
                }
            }
        }
        let properties = Rc::new(compiled);

        Rc::new(move |frame: &Frame| {
            let (properties, frame) = (properties.clone(), frame.clone());
            Completion::eager(async move {
                let object = ObjectRef::plain();
                for property in properties.iter() {
                    match property {
                        PropertyThunk::Value { key, value } => {
                            let key = key.resolve(&frame).await?;
                            let value = evaluate(value, &frame).await?;
                            object.set(&key, value);
                        }
                        PropertyThunk::Spread(source) => {
                            copy_own_properties(&evaluate(source, &frame).await?, &object);
                        }
                    }
                }
                Ok(Control::Normal(Value::Object(object)))
            })
        })
    }
}

fn copy_own_properties(source: &Value, target: &ObjectRef) {
    match source {
        Value::Object(object) => {
            for key in object.own_keys() {
                target.set(&key, object.get_own(&key).unwrap_or_default());
            }
        }
        Value::String(s) => {
            for (index, ch) in s.chars().enumerate() {
                target.set(&index.to_string(), Value::string(ch.to_string()));
            }
        }
        _ => {}
    }
}
