//! Tests for soft error reporting

use super::helpers::*;
use crate::interpreter::{Engine, Value};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_undefined_property_reports_path_and_position() {
    // var npc = {}; npc.shop.name; var after = 1;
    let h = Harness::new();
    h.run(program(vec![
        var("npc", Some(object(vec![]))),
        expr(at(member(member(ident("npc"), "shop"), "name"), 3, 4)),
        var("after", Some(num(1.0))),
    ]))
    .unwrap();

    assert_eq!(
        h.messages(),
        vec!["Cannot read property 'name' of undefined (npc.shop.name) at line 3, column 4"]
    );
    assert_eq!(h.global("after"), n(1.0));
}

#[test]
fn test_calling_a_missing_method_reports() {
    // var npc = {}; var r = npc.open(1);
    let h = Harness::new();
    h.run(program(vec![
        var("npc", Some(object(vec![]))),
        var("r", Some(method(ident("npc"), "open", vec![num(1.0)]))),
    ]))
    .unwrap();

    assert_eq!(h.messages(), vec!["npc.open is not a function (npc.open())"]);
    assert_eq!(h.global("r"), Value::Undefined);
}

#[test]
fn test_calling_through_undefined_receiver_reports_once() {
    // npc.shop.open();
    let h = Harness::new();
    h.define("npc", Value::object());
    h.run(program(vec![expr(method(
        member(ident("npc"), "shop"),
        "open",
        vec![],
    ))]))
    .unwrap();

    let messages = h.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Cannot read property 'open' of undefined"));
    assert!(messages[0].contains("(npc.shop.open)"));
}

#[test]
fn test_arguments_are_evaluated_before_the_callable_check() {
    // notAFunction(bump());
    let h = Harness::new();
    let count = h.with_counter("bump");
    h.run(program(vec![expr(call_named(
        "notAFunction",
        vec![call_named("bump", vec![])],
    ))]))
    .unwrap();
    assert_eq!(count.get(), 1);
    assert_eq!(h.messages().len(), 1);
}

#[test]
fn test_delete_through_undefined_reports() {
    // delete nothing.x;
    let h = Harness::new();
    let value = h.eval(program(vec![expr(unary("delete", member(ident("nothing"), "x")))]));
    assert_eq!(value, Value::Undefined);
    assert_eq!(
        h.messages(),
        vec!["Cannot delete property 'x' of undefined (nothing.x)"]
    );
}

#[test]
fn test_delete_removes_own_property() {
    // var o = {a: 1}; var removed = delete o.a; var unbound = delete o;
    let h = Harness::new();
    h.run(program(vec![
        var("o", Some(object(vec![("a", num(1.0))]))),
        var("removed", Some(unary("delete", member(ident("o"), "a")))),
        var("unbound", Some(unary("delete", ident("o")))),
    ]))
    .unwrap();
    assert_eq!(h.global("removed"), Value::Bool(true));
    assert_eq!(h.global("unbound"), Value::Bool(false));
    assert!(!h.global("o").as_object().unwrap().has_own("a"));
}

#[test]
fn test_assigning_property_of_primitive_reports() {
    // var s = 5; s.x = 1;
    let h = Harness::new();
    h.run(program(vec![
        var("s", Some(num(5.0))),
        expr(assign(member(ident("s"), "x"), num(1.0))),
    ]))
    .unwrap();
    assert_eq!(h.messages(), vec!["Cannot set property 'x' of 5 (s.x)"]);
}

#[test]
fn test_nested_pattern_reported_at_compile_time() {
    // var {a: {b}} = o;
    let h = Harness::new();
    let pattern = json!({
        "type": "ObjectPattern",
        "properties": [{
            "type": "Property",
            "key": ident("a"),
            "value": {"type": "ObjectPattern", "properties": [
                {"type": "Property", "key": ident("b"), "value": ident("b"), "shorthand": true}
            ]},
            "computed": false
        }]
    });
    let node = Harness::node(program(vec![var_pattern(
        at(pattern, 2, 5),
        Some(object(vec![])),
    )]));
    h.engine.compile(&node);

    let messages = h.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Unsupported binding pattern 'ObjectPattern'"));
}

#[test]
fn test_optional_chain_is_silent() {
    // var npc = {}; var a = npc.shop?.name; var b = npc.shop?.open(); var c = npc.missing?.();
    let h = Harness::new();
    h.run(program(vec![
        var("npc", Some(object(vec![]))),
        var(
            "a",
            Some(chain(optional_member(member(ident("npc"), "shop"), "name"))),
        ),
        var(
            "b",
            Some(chain(call(
                optional_member(member(ident("npc"), "shop"), "open"),
                vec![],
            ))),
        ),
        var(
            "c",
            Some(chain(optional_call(member(ident("npc"), "missing"), vec![]))),
        ),
    ]))
    .unwrap();

    assert!(h.messages().is_empty());
    assert_eq!(h.global("a"), Value::Undefined);
    assert_eq!(h.global("b"), Value::Undefined);
    assert_eq!(h.global("c"), Value::Undefined);
}

#[test]
fn test_optional_chain_short_circuits_rest_of_chain() {
    // var npc = {}; npc.shop?.items.first; ok = 1;
    let h = Harness::new();
    h.run(program(vec![
        var("npc", Some(object(vec![]))),
        expr(chain(member(
            optional_member(member(ident("npc"), "shop"), "items"),
            "first",
        ))),
        set("ok", num(1.0)),
    ]))
    .unwrap();
    assert!(h.messages().is_empty());
    assert_eq!(h.global("ok"), n(1.0));
}

#[test]
fn test_unsupported_node_reports_and_continues() {
    // class A {} ; var after = 2;
    let h = Harness::new();
    h.run(program(vec![
        at(json!({"type": "ClassDeclaration", "id": ident("A"), "body": {"type": "ClassBody", "body": []}}), 1, 0),
        var("after", Some(num(2.0))),
    ]))
    .unwrap();

    let messages = h.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Unsupported syntax node"));
    assert!(messages[0].ends_with("at line 1, column 0"));
    assert_eq!(h.global("after"), n(2.0));
}

#[test]
fn test_error_callback_can_be_replaced() {
    let engine = Engine::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    engine.set_error_callback(Some(Box::new(move |message: &str| {
        sink.borrow_mut().push(message.to_string())
    })));

    let value = engine
        .call_global("missing", vec![])
        .run_until_done()
        .unwrap()
        .into_value();
    assert_eq!(value, Value::Undefined);
    assert_eq!(
        *seen.borrow(),
        vec!["'missing' is not a function (missing())".to_string()]
    );

    engine.set_error_callback(None);
    engine.call_global("missing", vec![]).run_until_done().unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_error_callback_can_mute_itself() {
    let engine = Engine::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (sink, handle) = (seen.clone(), engine.clone());
    engine.set_error_callback(Some(Box::new(move |message: &str| {
        sink.borrow_mut().push(message.to_string());
        handle.set_error_callback(None);
    })));

    engine.call_global("first", vec![]).run_until_done().unwrap();
    engine.call_global("second", vec![]).run_until_done().unwrap();
    assert_eq!(
        *seen.borrow(),
        vec!["'first' is not a function (first())".to_string()]
    );
}
