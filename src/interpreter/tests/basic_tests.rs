//! Tests for expressions, literals and variables

use super::helpers::*;
use crate::interpreter::{Control, Engine, Node, ScriptManager, Value};
use std::cell::RefCell;
use std::rc::Rc;

/* ===================== Raw ESTree ===================== */

#[test]
fn test_program_from_parser_json() {
    // var x = 40 + 2; x;
    let source = r#"{
        "type": "Program",
        "body": [
            {
                "type": "VariableDeclaration",
                "kind": "var",
                "declarations": [{
                    "type": "VariableDeclarator",
                    "id": {"type": "Identifier", "name": "x"},
                    "init": {
                        "type": "BinaryExpression",
                        "operator": "+",
                        "left": {"type": "Literal", "value": 40, "raw": "40"},
                        "right": {"type": "Literal", "value": 2, "raw": "2"}
                    }
                }]
            },
            {
                "type": "ExpressionStatement",
                "expression": {"type": "Identifier", "name": "x"}
            }
        ],
        "sourceType": "script"
    }"#;

    let engine = Engine::new();
    let program = engine.compile(&Node::from_json(source).unwrap());
    let outcome = engine.run(&program).run_until_done();

    assert_eq!(outcome.unwrap(), Control::Normal(Value::Number(42.0)));
    assert_eq!(engine.global().get_own("x"), Some(Value::Number(42.0)));
}

/* ===================== Operators ===================== */

#[test]
fn test_arithmetic_and_precedence_from_tree() {
    // (2 + 3) * 4 - 6 / 3
    let h = Harness::new();
    let value = h.eval(program(vec![expr(bin(
        "-",
        bin("*", bin("+", num(2.0), num(3.0)), num(4.0)),
        bin("/", num(6.0), num(3.0)),
    ))]));
    assert_eq!(value, n(18.0));
}

#[test]
fn test_binary_operator_table() {
    // var o = {hp: 1}; function C() {} var c = new C(); <left> <op> <right>;
    let t = Value::Bool(true);
    let f = Value::Bool(false);
    let cases = vec![
        (num(7.0), "+", string("1"), Value::from("71")),
        (num(7.0), "-", num(2.0), n(5.0)),
        (num(7.0), "*", num(2.0), n(14.0)),
        (num(7.0), "/", num(2.0), n(3.5)),
        (num(7.0), "%", num(3.0), n(1.0)),
        (num(-7.0), "%", num(3.0), n(-1.0)),
        (num(2.0), "**", num(10.0), n(1024.0)),
        (num(1.0), "==", string("1"), t.clone()),
        (null(), "==", ident("undefined"), t.clone()),
        (num(1.0), "!=", string("1"), f.clone()),
        (num(1.0), "!=", num(2.0), t.clone()),
        (num(1.0), "===", string("1"), f.clone()),
        (num(1.0), "!==", string("1"), t.clone()),
        (num(1.0), "!==", num(1.0), f.clone()),
        (num(1.0), "<", num(2.0), t.clone()),
        (num(2.0), "<=", num(2.0), t.clone()),
        (string("b"), ">", string("a"), t.clone()),
        (num(1.0), ">=", num(2.0), f.clone()),
        (num(1.0), "<<", num(4.0), n(16.0)),
        (num(-16.0), ">>", num(2.0), n(-4.0)),
        (num(-1.0), ">>>", num(28.0), n(15.0)),
        (num(12.0), "|", num(3.0), n(15.0)),
        (num(12.0), "^", num(10.0), n(6.0)),
        (num(12.0), "&", num(10.0), n(8.0)),
        (string("hp"), "in", ident("o"), t.clone()),
        (string("mp"), "in", ident("o"), f.clone()),
        (ident("c"), "instanceof", ident("C"), t.clone()),
        (ident("o"), "instanceof", ident("C"), f.clone()),
        (num(0.0), "&&", string("x"), n(0.0)),
        (num(1.0), "&&", string("x"), Value::from("x")),
        (string(""), "||", string("y"), Value::from("y")),
        (string("z"), "||", string("y"), Value::from("z")),
        (null(), "??", num(5.0), n(5.0)),
        (num(0.0), "??", num(5.0), n(0.0)),
    ];

    for (left, operator, right, expected) in cases {
        let expression = if matches!(operator, "&&" | "||" | "??") {
            logical(operator, left, right)
        } else {
            bin(operator, left, right)
        };
        let h = Harness::new();
        let value = h.eval(program(vec![
            var("o", Some(object(vec![("hp", num(1.0))]))),
            function("C", vec![], vec![]),
            var("c", Some(new(ident("C"), vec![]))),
            expr(expression),
        ]));
        assert_eq!(value, expected, "operator {}", operator);
        assert!(h.messages().is_empty(), "operator {}", operator);
    }
}

#[test]
fn test_logical_operators_short_circuit() {
    // false && bump(); true || bump(); null ?? bump();
    let h = Harness::new();
    let count = h.with_counter("bump");
    let value = h.eval(program(vec![
        expr(logical("&&", boolean(false), call_named("bump", vec![]))),
        expr(logical("||", boolean(true), call_named("bump", vec![]))),
        expr(logical("??", null(), call_named("bump", vec![]))),
    ]));
    assert_eq!(count.get(), 1);
    assert_eq!(value, n(1.0));
}

#[test]
fn test_compound_and_logical_assignment() {
    // var a = 5; a += 2; a *= 3; var b = null; b ??= "x"; b ||= "y";
    let h = Harness::new();
    h.run(program(vec![
        var("a", Some(num(5.0))),
        expr(assign_op("+=", ident("a"), num(2.0))),
        expr(assign_op("*=", ident("a"), num(3.0))),
        var("b", Some(null())),
        expr(assign_op("??=", ident("b"), string("x"))),
        expr(assign_op("||=", ident("b"), string("y"))),
    ]))
    .unwrap();
    assert_eq!(h.global("a"), n(21.0));
    assert_eq!(h.global("b"), Value::from("x"));
}

#[test]
fn test_update_expressions() {
    // var i = 1; var a = i++; var b = ++i; o = {n: 1}; o.n--;
    let h = Harness::new();
    h.run(program(vec![
        var("i", Some(num(1.0))),
        var("a", Some(update("++", ident("i"), false))),
        var("b", Some(update("++", ident("i"), true))),
        set("o", object(vec![("n", num(1.0))])),
        expr(update("--", member(ident("o"), "n"), false)),
    ]))
    .unwrap();
    assert_eq!(h.global("a"), n(1.0));
    assert_eq!(h.global("b"), n(3.0));
    assert_eq!(h.global("i"), n(3.0));
    assert_eq!(h.global("o").as_object().unwrap().get_own("n"), Some(n(0.0)));
}

#[test]
fn test_typeof_unbound_name_is_undefined() {
    let h = Harness::new();
    let value = h.eval(program(vec![expr(unary("typeof", ident("nothingHere")))]));
    assert_eq!(value, Value::from("undefined"));
    assert!(h.messages().is_empty());
}

#[test]
fn test_template_literal() {
    // `hp: ${hp}/${max}`
    let h = Harness::new();
    h.define("hp", n(7.0));
    h.define("max", n(10.0));
    let template = serde_json::json!({
        "type": "TemplateLiteral",
        "quasis": [
            {"type": "TemplateElement", "value": {"raw": "hp: ", "cooked": "hp: "}, "tail": false},
            {"type": "TemplateElement", "value": {"raw": "/", "cooked": "/"}, "tail": false},
            {"type": "TemplateElement", "value": {"raw": "", "cooked": ""}, "tail": true}
        ],
        "expressions": [ident("hp"), ident("max")]
    });
    assert_eq!(h.eval(program(vec![expr(template)])), Value::from("hp: 7/10"));
}

#[test]
fn test_conditional_and_sequence() {
    let h = Harness::new();
    let sequence = serde_json::json!({
        "type": "SequenceExpression",
        "expressions": [num(1.0), num(2.0), serde_json::json!({
            "type": "ConditionalExpression",
            "test": bin("<", num(1.0), num(2.0)),
            "consequent": string("yes"),
            "alternate": string("no")
        })]
    });
    assert_eq!(h.eval(program(vec![expr(sequence)])), Value::from("yes"));
}

/* ===================== Variables ===================== */

#[test]
fn test_unresolved_assignment_creates_global() {
    // function f() { leaked = 3; } f();
    let h = Harness::new();
    h.run(program(vec![
        function("f", vec![], vec![set("leaked", num(3.0))]),
        expr(call_named("f", vec![])),
    ]))
    .unwrap();
    assert_eq!(h.global("leaked"), n(3.0));
}

#[test]
fn test_well_known_names_fall_back() {
    let h = Harness::new();
    let value = h.eval(program(vec![expr(bin(
        "===",
        ident("undefined"),
        unary("void", num(0.0)),
    ))]));
    assert_eq!(value, Value::Bool(true));
    assert!(h.eval(program(vec![expr(ident("NaN"))])).to_number().is_nan());
    assert_eq!(h.eval(program(vec![expr(ident("Infinity"))])), n(f64::INFINITY));
}

/* ===================== Literals ===================== */

#[test]
fn test_object_and_array_literals_with_spread() {
    // var base = {a: 1, b: 2}; var o = {...base, b: 3}; var arr = [0, ...[1, 2], 3];
    let h = Harness::new();
    let object_with_spread = serde_json::json!({
        "type": "ObjectExpression",
        "properties": [spread(ident("base")), property(ident("b"), num(3.0))]
    });
    h.run(program(vec![
        var("base", Some(object(vec![("a", num(1.0)), ("b", num(2.0))]))),
        var("o", Some(object_with_spread)),
        var(
            "arr",
            Some(array(vec![num(0.0), spread(array(vec![num(1.0), num(2.0)])), num(3.0)])),
        ),
    ]))
    .unwrap();

    let o = h.global("o");
    let o = o.as_object().unwrap();
    assert_eq!(o.own_keys(), vec!["a", "b"]);
    assert_eq!(o.get_own("b"), Some(n(3.0)));

    let arr = h.global("arr").as_object().unwrap().array_items().unwrap();
    assert_eq!(arr, vec![n(0.0), n(1.0), n(2.0), n(3.0)]);
}

#[test]
fn test_computed_member_access() {
    // var o = {}; o["a" + "b"] = 1; o.ab;
    let h = Harness::new();
    let value = h.eval(program(vec![
        var("o", Some(object(vec![]))),
        expr(assign(index(ident("o"), bin("+", string("a"), string("b"))), num(1.0))),
        expr(member(ident("o"), "ab")),
    ]));
    assert_eq!(value, n(1.0));
}

struct ArrayLog(RefCell<Vec<usize>>);

impl ScriptManager for ArrayLog {
    fn array_created(&self, array: &crate::interpreter::ObjectRef) {
        let len = array.array_items().map(|items| items.len()).unwrap_or(0);
        self.0.borrow_mut().push(len);
    }
}

#[test]
fn test_script_manager_sees_array_literals() {
    let h = Harness::new();
    let log = Rc::new(ArrayLog(RefCell::new(Vec::new())));
    h.engine.set_script_manager(log.clone());

    h.run(program(vec![
        var("a", Some(array(vec![num(1.0), num(2.0)]))),
        var("b", Some(array(vec![]))),
    ]))
    .unwrap();
    assert_eq!(*log.0.borrow(), vec![2, 0]);
}

/* ===================== Arrays And Numbers ===================== */

#[test]
fn test_far_array_writes_and_bad_lengths() {
    // var a = [1]; a[4294967294] = "far"; var far = a[4294967294];
    // try { a.length = 1e300; } catch (e) { msg = e; } var len = a.length;
    let h = Harness::new();
    h.run(program(vec![
        var("a", Some(array(vec![num(1.0)]))),
        expr(assign(index(ident("a"), num(4294967294.0)), string("far"))),
        var("far", Some(index(ident("a"), num(4294967294.0)))),
        try_catch(
            vec![expr(assign(member(ident("a"), "length"), num(1e300)))],
            Some("e"),
            vec![set("msg", ident("e"))],
        ),
        var("len", Some(member(ident("a"), "length"))),
    ]))
    .unwrap();

    assert_eq!(h.global("far"), Value::from("far"));
    assert_eq!(h.global("msg"), Value::from("Invalid array length"));
    assert_eq!(h.global("len"), n(1.0));
}

#[test]
fn test_number_concatenation_uses_exponent_form() {
    // "" + 1e-7 + "|" + 1e21 + "|" + 0.000001
    let h = Harness::new();
    let value = h.eval(program(vec![expr(bin(
        "+",
        bin(
            "+",
            bin("+", bin("+", bin("+", string(""), num(1e-7)), string("|")), num(1e21)),
            string("|"),
        ),
        num(0.000001),
    ))]));
    assert_eq!(value, Value::from("1e-7|1e+21|0.000001"));
}
