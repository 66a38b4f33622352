//! Operator semantics
//!
//! Operators are resolved once at compile time to plain function pointers so
//! evaluation never re-dispatches on the operator string.

use std::cmp::Ordering;

use super::types::{Fault, Indexable, Value};

pub type BinaryOp = fn(&Value, &Value) -> Result<Value, Fault>;
pub type UnaryOp = fn(&Value) -> Value;

/// Short-circuiting operators (`&&`, `||`, `??`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

impl LogicalOp {
    pub fn parse(operator: &str) -> Option<Self> {
        match operator {
            "&&" => Some(LogicalOp::And),
            "||" => Some(LogicalOp::Or),
            "??" => Some(LogicalOp::Coalesce),
            _ => None,
        }
    }

    /// Whether the left operand alone decides the result
    pub fn short_circuits(self, left: &Value) -> bool {
        match self {
            LogicalOp::And => !left.is_truthy(),
            LogicalOp::Or => left.is_truthy(),
            LogicalOp::Coalesce => !left.is_nullish(),
        }
    }
}

/* ===================== Binary Operators ===================== */

pub fn binary(operator: &str) -> Option<BinaryOp> {
    let op: BinaryOp = match operator {
        "==" => |l, r| Ok(Value::Bool(l.loose_equals(r))),
        "!=" => |l, r| Ok(Value::Bool(!l.loose_equals(r))),
        "===" => |l, r| Ok(Value::Bool(l.strict_equals(r))),
        "!==" => |l, r| Ok(Value::Bool(!l.strict_equals(r))),
        "<" => |l, r| Ok(Value::Bool(compare(l, r) == Some(Ordering::Less))),
        "<=" => |l, r| {
            Ok(Value::Bool(matches!(
                compare(l, r),
                Some(Ordering::Less | Ordering::Equal)
            )))
        },
        ">" => |l, r| Ok(Value::Bool(compare(l, r) == Some(Ordering::Greater))),
        ">=" => |l, r| {
            Ok(Value::Bool(matches!(
                compare(l, r),
                Some(Ordering::Greater | Ordering::Equal)
            )))
        },
        "<<" => |l, r| Ok(Value::Number(f64::from(l.to_int32().wrapping_shl(r.to_uint32() & 0x1f)))),
        ">>" => |l, r| Ok(Value::Number(f64::from(l.to_int32() >> (r.to_uint32() & 0x1f)))),
        ">>>" => |l, r| Ok(Value::Number(f64::from(l.to_uint32() >> (r.to_uint32() & 0x1f)))),
        "+" => |l, r| Ok(add(l, r)),
        "-" => |l, r| Ok(Value::Number(l.to_number() - r.to_number())),
        "*" => |l, r| Ok(Value::Number(l.to_number() * r.to_number())),
        "/" => |l, r| Ok(Value::Number(l.to_number() / r.to_number())),
        "%" => |l, r| Ok(Value::Number(l.to_number() % r.to_number())),
        "**" => |l, r| Ok(Value::Number(l.to_number().powf(r.to_number()))),
        "|" => |l, r| Ok(Value::Number(f64::from(l.to_int32() | r.to_int32()))),
        "^" => |l, r| Ok(Value::Number(f64::from(l.to_int32() ^ r.to_int32()))),
        "&" => |l, r| Ok(Value::Number(f64::from(l.to_int32() & r.to_int32()))),
        "in" => has_property,
        "instanceof" => instance_of,
        _ => return None,
    };
    Some(op)
}

/// Operator applied by a compound assignment such as `+=`
pub fn compound(operator: &str) -> Option<BinaryOp> {
    match operator.strip_suffix('=') {
        Some(base) if !base.is_empty() && LogicalOp::parse(base).is_none() => binary(base),
        _ => None,
    }
}

/// Objects take part in arithmetic and comparison through their string form
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::string(value.to_display_string()),
        _ => value.clone(),
    }
}

fn add(left: &Value, right: &Value) -> Value {
    let left = to_primitive(left);
    let right = to_primitive(right);
    match (&left, &right) {
        (Value::String(_), _) | (_, Value::String(_)) => Value::string(format!(
            "{}{}",
            left.to_display_string(),
            right.to_display_string()
        )),
        _ => Value::Number(left.to_number() + right.to_number()),
    }
}

/// Abstract relational comparison; `None` when either side is NaN
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let left = to_primitive(left);
    let right = to_primitive(right);
    match (&left, &right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

fn has_property(key: &Value, target: &Value) -> Result<Value, Fault> {
    match target {
        Value::Object(_) => Ok(Value::Bool(target.has_property(&key.to_property_key()))),
        _ => Err(Fault::internal(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            key.to_display_string(),
            target.to_display_string()
        ))),
    }
}

fn instance_of(value: &Value, constructor: &Value) -> Result<Value, Fault> {
    let Some(constructor) = constructor.as_object().filter(|c| c.callable().is_some()) else {
        return Err(Fault::internal(
            "Right-hand side of 'instanceof' is not callable",
        ));
    };
    let Some(prototype) = constructor.get("prototype").and_then(|p| p.as_object().cloned()) else {
        return Ok(Value::Bool(false));
    };
    let Some(object) = value.as_object() else {
        return Ok(Value::Bool(false));
    };
    let mut current = object.proto();
    while let Some(link) = current {
        if link.ptr_eq(&prototype) {
            return Ok(Value::Bool(true));
        }
        current = link.proto();
    }
    Ok(Value::Bool(false))
}

/* ===================== Unary Operators ===================== */

/// Unary operators other than `delete`, which needs the operand's container
pub fn unary(operator: &str) -> Option<UnaryOp> {
    let op: UnaryOp = match operator {
        "-" => |v| Value::Number(-v.to_number()),
        "+" => |v| Value::Number(v.to_number()),
        "!" => |v| Value::Bool(!v.is_truthy()),
        "~" => |v| Value::Number(f64::from(!v.to_int32())),
        "typeof" => |v| Value::from(v.type_of()),
        "void" => |_| Value::Undefined,
        _ => return None,
    };
    Some(op)
}

/// Step applied by `++` / `--`
pub fn update_delta(operator: &str) -> Option<f64> {
    match operator {
        "++" => Some(1.0),
        "--" => Some(-1.0),
        _ => None,
    }
}
