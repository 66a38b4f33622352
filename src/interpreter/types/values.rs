//! Runtime value types
//!
//! This is the host object model the compiled scripts operate on. Objects are
//! shared, interior-mutable containers compared by identity; everything else
//! is a plain copyable value.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::control::{Completion, Fault};
use crate::interpreter::engine::Engine;

/* ===================== Capabilities ===================== */

/// Something a script can invoke: compiled script functions and host natives
pub trait Callable {
    /// Name used in diagnostics and string conversion
    fn name(&self) -> &str;

    /// Invoke with an explicit receiver and argument bundle.
    ///
    /// The result may be a resumable computation when the body suspends.
    fn call(&self, engine: &Engine, this: Value, args: Arguments) -> Completion;
}

/// Property access by string key
pub trait Indexable {
    fn get_property(&self, key: &str) -> Option<Value>;
    /// `Ok(false)` when the receiver cannot hold properties
    fn set_property(&self, key: &str, value: Value) -> Result<bool, Fault>;
    fn has_property(&self, key: &str) -> bool;
    fn delete_property(&self, key: &str) -> bool;
}

/// Value sequence for `for-of` and spread
pub trait Iterable {
    /// `None` when the value is not iterable
    fn iterate(&self) -> Option<Vec<Value>>;
}

/* ===================== Argument Bundle ===================== */

/// Actual arguments of one invocation
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Argument at `index`, `undefined` when not supplied
    pub fn get(&self, index: usize) -> Value {
        self.values.get(index).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Arguments from `start` onwards (rest parameters)
    pub fn rest(&self, start: usize) -> Vec<Value> {
        self.values.iter().skip(start).cloned().collect()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }
}

/* ===================== Property Storage ===================== */

/// String-keyed properties kept in insertion order
#[derive(Clone, Default)]
pub struct PropertyMap {
    entries: IndexMap<Rc<str>, Value>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite in place; returns the previous value
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        if let Some(slot) = self.entries.get_mut(key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.insert(Rc::from(key), value)
    }

    /// Remove, keeping the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Keep only the entries `keep` accepts
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.entries.retain(|key, value| keep(key, value));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|key| key.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_ref(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/* ===================== Objects ===================== */

pub enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    Function(Rc<dyn Callable>),
}

pub struct Object {
    pub kind: ObjectKind,
    pub props: PropertyMap,
    pub proto: Option<ObjectRef>,
}

/// Shared handle to an object; equality is identity
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Largest array index; `length` tops out one above it
const MAX_ARRAY_INDEX: u64 = 4_294_967_294;

/// Nested arrays deeper than this render as `""` when converted to a string
const MAX_JOIN_DEPTH: usize = 512;

/// How far past the end a write may extend an array's dense storage.
/// Writes further out are kept as ordinary properties.
const MAX_DENSE_GAP: usize = 1024;

/// Canonical array index (`"0"`, `"17"`, but not `"01"`, `"-1"` or anything
/// above 2^32 - 2)
fn array_index(key: &str) -> Option<usize> {
    let bytes = key.as_bytes();
    let index: u64 = match bytes.first() {
        Some(b'0') if bytes.len() == 1 => 0,
        Some(b'1'..=b'9') if bytes.len() <= 10 && bytes.iter().all(u8::is_ascii_digit) => {
            key.parse().ok()?
        }
        _ => return None,
    };
    if index > MAX_ARRAY_INDEX {
        return None;
    }
    usize::try_from(index).ok()
}

/// Move elements stored as ordinary properties into dense slots `from..`
fn absorb_sparse(items: &mut [Value], props: &mut PropertyMap, from: usize) {
    if props.is_empty() {
        return;
    }
    for (index, slot) in items.iter_mut().enumerate().skip(from) {
        if let Some(value) = props.remove(&index.to_string()) {
            *slot = value;
        }
    }
}

impl ObjectRef {
    pub fn new(kind: ObjectKind) -> Self {
        ObjectRef(Rc::new(RefCell::new(Object {
            kind,
            props: PropertyMap::new(),
            proto: None,
        })))
    }

    pub fn plain() -> Self {
        Self::new(ObjectKind::Plain)
    }

    pub fn array(items: Vec<Value>) -> Self {
        Self::new(ObjectKind::Array(items))
    }

    pub fn function(callable: Rc<dyn Callable>) -> Self {
        Self::new(ObjectKind::Function(callable))
    }

    pub fn with_proto(self, proto: Option<ObjectRef>) -> Self {
        self.borrow_mut().proto = proto;
        self
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn proto(&self) -> Option<ObjectRef> {
        self.borrow().proto.clone()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Array(_))
    }

    pub fn callable(&self) -> Option<Rc<dyn Callable>> {
        match &self.borrow().kind {
            ObjectKind::Function(callable) => Some(callable.clone()),
            _ => None,
        }
    }

    /// Elements of an array object
    pub fn array_items(&self) -> Option<Vec<Value>> {
        match &self.borrow().kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    pub fn push(&self, value: Value) {
        if let ObjectKind::Array(items) = &mut self.borrow_mut().kind {
            items.push(value);
        }
    }

    /// Own property lookup (array elements and `length` included)
    pub fn get_own(&self, key: &str) -> Option<Value> {
        let object = self.borrow();
        if let ObjectKind::Array(items) = &object.kind {
            if key == "length" {
                return Some(Value::Number(items.len() as f64));
            }
            if let Some(value) = array_index(key).and_then(|index| items.get(index)) {
                return Some(value.clone());
            }
        }
        object.props.get(key).cloned()
    }

    /// Lookup through the prototype chain
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            if let Some(value) = object.get_own(key) {
                return Some(value);
            }
            current = object.proto();
        }
        None
    }

    pub fn has_own(&self, key: &str) -> bool {
        let object = self.borrow();
        if let ObjectKind::Array(items) = &object.kind {
            if key == "length" {
                return true;
            }
            if array_index(key).is_some_and(|index| index < items.len()) {
                return true;
            }
        }
        object.props.contains_key(key)
    }

    pub fn has(&self, key: &str) -> bool {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            if object.has_own(key) {
                return true;
            }
            current = object.proto();
        }
        false
    }

    /// Host-side write. An invalid array `length` leaves the array as it was.
    pub fn set(&self, key: &str, value: Value) {
        if let Err(fault) = self.try_set(key, value) {
            tracing::debug!(%fault, key, "ignored invalid property write");
        }
    }

    /// Write an own property; arrays grow (or shrink through `length`)
    pub fn try_set(&self, key: &str, value: Value) -> Result<(), Fault> {
        let mut guard = self.borrow_mut();
        let object = &mut *guard;
        if let ObjectKind::Array(items) = &mut object.kind {
            if key == "length" {
                let length = value.to_number();
                if !(0.0..=(MAX_ARRAY_INDEX + 1) as f64).contains(&length) || length.fract() != 0.0
                {
                    return Err(Fault::internal("Invalid array length"));
                }
                let length = length as usize;
                if length > items.len() + MAX_DENSE_GAP {
                    return Err(Fault::internal(format!(
                        "Array length {} is too large to allocate",
                        length
                    )));
                }
                let old = items.len();
                items.resize(length, Value::Undefined);
                if length < old {
                    // Far-off elements past the new length go too
                    object
                        .props
                        .retain(|key, _| array_index(key).map_or(true, |index| index < length));
                } else {
                    absorb_sparse(items, &mut object.props, old);
                }
                return Ok(());
            }
            if let Some(index) = array_index(key) {
                if index < items.len() {
                    items[index] = value;
                    return Ok(());
                }
                if index - items.len() <= MAX_DENSE_GAP {
                    let old = items.len();
                    items.resize(index, Value::Undefined);
                    items.push(value);
                    object.props.remove(key);
                    absorb_sparse(items, &mut object.props, old);
                    return Ok(());
                }
            }
        }
        object.props.insert(key, value);
        Ok(())
    }

    /// Remove an own property; array slots become `undefined`
    pub fn delete(&self, key: &str) -> bool {
        let mut object = self.borrow_mut();
        if let ObjectKind::Array(items) = &mut object.kind {
            if key == "length" {
                return false;
            }
            if let Some(slot) = array_index(key).and_then(|index| items.get_mut(index)) {
                *slot = Value::Undefined;
                return true;
            }
        }
        object.props.remove(key);
        true
    }

    /// Own keys in enumeration order: array indices first, then properties
    pub fn own_keys(&self) -> Vec<String> {
        let object = self.borrow();
        let mut keys = Vec::new();
        if let ObjectKind::Array(items) = &object.kind {
            keys.extend((0..items.len()).map(|index| index.to_string()));
        }
        keys.extend(object.props.keys().map(str::to_string));
        keys
    }

    /// Own and inherited keys, each reported once (`for-in` order)
    pub fn enumerable_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        let mut current = Some(self.clone());
        while let Some(object) = current {
            for key in object.own_keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            current = object.proto();
        }
        keys
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let object = self.borrow();
        match &object.kind {
            ObjectKind::Plain => {
                let keys: Vec<&str> = object.props.keys().collect();
                write!(f, "Object {{ {} }}", keys.join(", "))
            }
            ObjectKind::Array(items) => write!(f, "Array({})", items.len()),
            ObjectKind::Function(callable) => write!(f, "Function({})", callable.name()),
        }
    }
}

/* ===================== Native Functions ===================== */

pub type NativeFn = dyn Fn(&Engine, Value, Arguments) -> Completion;

/// Host function exposed to scripts
pub struct NativeFunction {
    name: String,
    func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Engine, Value, Arguments) -> Completion + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, engine: &Engine, this: Value, args: Arguments) -> Completion {
        (self.func)(engine, this, args)
    }
}

/* ===================== Values ===================== */

/// Runtime value type
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// Fresh empty plain object
    pub fn object() -> Self {
        Value::Object(ObjectRef::plain())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Object(ObjectRef::array(items))
    }

    /// Wrap a host function as a callable script value
    pub fn native(
        name: impl Into<String>,
        func: impl Fn(&Engine, Value, Arguments) -> Completion + 'static,
    ) -> Self {
        Value::Object(ObjectRef::function(Rc::new(NativeFunction::new(name, func))))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn callable(&self) -> Option<Rc<dyn Callable>> {
        self.as_object().and_then(ObjectRef::callable)
    }

    pub fn is_callable(&self) -> bool {
        self.callable().is_some()
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(object) if object.callable().is_some() => "function",
            Value::Object(_) => "object",
        }
    }

    /// ToNumber
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Object(_) => parse_number(&self.to_display_string()),
        }
    }

    /// ToInt32
    pub fn to_int32(&self) -> i32 {
        self.to_uint32() as i32
    }

    /// ToUint32
    pub fn to_uint32(&self) -> u32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        n.trunc().rem_euclid(4_294_967_296.0) as u32
    }

    /// ToString
    pub fn to_display_string(&self) -> String {
        self.display_with(&mut Vec::new())
    }

    /// ToString, tracking the arrays being joined so a cycle renders as `""`
    fn display_with(&self, joining: &mut Vec<ObjectRef>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Object(object) => {
                if let Some(items) = object.array_items() {
                    if joining.len() >= MAX_JOIN_DEPTH
                        || joining.iter().any(|seen| seen.ptr_eq(object))
                    {
                        return String::new();
                    }
                    joining.push(object.clone());
                    let text = items
                        .iter()
                        .map(|item| {
                            if item.is_nullish() {
                                String::new()
                            } else {
                                item.display_with(joining)
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(",");
                    joining.pop();
                    return text;
                }
                match object.callable() {
                    Some(callable) => format!("function {}() {{ [code] }}", callable.name()),
                    None => "[object Object]".to_string(),
                }
            }
        }
    }

    /// Property key conversion
    pub fn to_property_key(&self) -> String {
        self.to_display_string()
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Abstract equality (==)
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(a), Value::String(_)) => *a == other.to_number(),
            (Value::String(_), Value::Number(b)) => self.to_number() == *b,
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Value::Object(_), Value::Number(_) | Value::String(_)) => {
                Value::string(self.to_display_string()).loose_equals(other)
            }
            (Value::Number(_) | Value::String(_), Value::Object(_)) => {
                self.loose_equals(&Value::string(other.to_display_string()))
            }
            _ => self.strict_equals(other),
        }
    }

    /// Convert a JSON literal (parser output or host input) into a value
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let object = ObjectRef::plain();
                for (key, value) in map {
                    object.set(key, Value::from_json(value));
                }
                Value::Object(object)
            }
        }
    }

    /// Render as JSON for host output; cycles and functions are cut off
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_bounded(32)
    }

    fn to_json_bounded(&self, depth: usize) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            // Integral numbers render without a fraction
            Value::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                serde_json::Value::from(*n as i64)
            }
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Object(_) if depth == 0 => serde_json::Value::String("[Circular]".into()),
            Value::Object(object) => {
                if let Some(items) = object.array_items() {
                    return serde_json::Value::Array(
                        items.iter().map(|v| v.to_json_bounded(depth - 1)).collect(),
                    );
                }
                if let Some(callable) = object.callable() {
                    return serde_json::Value::String(format!("[Function {}]", callable.name()));
                }
                let map = object
                    .borrow()
                    .props
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json_bounded(depth - 1)))
                    .collect();
                serde_json::Value::Object(map)
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Object(object) => write!(f, "{:?}", object),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

impl Indexable for Value {
    fn get_property(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.get(key),
            Value::String(s) => {
                if key == "length" {
                    return Some(Value::Number(s.chars().count() as f64));
                }
                array_index(key)
                    .and_then(|index| s.chars().nth(index))
                    .map(|ch| Value::string(ch.to_string()))
            }
            _ => None,
        }
    }

    fn set_property(&self, key: &str, value: Value) -> Result<bool, Fault> {
        match self {
            Value::Object(object) => object.try_set(key, value).map(|()| true),
            _ => Ok(false),
        }
    }

    fn has_property(&self, key: &str) -> bool {
        match self {
            Value::Object(object) => object.has(key),
            _ => false,
        }
    }

    fn delete_property(&self, key: &str) -> bool {
        match self {
            Value::Object(object) => object.delete(key),
            _ => true,
        }
    }
}

impl Iterable for Value {
    fn iterate(&self) -> Option<Vec<Value>> {
        match self {
            Value::Object(object) => object.array_items(),
            Value::String(s) => Some(s.chars().map(|ch| Value::string(ch.to_string())).collect()),
            _ => None,
        }
    }
}

/* ===================== Helpers ===================== */

fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts spellings like "inf" and "nan" that scripts must not
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// Number to string with the script language's formatting: plain decimal
/// for exponents in -7..21, exponent notation (`1e-7`, `1.5e+21`) outside it
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }

    // Shortest round-trip digits, e.g. "1.2345e3"
    let scientific = format!("{:e}", n);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    // Position of the decimal point relative to the digits
    let point = exponent + 1;

    if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (whole, fraction) = digits.split_at(point as usize);
        format!("{}.{}", whole, fraction)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        let magnitude = (point - 1).abs();
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, magnitude)
        } else {
            format!("{}.{}e{}{}", first, rest, sign, magnitude)
        }
    }
}
