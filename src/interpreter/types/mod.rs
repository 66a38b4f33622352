//! Type definitions for the interpreter
//!
//! This module contains the core types shared by every part of the engine:
//! - Syntax tree nodes (Node, NodeKind)
//! - Runtime values (Value, ObjectRef) and capability traits
//! - Control flow (Control, Fault, Completion)

pub mod ast;
pub mod control;
pub mod values;

// Re-export all types for convenient access
pub use ast::{Node, NodeKind, Position, SourceLocation};
pub use control::{Completion, Control, Fault, Outcome};
pub use values::{
    Arguments, Callable, Indexable, Iterable, NativeFunction, Object, ObjectKind, ObjectRef,
    PropertyMap, Value,
};
