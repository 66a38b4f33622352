//! Tree-walking interpreter with cooperative suspension
//!
//! Architecture:
//! - types: syntax tree, runtime values, control-flow results
//! - compiler: syntax tree → thunks, once per load
//! - resumable: suspended computations the host steps explicitly
//! - scope: chained variable stores
//! - declarations: install-if-absent hoisting and the hot-reload registry
//! - diagnostics: non-fatal error reporting
//! - engine: host API tying the above together
//!
//! A host compiles a program once, runs it, and keeps stepping the returned
//! [`Resumable`] (if any) on its own schedule:
//!
//! ```ignore
//! let engine = Engine::new();
//! let program = engine.compile_and_declare(&Node::from_json(source)?);
//! if let Completion::Pending(mut task) = engine.run(&program) {
//!     while let Step::Suspended = task.step() { /* next tick */ }
//! }
//! ```

pub mod compiler;
pub mod declarations;
pub mod diagnostics;
pub mod engine;
pub mod operators;
pub mod resumable;
pub mod scope;
pub mod types;

#[cfg(test)]
mod tests;

pub use compiler::{Compiler, Frame, ScriptFunction, Thunk};
pub use declarations::{DeclarationTable, ScriptRegistry};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use engine::{Engine, ScriptManager};
pub use resumable::{Resumable, Step};
pub use scope::VarStore;
pub use types::*;
