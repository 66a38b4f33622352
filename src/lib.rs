pub mod cli;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod library;

pub use error::{Error, Result};
pub use interpreter::{Completion, Engine, Node, Resumable, Step, Value};
pub use library::ScriptLibrary;
