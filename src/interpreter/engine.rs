//! Engine: the host-facing entry point
//!
//! An [`Engine`] owns the global container, the receiver top-level code runs
//! with, the diagnostics reporter and the hot-reload registry. It is a cheap
//! handle; clones share the same state.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use super::compiler::{Compiler, Frame, Thunk};
use super::declarations::ScriptRegistry;
use super::diagnostics::{self, Diagnostic, Diagnostics, ErrorCallback};
use super::scope::VarStore;
use super::types::{Arguments, Completion, Node, ObjectRef, Value};

/// Host hook notified of engine-side events
pub trait ScriptManager {
    /// Called for every array literal a script evaluates
    fn array_created(&self, array: &ObjectRef);
}

/* ===================== Engine ===================== */

#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineState>,
}

struct EngineState {
    global: RefCell<ObjectRef>,
    global_store: RefCell<Rc<VarStore>>,
    root_this: RefCell<Value>,
    diagnostics: Diagnostics,
    script_manager: RefCell<Option<Rc<dyn ScriptManager>>>,
    registry: RefCell<ScriptRegistry>,
    /// Loops suspend after this many iterations; zero disables
    loop_yield_interval: Cell<usize>,
    /// Script calls currently nested on the native stack
    call_depth: Cell<usize>,
    max_call_depth: Cell<usize>,
}

/// Default limit on nested script calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Marks one script call as being on the native stack until dropped
pub(crate) struct CallDepth {
    engine: Engine,
}

impl Drop for CallDepth {
    fn drop(&mut self) {
        let depth = &self.engine.inner.call_depth;
        depth.set(depth.get().saturating_sub(1));
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with an empty global container as both global and `this`
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_error_callback(callback: impl Fn(&str) + 'static) -> Self {
        Self::build(Some(Box::new(callback)))
    }

    fn build(callback: Option<ErrorCallback>) -> Self {
        let global = ObjectRef::plain();
        Self {
            inner: Rc::new(EngineState {
                global_store: RefCell::new(VarStore::global(global.clone())),
                root_this: RefCell::new(Value::Object(global.clone())),
                global: RefCell::new(global),
                diagnostics: Diagnostics::new(callback),
                script_manager: RefCell::new(None),
                registry: RefCell::new(ScriptRegistry::default()),
                loop_yield_interval: Cell::new(0),
                call_depth: Cell::new(0),
                max_call_depth: Cell::new(DEFAULT_MAX_CALL_DEPTH),
            }),
        }
    }

    /* ===================== Configuration ===================== */

    pub fn set_error_callback(&self, callback: Option<ErrorCallback>) {
        self.inner.diagnostics.set_callback(callback);
    }

    /// Replace the global container and the receiver of top-level code
    pub fn set_global_and_this(&self, global: ObjectRef, this: Value) {
        *self.inner.global_store.borrow_mut() = VarStore::global(global.clone());
        *self.inner.global.borrow_mut() = global;
        *self.inner.root_this.borrow_mut() = this;
    }

    pub fn set_script_manager(&self, manager: Rc<dyn ScriptManager>) {
        *self.inner.script_manager.borrow_mut() = Some(manager);
    }

    pub fn set_loop_yield_interval(&self, iterations: usize) {
        self.inner.loop_yield_interval.set(iterations);
    }

    pub(crate) fn loop_yield_interval(&self) -> usize {
        self.inner.loop_yield_interval.get()
    }

    /// Nested script calls allowed before a call faults with
    /// "Maximum call stack size exceeded"
    pub fn set_max_call_depth(&self, depth: usize) {
        self.inner.max_call_depth.set(depth);
    }

    pub(crate) fn call_depth_exceeded(&self) -> bool {
        self.inner.call_depth.get() >= self.inner.max_call_depth.get()
    }

    pub(crate) fn enter_call(&self) -> CallDepth {
        self.inner.call_depth.set(self.inner.call_depth.get() + 1);
        CallDepth {
            engine: self.clone(),
        }
    }

    /* ===================== Accessors ===================== */

    pub fn global(&self) -> ObjectRef {
        self.inner.global.borrow().clone()
    }

    pub fn root_this(&self) -> Value {
        self.inner.root_this.borrow().clone()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    pub fn registry(&self) -> Ref<'_, ScriptRegistry> {
        self.inner.registry.borrow()
    }

    /// Script class that installed the global function `name`
    pub fn script_class_of(&self, name: &str) -> Option<String> {
        self.inner.registry.borrow().label_of(name).map(str::to_string)
    }

    /// Bind a host value in the global container
    pub fn define_global(&self, name: &str, value: Value) {
        self.global().set(name, value);
    }

    /// Frame top-level code runs in
    pub fn root_frame(&self) -> Frame {
        Frame::new(
            self.clone(),
            self.inner.global_store.borrow().clone(),
            self.root_this(),
        )
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        self.inner.diagnostics.report(diagnostic);
    }

    pub(crate) fn notify_array_created(&self, array: &ObjectRef) {
        let manager = self.inner.script_manager.borrow().clone();
        if let Some(manager) = manager {
            manager.array_created(array);
        }
    }

    /* ===================== Compilation ===================== */

    /// Compile a tree. Declarations are installed when the thunk runs.
    pub fn compile(&self, tree: &Node) -> Thunk {
        Compiler::new(self).compile(tree)
    }

    /// Compile a program and install its top-level declarations in the
    /// global container right away, without running anything.
    pub fn compile_and_declare(&self, tree: &Node) -> Thunk {
        let (thunk, table) = Compiler::new(self).compile_program(tree);
        let installed = table.install(&self.root_frame());
        tracing::debug!(installed = installed.len(), "declared program");
        thunk
    }

    /// Hot reload: drop the global functions the previous load of `label`
    /// installed, declare the new program, and tag the functions it installed
    /// with `label`.
    pub fn compile_and_retag(&self, tree: &Node, label: &str) -> Thunk {
        let global = self.global();
        let previous = self.inner.registry.borrow_mut().take_class(label);
        let mut removed = 0;
        for (name, function) in previous {
            // Only drop it if the global still holds the function we tagged
            if global
                .get_own(&name)
                .is_some_and(|current| current.strict_equals(&function))
            {
                global.delete(&name);
                removed += 1;
            }
        }

        let (thunk, table) = Compiler::new(self).compile_program(tree);
        let installed = table.install(&self.root_frame());

        let mut registry = self.inner.registry.borrow_mut();
        let mut tagged = 0;
        for name in installed {
            if let Some(function) = global.get_own(&name).filter(Value::is_callable) {
                registry.tag(&name, function, label);
                tagged += 1;
            }
        }
        tracing::info!(class = label, removed, tagged, "reloaded script class");
        thunk
    }

    /* ===================== Execution ===================== */

    /// Run a compiled program with the root frame
    pub fn run(&self, program: &Thunk) -> Completion {
        program(&self.root_frame())
    }

    /// Invoke a callable value with an explicit receiver
    pub fn call(&self, function: &Value, this: Value, args: Vec<Value>) -> Completion {
        match function.callable() {
            Some(callable) => callable.call(self, this, Arguments::new(args)),
            None => {
                self.report(Diagnostic::new(
                    diagnostics::NOT_CALLABLE,
                    format!("{} is not a function", function.to_display_string()),
                ));
                Completion::undefined()
            }
        }
    }

    /// Invoke the global function `name` with the root receiver
    pub fn call_global(&self, name: &str, args: Vec<Value>) -> Completion {
        let function = self.global().get(name).unwrap_or_default();
        if !function.is_callable() {
            self.report(
                Diagnostic::new(
                    diagnostics::NOT_CALLABLE,
                    format!("'{}' is not a function", name),
                )
                .with_path(Some(format!("{}()", name))),
            );
            return Completion::undefined();
        }
        self.call(&function, self.root_this(), args)
    }
}
