//! Control flow and thunk result types

use std::future::Future;

use super::values::Value;
use crate::interpreter::resumable::{Resumable, Step};

/* ===================== Control Flow ===================== */

/// Result of executing a compiled node.
///
/// `Break`, `Continue` and `Return` are ordinary results, not faults; every
/// statement-sequencing construct inspects them after each child.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Normal(Value),
    Break,
    Continue,
    Return(Value),
}

impl Control {
    /// Value carried by the signal (`undefined` for `Break`/`Continue`)
    pub fn into_value(self) -> Value {
        match self {
            Control::Normal(value) | Control::Return(value) => value,
            Control::Break | Control::Continue => Value::Undefined,
        }
    }

    pub fn is_signal(&self) -> bool {
        !matches!(self, Control::Normal(_))
    }
}

/* ===================== Faults ===================== */

/// Language-level fault unwinding through the execution protocol
#[derive(Debug, Clone, thiserror::Error)]
pub enum Fault {
    /// A script `throw`
    #[error("uncaught exception: {0}")]
    Throw(Value),

    /// A fault raised by the engine itself (e.g. `new` on a non-constructor)
    #[error("{0}")]
    Internal(String),

    /// Optional chain hit a nullish link; consumed by the enclosing chain
    #[doc(hidden)]
    #[error("optional chain short-circuited")]
    ShortCircuit,
}

impl Fault {
    pub fn internal(message: impl Into<String>) -> Self {
        Fault::Internal(message.into())
    }

    /// Value bound by a `catch` clause
    pub fn into_value(self) -> Value {
        match self {
            Fault::Throw(value) => value,
            Fault::Internal(message) => Value::from(message),
            Fault::ShortCircuit => Value::Undefined,
        }
    }
}

pub type Outcome = Result<Control, Fault>;

/* ===================== Completion ===================== */

/// What invoking a thunk produces: a final outcome, or a computation that
/// suspended and must be driven to completion by the caller.
pub enum Completion {
    Ready(Outcome),
    Pending(Resumable),
}

impl Completion {
    pub fn value(value: Value) -> Self {
        Completion::Ready(Ok(Control::Normal(value)))
    }

    pub fn undefined() -> Self {
        Self::value(Value::Undefined)
    }

    pub fn fault(fault: Fault) -> Self {
        Completion::Ready(Err(fault))
    }

    /// Start `future` immediately.
    ///
    /// Finishing without suspending yields `Ready`; otherwise the partially
    /// advanced computation comes back as `Pending`, with the suspension it
    /// already hit still owed to whoever drives it.
    pub fn eager<F>(future: F) -> Self
    where
        F: Future<Output = Outcome> + 'static,
    {
        let mut resumable = Resumable::new(future);
        match resumable.step() {
            Step::Done(outcome) => Completion::Ready(outcome),
            Step::Suspended => Completion::Pending(resumable.primed()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Completion::Pending(_))
    }

    /// Delegate: drive a pending computation in place, forwarding each of its
    /// suspensions to the outer driver.
    pub async fn resolve(self) -> Outcome {
        match self {
            Completion::Ready(outcome) => outcome,
            Completion::Pending(resumable) => resumable.await,
        }
    }

    /// Drive to completion on the current thread without yielding
    pub fn run_until_done(self) -> Outcome {
        match self {
            Completion::Ready(outcome) => outcome,
            Completion::Pending(resumable) => resumable.run_until_done(),
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            Completion::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}
