//! Resumable computations
//!
//! A [`Resumable`] is an in-progress evaluation that the host advances one
//! suspension at a time with [`Resumable::step`]. Internally it is a boxed
//! future polled with a no-op waker; nested computations are delegated to with
//! `.await`, which is what threads an inner suspension out to the host.
//!
//! Dropping a `Resumable` abandons it. Nothing else runs afterwards, including
//! any `finally` blocks it had not reached yet.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use super::types::{Completion, Control, Outcome, Value};

/* ===================== Step Result ===================== */

/// Result of driving a computation by one step
#[derive(Debug)]
pub enum Step {
    /// Stopped at a suspension point; call `step()` again to continue
    Suspended,
    /// Finished with a value or a fault
    Done(Outcome),
}

/* ===================== Resumable ===================== */

pub struct Resumable {
    future: Pin<Box<dyn Future<Output = Outcome>>>,
    /// Set when the computation already suspended during its eager start and
    /// that suspension has not been reported to an awaiting parent yet
    primed: bool,
}

struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

impl Resumable {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Outcome> + 'static,
    {
        Self {
            future: Box::pin(future),
            primed: false,
        }
    }

    pub(crate) fn primed(mut self) -> Self {
        self.primed = true;
        self
    }

    /// Advance until the next suspension point or completion
    pub fn step(&mut self) -> Step {
        // The host calling step() is the report of any pending suspension
        self.primed = false;
        let waker = Waker::from(Arc::new(NoopWake));
        let mut cx = Context::from_waker(&waker);
        match self.future.as_mut().poll(&mut cx) {
            Poll::Ready(outcome) => Step::Done(outcome),
            Poll::Pending => {
                tracing::trace!("computation suspended");
                Step::Suspended
            }
        }
    }

    /// Drive with an unbounded budget
    pub fn run_until_done(mut self) -> Outcome {
        loop {
            if let Step::Done(outcome) = self.step() {
                return outcome;
            }
        }
    }

    /// Drive for at most `budget` steps.
    ///
    /// Returns `Err(self)` with the partially advanced computation when the
    /// budget runs out first.
    pub fn run_with_budget(mut self, budget: usize) -> Result<Outcome, Resumable> {
        for _ in 0..budget {
            if let Step::Done(outcome) = self.step() {
                return Ok(outcome);
            }
        }
        Err(self)
    }

    /* ===================== Host Suspension Points ===================== */

    /// Suspend once, then resolve to `undefined`
    pub fn yield_now() -> Completion {
        Self::yield_ticks(1)
    }

    /// Suspend `ticks` times, then resolve to `undefined`
    pub fn yield_ticks(ticks: usize) -> Completion {
        Self::yield_then(ticks, Value::Undefined)
    }

    /// Suspend `ticks` times, then resolve to `value`
    pub fn yield_then(ticks: usize, value: Value) -> Completion {
        Completion::eager(async move {
            for _ in 0..ticks {
                Suspend::default().await;
            }
            Ok(Control::Normal(value))
        })
    }
}

impl Future for Resumable {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
        if self.primed {
            // Surface the suspension that happened during the eager start
            // before advancing any further.
            self.primed = false;
            return Poll::Pending;
        }
        self.future.as_mut().poll(cx)
    }
}

/// Leaf suspension point: pending once, ready on the next poll
#[derive(Default)]
pub struct Suspend {
    suspended: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.suspended {
            Poll::Ready(())
        } else {
            self.suspended = true;
            Poll::Pending
        }
    }
}
