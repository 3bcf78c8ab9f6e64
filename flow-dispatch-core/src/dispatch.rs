//! Dispatch capabilities handed to middleware, commands and collaborators
//!
//! Both capabilities hold a weak back-reference to the store. They stay
//! valid for the whole lifetime of the store and turn into silent no-ops
//! once it has been dropped.
//!
//! - [`Dispatch`] routes an action through the store's composed chain
//!   right away, in the caller's stack frame.
//! - [`DeferredDispatch`] schedules the same routing onto the store's
//!   [`Executor`] for a later cycle. This is the only capability commands
//!   ever receive.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::executor::Executor;

/// Anything an action can be routed into. Implemented by the store internals.
pub(crate) trait DispatchTarget<A> {
    fn dispatch(&self, action: A);
}

/// Synchronous dispatch capability.
///
/// Calling [`send`](Self::send) resolves the store's current chain at call
/// time. Sending from inside a reducer (or a state observer) is a reentrant
/// dispatch and aborts with a panic.
pub struct Dispatch<A> {
    target: Weak<dyn DispatchTarget<A>>,
}

impl<A: 'static> Dispatch<A> {
    pub(crate) fn new(target: Weak<dyn DispatchTarget<A>>) -> Self {
        Self { target }
    }

    /// Route `action` through the full middleware chain now.
    pub fn send(&self, action: A) {
        match self.target.upgrade() {
            Some(target) => target.dispatch(action),
            None => tracing::trace!("store dropped, ignoring dispatch"),
        }
    }

    /// Whether the store this capability points to still exists.
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("alive", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// Deferred dispatch capability.
///
/// [`send`](Self::send) never runs the chain inline: it schedules a job on
/// the executor which sends the action once the current cycle has returned.
/// Jobs run in the order they were scheduled.
pub struct DeferredDispatch<A> {
    target: Weak<dyn DispatchTarget<A>>,
    executor: Rc<dyn Executor>,
}

impl<A: 'static> DeferredDispatch<A> {
    pub(crate) fn new(target: Weak<dyn DispatchTarget<A>>, executor: Rc<dyn Executor>) -> Self {
        Self { target, executor }
    }

    /// Schedule `action` to be sent on a later cycle.
    pub fn send(&self, action: A) {
        let target = self.target.clone();
        self.executor.schedule(Box::new(move || match target.upgrade() {
            Some(target) => target.dispatch(action),
            None => tracing::trace!("store dropped, discarding deferred action"),
        }));
    }

    /// Whether the store this capability points to still exists.
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl<A> Clone for DeferredDispatch<A> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<A> fmt::Debug for DeferredDispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredDispatch")
            .field("alive", &(self.target.strong_count() > 0))
            .finish_non_exhaustive()
    }
}
