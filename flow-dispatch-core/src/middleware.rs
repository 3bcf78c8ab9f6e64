//! Middleware: composable interceptors around the reduction step
//!
//! A middleware sees every action before anything registered after it and
//! before the reducer. It decides whether to pass the action on by calling
//! [`Next::run`], and may do work before and after that call.
//!
//! # Example
//!
//! ```ignore
//! // Drop every `Blocked` action, forward everything else.
//! let guard = |action: AppAction, _api: &MiddlewareApi<AppState, AppAction>, next: &Next<AppAction>| {
//!     if !matches!(action, AppAction::Blocked) {
//!         next.run(action);
//!     }
//! };
//!
//! let store = Store::with_middleware(
//!     AppState::default(),
//!     AppAction::Init,
//!     reducer,
//!     vec![Box::new(LoggingMiddleware::new()), Box::new(guard)],
//!     executor,
//! );
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dispatch::{DeferredDispatch, Dispatch};
use crate::store::StoreCore;
use crate::Action;

/// Interceptor in a store's dispatch chain.
///
/// `handle` receives ownership of the action. Forward it with
/// `next.run(action)`, replace it with a different one, or drop it to
/// short-circuit everything further down the chain.
///
/// Middleware is shared behind `&self`; keep any mutable bookkeeping in
/// `Cell`/`RefCell` and never hold a borrow across `next.run`, since the
/// chain can be re-entered through [`MiddlewareApi::dispatch`].
pub trait Middleware<S, A> {
    /// Intercept one action.
    fn handle(&self, action: A, api: &MiddlewareApi<S, A>, next: &Next<A>);
}

impl<S, A, F> Middleware<S, A> for F
where
    F: Fn(A, &MiddlewareApi<S, A>, &Next<A>),
{
    fn handle(&self, action: A, api: &MiddlewareApi<S, A>, next: &Next<A>) {
        self(action, api, next)
    }
}

/// The rest of the chain, as seen from one middleware.
pub struct Next<A> {
    inner: Rc<dyn Fn(A) -> bool>,
    // One entry per action currently inside this link; nested dispatches
    // push and pop their own.
    reached: Rc<RefCell<Vec<bool>>>,
}

impl<A> Next<A> {
    pub(crate) fn new(inner: Rc<dyn Fn(A) -> bool>) -> Self {
        Self {
            inner,
            reached: Rc::default(),
        }
    }

    /// Pass `action` to the next middleware (or the reducer).
    ///
    /// Returns whether this action reached the reducer. Actions dispatched
    /// synchronously further down the chain do not count.
    pub fn run(&self, action: A) -> bool {
        let reached = (self.inner)(action);
        if reached {
            if let Some(frame) = self.reached.borrow_mut().last_mut() {
                *frame = true;
            }
        }
        reached
    }

    pub(crate) fn enter(&self) {
        self.reached.borrow_mut().push(false);
    }

    pub(crate) fn exit(&self) -> bool {
        self.reached.borrow_mut().pop().unwrap_or(false)
    }
}

impl<A> Clone for Next<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            reached: self.reached.clone(),
        }
    }
}

impl<A> fmt::Debug for Next<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Capabilities a middleware gets from its store.
///
/// Everything here goes through a weak reference, so it stays safe to use
/// from closures that outlive the store.
pub struct MiddlewareApi<S, A> {
    store: Weak<StoreCore<S, A>>,
    dispatch: Dispatch<A>,
    deferred: DeferredDispatch<A>,
}

impl<S: 'static, A: Action> MiddlewareApi<S, A> {
    pub(crate) fn new(
        store: Weak<StoreCore<S, A>>,
        dispatch: Dispatch<A>,
        deferred: DeferredDispatch<A>,
    ) -> Self {
        Self {
            store,
            dispatch,
            deferred,
        }
    }

    /// Send an action through the whole chain, starting at the first middleware.
    pub fn dispatch(&self, action: A) {
        self.dispatch.send(action)
    }

    /// Schedule an action through the whole chain on a later cycle.
    pub fn dispatch_async(&self, action: A) {
        self.deferred.send(action)
    }

    /// A clone of the synchronous dispatch capability.
    pub fn dispatcher(&self) -> Dispatch<A> {
        self.dispatch.clone()
    }

    /// A clone of the deferred dispatch capability.
    pub fn deferred(&self) -> DeferredDispatch<A> {
        self.deferred.clone()
    }

    /// Read the current state.
    ///
    /// Returns `None` when the store is gone, or when the state is being
    /// mutated by an in-flight reduction.
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        let store = self.store.upgrade()?;
        let state = store.state.try_borrow().ok()?;
        Some(f(&state))
    }

    /// Clone the current state, see [`with_state`](Self::with_state).
    pub fn snapshot(&self) -> Option<S>
    where
        S: Clone,
    {
        self.with_state(S::clone)
    }

    /// Number of reduction steps the store has completed, or `None` if it is gone.
    ///
    /// Use the value returned by [`Next::run`] to tell whether one action
    /// was reduced; this counter also moves for nested dispatches.
    pub fn reductions(&self) -> Option<u64> {
        self.store.upgrade().map(|store| store.reductions.get())
    }
}

impl<S, A> Clone for MiddlewareApi<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            dispatch: self.dispatch.clone(),
            deferred: self.deferred.clone(),
        }
    }
}

impl<S, A> fmt::Debug for MiddlewareApi<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareApi")
            .field("alive", &(self.store.strong_count() > 0))
            .finish()
    }
}

/// Middleware that traces actions as they pass through
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    /// Whether to log before forwarding
    pub log_before: bool,
    /// Whether to log after the rest of the chain returned
    pub log_after: bool,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl<S: 'static, A: Action> Middleware<S, A> for LoggingMiddleware {
    fn handle(&self, action: A, _api: &MiddlewareApi<S, A>, next: &Next<A>) {
        let name = action.name();
        if self.log_before {
            tracing::debug!(action = %name, "Dispatching action");
        }

        let reduced = next.run(action);

        if self.log_after {
            tracing::debug!(action = %name, reduced, "Action processed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ManualExecutor;
    use crate::{DispatchResult, Store};
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Init,
        Add(i32),
        Double,
    }

    impl Action for Op {
        fn name(&self) -> &'static str {
            match self {
                Op::Init => "Init",
                Op::Add(_) => "Add",
                Op::Double => "Double",
            }
        }
    }

    fn reducer(state: &mut i32, action: Op) -> DispatchResult<Op> {
        match action {
            Op::Init => DispatchResult::unchanged(),
            Op::Add(n) => {
                *state += n;
                DispatchResult::changed()
            }
            Op::Double => {
                *state *= 2;
                DispatchResult::changed()
            }
        }
    }

    #[test]
    fn test_closure_middleware_can_rewrite_actions() {
        let rewrite = |action: Op, _api: &MiddlewareApi<i32, Op>, next: &Next<Op>| {
            let action = match action {
                Op::Double => Op::Add(100),
                other => other,
            };
            next.run(action);
        };

        let store = Store::with_middleware(
            1,
            Op::Init,
            reducer,
            vec![Box::new(rewrite)],
            ManualExecutor::new(),
        );
        store.send(Op::Double);
        assert_eq!(*store.state(), 101);
    }

    #[test]
    fn test_api_reads_state_around_next() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let probe = move |action: Op, api: &MiddlewareApi<i32, Op>, next: &Next<Op>| {
            let before = api.snapshot();
            next.run(action);
            let after = api.with_state(|s| *s);
            sink.borrow_mut().push((before, after));
        };

        let store = Store::with_middleware(
            0,
            Op::Init,
            reducer,
            vec![Box::new(probe)],
            ManualExecutor::new(),
        );
        store.send(Op::Add(5));

        assert_eq!(
            *seen.borrow(),
            vec![(Some(0), Some(0)), (Some(0), Some(5))]
        );
    }

    #[test]
    fn test_api_dispatch_reenters_chain_from_the_top() {
        // The first middleware sees the follow-up action sent by the second.
        let order = Rc::new(RefCell::new(Vec::new()));

        let outer_log = order.clone();
        let outer = move |action: Op, _api: &MiddlewareApi<i32, Op>, next: &Next<Op>| {
            outer_log.borrow_mut().push(format!("outer:{}", action.name()));
            next.run(action);
        };

        let follow_up = |action: Op, api: &MiddlewareApi<i32, Op>, next: &Next<Op>| {
            let is_add = matches!(action, Op::Add(_));
            next.run(action);
            if is_add {
                api.dispatch(Op::Double);
            }
        };

        let store = Store::with_middleware(
            0,
            Op::Init,
            reducer,
            vec![Box::new(outer), Box::new(follow_up)],
            ManualExecutor::new(),
        );
        store.send(Op::Add(3));

        assert_eq!(*store.state(), 6);
        assert_eq!(
            *order.borrow(),
            vec!["outer:Init", "outer:Add", "outer:Double"]
        );
    }

    #[test]
    fn test_api_outliving_the_store_reads_nothing() {
        let stash: Rc<RefCell<Option<MiddlewareApi<i32, Op>>>> = Rc::default();
        let sink = stash.clone();
        let keep = move |action: Op, api: &MiddlewareApi<i32, Op>, next: &Next<Op>| {
            *sink.borrow_mut() = Some(api.clone());
            next.run(action);
        };

        let store = Store::with_middleware(
            4,
            Op::Init,
            reducer,
            vec![Box::new(keep)],
            ManualExecutor::new(),
        );
        let api = stash.borrow_mut().take().expect("middleware ran for Init");
        assert_eq!(api.snapshot(), Some(4));
        assert_eq!(api.reductions(), Some(1));

        drop(store);
        assert_eq!(api.snapshot(), None);
        assert_eq!(api.reductions(), None);
        api.dispatch(Op::Add(1));
    }

    #[test]
    fn test_next_reports_only_its_own_action() {
        // `Double` is swallowed and replaced by a synchronous `Add(1)`.
        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = results.clone();
        let outer = move |action: Op, _api: &MiddlewareApi<i32, Op>, next: &Next<Op>| {
            let name = action.name();
            let reached = next.run(action);
            sink.borrow_mut().push((name, reached));
        };
        let swallow = |action: Op, api: &MiddlewareApi<i32, Op>, next: &Next<Op>| {
            if matches!(action, Op::Double) {
                api.dispatch(Op::Add(1));
            } else {
                next.run(action);
            }
        };

        let store = Store::with_middleware(
            10,
            Op::Init,
            reducer,
            vec![Box::new(outer), Box::new(swallow)],
            ManualExecutor::new(),
        );
        store.send(Op::Double);

        assert_eq!(*store.state(), 11);
        assert_eq!(
            *results.borrow(),
            vec![("Init", true), ("Add", true), ("Double", false)]
        );
    }

    #[test]
    fn test_logging_middleware_forwards() {
        let store = Store::with_middleware(
            0,
            Op::Init,
            reducer,
            vec![Box::new(LoggingMiddleware::verbose())],
            ManualExecutor::new(),
        );
        store.send(Op::Add(2));
        assert_eq!(*store.state(), 2);
    }
}
