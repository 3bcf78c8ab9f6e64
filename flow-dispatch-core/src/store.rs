//! Centralized state store with reducer, middleware chain and commands
//!
//! The store is the single owner of application state. Every action goes
//! through the composed middleware chain and ends in the reduction step:
//!
//! 1. the reentrancy guard rejects actions sent while another one is being reduced,
//! 2. the reducer mutates the state and returns a [`DispatchResult`],
//! 3. observers are told about the new state,
//! 4. the returned commands run with a [`DeferredDispatch`].

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::command::DispatchResult;
use crate::dispatch::{DeferredDispatch, Dispatch, DispatchTarget};
use crate::executor::Executor;
use crate::middleware::{Middleware, MiddlewareApi, Next};
use crate::Action;

/// A reducer: mutates the state for one action and returns the commands to run.
pub type Reducer<S, A> = Box<dyn Fn(&mut S, A) -> DispatchResult<A>>;

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer<S> = Rc<dyn Fn(&S)>;

pub(crate) struct StoreCore<S, A> {
    pub(crate) state: RefCell<S>,
    pub(crate) reductions: Cell<u64>,
    reducer: Reducer<S, A>,
    reducing: Cell<bool>,
    chain: Rc<dyn Fn(A) -> bool>,
    executor: Rc<dyn Executor>,
    observers: RefCell<Vec<(SubscriptionId, Observer<S>)>>,
    next_subscription: Cell<u64>,
}

impl<S: 'static, A: Action> StoreCore<S, A> {
    fn reduce(self: &Rc<Self>, action: A) {
        if self.reducing.get() {
            tracing::error!(action = %action.name(), "reentrant dispatch");
            panic!(
                "reentrant dispatch: {:?} was sent while another action was being reduced; \
                 send it from a command or with send_async instead",
                action
            );
        }

        let name = action.name();
        self.reducing.set(true);
        let result = {
            let mut state = self.state.borrow_mut();
            (self.reducer)(&mut state, action)
        };
        self.reductions.set(self.reductions.get() + 1);
        tracing::trace!(action = %name, changed = result.changed, "reduced");
        // The reducer may have mutated the state even when it reports no change.
        self.notify();
        self.reducing.set(false);

        if result.has_commands() {
            let target: Weak<StoreCore<S, A>> = Rc::downgrade(self);
            let dispatch = DeferredDispatch::new(target, self.executor.clone());
            for command in result.commands {
                command.execute(dispatch.clone());
            }
        }
    }

    fn notify(&self) {
        // Observers may (un)subscribe while being notified.
        let observers: Vec<Observer<S>> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        if observers.is_empty() {
            return;
        }
        let state = self.state.borrow();
        for observer in observers {
            observer(&state);
        }
    }
}

impl<S: 'static, A: Action> DispatchTarget<A> for StoreCore<S, A> {
    fn dispatch(&self, action: A) {
        (self.chain)(action);
    }
}

/// Build `mw[0](mw[1](...mw[n](reduce)))`.
///
/// Every link returns whether the action it was given reached the reducer.
fn compose<S: 'static, A: Action>(
    middleware: Vec<Box<dyn Middleware<S, A>>>,
    store: &Weak<StoreCore<S, A>>,
    executor: &Rc<dyn Executor>,
) -> Rc<dyn Fn(A) -> bool> {
    let reduce: Rc<dyn Fn(A) -> bool> = {
        let store = store.clone();
        Rc::new(move |action: A| match store.upgrade() {
            Some(core) => {
                core.reduce(action);
                true
            }
            None => {
                tracing::trace!("store dropped, ignoring action");
                false
            }
        })
    };

    middleware.into_iter().rev().fold(reduce, |inner, middleware| {
        let target: Weak<dyn DispatchTarget<A>> = store.clone();
        let api = MiddlewareApi::new(
            store.clone(),
            Dispatch::new(target.clone()),
            DeferredDispatch::new(target, executor.clone()),
        );
        let next = Next::new(inner);
        let outer: Rc<dyn Fn(A) -> bool> = Rc::new(move |action: A| {
            next.enter();
            middleware.handle(action, &api, &next);
            next.exit()
        });
        outer
    })
}

/// Centralized state store with Redux-like reducer pattern
///
/// The store holds the application state and provides a single point
/// for state changes through [`send`](Self::send).
///
/// # Type Parameters
/// * `S` - The application state type
/// * `A` - The action type (must implement `Action`)
///
/// # Example
/// ```
/// use flow_dispatch_core::{Action, DispatchResult, ManualExecutor, Store};
///
/// #[derive(Debug)]
/// enum Counter {
///     Init,
///     Increment,
/// }
///
/// impl Action for Counter {
///     fn name(&self) -> &'static str {
///         match self {
///             Counter::Init => "Init",
///             Counter::Increment => "Increment",
///         }
///     }
/// }
///
/// fn reducer(count: &mut i32, action: Counter) -> DispatchResult<Counter> {
///     match action {
///         Counter::Init => DispatchResult::unchanged(),
///         Counter::Increment => {
///             *count += 1;
///             DispatchResult::changed()
///         }
///     }
/// }
///
/// let store = Store::new(0, Counter::Init, reducer, ManualExecutor::new());
/// store.send(Counter::Increment);
/// assert_eq!(*store.state(), 1);
/// ```
pub struct Store<S, A> {
    core: Rc<StoreCore<S, A>>,
}

impl<S: 'static, A: Action> Store<S, A> {
    /// Create a store without middleware and reduce `initial_action` before returning.
    pub fn new<R, E>(state: S, initial_action: A, reducer: R, executor: E) -> Self
    where
        R: Fn(&mut S, A) -> DispatchResult<A> + 'static,
        E: Executor + 'static,
    {
        Self::with_middleware(state, initial_action, reducer, Vec::new(), executor)
    }

    /// Create a store whose actions pass through `middleware` (first element
    /// outermost) and send `initial_action` through the full chain before returning.
    pub fn with_middleware<R, E>(
        state: S,
        initial_action: A,
        reducer: R,
        middleware: Vec<Box<dyn Middleware<S, A>>>,
        executor: E,
    ) -> Self
    where
        R: Fn(&mut S, A) -> DispatchResult<A> + 'static,
        E: Executor + 'static,
    {
        let executor: Rc<dyn Executor> = Rc::new(executor);
        let core = Rc::new_cyclic(|store: &Weak<StoreCore<S, A>>| StoreCore {
            state: RefCell::new(state),
            reductions: Cell::new(0),
            reducer: Box::new(reducer),
            reducing: Cell::new(false),
            chain: compose(middleware, store, &executor),
            executor: executor.clone(),
            observers: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
        });

        let store = Self { core };
        store.send(initial_action);
        store
    }

    /// Send an action through the middleware chain synchronously.
    ///
    /// # Panics
    ///
    /// Panics when called while an action is being reduced (from a reducer
    /// or a state observer). Use [`send_async`](Self::send_async) or a
    /// [`Command`](crate::Command) for follow-up actions.
    pub fn send(&self, action: A) {
        (self.core.chain)(action);
    }

    /// Schedule an action to be sent on a later executor cycle.
    pub fn send_async(&self, action: A) {
        self.deferred().send(action)
    }

    /// Get a reference to the current state
    ///
    /// Release the borrow before calling [`send`](Self::send).
    pub fn state(&self) -> Ref<'_, S> {
        self.core.state.borrow()
    }

    /// A synchronous dispatch capability that does not keep the store alive.
    pub fn dispatcher(&self) -> Dispatch<A> {
        Dispatch::new(self.target())
    }

    /// A deferred dispatch capability that does not keep the store alive.
    pub fn deferred(&self) -> DeferredDispatch<A> {
        DeferredDispatch::new(self.target(), self.core.executor.clone())
    }

    /// Call `observer` with the committed state after every reduction step.
    ///
    /// Observers run whatever the reducer reported in
    /// [`DispatchResult::changed`]; hosts that only care about real changes
    /// compare against their own last seen value.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&S) + 'static,
    {
        let id = SubscriptionId(self.core.next_subscription.get());
        self.core.next_subscription.set(id.0 + 1);
        self.core
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.core.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of completed reduction steps, including the initial action.
    pub fn reductions(&self) -> u64 {
        self.core.reductions.get()
    }

    /// Whether an action is being reduced right now.
    pub fn is_reducing(&self) -> bool {
        self.core.reducing.get()
    }

    fn target(&self) -> Weak<dyn DispatchTarget<A>> {
        let target: Weak<StoreCore<S, A>> = Rc::downgrade(&self.core);
        target
    }
}

impl<S: fmt::Debug, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Store");
        match self.core.state.try_borrow() {
            Ok(state) => debug.field("state", &*state),
            Err(_) => debug.field("state", &"<reducing>"),
        };
        debug
            .field("reductions", &self.core.reductions.get())
            .field("observers", &self.core.observers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ManualExecutor;
    use crate::Command;

    #[derive(Default, Debug, Clone, PartialEq)]
    struct TestState {
        counter: i32,
        log: Vec<&'static str>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Init,
        Increment,
        Decrement,
        NoOp,
        Start,
        Finished,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Init => "Init",
                TestAction::Increment => "Increment",
                TestAction::Decrement => "Decrement",
                TestAction::NoOp => "NoOp",
                TestAction::Start => "Start",
                TestAction::Finished => "Finished",
            }
        }
    }

    fn test_reducer(state: &mut TestState, action: TestAction) -> DispatchResult<TestAction> {
        state.log.push(action.name());
        match action {
            TestAction::Init | TestAction::NoOp => DispatchResult::unchanged(),
            TestAction::Increment => {
                state.counter += 1;
                DispatchResult::changed()
            }
            TestAction::Decrement => {
                state.counter -= 1;
                DispatchResult::changed()
            }
            TestAction::Start => DispatchResult::command(Command::send(TestAction::Finished)),
            TestAction::Finished => {
                state.counter = 100;
                DispatchResult::changed()
            }
        }
    }

    fn new_store(executor: &ManualExecutor) -> Store<TestState, TestAction> {
        Store::new(
            TestState::default(),
            TestAction::Init,
            test_reducer,
            executor.clone(),
        )
    }

    #[test]
    fn test_initial_action_is_reduced_during_construction() {
        let store = new_store(&ManualExecutor::new());
        assert_eq!(store.state().log, vec!["Init"]);
        assert_eq!(store.reductions(), 1);
        assert!(!store.is_reducing());
    }

    #[test]
    fn test_store_send() {
        let store = new_store(&ManualExecutor::new());

        store.send(TestAction::Increment);
        assert_eq!(store.state().counter, 1);

        store.send(TestAction::Increment);
        assert_eq!(store.state().counter, 2);

        store.send(TestAction::Decrement);
        assert_eq!(store.state().counter, 1);
        assert_eq!(store.reductions(), 4);
    }

    #[test]
    fn test_command_runs_on_a_later_cycle() {
        let executor = ManualExecutor::new();
        let store = new_store(&executor);

        store.send(TestAction::Start);
        assert_eq!(store.state().counter, 0);
        assert_eq!(store.state().log, vec!["Init", "Start"]);
        assert_eq!(executor.pending(), 1);

        assert_eq!(executor.run_pending(), 1);
        assert_eq!(store.state().counter, 100);
        assert_eq!(store.state().log, vec!["Init", "Start", "Finished"]);
    }

    #[test]
    fn test_send_async_is_fifo() {
        let executor = ManualExecutor::new();
        let store = new_store(&executor);

        store.send_async(TestAction::Increment);
        store.send_async(TestAction::NoOp);
        store.send_async(TestAction::Decrement);
        assert_eq!(store.state().log, vec!["Init"]);

        executor.run_until_idle();
        assert_eq!(
            store.state().log,
            vec!["Init", "Increment", "NoOp", "Decrement"]
        );
    }

    #[test]
    fn test_observers_see_every_reduction() {
        let store = new_store(&ManualExecutor::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = store.subscribe(move |state: &TestState| sink.borrow_mut().push(state.counter));

        store.send(TestAction::Increment);
        store.send(TestAction::NoOp);
        store.send(TestAction::Increment);
        assert_eq!(*seen.borrow(), vec![1, 1, 2]);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.send(TestAction::Increment);
        assert_eq!(*seen.borrow(), vec![1, 1, 2]);
    }

    #[test]
    fn test_observers_see_mutation_from_a_command_only_result() {
        // `Start` records itself in the log but only reports a command.
        let executor = ManualExecutor::new();
        let store = new_store(&executor);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |state: &TestState| sink.borrow_mut().push(state.log.clone()));

        store.send(TestAction::Start);
        assert_eq!(*seen.borrow(), vec![vec!["Init", "Start"]]);

        executor.run_pending();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[1], vec!["Init", "Start", "Finished"]);
    }

    #[test]
    fn test_command_from_initial_action_waits_for_executor() {
        let executor = ManualExecutor::new();
        let store = Store::new(
            TestState::default(),
            TestAction::Init,
            |state: &mut TestState, action: TestAction| match action {
                TestAction::Init => DispatchResult::command(Command::send(TestAction::Increment)),
                other => test_reducer(state, other),
            },
            executor.clone(),
        );

        assert_eq!(store.state().counter, 0);
        assert_eq!(store.reductions(), 1);
        assert_eq!(executor.pending(), 1);

        assert_eq!(executor.run_pending(), 1);
        assert_eq!(store.state().counter, 1);
        assert_eq!(store.reductions(), 2);
        assert!(executor.is_idle());
    }

    #[test]
    #[should_panic(expected = "reentrant dispatch")]
    fn test_send_from_observer_is_reentrant() {
        let store = new_store(&ManualExecutor::new());
        let dispatch = store.dispatcher();
        store.subscribe(move |_state: &TestState| dispatch.send(TestAction::NoOp));

        store.send(TestAction::Increment);
    }

    #[test]
    fn test_capabilities_are_noops_after_drop() {
        let executor = ManualExecutor::new();
        let store = new_store(&executor);
        let dispatch = store.dispatcher();
        let deferred = store.deferred();
        store.send_async(TestAction::Increment);
        assert!(dispatch.is_alive());

        drop(store);
        assert!(!dispatch.is_alive());
        assert!(!deferred.is_alive());

        dispatch.send(TestAction::Increment);
        deferred.send(TestAction::Increment);
        assert_eq!(executor.run_until_idle(), 2);
    }

    #[test]
    fn test_debug_shows_state() {
        let store = new_store(&ManualExecutor::new());
        let debug = format!("{:?}", store);
        assert!(debug.contains("counter: 0"));
        assert!(debug.contains("reductions: 1"));
    }
}
