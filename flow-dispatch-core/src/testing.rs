//! Test utilities for flow-dispatch stores
//!
//! - [`TestHarness`]: a store wired to a [`ManualExecutor`] and a recording
//!   middleware, so tests control exactly when deferred work runs
//! - Assertion macros for verifying which actions reached the reducer
//!
//! # Example
//!
//! ```ignore
//! use flow_dispatch::testing::TestHarness;
//! use flow_dispatch::assert_dispatched;
//!
//! let harness = TestHarness::new(AppState::default(), Action::Init, reducer);
//!
//! harness.send(Action::Start);
//! harness.settle();
//!
//! let actions = harness.drain_dispatched();
//! assert_dispatched!(actions, Action::Finished);
//! ```

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::command::DispatchResult;
use crate::executor::ManualExecutor;
use crate::middleware::{Middleware, MiddlewareApi, Next};
use crate::store::Store;
use crate::{Action, ActionCategory};

/// Generic test harness around a [`Store`].
///
/// Provides:
/// - a [`ManualExecutor`] driven by [`run_pending`](Self::run_pending) and
///   [`settle`](Self::settle)
/// - a record of every action that reached the reducer, in order
///
/// # Type Parameters
///
/// - `S`: The state type
/// - `A`: The action type (must implement [`Action`] and `Clone`)
pub struct TestHarness<S, A> {
    store: Store<S, A>,
    executor: ManualExecutor,
    reduced: Rc<RefCell<Vec<A>>>,
}

impl<S: 'static, A: Action + Clone> TestHarness<S, A> {
    /// Create a harness with no extra middleware.
    pub fn new<R>(state: S, initial_action: A, reducer: R) -> Self
    where
        R: Fn(&mut S, A) -> DispatchResult<A> + 'static,
    {
        Self::with_middleware(state, initial_action, reducer, Vec::new())
    }

    /// Create a harness; the recorder sits innermost, after `middleware`.
    pub fn with_middleware<R>(
        state: S,
        initial_action: A,
        reducer: R,
        mut middleware: Vec<Box<dyn Middleware<S, A>>>,
    ) -> Self
    where
        R: Fn(&mut S, A) -> DispatchResult<A> + 'static,
    {
        let executor = ManualExecutor::new();
        let reduced = Rc::new(RefCell::new(Vec::new()));

        let sink = reduced.clone();
        let recorder = move |action: A, _api: &MiddlewareApi<S, A>, next: &Next<A>| {
            sink.borrow_mut().push(action.clone());
            next.run(action);
        };
        middleware.push(Box::new(recorder));

        let store = Store::with_middleware(
            state,
            initial_action,
            reducer,
            middleware,
            executor.clone(),
        );
        Self {
            store,
            executor,
            reduced,
        }
    }

    /// The store under test
    pub fn store(&self) -> &Store<S, A> {
        &self.store
    }

    /// The executor deferred work is queued on
    pub fn executor(&self) -> &ManualExecutor {
        &self.executor
    }

    /// Send an action synchronously.
    pub fn send(&self, action: A) {
        self.store.send(action)
    }

    /// Schedule an action for the next cycle.
    pub fn send_async(&self, action: A) {
        self.store.send_async(action)
    }

    /// Borrow the current state.
    pub fn state(&self) -> Ref<'_, S> {
        self.store.state()
    }

    /// Run one executor cycle. Returns the number of jobs that ran.
    pub fn run_pending(&self) -> usize {
        self.executor.run_pending()
    }

    /// Run cycles until nothing is pending. Returns the number of jobs that ran.
    pub fn settle(&self) -> usize {
        self.executor.run_until_idle()
    }

    /// Drain every action that reached the reducer since the last drain.
    pub fn drain_dispatched(&self) -> Vec<A> {
        std::mem::take(&mut *self.reduced.borrow_mut())
    }

    /// Check if any action reached the reducer since the last drain (drains).
    pub fn has_dispatched(&self) -> bool {
        !self.drain_dispatched().is_empty()
    }
}

/// Category-aware methods for TestHarness.
impl<S: 'static, A: ActionCategory + Clone> TestHarness<S, A> {
    /// Drain the recorded actions that belong to `category`.
    ///
    /// Actions not matching the category stay recorded for later draining.
    pub fn drain_category(&self, category: &str) -> Vec<A> {
        let mut reduced = self.reduced.borrow_mut();
        let (matching, rest): (Vec<A>, Vec<A>) = reduced
            .drain(..)
            .partition(|action| action.category() == Some(category));
        *reduced = rest;
        matching
    }

    /// Check if any recorded action has the given category (drains that category).
    pub fn has_category(&self, category: &str) -> bool {
        !self.drain_category(category).is_empty()
    }
}

/// Assert that a specific action was dispatched.
///
/// # Example
///
/// ```ignore
/// let actions = harness.drain_dispatched();
/// assert_dispatched!(actions, Action::Increment);
/// assert_dispatched!(actions, Action::SetValue(42));
/// ```
#[macro_export]
macro_rules! assert_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` to be dispatched, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that a specific action was NOT dispatched.
#[macro_export]
macro_rules! assert_not_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` NOT to be dispatched, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Find and return the first action matching a pattern.
#[macro_export]
macro_rules! find_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Count how many actions match a pattern.
#[macro_export]
macro_rules! count_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}

/// Assert that an action of a specific category was dispatched.
///
/// This requires the action type to implement [`ActionCategory`].
#[macro_export]
macro_rules! assert_category_dispatched {
    ($actions:expr, $category:expr) => {
        assert!(
            $actions.iter().any(|a| {
                use $crate::ActionCategory;
                a.category() == Some($category)
            }),
            "Expected action with category `{}` to be dispatched, but got: {:?}",
            $category,
            $actions
        );
    };
}

/// Count how many actions belong to a specific category.
///
/// This requires the action type to implement [`ActionCategory`].
#[macro_export]
macro_rules! count_category {
    ($actions:expr, $category:expr) => {{
        use $crate::ActionCategory;
        $actions
            .iter()
            .filter(|a| a.category() == Some($category))
            .count()
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Init,
        Fetch,
        FetchDidLoad(i32),
        Tick,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Init => "Init",
                TestAction::Fetch => "Fetch",
                TestAction::FetchDidLoad(_) => "FetchDidLoad",
                TestAction::Tick => "Tick",
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum TestCategory {
        Fetch,
        Uncategorized,
    }

    impl ActionCategory for TestAction {
        type Category = TestCategory;

        fn category(&self) -> Option<&'static str> {
            match self {
                TestAction::Fetch | TestAction::FetchDidLoad(_) => Some("fetch"),
                _ => None,
            }
        }

        fn category_enum(&self) -> TestCategory {
            match self.category() {
                Some(_) => TestCategory::Fetch,
                None => TestCategory::Uncategorized,
            }
        }
    }

    fn reducer(value: &mut i32, action: TestAction) -> DispatchResult<TestAction> {
        match action {
            TestAction::Init | TestAction::Tick => DispatchResult::unchanged(),
            TestAction::Fetch => {
                DispatchResult::command(Command::send(TestAction::FetchDidLoad(7)))
            }
            TestAction::FetchDidLoad(v) => {
                *value = v;
                DispatchResult::changed()
            }
        }
    }

    #[test]
    fn test_harness_records_in_order() {
        let harness = TestHarness::new(0, TestAction::Init, reducer);

        harness.send(TestAction::Fetch);
        assert_eq!(*harness.state(), 0);
        assert_eq!(harness.settle(), 1);
        assert_eq!(*harness.state(), 7);

        let actions = harness.drain_dispatched();
        assert_eq!(
            actions,
            vec![
                TestAction::Init,
                TestAction::Fetch,
                TestAction::FetchDidLoad(7)
            ]
        );
        assert!(harness.drain_dispatched().is_empty());
    }

    #[test]
    fn test_harness_drain_category() {
        let harness = TestHarness::new(0, TestAction::Init, reducer);
        harness.send(TestAction::Tick);
        harness.send(TestAction::Fetch);
        harness.run_pending();

        let fetches = harness.drain_category("fetch");
        assert_eq!(fetches.len(), 2);
        assert!(!harness.has_category("fetch"));

        let remaining = harness.drain_dispatched();
        assert_eq!(remaining, vec![TestAction::Init, TestAction::Tick]);
    }

    #[test]
    fn test_assert_macros() {
        let actions = vec![TestAction::Fetch, TestAction::FetchDidLoad(42)];

        assert_dispatched!(actions, TestAction::Fetch);
        assert_dispatched!(actions, TestAction::FetchDidLoad(42));
        assert_dispatched!(actions, TestAction::FetchDidLoad(v) if *v > 40);

        assert_not_dispatched!(actions, TestAction::FetchDidLoad(99));

        let found = find_dispatched!(actions, TestAction::FetchDidLoad(_));
        assert!(found.is_some());

        assert_eq!(count_dispatched!(actions, TestAction::FetchDidLoad(_)), 1);
        assert_category_dispatched!(actions, "fetch");
        assert_eq!(count_category!(actions, "fetch"), 2);
    }
}
