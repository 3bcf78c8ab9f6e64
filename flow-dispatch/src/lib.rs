//! flow-dispatch: a single-threaded unidirectional state store
//!
//! Like Redux/Elm, but with Rust ownership: one [`Store`] owns the state,
//! every mutation goes through a reducer, and side effects are returned as
//! [`Command`]s that report back on a later executor cycle.
//!
//! # Example
//! ```ignore
//! use flow_dispatch::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! #[action(infer_categories)]
//! enum CounterAction {
//!     Init,
//!     CountIncrement,
//!     CountReset,
//! }
//!
//! fn reducer(count: &mut i64, action: CounterAction) -> DispatchResult<CounterAction> {
//!     match action {
//!         CounterAction::Init => DispatchResult::unchanged(),
//!         CounterAction::CountIncrement => { *count += 1; DispatchResult::changed() }
//!         CounterAction::CountReset => { *count = 0; DispatchResult::changed() }
//!     }
//! }
//!
//! let executor = ManualExecutor::new();
//! let store = Store::new(0, CounterAction::Init, reducer, executor.clone());
//! store.send(CounterAction::CountIncrement);
//! assert_eq!(*store.state(), 1);
//! ```

// Re-export everything from core
pub use flow_dispatch_core::*;

// Re-export derive macros
pub use flow_dispatch_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use flow_dispatch_core::{Action, ActionCategory, ActionSummary};

    // Store
    pub use flow_dispatch_core::{
        Command, DeferredDispatch, Dispatch, DispatchResult, LoggingMiddleware, Middleware,
        MiddlewareApi, Next, Store, SubscriptionId,
    };

    // Executors
    pub use flow_dispatch_core::{Executor, JobLoop, LocalExecutor, ManualExecutor};

    // Debug
    pub use flow_dispatch_core::debug::{
        ActionLogConfig, ActionLogHandle, ActionLoggerConfig, ActionLoggerMiddleware,
    };

    // Derive macros
    pub use flow_dispatch_macros::Action;
}
