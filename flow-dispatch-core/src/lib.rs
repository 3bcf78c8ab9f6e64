//! Core traits and types for flow-dispatch
//!
//! This crate provides a single-owner, unidirectional state store following
//! a Redux/Elm-inspired architecture.
//!
//! # Core Concepts
//!
//! - **Action**: Events that describe what happened
//! - **Reducer**: Mutates state for one action and returns commands
//! - **Command**: Deferred side effect, run after the reduction step
//! - **Middleware**: Composable interceptors in front of the reducer
//! - **Store**: Owns the state and the composed dispatch chain
//! - **Executor**: The single cooperative context deferred work runs on
//!
//! # Basic Example
//!
//! ```ignore
//! use flow_dispatch_core::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum MyAction {
//!     Init,
//!     Increment,
//! }
//!
//! fn reducer(count: &mut i32, action: MyAction) -> DispatchResult<MyAction> {
//!     match action {
//!         MyAction::Init => DispatchResult::unchanged(),
//!         MyAction::Increment => { *count += 1; DispatchResult::changed() }
//!     }
//! }
//!
//! let executor = ManualExecutor::new();
//! let store = Store::new(0, MyAction::Init, reducer, executor.clone());
//! store.send(MyAction::Increment);
//! assert_eq!(*store.state(), 1);
//! ```
//!
//! # Commands and Reentrancy
//!
//! A reducer must never send actions itself. Follow-up work is returned as
//! [`Command`]s, which get a [`DeferredDispatch`]:
//!
//! ```ignore
//! MyAction::Load => DispatchResult::changed_with(Command::new(|dispatch| {
//!     let data = read_cache();
//!     dispatch.send(MyAction::DidLoad(data));
//! })),
//! ```
//!
//! `DidLoad` is queued on the executor and reduced once the current cycle
//! returned. Sending synchronously from inside a reduction panics.

pub mod action;
pub mod command;
pub mod debug;
pub mod dispatch;
pub mod executor;
pub mod middleware;
pub mod store;
pub mod testing;

// Core trait exports
pub use action::{Action, ActionCategory, ActionSummary};

// Store exports
pub use command::{Command, DispatchResult};
pub use dispatch::{DeferredDispatch, Dispatch};
pub use executor::{Executor, Job, JobLoop, LocalExecutor, ManualExecutor};
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareApi, Next};
pub use store::{Reducer, Store, SubscriptionId};

// Testing exports
pub use testing::TestHarness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionCategory, ActionSummary};
    pub use crate::command::{Command, DispatchResult};
    pub use crate::debug::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
    pub use crate::dispatch::{DeferredDispatch, Dispatch};
    pub use crate::executor::{Executor, JobLoop, LocalExecutor, ManualExecutor};
    pub use crate::middleware::{LoggingMiddleware, Middleware, MiddlewareApi, Next};
    pub use crate::store::{Store, SubscriptionId};
}
