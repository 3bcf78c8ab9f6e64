//! Action traits for type-safe state transitions

use std::fmt::Debug;

/// Marker trait for actions that can be sent to a [`Store`](crate::Store)
///
/// Actions describe something that happened. They should be:
/// - Debug: for logging and reentrancy diagnostics
/// - 'static: they are moved into deferred jobs and commands
///
/// Actions are never required to be `Send`: a store lives on a single
/// cooperative execution context.
///
/// Use `#[derive(Action)]` from `flow-dispatch-macros` to auto-implement this trait.
pub trait Action: Debug + 'static {
    /// Get the action name for logging and filtering
    fn name(&self) -> &'static str;
}

/// Human-readable one-line description of an action, used by the action log.
///
/// The default implementation uses the `Debug` representation.
pub trait ActionSummary: Action {
    /// Summarize the action for display
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}

/// Category information for actions, generated by `#[action(infer_categories)]`.
///
/// Categories group related variants by their name prefix, e.g.
/// `CountIncrement` and `CountReset` both belong to `"count"`.
pub trait ActionCategory: Action {
    /// Enum of every category of this action type
    type Category: Copy + Eq + Debug;

    /// The category name, if the action is categorized
    fn category(&self) -> Option<&'static str>;

    /// The category as an enum value
    fn category_enum(&self) -> Self::Category;
}
