//! Commands: deferred side effects emitted by reducers
//!
//! A reducer never performs effects itself. Instead it returns a
//! [`DispatchResult`] holding the state change indicator plus any
//! [`Command`]s to run once the reduction step is over.
//!
//! # Example
//!
//! ```
//! use flow_dispatch_core::{Action, Command, DispatchResult, DeferredDispatch};
//!
//! #[derive(Debug)]
//! enum Msg {
//!     Start,
//!     Finished,
//! }
//!
//! impl Action for Msg {
//!     fn name(&self) -> &'static str {
//!         match self {
//!             Msg::Start => "Start",
//!             Msg::Finished => "Finished",
//!         }
//!     }
//! }
//!
//! fn reducer(running: &mut bool, action: Msg) -> DispatchResult<Msg> {
//!     match action {
//!         Msg::Start => {
//!             *running = true;
//!             DispatchResult::changed_with(Command::new(|dispatch: DeferredDispatch<Msg>| {
//!                 // talk to the outside world, then report back
//!                 dispatch.send(Msg::Finished);
//!             }))
//!         }
//!         Msg::Finished => {
//!             *running = false;
//!             DispatchResult::changed()
//!         }
//!     }
//! }
//! ```

use std::fmt;

use crate::dispatch::DeferredDispatch;

/// A deferred unit of work produced by a reducer.
///
/// The closure receives a [`DeferredDispatch`] and may call it any number of
/// times. Every action sent through it is scheduled for a later cycle, so a
/// command can never re-enter the reduction step that produced it.
pub struct Command<A> {
    run: Box<dyn FnOnce(DeferredDispatch<A>)>,
}

impl<A: 'static> Command<A> {
    /// Wrap a closure as a command.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(DeferredDispatch<A>) + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// A command that only sends `action` on the next cycle.
    pub fn send(action: A) -> Self {
        Self::new(move |dispatch| dispatch.send(action))
    }

    /// Run several commands in order, sharing one dispatch capability.
    pub fn batch(commands: Vec<Command<A>>) -> Self {
        Self::new(move |dispatch| {
            for command in commands {
                command.execute(dispatch.clone());
            }
        })
    }

    /// Consume the command and run it.
    pub fn execute(self, dispatch: DeferredDispatch<A>) {
        (self.run)(dispatch)
    }
}

impl<A> fmt::Debug for Command<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command").finish_non_exhaustive()
    }
}

/// Result of reducing one action.
///
/// `changed` is the reducer's own report and shows up in the store's traces
/// and in tests; observers are notified after every reduction regardless.
/// `commands` are executed in order right after the reduction step. An
/// empty list means "no commands".
#[derive(Debug)]
pub struct DispatchResult<A> {
    /// Whether the state was modified by this action.
    pub changed: bool,
    /// Commands to run after the reduction step.
    pub commands: Vec<Command<A>>,
}

impl<A> Default for DispatchResult<A> {
    fn default() -> Self {
        Self::unchanged()
    }
}

impl<A> DispatchResult<A> {
    /// Create a result indicating no state change and no commands.
    #[inline]
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            commands: vec![],
        }
    }

    /// Create a result indicating state changed but no commands.
    #[inline]
    pub fn changed() -> Self {
        Self {
            changed: true,
            commands: vec![],
        }
    }

    /// Create a result with a single command but no state change.
    #[inline]
    pub fn command(command: Command<A>) -> Self {
        Self {
            changed: false,
            commands: vec![command],
        }
    }

    /// Create a result with multiple commands but no state change.
    #[inline]
    pub fn commands(commands: Vec<Command<A>>) -> Self {
        Self {
            changed: false,
            commands,
        }
    }

    /// Create a result indicating state changed with a single command.
    #[inline]
    pub fn changed_with(command: Command<A>) -> Self {
        Self {
            changed: true,
            commands: vec![command],
        }
    }

    /// Create a result indicating state changed with multiple commands.
    #[inline]
    pub fn changed_with_many(commands: Vec<Command<A>>) -> Self {
        Self {
            changed: true,
            commands,
        }
    }

    /// Add a command to this result.
    #[inline]
    pub fn with(mut self, command: Command<A>) -> Self {
        self.commands.push(command);
        self
    }

    /// Set the changed flag to true.
    #[inline]
    pub fn mark_changed(mut self) -> Self {
        self.changed = true;
        self
    }

    /// Returns true if there are any commands to run.
    #[inline]
    pub fn has_commands(&self) -> bool {
        !self.commands.is_empty()
    }
}

impl<A> From<bool> for DispatchResult<A> {
    fn from(changed: bool) -> Self {
        Self {
            changed,
            commands: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ManualExecutor;
    use crate::Store;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Ping(u8),
    }

    impl crate::Action for Ping {
        fn name(&self) -> &'static str {
            "Ping"
        }
    }

    fn recording_store(executor: &ManualExecutor) -> Store<Vec<Ping>, Ping> {
        Store::new(
            Vec::new(),
            Ping::Ping(0),
            |seen: &mut Vec<Ping>, action| {
                seen.push(action);
                DispatchResult::changed()
            },
            executor.clone(),
        )
    }

    #[test]
    fn test_dispatch_result_builders() {
        let r: DispatchResult<Ping> = DispatchResult::unchanged();
        assert!(!r.changed);
        assert!(!r.has_commands());

        let r: DispatchResult<Ping> = DispatchResult::changed();
        assert!(r.changed);
        assert!(r.commands.is_empty());

        let r = DispatchResult::command(Command::send(Ping::Ping(1)));
        assert!(!r.changed);
        assert_eq!(r.commands.len(), 1);

        let r = DispatchResult::changed_with(Command::send(Ping::Ping(1)));
        assert!(r.changed);
        assert!(r.has_commands());

        let r = DispatchResult::changed_with_many(vec![
            Command::send(Ping::Ping(1)),
            Command::send(Ping::Ping(2)),
        ]);
        assert!(r.changed);
        assert_eq!(r.commands.len(), 2);

        let r: DispatchResult<Ping> = true.into();
        assert!(r.changed);
    }

    #[test]
    fn test_dispatch_result_chaining() {
        let r: DispatchResult<Ping> = DispatchResult::unchanged()
            .with(Command::send(Ping::Ping(7)))
            .mark_changed();
        assert!(r.changed);
        assert_eq!(r.commands.len(), 1);
    }

    #[test]
    fn test_send_command_defers_action() {
        let executor = ManualExecutor::new();
        let store = recording_store(&executor);

        Command::send(Ping::Ping(1)).execute(store.deferred());
        assert_eq!(*store.state(), vec![Ping::Ping(0)]);
        assert_eq!(executor.pending(), 1);

        executor.run_until_idle();
        assert_eq!(*store.state(), vec![Ping::Ping(0), Ping::Ping(1)]);
    }

    #[test]
    fn test_batch_preserves_order() {
        let executor = ManualExecutor::new();
        let store = recording_store(&executor);

        Command::batch(vec![
            Command::send(Ping::Ping(1)),
            Command::new(|d: DeferredDispatch<Ping>| {
                d.send(Ping::Ping(2));
                d.send(Ping::Ping(3));
            }),
        ])
        .execute(store.deferred());

        executor.run_until_idle();
        assert_eq!(
            *store.state(),
            vec![Ping::Ping(0), Ping::Ping(1), Ping::Ping(2), Ping::Ping(3)]
        );
    }

    #[test]
    fn test_debug_is_opaque() {
        let command: Command<Ping> = Command::send(Ping::Ping(1));
        assert_eq!(format!("{:?}", command), "Command { .. }");
    }
}
