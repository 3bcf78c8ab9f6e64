//! State, actions and reducer of the counter

use std::time::Duration;

use flow_dispatch::{Action, ActionSummary, Command, DeferredDispatch, DispatchResult};

pub struct AppState {
    pub count: i64,
    pub step: i64,
    pub delay: Duration,
    /// Delayed increments still waiting for their timer
    pub pending: usize,
    pub show_log: bool,
}

impl AppState {
    pub fn new(step: i64, delay: Duration, show_log: bool) -> Self {
        Self {
            count: 0,
            step,
            delay,
            pending: 0,
            show_log,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Action)]
#[action(infer_categories)]
pub enum AppAction {
    Init,
    CountIncrement,
    CountDecrement,
    CountReset,
    CountScheduleIncrement,
    DidDelayElapse,
    ToggleLog,
}

impl ActionSummary for AppAction {}

pub fn reducer(state: &mut AppState, action: AppAction) -> DispatchResult<AppAction> {
    match action {
        AppAction::Init => DispatchResult::changed(),
        AppAction::CountIncrement => {
            state.count += state.step;
            DispatchResult::changed()
        }
        AppAction::CountDecrement => {
            state.count -= state.step;
            DispatchResult::changed()
        }
        AppAction::CountReset => {
            if state.count == 0 {
                return DispatchResult::unchanged();
            }
            state.count = 0;
            DispatchResult::changed()
        }
        AppAction::CountScheduleIncrement => {
            state.pending += 1;
            DispatchResult::changed_with(delayed_increment(state.delay))
        }
        AppAction::DidDelayElapse => {
            state.pending = state.pending.saturating_sub(1);
            state.count += state.step;
            DispatchResult::changed()
        }
        AppAction::ToggleLog => {
            state.show_log = !state.show_log;
            DispatchResult::changed()
        }
    }
}

/// Wait on the local set, then report back through the executor.
fn delayed_increment(delay: Duration) -> Command<AppAction> {
    Command::new(move |dispatch: DeferredDispatch<AppAction>| {
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            dispatch.send(AppAction::DidDelayElapse);
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_dispatch::testing::TestHarness;

    fn harness() -> TestHarness<AppState, AppAction> {
        TestHarness::new(
            AppState::new(2, Duration::from_millis(1), false),
            AppAction::Init,
            reducer,
        )
    }

    #[test]
    fn test_step_applies_to_both_directions() {
        let harness = harness();
        harness.send(AppAction::CountIncrement);
        harness.send(AppAction::CountIncrement);
        harness.send(AppAction::CountDecrement);
        assert_eq!(harness.state().count, 2);
    }

    #[test]
    fn test_reset_of_zero_is_unchanged() {
        let harness = harness();
        let result = reducer(&mut AppState::new(1, Duration::ZERO, false), AppAction::CountReset);
        assert!(!result.changed);

        harness.send(AppAction::CountIncrement);
        harness.send(AppAction::CountReset);
        assert_eq!(harness.state().count, 0);
    }

    #[test]
    fn test_categories() {
        assert!(AppAction::CountScheduleIncrement.is_count());
        assert!(AppAction::DidDelayElapse.is_async_result());
        assert_eq!(AppAction::ToggleLog.category(), None);
    }

    #[tokio::test]
    async fn test_scheduled_increment_lands_later() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let harness = harness();
                harness.send(AppAction::CountScheduleIncrement);
                assert_eq!(harness.state().pending, 1);
                assert_eq!(harness.state().count, 0);

                tokio::time::sleep(Duration::from_millis(20)).await;
                harness.settle();

                assert_eq!(harness.state().pending, 0);
                assert_eq!(harness.state().count, 2);
            })
            .await;
    }
}
