//! Terminal input: polling crossterm and mapping keys to actions

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app::AppAction;

const MAX_EVENTS_PER_BATCH: usize = 20;

/// What a key press asks the main loop to do
#[derive(Debug, PartialEq)]
pub enum Input {
    Action(AppAction),
    Quit,
}

/// Spawn a task that forwards key events until `cancel` fires or the
/// receiver is dropped.
pub fn spawn_key_poller(
    tx: mpsc::UnboundedSender<KeyEvent>,
    loop_sleep: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("key poller cancelled, draining buffer");
                    while event::poll(Duration::ZERO).unwrap_or(false) {
                        let _ = event::read();
                    }
                    break;
                }
                _ = tokio::time::sleep(loop_sleep) => {
                    let mut processed = 0;
                    while processed < MAX_EVENTS_PER_BATCH
                        && event::poll(Duration::ZERO).unwrap_or(false)
                    {
                        processed += 1;
                        if let Ok(Event::Key(key)) = event::read() {
                            if tx.send(key).is_err() {
                                tracing::debug!("key channel closed, stopping poller");
                                return;
                            }
                        }
                    }
                }
            }
        }
    })
}

pub fn map_key(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let action = match key.code {
        KeyCode::Char('k') | KeyCode::Up => AppAction::CountIncrement,
        KeyCode::Char('j') | KeyCode::Down => AppAction::CountDecrement,
        KeyCode::Char('r') => AppAction::CountReset,
        KeyCode::Char('d') => AppAction::CountScheduleIncrement,
        KeyCode::Char('l') => AppAction::ToggleLog,
        KeyCode::Char('q') | KeyCode::Esc => return Some(Input::Quit),
        _ => return None,
    };
    Some(Input::Action(action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn test_map_key() {
        let press = |code| KeyEvent::new(code, KeyModifiers::NONE);

        assert_eq!(
            map_key(press(KeyCode::Up)),
            Some(Input::Action(AppAction::CountIncrement))
        );
        assert_eq!(
            map_key(press(KeyCode::Char('d'))),
            Some(Input::Action(AppAction::CountScheduleIncrement))
        );
        assert_eq!(map_key(press(KeyCode::Esc)), Some(Input::Quit));
        assert_eq!(map_key(press(KeyCode::Char('x'))), None);
    }
}
