//! Counter - flow-dispatch on a tokio LocalSet
//!
//! - State, actions and reducer live in `app`
//! - Deferred work runs on a `LocalExecutor` whose `JobLoop` is a local task
//! - `d` schedules a delayed increment through a command
//! - `l` toggles a side panel fed by the action log middleware
//!
//! Keys: k/Up = +step, j/Down = -step, d = delayed +step, r = reset, q = quit

mod app;
mod input;
mod ui;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use flow_dispatch::prelude::*;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::app::{reducer, AppAction, AppState};
use crate::input::{map_key, spawn_key_poller, Input};

/// Counter TUI - flow-dispatch example
#[derive(Parser, Debug)]
#[command(name = "counter")]
#[command(about = "A counter TUI demonstrating flow-dispatch commands and middleware")]
struct Args {
    /// Amount added or removed per key press
    #[arg(long, short, default_value = "1")]
    step: i64,

    /// Delay before a scheduled increment lands, in milliseconds
    #[arg(long, default_value = "500")]
    delay_ms: u64,

    /// Start with the action log panel open
    #[arg(long)]
    debug: bool,

    /// JSON file with the action log config (capacity and filter patterns)
    #[arg(long)]
    log_config: Option<PathBuf>,

    /// Write tracing output to this file (filter with RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        init_tracing(path)?;
    }
    let log_config = match &args.log_config {
        Some(path) => load_log_config(path)?,
        None => ActionLogConfig::default(),
    };

    // ===== Terminal setup =====
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let local = tokio::task::LocalSet::new();
    let result = local
        .run_until(run_app(&mut terminal, &args, log_config))
        .await;

    // ===== Cleanup =====
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn init_tracing(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn load_log_config(path: &Path) -> io::Result<ActionLogConfig> {
    let json = std::fs::read_to_string(path)?;
    ActionLogConfig::from_json(&json).map_err(io::Error::other)
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    args: &Args,
    log_config: ActionLogConfig,
) -> io::Result<()> {
    let cancel = CancellationToken::new();
    let (executor, jobs) = LocalExecutor::new();
    let job_loop = tokio::task::spawn_local(jobs.run_until_cancelled(cancel.clone()));

    let logger = ActionLoggerMiddleware::with_log(log_config);
    let log = logger.log_handle();

    let store = Store::with_middleware(
        AppState::new(args.step, Duration::from_millis(args.delay_ms), args.debug),
        AppAction::Init,
        reducer,
        vec![Box::new(logger), Box::new(LoggingMiddleware::new())],
        executor,
    );

    // Deferred actions land while the loop waits on input
    let redraw = Rc::new(Notify::new());
    let notify = redraw.clone();
    store.subscribe(move |_: &AppState| notify.notify_one());

    let (key_tx, mut key_rx) = mpsc::unbounded_channel();
    let _poller = spawn_key_poller(key_tx, Duration::from_millis(16), cancel.clone());

    loop {
        {
            let state = store.state();
            let log = log.as_ref().map(|handle| handle.borrow());
            terminal.draw(|frame| ui::render(frame, &state, log.as_deref()))?;
        }

        tokio::select! {
            Some(key) = key_rx.recv() => match map_key(key) {
                Some(Input::Quit) => break,
                Some(Input::Action(action)) => store.send(action),
                None => {}
            },
            _ = redraw.notified() => {}
        }
    }

    tracing::debug!(reductions = store.reductions(), "shutting down");
    cancel.cancel();
    if let Err(err) = job_loop.await {
        if err.is_panic() {
            std::panic::resume_unwind(err.into_panic());
        }
        tracing::warn!(error = %err, "job loop did not finish");
    }
    Ok(())
}
