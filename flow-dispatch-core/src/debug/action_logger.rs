//! Filtered action tracing plus an optional ring buffer of recent actions
//!
//! [`ActionLoggerMiddleware`] emits a `tracing::debug!` event for every
//! action whose name passes an include/exclude glob filter. With storage
//! enabled it also appends an [`ActionLogEntry`] to a shared [`ActionLog`],
//! recording afterwards whether the action made it to the reducer.
//!
//! # Example
//!
//! ```ignore
//! use flow_dispatch_core::debug::{ActionLogConfig, ActionLoggerMiddleware};
//!
//! let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::default());
//! let log = logger.log_handle().expect("storage enabled");
//!
//! let store = Store::with_middleware(
//!     AppState::default(),
//!     AppAction::Init,
//!     reducer,
//!     vec![Box::new(logger)],
//!     executor,
//! );
//!
//! for entry in log.borrow().recent(10) {
//!     println!("{}: {}", entry.elapsed_display(), entry.summary);
//! }
//! ```

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::action::ActionSummary;
use crate::middleware::{Middleware, MiddlewareApi, Next};

// Actions fired on every frame or timer tick drown everything else.
fn noisy_actions() -> Vec<String> {
    vec!["Tick".to_string(), "Render".to_string()]
}

fn split_patterns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(String::from)
        .collect()
}

/// Which action names get logged.
///
/// Both lists hold [`glob_match`] patterns, e.g. `Count*`, `Did*` or
/// `*Error*`. An empty include list admits every name; the exclude list is
/// checked afterwards and always wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionLoggerConfig {
    /// Only names matching one of these are logged (all names if empty)
    pub include_patterns: Vec<String>,
    /// Names matching one of these are never logged
    pub exclude_patterns: Vec<String>,
}

impl Default for ActionLoggerConfig {
    fn default() -> Self {
        Self {
            include_patterns: vec![],
            exclude_patterns: noisy_actions(),
        }
    }
}

impl ActionLoggerConfig {
    /// Build a filter from comma-separated pattern lists.
    ///
    /// `None` for `include` admits everything, `None` for `exclude` keeps
    /// the default `Tick,Render` exclusions.
    ///
    /// ```
    /// use flow_dispatch_core::debug::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("Count*, DidLoad"), None);
    /// assert!(config.should_log("CountReset"));
    /// assert!(config.should_log("DidLoad"));
    /// assert!(!config.should_log("DidFail"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude.map_or_else(noisy_actions, split_patterns),
        }
    }

    /// Build a filter from already split pattern lists.
    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Parse a filter from JSON. Missing fields take their default values.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn should_log(&self, action_name: &str) -> bool {
        let matches_any =
            |patterns: &[String]| patterns.iter().any(|p| glob_match(p, action_name));

        let included = self.include_patterns.is_empty() || matches_any(&self.include_patterns);
        included && !matches_any(&self.exclude_patterns)
    }
}

/// One logged action
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    /// `Action::name()`
    pub name: &'static str,
    /// `ActionSummary::summary()`
    pub summary: String,
    pub logged_at: Instant,
    /// Monotonic per log, survives eviction of older entries
    pub sequence: u64,
    /// `None` until the rest of the chain returned, then whether the store
    /// reduced the action
    pub reached_reducer: Option<bool>,
}

impl ActionLogEntry {
    pub fn new(name: &'static str, summary: String, sequence: u64) -> Self {
        Self {
            name,
            summary,
            logged_at: Instant::now(),
            sequence,
            reached_reducer: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.logged_at.elapsed()
    }

    /// Age of the entry as `150ms` below one second, `2.3s` above.
    pub fn elapsed_display(&self) -> String {
        let elapsed = self.elapsed();
        match elapsed.as_millis() {
            ms @ 0..=999 => format!("{}ms", ms),
            _ => format!("{:.1}s", elapsed.as_secs_f64()),
        }
    }
}

/// Size and filter of an [`ActionLog`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionLogConfig {
    /// Entries kept before the oldest is evicted; 0 disables storage
    pub capacity: usize,
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self::with_capacity(100)
    }
}

impl ActionLogConfig {
    /// Default filter with a custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, ActionLoggerConfig::default())
    }

    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }

    /// Parse a log config from JSON. Missing fields take their default values.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Bounded, oldest-first record of recent actions
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    next_sequence: u64,
}

impl ActionLog {
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            config,
            next_sequence: 0,
        }
    }

    /// Append `action` if the filter admits it, evicting the oldest entry
    /// when full.
    ///
    /// Returns the entry's sequence number, `None` if nothing was stored.
    pub fn log<A: ActionSummary>(&mut self, action: &A) -> Option<u64> {
        let name = action.name();
        if self.config.capacity == 0 || !self.config.filter.should_log(name) {
            return None;
        }

        while self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries
            .push_back(ActionLogEntry::new(name, action.summary(), sequence));
        Some(sequence)
    }

    /// Record whether the entry with `sequence` reached the reducer.
    ///
    /// Entries that were already evicted are ignored.
    pub fn mark_reached(&mut self, sequence: u64, reached: bool) {
        // almost always the newest entry
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.sequence == sequence)
        {
            entry.reached_reducer = Some(reached);
        }
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// Up to `count` entries, newest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry; sequence numbers keep counting.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn config(&self) -> &ActionLogConfig {
        &self.config
    }
}

/// Shared read access to the log of an [`ActionLoggerMiddleware`] that has
/// been moved into a store.
#[derive(Debug, Clone)]
pub struct ActionLogHandle(Rc<RefCell<ActionLog>>);

impl ActionLogHandle {
    /// Borrow the log. Do not hold the borrow across `Store::send`.
    pub fn borrow(&self) -> Ref<'_, ActionLog> {
        self.0.borrow()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Middleware tracing every admitted action, optionally into an [`ActionLog`].
///
/// It never blocks or rewrites actions: filtering decides only what is
/// logged. Put it first in the middleware list to see actions that later
/// middleware swallow; their entries end up with `reached_reducer == Some(false)`.
#[derive(Debug)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<ActionLogHandle>,
    active: bool,
}

impl ActionLoggerMiddleware {
    /// Trace through `tracing` only, without storage
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            active: true,
        }
    }

    /// Trace and store entries; the log uses the same filter as tracing
    pub fn with_log(config: ActionLogConfig) -> Self {
        let filter = config.filter.clone();
        let log = ActionLogHandle(Rc::new(RefCell::new(ActionLog::new(config))));
        Self {
            config: filter,
            log: Some(log),
            active: true,
        }
    }

    /// Storage with [`ActionLogConfig::default`]
    pub fn with_default_log() -> Self {
        Self::with_log(ActionLogConfig::default())
    }

    /// Tracing only, skipping `Tick` and `Render`
    pub fn default_filtering() -> Self {
        Self::new(ActionLoggerConfig::default())
    }

    /// Tracing only, every action
    pub fn log_all() -> Self {
        Self::new(ActionLoggerConfig::with_patterns(vec![], vec![]))
    }

    /// Turn logging on or off; an inactive logger only forwards.
    ///
    /// ```ignore
    /// let logger = ActionLoggerMiddleware::with_default_log().active(args.debug);
    /// ```
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Handle to the stored log, `None` without storage.
    ///
    /// Take it before moving the middleware into a store.
    pub fn log_handle(&self) -> Option<ActionLogHandle> {
        self.log.clone()
    }

    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }
}

impl<S: 'static, A: ActionSummary> Middleware<S, A> for ActionLoggerMiddleware {
    fn handle(&self, action: A, _api: &MiddlewareApi<S, A>, next: &Next<A>) {
        if !self.active {
            next.run(action);
            return;
        }

        let name = action.name();
        if self.config.should_log(name) {
            tracing::debug!(action = %name, "action");
        }
        let sequence = self
            .log
            .as_ref()
            .and_then(|log| log.0.borrow_mut().log(&action));

        let reached = next.run(action);

        if let (Some(log), Some(sequence)) = (&self.log, sequence) {
            log.0.borrow_mut().mark_reached(sequence, reached);
        }
    }
}

/// Match `text` against a glob where `*` is any run of characters
/// (including none) and `?` exactly one character.
///
/// ```
/// use flow_dispatch_core::debug::glob_match;
///
/// assert!(glob_match("Did*", "DidLoad"));
/// assert!(glob_match("Count?", "Counts"));
/// assert!(!glob_match("Count", "CountReset"));
/// ```
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // last `*` seen and the text position it currently stops at
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    // let the `*` swallow one more character and retry
                    star = Some((star_p, star_t + 1));
                    p = star_p + 1;
                    t = star_t + 1;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
