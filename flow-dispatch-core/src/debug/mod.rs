//! Debug and inspection utilities
//!
//! - **Action Logging**: pattern-filtered tracing of every action, with an
//!   optional in-memory ring buffer a UI can display
//!
//! # Action Logging
//!
//! ```ignore
//! use flow_dispatch::debug::{ActionLoggerConfig, ActionLoggerMiddleware};
//!
//! // Only log Count* actions, skip the tick spam
//! let config = ActionLoggerConfig::new(Some("Count*"), Some("Tick"));
//! let logger = ActionLoggerMiddleware::new(config);
//! ```

pub mod action_logger;

pub use action_logger::{
    glob_match, ActionLog, ActionLogConfig, ActionLogEntry, ActionLogHandle, ActionLoggerConfig,
    ActionLoggerMiddleware,
};
