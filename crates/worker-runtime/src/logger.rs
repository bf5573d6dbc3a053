//! # Worker Log
//!
//! The `loggingProvider` of the configuration. It does not own a sink: every
//! record becomes a `tracing` event carrying the component id and a numeric
//! log code, and the binary's subscriber decides where it goes.
//!
//! ## Configuration
//!
//! | Key | Meaning | Default |
//! |-----|---------|---------|
//! | `name` | Component id stamped on every record | `24` |
//! | `loglevel` / `ll` | 0 off, 1-2 error, 3 warn, 4 info, 5 debug | `4` |

use parking_lot::RwLock;
use serde_json::Value;
use shared_types::{ConfigMap, DopResult, Provider};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};

/// Component id of the worker.
pub const WORKER_COMPONENT: &str = "24";

/// Record severity, numerically ordered like the `loglevel` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Unusable state.
    Critical = 1,
    /// Failed operation.
    Error = 2,
    /// Unexpected but handled.
    Warn = 3,
    /// Normal operation.
    Info = 4,
    /// Diagnostics.
    Debug = 5,
}

#[derive(Debug, Clone)]
struct LogSettings {
    name: String,
    level: i64,
}

/// Shared logger handle.
#[derive(Debug, Clone)]
pub struct WorkerLog {
    settings: Arc<RwLock<LogSettings>>,
}

impl WorkerLog {
    /// Logger with the default component id and level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: Arc::new(RwLock::new(LogSettings {
                name: WORKER_COMPONENT.to_string(),
                level: Severity::Info as i64,
            })),
        }
    }

    /// Component id.
    #[must_use]
    pub fn name(&self) -> String {
        self.settings.read().name.clone()
    }

    /// Configured level, 0..=5.
    #[must_use]
    pub fn level(&self) -> i64 {
        self.settings.read().level
    }

    /// Subscriber filter matching the configured level.
    #[must_use]
    pub fn level_filter(&self) -> LevelFilter {
        match self.level() {
            i64::MIN..=0 => LevelFilter::OFF,
            1 | 2 => LevelFilter::ERROR,
            3 => LevelFilter::WARN,
            4 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    }

    /// Whether records of `severity` pass the configured level.
    #[must_use]
    pub fn enabled(&self, severity: Severity) -> bool {
        severity as i64 <= self.level()
    }

    /// Emit one record.
    pub fn log(&self, code: u32, severity: Severity, detail: &Value) {
        if !self.enabled(severity) {
            return;
        }
        let name = self.name();
        match severity {
            Severity::Critical | Severity::Error => {
                error!(component = %name, code, %detail, "[Worker] {}", code);
            }
            Severity::Warn => warn!(component = %name, code, %detail, "[Worker] {}", code),
            Severity::Info => info!(component = %name, code, %detail, "[Worker] {}", code),
            Severity::Debug => debug!(component = %name, code, %detail, "[Worker] {}", code),
        }
    }

    /// Debug record.
    pub fn debug(&self, code: u32, detail: &Value) {
        self.log(code, Severity::Debug, detail);
    }

    /// Info record.
    pub fn info(&self, code: u32, detail: &Value) {
        self.log(code, Severity::Info, detail);
    }

    /// Warning record.
    pub fn warn(&self, code: u32, detail: &Value) {
        self.log(code, Severity::Warn, detail);
    }

    /// Error record.
    pub fn error(&self, code: u32, detail: &Value) {
        self.log(code, Severity::Error, detail);
    }
}

impl Default for WorkerLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for WorkerLog {
    fn init(&self, config: &str) -> DopResult<()> {
        let cfg = ConfigMap::parse(config);
        let mut settings = self.settings.write();
        settings.name = cfg.get_str(&["name"], WORKER_COMPONENT);
        settings.level = cfg.get_int(&["loglevel", "ll"], Severity::Info as i64);
        Ok(())
    }
}
