//! Logging infrastructure - structured tracing for reference events
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels, overridable through `RUST_LOG`
//! - Zero-cost when disabled
//! - Console output (human-readable or JSON) and optional file output

use crate::errors::{BridgeError, BridgeOp};
use crate::handle::Handle;
use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub use tracing::{debug, error, info, trace, warn};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Enable file logging
    pub file_output: bool,
    /// Log file path (if file_output enabled)
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_output: false,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // OBJREF_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("OBJREF_LOG_LEVEL") {
            config.level = parse_level(&level_str);
        }

        // OBJREF_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("OBJREF_LOG_FILE") {
            config.file_output = true;
            config.log_path = Some(path);
        }

        config.json_format = std::env::var("OBJREF_LOG_JSON").is_ok();
        config.show_spans = std::env::var("OBJREF_LOG_SPANS").is_ok();

        config
    }

    /// Errors only
    pub fn performance() -> Self {
        Self {
            level: Level::ERROR,
            ..Self::default()
        }
    }

    /// Every bridge call, mirrored to a file
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            file_output: true,
            log_path: Some("objref_column.log".to_string()),
            json_format: false,
            show_spans: true,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with default configuration
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration. Only the first call
/// installs a subscriber.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "objref_column={}",
                config.level.as_str().to_lowercase()
            ))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);

        if config.json_format {
            layers.push(
                fmt::layer()
                    .json()
                    .with_writer(io::stdout)
                    .with_span_events(span_events.clone())
                    .with_target(true)
                    .boxed(),
            );
        } else {
            layers.push(
                fmt::layer()
                    .with_writer(io::stdout)
                    .with_span_events(span_events.clone())
                    .with_target(true)
                    .with_thread_ids(cfg!(debug_assertions))
                    .with_line_number(cfg!(debug_assertions))
                    .boxed(),
            );
        }

        if let Some(path) = config.log_path.as_deref().filter(|_| config.file_output) {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "objref_column.log".into());

            layers.push(
                fmt::layer()
                    .with_writer(tracing_appender::rolling::never(directory, file_name))
                    .with_ansi(false)
                    .with_span_events(span_events)
                    .boxed(),
            );
        }

        // Another subscriber may already be installed by the host
        let _ = tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init();
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Reference-event logging functions
// ============================================================================

/// Log one bridge call
#[inline]
pub fn log_bridge_call(bridge: &str, op: BridgeOp, handle: Handle) {
    trace!(
        event = "bridge_call",
        bridge = bridge,
        op = %op,
        handle = %handle,
        "Bridge call"
    );
}

/// Log a failed bridge call
pub fn log_bridge_failure(bridge: &str, op: BridgeOp, handle: Handle, err: &BridgeError) {
    warn!(
        event = "bridge_failure",
        bridge = bridge,
        op = %op,
        handle = %handle,
        error = %err,
        "Bridge call failed"
    );
}

/// Log a failed rollback after an overwrite could not acquire its new handle
pub fn log_rollback_failure(index: usize, handle: Handle, err: &BridgeError) {
    error!(
        event = "rollback_failure",
        index = index,
        handle = %handle,
        error = %err,
        "Could not restore previous handle; cell left empty"
    );
}

/// A self-assignment acquired a second reference it could not give back.
pub fn log_extra_reference(index: usize, handle: Handle, err: &BridgeError) {
    error!(
        event = "extra_reference",
        index = index,
        handle = %handle,
        error = %err,
        "Could not release duplicate reference; host object leaks one count"
    );
}

/// Log column teardown summary
pub fn log_teardown(released: usize, failed: usize) {
    debug!(
        event = "teardown",
        released = released,
        failed = failed,
        "Column destroyed"
    );
}

/// Log teardown that could not release every reference
pub fn log_teardown_failure(failed: usize, threshold: usize) {
    warn!(
        event = "teardown_failure",
        failed = failed,
        threshold = threshold,
        "Column teardown leaked foreign references"
    );
}

/// Log library initialization
pub fn log_runtime_init() {
    info!(event = "runtime_init", "objref-column initializing");
}

/// Performance tracking utilities
pub mod perf {
    use std::time::Instant;
    use tracing::debug;

    /// Track operation duration (returns guard that logs on drop)
    #[must_use]
    pub fn track(operation: &'static str) -> PerformanceGuard {
        PerformanceGuard {
            operation,
            start: Instant::now(),
        }
    }

    pub struct PerformanceGuard {
        operation: &'static str,
        start: Instant,
    }

    impl Drop for PerformanceGuard {
        fn drop(&mut self) {
            let elapsed = self.start.elapsed();
            debug!(
                operation = self.operation,
                duration_us = elapsed.as_micros() as u64,
                "operation completed"
            );
        }
    }
}
