//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and files
//! for following concurrent dispatches across a telescope fleet.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let log_dir = PathBuf::from("log");
        let file_output = fs::create_dir_all(&log_dir).is_ok();

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(log_level));

        let result = if file_output {
            let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            // Flushes on drop; logging lives for the whole process.
            std::mem::forget(guard);

            tracing_subscriber::registry()
                .with(console)
                .with(
                    fmt::layer()
                        .with_writer(file_writer)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(EnvFilter::new(log_level)),
                )
                .try_init()
        } else {
            tracing_subscriber::registry().with(console).try_init()
        };

        if result.is_err() {
            // A global subscriber is already set (embedding process or test harness)
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            file_output = file_output,
            "STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("PILOT_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for action lifecycle events
pub fn log_action_operation(
    action: &str,
    telescope: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        action = %action,
        telescope = %telescope,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "ACTION_OPERATION"
    );
}

/// Log structured data for dispatch bookkeeping
pub fn log_dispatch_operation(
    operation: &str,
    action_id: &str,
    target_id: &str,
    scope: &str,
    telescopes: &[String],
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        action_id = %action_id,
        target_id = %target_id,
        scope = %scope,
        telescopes = ?telescopes,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "DISPATCH_OPERATION"
    );
}

/// Log structured data for resource pool mutations
pub fn log_pool_operation(operation: &str, telescopes: &[String], idle_after: usize) {
    tracing::debug!(
        operation = %operation,
        telescopes = ?telescopes,
        idle_after = idle_after,
        timestamp = %Utc::now().to_rfc3339(),
        "POOL_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
