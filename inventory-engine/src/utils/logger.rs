//! Logging Infrastructure
//!
//! Structured logging setup with support for both development and production environments
//! Features:
//! - Daily rotating application logs (deleted after 14 days)
//! - Permanent audit logs (never deleted): archive records, merges, force-deletes

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::filter_fn, fmt, layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Target used by [`audit_log!`](crate::audit_log)
pub const AUDIT_TARGET: &str = "audit";

/// Application logs older than this are removed by [`cleanup_old_logs`]
pub const APP_LOG_RETENTION_DAYS: i64 = 14;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Clean up old application log files (older than 14 days)
///
/// Only `app/app.YYYY-MM-DD.log` files are considered; audit logs are kept.
/// Returns the number of deleted files.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let mut deleted = 0;
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let date = name
            .strip_prefix("app.")
            .and_then(|d| d.strip_suffix(".log"))
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        if let Some(date) = date
            && date < cutoff
        {
            fs::remove_file(&path)?;
            deleted += 1;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }

    Ok(deleted)
}

fn daily_appender(dir: &Path, prefix: &str) -> anyhow::Result<RollingFileAppender> {
    fs::create_dir_all(dir)?;
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)?)
}

/// File sink; `audit` selects audit-only events, otherwise everything else
fn file_layer(writer: RollingFileAppender, json_format: bool, audit: bool) -> BoxedLayer {
    let only = filter_fn(move |meta| (meta.target() == AUDIT_TARGET) == audit);
    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_writer(Mutex::new(writer))
            .with_filter(only)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(Mutex::new(writer))
            .with_filter(only)
            .boxed()
    }
}

/// Initialize the logging system with daily rotating logs
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug", "inventory_engine=trace")
/// * `json_format` - Whether to use JSON format (true for production, false for development)
/// * `log_dir` - Optional directory for file logging (e.g., Some("./logs"))
///
/// # Examples
/// ```no_run
/// # use inventory_engine::utils::logger::init_logger_with_file;
/// // Development setup (console only)
/// init_logger_with_file("debug", false, None)?;
///
/// // Production setup (console + file)
/// init_logger_with_file("info", true, Some("./logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer: BoxedLayer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(env_filter)
            .boxed()
    };

    let mut layers = vec![console_layer];

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        let app_log = daily_appender(&log_dir.join("app"), "app")?;
        let audit_log = daily_appender(&log_dir.join("audit"), "audit")?;

        layers.push(file_layer(app_log, json_format, false));
        layers.push(file_layer(audit_log, json_format, true));

        // Start cleanup task when running inside a runtime
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(periodic_cleanup(log_dir.to_path_buf()));
        }
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}

/// Periodic cleanup task - runs every hour to clean old logs
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
        sleep(Duration::from_secs(3600)).await;
    }
}

/// Initialize the logging system (console only)
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Timestamp attached to audit events
pub fn audit_timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

/// Audit log helper - records write-once archive copies and destructive operations
///
/// Audit logs are stored in `audit/audit.YYYY-MM-DD.log` and never pruned.
///
/// # Examples
/// ```no_run
/// # use inventory_engine::audit_log;
/// audit_log!("archive", "products_master_archive:vg_001");
/// audit_log!("merge", "vg_001", "merged into vg_002");
/// ```
#[macro_export]
macro_rules! audit_log {
    ($action:expr, $resource:expr) => {
        tracing::info!(
            target: "audit",
            action = $action,
            resource = %$resource,
            timestamp = %$crate::utils::logger::audit_timestamp(),
            "AUDIT"
        );
    };
    ($action:expr, $resource:expr, $details:expr) => {
        tracing::info!(
            target: "audit",
            action = $action,
            resource = %$resource,
            details = %$details,
            timestamp = %$crate::utils::logger::audit_timestamp(),
            "AUDIT"
        );
    };
}
