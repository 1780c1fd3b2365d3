//! Logging setup built on the `tracing` ecosystem.
//!
//! [`init_minimal_logging`] is meant for tests and early start-up.
//! [`init_logging`] installs the configured console layer and an optional
//! daily-rolling file layer. Processes that own stdout for their protocol use
//! [`init_logging_to`] with [`LogTarget::Stderr`].

use std::io::{stderr, stdout};
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{CoreError, LoggingError};
use crate::utils;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps the non-blocking file writer alive until the process exits.
static LOG_WORKER_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Installs a stderr subscriber filtered by `RUST_LOG` (default `info`).
///
/// Errors are ignored when a global subscriber is already set.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
}

fn level_filter(level: &str) -> Result<String, CoreError> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            return Err(LoggingError::InitializationFailure(format!("Invalid log level in config: {}", other)).into())
        }
    };
    Ok(level.to_string())
}

fn create_file_layer(log_path: &Path, format: &str) -> Result<(BoxedLayer, WorkerGuard), CoreError> {
    let parent = log_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    utils::fs::ensure_dir_exists(parent)?;

    let file_name = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("ivi-wm.log"));
    let appender = tracing_appender::rolling::daily(parent, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = match format.to_lowercase().as_str() {
        "json" => fmt::layer().json().with_writer(writer).with_ansi(false).boxed(),
        _ => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
    };
    Ok((layer, guard))
}

/// Stream the console layer writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTarget {
    #[default]
    Stdout,
    Stderr,
}

fn console_layer<W>(format: &str, writer: W, ansi: bool, filter: &str) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format.to_lowercase().as_str() {
        "json" => fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(EnvFilter::new(filter))
            .boxed(),
        _ => fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_filter(EnvFilter::new(filter))
            .boxed(),
    }
}

/// Installs the global subscriber described by `config`, logging to stdout.
///
/// When `is_reload` is true a subscriber that is already installed is not an
/// error; the file writer guard is still replaced.
pub fn init_logging(config: &LoggingConfig, is_reload: bool) -> Result<(), CoreError> {
    init_logging_to(config, is_reload, LogTarget::Stdout)
}

/// [`init_logging`] with an explicit console stream.
pub fn init_logging_to(config: &LoggingConfig, is_reload: bool, target: LogTarget) -> Result<(), CoreError> {
    let filter = level_filter(&config.level)?;

    let console = match target {
        LogTarget::Stdout => console_layer(&config.format, stdout, atty::is(atty::Stream::Stdout), &filter),
        LogTarget::Stderr => console_layer(&config.format, stderr, atty::is(atty::Stream::Stderr), &filter),
    };

    let mut layers: Vec<BoxedLayer> = vec![console];
    let mut new_guard = None;
    if let Some(path) = &config.file_path {
        let (file_layer, guard) = create_file_layer(path, &config.format)?;
        layers.push(file_layer.with_filter(EnvFilter::new(filter)).boxed());
        new_guard = Some(guard);
    }

    let result = Registry::default().with(layers).try_init();

    match LOG_WORKER_GUARD.lock() {
        Ok(mut slot) => *slot = new_guard,
        Err(e) => eprintln!("[ERROR] Failed to lock log worker guard: {}. Log flushing may be affected.", e),
    }

    match result {
        Ok(()) => Ok(()),
        Err(e) if is_reload => {
            eprintln!("[INFO] Logging re-initialization attempted; previous subscriber stays active: {}", e);
            Ok(())
        }
        Err(e) => Err(LoggingError::InitializationFailure(format!(
            "Failed to set global tracing subscriber. Was it already initialized? Error: {}",
            e
        ))
        .into()),
    }
}
