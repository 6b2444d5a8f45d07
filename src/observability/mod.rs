//! Observability: structured logging, the entry event bus and correlation
//! context.
//!
//! Metrics are emitted through the `metrics` facade; installing a recorder is
//! left to the embedding application.

mod event_bus;
mod logging;
mod request_context;

pub use event_bus::{EventBus, FilteredReceiver, global_event_bus, record_event};
pub use logging::{LogFormat, LoggingConfig};
pub use request_context::{
    OperationContext, OperationContextGuard, current_context, current_correlation_id,
    enter_operation_context, scope_operation_context,
};

use crate::config::LoggingSettings;
use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Marker returned by [`init`]; logging stays installed for the process.
#[derive(Debug)]
pub struct ObservabilityHandle {
    format: LogFormat,
}

impl ObservabilityHandle {
    /// The log format that was installed.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Initializes logging from config settings with env overrides.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the log file
/// cannot be opened.
pub fn init_from_config(
    settings: Option<&LoggingSettings>,
    verbose: bool,
) -> Result<ObservabilityHandle> {
    init(LoggingConfig::from_settings(settings, verbose))
}

/// Installs the global tracing subscriber.
///
/// Logs go to stderr, or are appended to the configured file without ANSI
/// colors.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the log file
/// cannot be opened.
pub fn init(config: LoggingConfig) -> Result<ObservabilityHandle> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(already_initialized());
    }
    let LoggingConfig {
        format,
        filter,
        file,
    } = config;

    let (writer, to_terminal) = match file {
        Some(path) => (BoxMakeWriter::new(Mutex::new(open_log_file(&path)?)), false),
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    tracing_subscriber::registry()
        .with(fmt_layer(format, writer, to_terminal))
        .with(filter)
        .try_init()
        .map_err(init_error)?;

    OBSERVABILITY_INIT.set(()).map_err(|()| already_initialized())?;
    Ok(ObservabilityHandle { format })
}

fn fmt_layer(format: LogFormat, writer: BoxMakeWriter, to_terminal: bool) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(to_terminal)
        .with_target(true);
    match format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty if to_terminal => layer.pretty().boxed(),
        LogFormat::Pretty => layer.boxed(),
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_log_dir".to_string(),
            cause: e.to_string(),
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::OperationFailed {
            operation: "open_log_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })
}

fn already_initialized() -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: "observability already initialized".to_string(),
    }
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_open_log_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("skillvault.log");
        assert!(open_log_file(&path).is_ok());
        assert!(path.exists());
    }
}
