//! Global tracing subscriber for batch runs.
//!
//! `log` records from the worker code are forwarded into `tracing`, so a
//! single `EnvFilter` governs everything. `RUST_LOG` wins over the configured
//! level when set.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use crate::config::{LogFormat, LogSettings};

static INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to forward log records: {0}")]
    LogTracer(#[from] log::SetLoggerError),

    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

fn build_env_filter(settings: &LogSettings) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level).map_err(|source| LoggingError::Filter {
        filter: settings.level.clone(),
        source,
    })
}

/// Installs the subscriber. Later calls are no-ops.
pub fn init(settings: &LogSettings) -> Result<(), LoggingError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let env_filter = build_env_filter(settings)?;
    tracing_log::LogTracer::init()?;

    match settings.format {
        LogFormat::Text => {
            let subscriber = Registry::default()
                .with(env_filter)
                .with(fmt::layer().with_target(true));
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = Registry::default()
                .with(env_filter)
                .with(fmt::layer().json().with_current_span(true));
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let _ = INITIALIZED.set(());
    tracing::debug!("Logging initialized ({:?})", settings.format);
    Ok(())
}
