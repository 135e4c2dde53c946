use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::Result;

const LOG_DIR_VAR: &str = "COSMIC_LS_LOG_DIR";

fn log_dir() -> PathBuf {
    std::env::var_os(LOG_DIR_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("cosmic_ls"))
}

/// Logs go to a file, stdout carries the LSP messages. The returned guard flushes
/// pending lines when dropped, so it has to outlive the server.
pub fn init_tracing() -> Result<WorkerGuard> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "cosmic_ls.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_timer(ChronoUtc::rfc_3339())
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_target(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()?;

    tracing::info!(log_dir = %log_dir.display(), "cosmic language server starting up");

    Ok(guard)
}
