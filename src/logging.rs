use std::path::PathBuf;

use color_eyre::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::Mode;

/// Directory for log files: $XDG_DATA_HOME/todos/logs
pub fn log_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("todos")
    .join("logs")
}

/// Install a file subscriber. The terminal belongs to the UI, so nothing is
/// written to stdout or stderr. Keep the guard alive until exit.
pub fn init(mode: Mode) -> Result<WorkerGuard> {
  let dir = log_dir();
  std::fs::create_dir_all(&dir)?;

  let appender = RollingFileAppender::new(Rotation::DAILY, &dir, "todos.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let default_level = if mode.is_development() {
    "todos=debug"
  } else {
    "todos=info"
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()?;

  Ok(guard)
}
