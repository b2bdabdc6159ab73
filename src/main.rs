mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod forms;
mod logging;
mod mutation;
mod pagination;
mod query;
mod routes;
mod ui;

use clap::Parser;
use color_eyre::config::{HookBuilder, PanicHook};
use color_eyre::Result;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "todos")]
#[command(about = "A terminal task list for a remote todo API")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./todos.yaml, then $XDG_CONFIG_HOME/todos/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the todo API
  #[arg(short, long)]
  base_url: Option<String>,

  /// Run in development mode (cache inspector, error details, debug logs)
  #[arg(long)]
  dev: bool,
}

/// Report panics through tracing: the terminal is in raw mode and owned by
/// the UI, so nothing may be printed to it. Until this runs, the default
/// hook still writes to stderr.
fn install_panic_hook(panic_hook: PanicHook) {
  std::panic::set_hook(Box::new(move |info| {
    error!("{}", panic_hook.panic_report(info));
  }));
}

#[tokio::main]
async fn main() -> Result<()> {
  let (panic_hook, eyre_hook) = HookBuilder::default().into_hooks();
  eyre_hook.install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line wins over file and environment
  if args.dev {
    config.mode = config::Mode::Development;
  }
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
    config.validate()?;
  }

  let _log_guard = logging::init(config.mode)?;
  install_panic_hook(panic_hook);

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
