pub mod config;
pub mod datetime;
pub mod notify;
pub mod query;
pub mod quickadd;
pub mod stats;
pub mod storage;
pub mod store;
pub mod task;

use std::io::IsTerminal;

use anyhow::anyhow;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::notify::Notifier;
use crate::store::TaskStore;

/// Wires the default stack for an embedding shell: config, file storage in
/// the resolved data directory, and the caller's notifier.
#[tracing::instrument(skip_all)]
pub fn open_default_store(notifier: Box<dyn Notifier>) -> anyhow::Result<TaskStore> {
    let cfg = config::Config::load(None)?;
    let data_dir = config::resolve_data_dir(&cfg, None)?;
    let file_storage = storage::JsonFileStorage::open(&data_dir)?;

    Ok(TaskStore::open_with_categories(
        Box::new(file_storage),
        notifier,
        cfg.default_categories(),
    ))
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
