use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt};

use crate::storage;

/// Logs go to `~/.evcharge/evcharge.log`; the terminal belongs to the UI.
/// Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init() -> io::Result<()> {
    let Some(dir) = storage::data_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("evcharge.log"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|err| io::Error::other(err.to_string()))
}
