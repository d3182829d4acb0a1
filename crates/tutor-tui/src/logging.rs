use anyhow::{anyhow, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `RUST_LOG` wins when set; otherwise `--verbose` picks debug over info.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    })
}

/// Log to stderr, for the one-shot commands.
pub fn init_stderr(verbose: bool) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Log to a file while the terminal UI owns the screen.
pub fn init_file(verbose: bool) -> Result<PathBuf> {
    let log_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?
        .join("tutor");
    fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("tutor.log");
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter(verbose))
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(log_path)
}
