use std::{fs, path::Path};

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Console output goes to stderr at `console_level` (overridable with
/// `RUST_LOG`); everything at `file_level` and above is appended to
/// `log_path`.
pub fn init_logging(console_level: LevelFilter, log_path: &Path, file_level: LevelFilter) -> Result<()> {
    let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create log directory {}", directory.display()))?;
    let file_name = log_path.file_name().unwrap_or_else(|| "framekit.log".as_ref());
    let file_appender = tracing_appender::rolling::never(directory, file_name);

    let console_filter = EnvFilter::builder()
        .with_default_directive(console_level.into())
        .from_env_lossy();
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_filter);
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(file_level);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install logger")?;

    Ok(())
}
