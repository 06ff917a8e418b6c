use anyhow::{Context, Result};
use genbench_config::{LogFormat, LogLevel, LogRotation, LogTarget, LoggingConfig};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps background log writers alive; drop it only at process exit
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

/// Initialize logging from configuration.
///
/// `level_override` (the CLI flag) wins over the configured level.
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) -> Result<LoggingGuard> {
    let level = level_override
        .map(str::to_string)
        .unwrap_or_else(|| config.level.to_string());

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guards = Vec::new();

    for target in &config.targets {
        match target {
            LogTarget::Console { level } => {
                let layer = build_layer(config.format, config.include_location, std::io::stderr, true);
                layers.push(with_target_level(layer, *level));
            }
            LogTarget::File {
                path,
                level,
                rotation,
            } => {
                let appender = file_appender(Path::new(path), *rotation)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);
                guards.push(guard);
                let layer = build_layer(config.format, config.include_location, writer, false);
                layers.push(with_target_level(layer, *level));
            }
        }
    }

    if let Err(_) = tracing_subscriber::registry()
        .with(layers)
        .with(level_filter(&level))
        .try_init()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(LoggingGuard { _guards: guards })
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    if let Err(_) = tracing_subscriber::fmt()
        .with_env_filter(level_filter(log_level))
        .with_writer(std::io::stderr)
        .try_init()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Filter for a level string, falling back to `RUST_LOG` and then `info`
pub fn level_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn build_layer<W>(format: LogFormat, include_location: bool, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(include_location)
        .with_line_number(include_location);

    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Text => layer.boxed(),
    }
}

fn with_target_level(layer: BoxedLayer, level: Option<LogLevel>) -> BoxedLayer {
    match level {
        Some(level) => layer.with_filter(to_level_filter(level)).boxed(),
        None => layer,
    }
}

fn to_level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

fn file_appender(
    path: &Path,
    rotation: LogRotation,
) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    Ok(match rotation {
        LogRotation::Never => tracing_appender::rolling::never(directory, file_name),
        LogRotation::Hourly => tracing_appender::rolling::hourly(directory, file_name),
        LogRotation::Daily => tracing_appender::rolling::daily(directory, file_name),
    })
}
