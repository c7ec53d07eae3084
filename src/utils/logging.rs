use anyhow::Result;
use clap::ValueEnum;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::sources::ServiceConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match *self {
            LogLevel::TRACE => "trace",
            LogLevel::DEBUG => "debug",
            LogLevel::INFO => "info",
            LogLevel::WARN => "warn",
            LogLevel::ERROR => "error",
        }
    }
}

/// Resolves the logging config: the command line level wins over the file one.
pub fn resolve(service_config: Option<&ServiceConfig>, arg_log_level: Option<LogLevel>) -> LoggingConfig {
    let from_file = service_config.and_then(|config| config.settings.logging.clone());
    let format = from_file
        .as_ref()
        .map(|config| config.format.clone())
        .unwrap_or_default();
    let level = match (arg_log_level, from_file) {
        (Some(level), _) => level.as_str().to_owned(),
        (None, Some(config)) => config.level,
        (None, None) => "info".to_owned(),
    };
    LoggingConfig::new(level, format)
}

pub fn run(service_config: Option<&ServiceConfig>, arg_log_level: Option<LogLevel>) -> Result<()> {
    init_logging(&resolve(service_config, arg_log_level));
    Ok(())
}

/// Initialize tracing with the desired config.
pub fn init_logging(cfg: &LoggingConfig) {
    let env_filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Base layer: filter + writer
    let registry = tracing_subscriber::registry().with(env_filter);

    match cfg.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .flatten_event(true)
                .with_ansi(false)
                .with_writer(std::io::stderr);

            let _ = registry.with(layer).try_init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_timer(UtcTime::rfc_3339())
                .with_ansi(true)
                .with_writer(std::io::stderr);

            let _ = registry.with(layer).try_init();
        }
    };
}
