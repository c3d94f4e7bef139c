use color_eyre::eyre::Result;
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Log filename used by the tool.
pub const LOG_FILENAME: &str = "flowvault.log";

/// Configuration for the logging system.
pub struct LogConfig {
    /// Directory where log files will be written.
    pub log_dir: PathBuf,
    /// Default log level when RUST_LOG is not set.
    pub log_level: Level,
    /// Whether to use JSON format for logs.
    pub json_format: bool,
    /// Log rotation period.
    pub rotation: Rotation,
}

impl Default for LogConfig {
    fn default() -> Self {
        let log_dir = crate::config::flowvault_home()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("logs");

        Self {
            log_dir,
            log_level: Level::INFO,
            json_format: false,
            rotation: Rotation::DAILY,
        }
    }
}

// RUST_LOG wins when set; otherwise only our own crate logs at the
// configured level. EnvFilter is not Clone, so each layer builds its own.
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("flowvault={level}")))
}

/// Initialize logging: a rotating file in the log directory plus stderr.
///
/// Console output goes to stderr so that run summaries printed on stdout
/// stay machine-consumable. JSON format is meant for log aggregation;
/// the human format keeps ANSI colors on the terminal only.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created.
pub fn init_logging(config: LogConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)?;

    let file_appender = RollingFileAppender::new(config.rotation, &config.log_dir, LOG_FILENAME);
    let registry = tracing_subscriber::registry().with(ErrorLayer::default());

    if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(file_appender)
                    .with_target(true)
                    .with_filter(level_filter(config.log_level)),
            )
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_filter(level_filter(config.log_level)),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_target(true)
                    .with_ansi(false)
                    .with_filter(level_filter(config.log_level)),
            )
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_filter(level_filter(config.log_level)),
            )
            .init();
    }

    Ok(())
}

/// Parse rotation period from string.
#[must_use]
pub fn parse_rotation(s: &str) -> Rotation {
    match s.to_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.log_level, Level::INFO);
        assert!(!config.json_format);
        assert!(config.log_dir.ends_with("logs"));
    }

    #[test]
    fn test_parse_rotation_hourly() {
        let rotation = parse_rotation("hourly");
        // Rotation doesn't impl PartialEq, so use debug
        let debug = format!("{rotation:?}");
        assert!(debug.contains("Hourly") || debug.contains("hourly") || debug.contains("3600"));
    }

    #[test]
    fn test_parse_rotation_never() {
        let rotation = parse_rotation("never");
        let debug = format!("{rotation:?}");
        assert!(debug.contains("Never") || debug.contains("never"));
    }

    #[test]
    fn test_parse_rotation_unknown_defaults_to_daily() {
        let rotation = parse_rotation("weekly");
        let debug = format!("{rotation:?}");
        let daily = format!("{:?}", parse_rotation("daily"));
        assert_eq!(debug, daily);
    }

    #[test]
    fn test_parse_rotation_case_insensitive() {
        let _ = parse_rotation("HOURLY");
        let _ = parse_rotation("Never");
        let _ = parse_rotation("DAILY");
    }

    #[test]
    fn test_log_filename_constant() {
        assert_eq!(LOG_FILENAME, "flowvault.log");
    }
}
