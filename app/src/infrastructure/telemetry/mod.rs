pub mod config;
pub use self::config::*;

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

fn env_filter(max_level: LoggingLevel, directives: &str, env: Option<&str>) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(max_level.into());
    match env.filter(|env| !env.is_empty()) {
        Some(env) => directives
            .split(',')
            .filter_map(|directive| directive.trim().parse().ok())
            .fold(builder.with_env_var(env).from_env_lossy(), |filter, directive| {
                filter.add_directive(directive)
            }),
        None => builder.parse_lossy(directives),
    }
}

/// Install the global subscriber with an optional console and an optional file output.
pub fn initialize_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    if !config.enable {
        return Ok(());
    }
    let filter = env_filter(
        config.max_level,
        &config.level_filter,
        Some(config.level_filter_env.as_str()),
    );
    let console = config.console.enable.then(|| {
        let debug = config.console.enable_debug_logging;
        tracing_subscriber::fmt::layer()
            .with_file(debug)
            .with_line_number(debug)
            .with_thread_ids(debug)
            .with_target(debug)
            .with_filter(env_filter(
                config.console.max_level,
                &config.console.level_filter,
                None,
            ))
    });
    let file = config.file.enable.then(|| {
        let file_config = &config.file;
        let debug = file_config.enable_debug_logging;
        let appender = RollingFileAppender::new(
            file_config.rolling_time.into(),
            &file_config.path,
            &file_config.prefix,
        );
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(appender)
            .with_file(debug)
            .with_line_number(debug)
            .with_thread_ids(debug)
            .with_target(debug)
            .with_filter(env_filter(file_config.max_level, &file_config.level_filter, None))
    });
    Registry::default().with(filter).with(console).with(file).try_init()?;
    Ok(())
}
