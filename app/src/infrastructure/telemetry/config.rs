use serde::Deserialize;
use tracing::metadata::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::Directive;

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetryConfig {
    #[serde(default = "default_enabled")]
    pub enable: bool,
    /// Global level, narrowed further by `level_filter`.
    #[serde(default)]
    pub max_level: LoggingLevel,
    /// Extra `EnvFilter` directives, e.g. `service_upload=debug`.
    #[serde(default)]
    pub level_filter: String,
    /// Environment variable holding more directives.
    #[serde(default)]
    pub level_filter_env: String,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub file: FileConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enable: default_enabled(),
            max_level: Default::default(),
            level_filter: Default::default(),
            level_filter_env: Default::default(),
            console: Default::default(),
            file: Default::default(),
        }
    }
}

#[derive(Default, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
    Off,
}

impl From<LoggingLevel> for LevelFilter {
    fn from(val: LoggingLevel) -> Self {
        match val {
            LoggingLevel::Error => LevelFilter::ERROR,
            LoggingLevel::Warn => LevelFilter::WARN,
            LoggingLevel::Info => LevelFilter::INFO,
            LoggingLevel::Debug => LevelFilter::DEBUG,
            LoggingLevel::Trace => LevelFilter::TRACE,
            LoggingLevel::Off => LevelFilter::OFF,
        }
    }
}

impl From<LoggingLevel> for Directive {
    fn from(val: LoggingLevel) -> Self {
        let level: LevelFilter = val.into();
        level.into()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ConsoleConfig {
    #[serde(default = "default_enabled")]
    pub enable: bool,
    /// Print file, line, thread id and target with every event.
    #[serde(default)]
    pub enable_debug_logging: bool,
    #[serde(default = "trace")]
    pub max_level: LoggingLevel,
    #[serde(default)]
    pub level_filter: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enable: default_enabled(),
            enable_debug_logging: false,
            max_level: trace(),
            level_filter: Default::default(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct FileConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub enable_debug_logging: bool,
    #[serde(default = "trace")]
    pub max_level: LoggingLevel,
    #[serde(default)]
    pub level_filter: String,
    /// Directory of the log files.
    #[serde(default = "default_path")]
    pub path: String,
    /// File name, or the file name prefix when rolling.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub rolling_time: RotationLevel,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enable: false,
            enable_debug_logging: false,
            max_level: trace(),
            level_filter: Default::default(),
            path: default_path(),
            prefix: default_prefix(),
            rolling_time: Default::default(),
        }
    }
}

#[derive(Default, Deserialize, Clone, Copy, Debug)]
pub enum RotationLevel {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<RotationLevel> for Rotation {
    fn from(val: RotationLevel) -> Self {
        match val {
            RotationLevel::Minutely => Rotation::MINUTELY,
            RotationLevel::Hourly => Rotation::HOURLY,
            RotationLevel::Daily => Rotation::DAILY,
            RotationLevel::Never => Rotation::NEVER,
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn trace() -> LoggingLevel {
    LoggingLevel::Trace
}
fn default_path() -> String {
    "./logs".to_string()
}
fn default_prefix() -> String {
    "resumable-upload.log".to_string()
}
