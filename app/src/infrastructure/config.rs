use std::path::PathBuf;

use domain_upload::model::vo::CompletenessPolicy;
use serde::Deserialize;

use super::telemetry::TelemetryConfig;

#[derive(Default, Clone, Deserialize, Debug)]
pub struct UploadServerConfig {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Deserialize, Debug)]
pub struct HostConfig {
    #[serde(default = "HostConfig::default_address")]
    pub bind_address: String,
    #[serde(default = "HostConfig::default_port")]
    pub bind_port: u16,
    /// Route the resumable.js client targets, e.g. `/upload`.
    #[serde(default = "HostConfig::default_upload_route")]
    pub upload_route: String,
    /// Largest request body accepted for one chunk.
    #[serde(default = "HostConfig::default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_address: Self::default_address(),
            bind_port: Self::default_port(),
            upload_route: Self::default_upload_route(),
            max_chunk_bytes: Self::default_max_chunk_bytes(),
        }
    }
}

impl HostConfig {
    fn default_address() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        8080
    }
    fn default_upload_route() -> String {
        "/upload".to_string()
    }
    fn default_max_chunk_bytes() -> usize {
        100 * 1024 * 1024
    }

    /// The upload route with exactly one leading and no trailing slash.
    pub fn route(&self) -> String {
        format!("/{}", self.upload_route.trim_matches('/'))
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct StorageConfig {
    /// Directory completed files land in, the system temp dir when unset or empty.
    #[serde(default)]
    pub upload_directory: Option<PathBuf>,
    #[serde(default = "StorageConfig::default_in_progress_suffix")]
    pub in_progress_suffix: String,
    #[serde(default = "StorageConfig::default_buffer_size")]
    pub buffer_size: usize,
    /// Flush every chunk to disk before acknowledging it.
    #[serde(default = "StorageConfig::default_sync_chunks")]
    pub sync_chunks: bool,
    #[serde(default)]
    pub completeness: CompletenessPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_directory: None,
            in_progress_suffix: Self::default_in_progress_suffix(),
            buffer_size: Self::default_buffer_size(),
            sync_chunks: Self::default_sync_chunks(),
            completeness: Default::default(),
        }
    }
}

impl StorageConfig {
    fn default_in_progress_suffix() -> String {
        ".part".to_string()
    }
    fn default_buffer_size() -> usize {
        16 * 1024
    }
    fn default_sync_chunks() -> bool {
        true
    }

    pub fn upload_dir(&self) -> PathBuf {
        match &self.upload_directory {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_owned(),
            _ => std::env::temp_dir(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct ReaperConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "ReaperConfig::default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "ReaperConfig::default_finished_ttl_secs")]
    pub finished_ttl_secs: i64,
    #[serde(default = "ReaperConfig::default_abandoned_ttl_secs")]
    pub abandoned_ttl_secs: i64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enable: false,
            interval_secs: Self::default_interval_secs(),
            finished_ttl_secs: Self::default_finished_ttl_secs(),
            abandoned_ttl_secs: Self::default_abandoned_ttl_secs(),
        }
    }
}

impl ReaperConfig {
    fn default_interval_secs() -> u64 {
        5 * 60
    }
    fn default_finished_ttl_secs() -> i64 {
        60 * 60
    }
    fn default_abandoned_ttl_secs() -> i64 {
        24 * 60 * 60
    }
}

/// Layers `config.yaml`, every `*.yaml`/`*.yml` command line argument and `RESUMABLE__*`
/// environment variables, later sources winning.
pub fn build_config() -> anyhow::Result<UploadServerConfig> {
    let mut config = config::Config::builder().add_source(
        config::File::with_name("config")
            .required(false)
            .format(config::FileFormat::Yaml),
    );
    for arg in std::env::args().skip(1) {
        if arg.ends_with("yaml") || arg.ends_with("yml") {
            config = config.add_source(
                config::File::from(std::path::Path::new(arg.as_str()))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );
        }
    }
    config = config.add_source(
        config::Environment::with_prefix("RESUMABLE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );
    Ok(config.build()?.try_deserialize()?)
}
