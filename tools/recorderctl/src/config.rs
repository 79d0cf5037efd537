use crate::errors::RecorderctlError;
use crate::runtime::FileSystem;
use crate::types::{HostSource, OutputFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const HOST_ENV_VAR: &str = "RECORDERCTL_HOST";
pub const DEFAULT_HOST: &str = "http://127.0.0.1:9234";

pub type EnvMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub host: Option<String>,
    pub output: Option<OutputFormat>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub daemon: DaemonConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonConfig {
    pub host: String,
    pub timeout_seconds: u64,
}

impl DaemonConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            daemon: DaemonConfig {
                host: DEFAULT_HOST.to_string(),
                timeout_seconds: 30,
            },
            output: OutputConfig {
                format: OutputFormat::Table,
            },
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: 4096,
                budget_bytes: crate::logging::DEFAULT_DISK_BUDGET_BYTES,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    daemon: Option<PartialDaemonConfig>,
    output: Option<PartialOutputConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialDaemonConfig {
    host: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
    budget_bytes: Option<u64>,
}

/// Resolved configuration plus where the daemon host came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub config: AppConfig,
    pub host_source: HostSource,
}

pub fn load_config(
    overrides: &CliOverrides,
    env: &EnvMap,
    fs: &dyn FileSystem,
) -> Result<ResolvedConfig, RecorderctlError> {
    let mut cfg = AppConfig::default();
    let mut host_source = HostSource::Default;

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| RecorderctlError::ConfigParse(e.to_string()))?;
        if merge_partial_config(&mut cfg, partial) {
            host_source = HostSource::ConfigFile;
        }
    }

    if let Some(host) = env.get(HOST_ENV_VAR).filter(|v| !v.trim().is_empty()) {
        cfg.daemon.host = host.trim().to_string();
        host_source = HostSource::Environment;
    }

    if apply_cli_overrides(&mut cfg, overrides) {
        host_source = HostSource::CliOverride;
    }

    cfg.daemon.host = normalize_host(&cfg.daemon.host);
    validate_config(&cfg)?;
    Ok(ResolvedConfig {
        config: cfg,
        host_source,
    })
}

/// Returns true when the file set the daemon host.
fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) -> bool {
    let mut host_set = false;

    if let Some(daemon) = partial.daemon {
        if let Some(host) = daemon.host {
            cfg.daemon.host = host;
            host_set = true;
        }
        if let Some(value) = daemon.timeout_seconds {
            cfg.daemon.timeout_seconds = value;
        }
    }

    if let Some(output) = partial.output {
        if let Some(format) = output.format {
            cfg.output.format = format;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
        if let Some(value) = logging.budget_bytes {
            cfg.logging.budget_bytes = value;
        }
    }

    host_set
}

/// Returns true when the CLI set the daemon host.
fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) -> bool {
    if let Some(format) = overrides.output {
        cfg.output.format = format;
    }
    if let Some(path) = &overrides.log_file {
        cfg.logging.path = Some(path.clone());
    }
    match &overrides.host {
        Some(host) => {
            cfg.daemon.host = host.clone();
            true
        }
        None => false,
    }
}

pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('/').to_string()
}

fn validate_config(cfg: &AppConfig) -> Result<(), RecorderctlError> {
    let host = cfg.daemon.host.as_str();
    if host.is_empty() {
        return Err(RecorderctlError::InvalidConfig(
            "daemon.host must not be empty".to_string(),
        ));
    }
    if host.starts_with("unix://") {
        return Err(RecorderctlError::InvalidConfig(format!(
            "daemon.host {host}: unix socket hosts are not supported, expose the API over http"
        )));
    }
    if !(host.starts_with("http://") || host.starts_with("https://")) {
        return Err(RecorderctlError::InvalidConfig(format!(
            "daemon.host {host}: expected an http:// or https:// url"
        )));
    }

    if cfg.daemon.timeout_seconds == 0 {
        return Err(RecorderctlError::InvalidConfig(
            "daemon.timeout_seconds must be greater than zero".to_string(),
        ));
    }

    if cfg.logging.max_payload_bytes == 0 {
        return Err(RecorderctlError::InvalidConfig(
            "logging.max_payload_bytes must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
