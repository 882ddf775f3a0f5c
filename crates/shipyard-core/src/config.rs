//! shipyard.toml configuration, with environment overrides.
//!
//! A config file is optional. Every setting the deployment pipelines used to
//! read from the environment can still be supplied that way, and the
//! environment always wins over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{DEFAULT_ALIAS, FunctionIdentity};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipyardConfig {
    pub function: FunctionConfig,
    pub release: ReleaseConfig,
    pub poll: PollConfig,
    pub upload: UploadConfig,
    pub gateway: GatewayConfig,
    pub certificate: CertificateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionConfig {
    pub region: Option<String>,
    pub namespace: String,
    pub name: Option<String>,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            region: None,
            namespace: "default".to_string(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Alias whose traffic is moved to the new revision.
    pub alias: String,
    /// Provisioned concurrency units for the new revision; `None` disables
    /// provisioning.
    pub concurrency: Option<u32>,
    /// Delete stale revisions and allocations after the traffic shift.
    pub cleanup: bool,
    /// Already-published revision to promote without a rebuild.
    pub version: Option<String>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            alias: DEFAULT_ALIAS.to_string(),
            concurrency: None,
            cleanup: true,
            version: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval: String,
    /// Give up waiting after this long. Unset waits forever.
    pub timeout: Option<String>,
    pub max_attempts: Option<u32>,
    pub backoff: BackoffKind,
    /// Ceiling for exponential backoff.
    pub max_interval: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: "1s".to_string(),
            timeout: None,
            max_attempts: None,
            backoff: BackoffKind::Fixed,
            max_interval: "60s".to_string(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.interval).ok_or_else(|| ConfigError::Invalid {
            key: "poll.interval",
            value: self.interval.clone(),
        })
    }

    pub fn max_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.max_interval).ok_or_else(|| ConfigError::Invalid {
            key: "poll.max_interval",
            value: self.max_interval.clone(),
        })
    }

    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.timeout
            .as_deref()
            .map(|t| {
                parse_duration(t).ok_or_else(|| ConfigError::Invalid {
                    key: "poll.timeout",
                    value: t.to_string(),
                })
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub region: Option<String>,
    pub bucket: Option<String>,
    /// Upper bound on concurrent uploads.
    pub workers: usize,
    /// Attempts per file before giving up.
    pub retries: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            region: None,
            bucket: None,
            workers: 8,
            retries: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub region: Option<String>,
    pub service_id: Option<String>,
    pub api_id: Option<String>,
    /// Cloud-native (TSE) gateway instance.
    pub tse_gateway_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateConfig {
    pub acme_home: PathBuf,
    pub config_home: PathBuf,
    /// Run `acme.sh --cron` before comparing certificates.
    pub run_acme: bool,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            acme_home: PathBuf::from("/opt/acme.sh"),
            config_home: PathBuf::from("/mnt/etc/acme.sh"),
            run_acme: false,
        }
    }
}

impl ShipyardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the optional config file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay settings from an environment lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SCF_REGION") {
            self.function.region = Some(v);
        }
        if let Some(v) = lookup("SCF_NAMESPACE") {
            self.function.namespace = v;
        }
        if let Some(v) = lookup("SCF_FUNCTION") {
            self.function.name = Some(v);
        }

        if let Some(v) = lookup("SCF_DEPLOY_ALIAS") {
            self.release.alias = v;
        }
        if let Some(v) = lookup("SCF_DEPLOY_VERSION") {
            self.release.version = Some(v);
        }
        if let Some(v) = lookup("SCF_ENABLE_CLEANUP") {
            self.release.cleanup = is_true(&v);
        }
        let units = lookup("SCF_DEFAULT_CONCURRENCY")
            .map(|v| {
                v.trim().parse::<u32>().map_err(|_| ConfigError::Invalid {
                    key: "SCF_DEFAULT_CONCURRENCY",
                    value: v.clone(),
                })
            })
            .transpose()?;
        match lookup("SCF_ENABLE_CONCURRENCY") {
            Some(v) if is_true(&v) => {
                self.release.concurrency = Some(units.or(self.release.concurrency).unwrap_or(1));
            }
            Some(_) => self.release.concurrency = None,
            None => {
                if let (Some(units), Some(current)) = (units, self.release.concurrency.as_mut()) {
                    *current = units;
                }
            }
        }

        if let Some(v) = lookup("COS_REGION") {
            self.upload.region = Some(v);
        }
        if let Some(v) = lookup("COS_BUCKET") {
            self.upload.bucket = Some(v);
        }

        if let Some(v) = lookup("API_GATEWAY_REGION") {
            self.gateway.region = Some(v);
        }
        if let Some(v) = lookup("API_GATEWAY_SERVICE_ID") {
            self.gateway.service_id = Some(v);
        }
        if let Some(v) = lookup("API_GATEWAY_API_ID") {
            self.gateway.api_id = Some(v);
        }
        if let Some(v) = lookup("API_GATEWAY_ID") {
            self.gateway.tse_gateway_id = Some(v);
        }

        Ok(())
    }

    /// The function every release command targets.
    pub fn function_identity(&self) -> Result<FunctionIdentity, ConfigError> {
        Ok(FunctionIdentity {
            region: required(&self.function.region, "SCF_REGION")?,
            namespace: self.function.namespace.clone(),
            name: required(&self.function.name, "SCF_FUNCTION")?,
        })
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Unwrap a required setting, naming the environment variable when missing.
pub fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .as_ref()
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or(ConfigError::Missing(name))
}

fn is_true(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Parse a duration string like "500ms", "5s", "2m", or bare seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
