//! Configuration module
//!
//! Settings are resolved once, from explicit arguments first and the process
//! environment (optionally seeded from a `.env` file) second. Every resolver
//! also accepts a lookup function so callers and tests can supply values
//! without touching the real environment.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::storage_types::BackendKind;

const DEFAULT_ENVIRONMENT: &str = "local";
const DEFAULT_REDIS_HOST: &str = "localhost";
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_REDIS_DATABASE: u8 = 3;

pub const ENV_BUCKET: &str = "AWS_S3_BUCKET_NAME";
pub const ENV_ACCESS_KEY: &str = "AWS_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "AWS_SECRET_KEY";
pub const ENV_REGION: &str = "AWS_REGION_NAME";
pub const ENV_ENDPOINT: &str = "AWS_S3_ENDPOINT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{} must be set", .0.join(", "))]
    MissingVariables(Vec<&'static str>),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Partially known object-store settings.
///
/// Used both for explicit constructor arguments and for whatever the
/// environment provided. [`S3Overrides::or`] layers the two.
#[derive(Clone, Default)]
pub struct S3Overrides {
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl S3Overrides {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            bucket: lookup(ENV_BUCKET),
            access_key_id: lookup(ENV_ACCESS_KEY),
            secret_access_key: lookup(ENV_SECRET_KEY),
            region: lookup(ENV_REGION),
            endpoint: lookup(ENV_ENDPOINT),
        }
    }

    /// Fill every unset field from `fallback`.
    pub fn or(self, fallback: S3Overrides) -> Self {
        Self {
            bucket: self.bucket.or(fallback.bucket),
            access_key_id: self.access_key_id.or(fallback.access_key_id),
            secret_access_key: self.secret_access_key.or(fallback.secret_access_key),
            region: self.region.or(fallback.region),
            endpoint: self.endpoint.or(fallback.endpoint),
        }
    }
}

impl fmt::Debug for S3Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Overrides")
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Fully resolved object-store connection parameters.
#[derive(Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, ...)
    pub endpoint: Option<String>,
}

impl S3Settings {
    /// Merge explicit values with `lookup` and require bucket, keys and region.
    pub fn resolve<F>(explicit: S3Overrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::try_from(explicit.or(S3Overrides::from_lookup(lookup)))
    }

    /// Same as [`S3Settings::resolve`] against the process environment.
    pub fn from_env(explicit: S3Overrides) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::resolve(explicit, |name| env::var(name).ok())
    }
}

impl TryFrom<S3Overrides> for S3Settings {
    type Error = ConfigError;

    fn try_from(value: S3Overrides) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        if value.bucket.is_none() {
            missing.push(ENV_BUCKET);
        }
        if value.access_key_id.is_none() {
            missing.push(ENV_ACCESS_KEY);
        }
        if value.secret_access_key.is_none() {
            missing.push(ENV_SECRET_KEY);
        }
        if value.region.is_none() {
            missing.push(ENV_REGION);
        }

        match (
            value.bucket,
            value.access_key_id,
            value.secret_access_key,
            value.region,
        ) {
            (Some(bucket), Some(access_key_id), Some(secret_access_key), Some(region)) => Ok(Self {
                bucket,
                access_key_id,
                secret_access_key,
                region,
                endpoint: value.endpoint,
            }),
            _ => Err(ConfigError::MissingVariables(missing)),
        }
    }
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Progress broadcasting settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastSettings {
    /// Deployment-level switch; when false broadcasts are no-ops.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub database: u8,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: DEFAULT_REDIS_HOST.to_string(),
            port: DEFAULT_REDIS_PORT,
            database: DEFAULT_REDIS_DATABASE,
        }
    }
}

impl BroadcastSettings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = match lookup("BROADCAST_MESSAGES") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue {
                name: "BROADCAST_MESSAGES",
                value,
            })?,
            None => true,
        };

        let port = match lookup("REDIS_PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "REDIS_PORT",
                value,
            })?,
            None => DEFAULT_REDIS_PORT,
        };

        let database = match lookup("REDIS_DATABASE") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "REDIS_DATABASE",
                value,
            })?,
            None => DEFAULT_REDIS_DATABASE,
        };

        Ok(Self {
            enabled,
            host: lookup("REDIS_HOST").unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string()),
            port,
            database,
        })
    }

    /// Broker address in `redis://host:port/db` form.
    pub fn broker_url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.database)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    environment: String,
    storage_backend: BackendKind,
    s3: S3Overrides,
    local_storage_path: Option<PathBuf>,
    broadcast: BroadcastSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Ok(Self::from_lookup(|name| env::var(name).ok())?)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let storage_backend = match lookup("MEDIA_MANAGER") {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    value = %value,
                    "Unknown MEDIA_MANAGER value, falling back to local storage"
                );
                BackendKind::Local
            }),
            None => BackendKind::Local,
        };

        Ok(Self {
            environment,
            storage_backend,
            s3: S3Overrides::from_lookup(&lookup),
            local_storage_path: lookup("LOCAL_STORAGE_PATH").map(PathBuf::from),
            broadcast: BroadcastSettings::from_lookup(&lookup)?,
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn storage_backend(&self) -> BackendKind {
        self.storage_backend
    }

    /// Object-store values found in the environment; may be incomplete.
    pub fn s3(&self) -> &S3Overrides {
        &self.s3
    }

    pub fn local_storage_path(&self) -> Option<&PathBuf> {
        self.local_storage_path.as_ref()
    }

    pub fn broadcast(&self) -> &BroadcastSettings {
        &self.broadcast
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.environment(), "local");
        assert_eq!(config.storage_backend(), BackendKind::Local);
        assert!(config.local_storage_path().is_none());
        assert_eq!(config.broadcast(), &BroadcastSettings::default());
        assert_eq!(config.broadcast().broker_url(), "redis://localhost:6379/3");
    }

    #[test]
    fn reads_backend_and_broker_settings() {
        let config = Config::from_lookup(lookup_from(&[
            ("ENVIRONMENT", "staging"),
            ("MEDIA_MANAGER", "AWS"),
            ("BROADCAST_MESSAGES", "false"),
            ("REDIS_HOST", "cache"),
            ("REDIS_PORT", "6380"),
            ("REDIS_DATABASE", "5"),
        ]))
        .unwrap();

        assert_eq!(config.environment(), "staging");
        assert_eq!(config.storage_backend(), BackendKind::S3);
        assert!(!config.broadcast().enabled);
        assert_eq!(config.broadcast().broker_url(), "redis://cache:6380/5");
    }

    #[test]
    fn rejects_malformed_port() {
        let err = Config::from_lookup(lookup_from(&[("REDIS_PORT", "abc")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "REDIS_PORT", .. }));
    }

    #[test]
    fn s3_settings_report_every_missing_variable() {
        let err = S3Settings::resolve(
            S3Overrides {
                bucket: Some("media".to_string()),
                ..Default::default()
            },
            |_| None,
        )
        .unwrap_err();

        match err {
            ConfigError::MissingVariables(missing) => {
                assert_eq!(missing, vec![ENV_ACCESS_KEY, ENV_SECRET_KEY, ENV_REGION]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn explicit_values_take_precedence_over_lookup() {
        let settings = S3Settings::resolve(
            S3Overrides {
                bucket: Some("explicit".to_string()),
                ..Default::default()
            },
            lookup_from(&[
                (ENV_BUCKET, "from-env"),
                (ENV_ACCESS_KEY, "AKIA"),
                (ENV_SECRET_KEY, "secret"),
                (ENV_REGION, "us-east-1"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.bucket, "explicit");
        assert_eq!(settings.region, "us-east-1");
        let rendered = format!("{:?}", settings);
        assert!(rendered.contains("***"));
        assert!(!rendered.contains("\"secret\""));
    }
}
