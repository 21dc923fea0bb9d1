//! Configuration management
//!
//! mlink is configured through `LINK_`-prefixed environment variables. A dotenv
//! file may seed them; values already present in the process environment win.
//! The resulting [`AppConfig`] is built once at startup and handed to every
//! component by reference.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Prefix shared by every configuration variable
pub const ENV_PREFIX: &str = "LINK_";

const DEFAULT_MINIO_ENDPOINT: &str = "localhost:9000";
const DEFAULT_BUCKET_NAME: &str = "minio-link";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_EXPIRY: &str = "168h";
const DEFAULT_YOURLS_ENDPOINT: &str = "http://localhost:8080";

/// Longest validity S3 accepts for a presigned URL
pub const MAX_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Object store connection and bucket defaults
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Endpoint as `host[:port]` or a full URL
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Use HTTPS when the endpoint carries no scheme
    pub use_ssl: bool,

    /// Base name of the public bucket; the private bucket derives from it
    pub bucket_name: String,

    /// Region used when creating buckets
    pub region: String,

    /// Enable object locking on newly created buckets
    pub object_locking: bool,

    /// Validity of signed links for private uploads
    pub default_expiry: Duration,
}

impl StorageConfig {
    /// Endpoint as an absolute URL, scheme derived from `use_ssl`
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            let scheme = if self.use_ssl { "https" } else { "http" };
            format!("{scheme}://{}", self.endpoint)
        };

        Url::parse(&raw)
            .map_err(|e| Error::Config(format!("invalid storage endpoint '{raw}': {e}")))
    }

    /// Whether traffic to the store is encrypted
    pub fn is_tls(&self) -> bool {
        self.endpoint_url()
            .map(|u| u.scheme() == "https")
            .unwrap_or(false)
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &"***")
            .field("secret_key", &"***")
            .field("use_ssl", &self.use_ssl)
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("object_locking", &self.object_locking)
            .field("default_expiry", &self.default_expiry)
            .finish()
    }
}

/// YOURLS endpoint and credentials
#[derive(Clone, PartialEq, Eq)]
pub struct ShortenerConfig {
    /// Base URL of the YOURLS installation
    pub endpoint: String,

    /// Shared secret sent as the `signature` parameter
    pub signature: String,
}

impl ShortenerConfig {
    /// Whether the shortener is reached over HTTPS
    pub fn is_tls(&self) -> bool {
        self.endpoint.starts_with("https://")
    }
}

impl fmt::Debug for ShortenerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortenerConfig")
            .field("endpoint", &self.endpoint)
            .field("signature", &"***")
            .finish()
    }
}

/// Complete configuration snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub shortener: ShortenerConfig,
}

impl AppConfig {
    /// Build the configuration from `(name, value)` pairs
    ///
    /// Names without the `LINK_` prefix are ignored. Empty values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = Vars::new(vars);

        let storage = StorageConfig {
            endpoint: vars.string_or("MINIO_ENDPOINT", DEFAULT_MINIO_ENDPOINT),
            access_key: vars.required("MINIO_ACCESS_KEY")?,
            secret_key: vars.required("MINIO_ACCESS_SECRET")?,
            use_ssl: vars.bool_or("MINIO_USE_SSL", false)?,
            bucket_name: vars.string_or("MINIO_BUCKET_NAME", DEFAULT_BUCKET_NAME),
            region: vars.string_or("MINIO_REGION", DEFAULT_REGION),
            object_locking: vars.bool_or("MINIO_OBJECT_LOCKING", false)?,
            default_expiry: parse_expiry(&vars.string_or("MINIO_DEFAULT_EXPIRY", DEFAULT_EXPIRY))?,
        };
        storage.endpoint_url()?;

        let shortener = ShortenerConfig {
            endpoint: vars
                .string_or("YOURLS_ENDPOINT", DEFAULT_YOURLS_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            signature: vars.required("YOURLS_SIGNATURE_KEY")?,
        };
        Url::parse(&shortener.endpoint).map_err(|e| {
            Error::Config(format!(
                "invalid shortener endpoint '{}': {e}",
                shortener.endpoint
            ))
        })?;

        Ok(Self { storage, shortener })
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "minio endpoint: {}, minio use ssl: {}, minio bucket name: {}, minio region: {}, minio object locking: {}, yourls url: {}",
            self.storage.endpoint,
            self.storage.use_ssl,
            self.storage.bucket_name,
            self.storage.region,
            self.storage.object_locking,
            self.shortener.endpoint,
        )
    }
}

/// Loads [`AppConfig`] from the environment and an optional dotenv file
#[derive(Debug, Default)]
pub struct ConfigLoader {
    env_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader reading only the process environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed variables from a dotenv file before reading the environment
    pub fn with_env_file(path: impl Into<PathBuf>) -> Self {
        Self {
            env_file: Some(path.into()),
        }
    }

    /// The dotenv file this loader reads, if any
    pub fn env_file(&self) -> Option<&Path> {
        self.env_file.as_deref()
    }

    /// Load configuration from the dotenv file and the process environment
    pub fn load(&self) -> Result<AppConfig> {
        self.load_from(std::env::vars())
    }

    /// Load configuration from the dotenv file overlaid with `process_vars`
    pub fn load_from<I>(&self, process_vars: I) -> Result<AppConfig>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars: HashMap<String, String> = HashMap::new();

        if let Some(path) = &self.env_file {
            let entries = dotenvy::from_path_iter(path).map_err(|e| {
                Error::Config(format!(
                    "failed to load environment file {}: {e}",
                    path.display()
                ))
            })?;
            for entry in entries {
                let (key, value) = entry.map_err(|e| {
                    Error::Config(format!(
                        "failed to parse environment file {}: {e}",
                        path.display()
                    ))
                })?;
                vars.insert(key, value);
            }
        }

        vars.extend(process_vars);
        AppConfig::from_vars(vars)
    }
}

/// Prefix-stripped view over raw variables
struct Vars(HashMap<String, String>);

impl Vars {
    fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = vars
            .into_iter()
            .filter_map(|(k, v)| {
                let key: String = k.into();
                let value: String = v.into();
                let name = key.strip_prefix(ENV_PREFIX)?.to_string();
                (!value.is_empty()).then_some((name, value))
            })
            .collect();
        Self(map)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn required(&self, name: &str) -> Result<String> {
        self.get(name)
            .map(str::to_string)
            .ok_or_else(|| Error::Config(format!("required variable {ENV_PREFIX}{name} is not set")))
    }

    fn string_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or(default).to_string()
    }

    fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                Error::Config(format!("{ENV_PREFIX}{name}: '{raw}' is not a boolean"))
            }),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse an expiry such as `168h`, `90m` or `PT1H`
fn parse_expiry(raw: &str) -> Result<Duration> {
    let signed: jiff::SignedDuration = raw.trim().parse().map_err(|e| {
        Error::Config(format!("{ENV_PREFIX}MINIO_DEFAULT_EXPIRY: '{raw}' is not a duration: {e}"))
    })?;

    let expiry = Duration::try_from(signed).map_err(|_| {
        Error::Config(format!("{ENV_PREFIX}MINIO_DEFAULT_EXPIRY: '{raw}' must not be negative"))
    })?;

    if expiry < Duration::from_secs(1) || expiry > MAX_EXPIRY {
        return Err(Error::Config(format!(
            "{ENV_PREFIX}MINIO_DEFAULT_EXPIRY: '{raw}' must be between 1s and 168h"
        )));
    }

    Ok(expiry)
}
