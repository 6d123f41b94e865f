use crate::constants::{DEFAULT_COMMAND_TIMEOUT_MS, ENV_PREFIX};
use crate::retry::RetryPolicy;
use config::{Config, File};
use datagate_error::DgResult;
use serde::{self, Deserialize};
use std::{ops::Deref, sync::Arc};

#[derive(Debug, Clone)]
pub struct Settings(Arc<Inner>);

impl Deref for Settings {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Settings {
    pub fn new(config_path: String) -> DgResult<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(config_path.as_str()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        let inner: Inner = builder.build()?.try_deserialize()?;
        Ok(Self(Arc::new(inner)))
    }

    /// Settings built purely from defaults, for tests and embedders that
    /// configure programmatically.
    pub fn default_settings() -> DgResult<Self> {
        let inner: Inner = Config::builder().build()?.try_deserialize()?;
        Ok(Self(Arc::new(inner)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Inner {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub db: Db,
    #[serde(default)]
    pub rpc: Rpc,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Instance name used in log context.
    #[serde(default = "General::instance_name_default")]
    pub instance_name: String,
    /// Directory the rolling log files are written to.
    #[serde(default = "General::log_dir_default")]
    pub log_dir: String,
}

impl General {
    fn instance_name_default() -> String {
        "datagate".to_string()
    }

    fn log_dir_default() -> String {
        "logs".to_string()
    }
}

impl Default for General {
    fn default() -> Self {
        Self {
            instance_name: Self::instance_name_default(),
            log_dir: Self::log_dir_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Db {
    #[serde(default)]
    pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
    #[serde(default = "Postgres::host_default")]
    pub host: String,
    #[serde(default = "Postgres::port_default")]
    pub port: u16,
    #[serde(default = "Postgres::user_default")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "Postgres::dbname_default")]
    pub dbname: String,
    /// Maximum pool size
    #[serde(default = "Postgres::max_connections_default")]
    pub max_connections: u32,
    /// Minimum idle connections kept alive
    #[serde(default = "Postgres::min_connections_default")]
    pub min_connections: u32,
    /// Connect timeout in milliseconds
    #[serde(default = "Postgres::timeout_default")]
    pub timeout: u64,
    /// Idle timeout in milliseconds
    #[serde(default = "Postgres::idle_timeout_default")]
    pub idle_timeout: u64,
    /// Max connection lifetime in milliseconds
    #[serde(default = "Postgres::max_lifetime_default")]
    pub max_lifetime: u64,
}

impl Postgres {
    fn host_default() -> String {
        "127.0.0.1".to_string()
    }

    fn port_default() -> u16 {
        5432
    }

    fn user_default() -> String {
        "postgres".to_string()
    }

    fn dbname_default() -> String {
        "postgres".to_string()
    }

    fn max_connections_default() -> u32 {
        16
    }

    fn min_connections_default() -> u32 {
        1
    }

    fn timeout_default() -> u64 {
        5_000
    }

    fn idle_timeout_default() -> u64 {
        60_000
    }

    fn max_lifetime_default() -> u64 {
        1_800_000
    }

    pub fn to_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.dbname
        )
    }
}

impl Default for Postgres {
    fn default() -> Self {
        Self {
            host: Self::host_default(),
            port: Self::port_default(),
            user: Self::user_default(),
            password: String::new(),
            dbname: Self::dbname_default(),
            max_connections: Self::max_connections_default(),
            min_connections: Self::min_connections_default(),
            timeout: Self::timeout_default(),
            idle_timeout: Self::idle_timeout_default(),
            max_lifetime: Self::max_lifetime_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rpc {
    /// Timeout applied to commands that do not declare one, in milliseconds.
    #[serde(default = "Rpc::default_timeout_ms_default")]
    pub default_timeout_ms: u64,
    /// Retry policy applied to commands that do not declare one.
    #[serde(default = "RetryPolicy::no_retry")]
    pub retry: RetryPolicy,
}

impl Rpc {
    fn default_timeout_ms_default() -> u64 {
        DEFAULT_COMMAND_TIMEOUT_MS
    }
}

impl Default for Rpc {
    fn default() -> Self {
        Self {
            default_timeout_ms: Self::default_timeout_ms_default(),
            retry: RetryPolicy::no_retry(),
        }
    }
}
