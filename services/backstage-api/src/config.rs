use anyhow::{Context, Result, bail};
use backstage_authz::AuthzConfig;
use backstage_authz::policy_store::postgres::PostgresConfig;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_PG_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

// Service configuration sourced from environment variables, optionally
// overridden by a YAML file named in BACKSTAGE_CONFIG.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub authz: AuthzConfig,
}

#[derive(Debug, Deserialize)]
struct ApiConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    policy_table: Option<String>,
    super_user: Option<String>,
    menu_refresh_secs: Option<u64>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("BACKSTAGE_BIND")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse BACKSTAGE_BIND")?;
        let metrics_bind = std::env::var("BACKSTAGE_METRICS_BIND")
            .unwrap_or_else(|_| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse BACKSTAGE_METRICS_BIND")?;
        let storage = std::env::var("BACKSTAGE_STORAGE")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()
            .with_context(|| "parse BACKSTAGE_STORAGE")?;

        let pg_url = std::env::var("BACKSTAGE_PG_URL").or_else(|_| std::env::var("DATABASE_URL"));
        let postgres = match pg_url {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_parse(
                    "BACKSTAGE_PG_MAX_CONNECTIONS",
                    DEFAULT_PG_MAX_CONNECTIONS,
                )?,
                acquire_timeout_ms: env_parse(
                    "BACKSTAGE_PG_ACQUIRE_TIMEOUT_MS",
                    DEFAULT_PG_ACQUIRE_TIMEOUT_MS,
                )?,
            }),
            Err(_) => None,
        };

        let defaults = AuthzConfig::default();
        let authz = AuthzConfig {
            policy_table: std::env::var("BACKSTAGE_POLICY_TABLE")
                .unwrap_or(defaults.policy_table),
            super_user: std::env::var("BACKSTAGE_SUPER_USER").unwrap_or_default(),
            menu_refresh: Duration::from_secs(env_parse(
                "BACKSTAGE_MENU_REFRESH_SECS",
                defaults.menu_refresh.as_secs(),
            )?),
        };

        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            authz,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("BACKSTAGE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read BACKSTAGE_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: ApiConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse backstage config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(value) = override_cfg.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = override_cfg.policy_table {
            self.authz.policy_table = value;
        }
        if let Some(value) = override_cfg.super_user {
            self.authz.super_user = value;
        }
        if let Some(value) = override_cfg.menu_refresh_secs {
            self.authz.menu_refresh = Duration::from_secs(value);
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("parse {key}")),
        Err(_) => Ok(default),
    }
}
