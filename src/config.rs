//! Process configuration, read from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::connection::{ConnectMode, ConnectionSettings, RetryPolicy};
use crate::enrollment::EnrollmentSettings;

const DEFAULT_MARKET_API_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?} (expected text or json)")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,

    /// PostgreSQL URL of the projection store
    pub database_url: String,
    pub max_connections: u32,
    pub migrate_on_startup: bool,

    /// JSON connection profile
    pub connection_profile: PathBuf,
    /// Identity store directory
    pub wallet_path: PathBuf,
    pub ca_name: String,
    /// `None` defers to the profile's `httpOptions.verify`
    pub ca_tls_verify: Option<bool>,
    pub ca_admin_id: String,
    pub ca_admin_secret: String,
    pub app_identity: String,
    pub app_affiliation: String,

    pub channel_name: String,
    pub contract_name: String,
    pub connect_mode: ConnectMode,
    pub connect_max_attempts: u32,
    pub connect_retry_delay: Duration,
    /// Per network call deadline; `None` when disabled
    pub call_timeout: Option<Duration>,

    /// `None` when reference data fetching is switched off
    pub market_api_url: Option<String>,
    pub ipfs_api_url: String,

    pub cors_allow_origins: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| -> String {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let host = var("HOST", "0.0.0.0");
        let port: u16 = parse("PORT", &var("PORT", "3000"))?;
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        let call_timeout_secs: u64 = parse(
            "LEDGER_CALL_TIMEOUT_SECS",
            &var("LEDGER_CALL_TIMEOUT_SECS", "30"),
        )?;

        let market_api_url = var("MARKET_API_URL", DEFAULT_MARKET_API_URL);
        let market_api_url = (!market_api_url.eq_ignore_ascii_case("off")).then_some(market_api_url);

        Ok(Self {
            listen_addr,
            database_url: var("DATABASE_URL", "postgres://localhost/cropchain"),
            max_connections: parse("MAX_DB_CONNECTIONS", &var("MAX_DB_CONNECTIONS", "10"))?,
            migrate_on_startup: lookup("DB_MIGRATE_ON_STARTUP")
                .map(|v| flag("DB_MIGRATE_ON_STARTUP", &v))
                .transpose()?
                .unwrap_or(true),

            connection_profile: PathBuf::from(var(
                "CONNECTION_PROFILE",
                "fabric-network/connection-org1.json",
            )),
            wallet_path: PathBuf::from(var("WALLET_PATH", "wallet")),
            ca_name: var("CA_NAME", "ca.org1.example.com"),
            ca_tls_verify: lookup("CA_TLS_VERIFY")
                .filter(|v| !v.trim().is_empty())
                .map(|v| flag("CA_TLS_VERIFY", &v))
                .transpose()?,
            ca_admin_id: var("CA_ADMIN_ID", "admin"),
            ca_admin_secret: var("CA_ADMIN_SECRET", "adminpw"),
            app_identity: var("APP_IDENTITY", "appUser"),
            app_affiliation: var("APP_AFFILIATION", "org1.department1"),

            channel_name: var("CHANNEL_NAME", "cropchainchannel"),
            contract_name: var("CONTRACT_NAME", "cropchain"),
            connect_mode: parse("LEDGER_CONNECT_MODE", &var("LEDGER_CONNECT_MODE", "lazy"))?,
            connect_max_attempts: parse(
                "LEDGER_CONNECT_MAX_ATTEMPTS",
                &var("LEDGER_CONNECT_MAX_ATTEMPTS", "5"),
            )?,
            connect_retry_delay: Duration::from_secs(parse(
                "LEDGER_CONNECT_RETRY_DELAY_SECS",
                &var("LEDGER_CONNECT_RETRY_DELAY_SECS", "10"),
            )?),
            call_timeout: (call_timeout_secs > 0).then(|| Duration::from_secs(call_timeout_secs)),

            market_api_url,
            ipfs_api_url: var("IPFS_API_URL", "http://ipfs:5001"),

            cors_allow_origins: lookup("CORS_ALLOW_ORIGINS").filter(|v| !v.trim().is_empty()),
            log_format: parse("LOG_FORMAT", &var("LOG_FORMAT", "text"))?,
        })
    }

    pub fn enrollment_settings(&self) -> EnrollmentSettings {
        EnrollmentSettings {
            admin_id: self.ca_admin_id.clone(),
            admin_secret: self.ca_admin_secret.clone(),
            app_enrollment_id: self.app_identity.clone(),
            affiliation: self.app_affiliation.clone(),
            call_timeout: self.call_timeout,
            ..EnrollmentSettings::default()
        }
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            policy: RetryPolicy::new(self.connect_max_attempts, self.connect_retry_delay),
            channel: self.channel_name.clone(),
            contract: self.contract_name.clone(),
            call_timeout: self.call_timeout,
            enrollment: self.enrollment_settings(),
        }
    }
}

fn parse<T>(name: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("invalid value for {name} ({raw:?}): {e}"))
}

fn flag(name: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => anyhow::bail!("invalid value for {name}: {other:?} (expected true or false)"),
    }
}
