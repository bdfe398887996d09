// Plutus — Configuration
//
// Settings are read from the process environment, after an optional `.env`
// file has been loaded by `main`. Secrets are held in zeroizing buffers and
// redacted from Debug output.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use zeroize::Zeroizing;

/// Roughly four months, long enough that the node stays unlocked between
/// routine restarts.
pub const DEFAULT_UNLOCK_SECS: u64 = 10_368_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub rpc_url: String,
    pub rpc_user: String,
    pub rpc_password: Zeroizing<String>,
    pub wallet_passphrase: Option<Zeroizing<String>>,
    pub unlock_secs: u64,
    pub rpc_timeout: Duration,
    pub throttle_rate_per_sec: u32,
    pub throttle_max_wait: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.is_empty());

        Ok(Self {
            db_path: get("PLUTUS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            bind_addr: parse_or(&get, "PLUTUS_BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 8080)))?,
            rpc_url: get("WALLET_RPC_URL").unwrap_or_else(|| "http://127.0.0.1:8332".to_string()),
            rpc_user: get("WALLET_RPC_USER").unwrap_or_default(),
            rpc_password: Zeroizing::new(get("WALLET_RPC_PASS").unwrap_or_default()),
            wallet_passphrase: get("WALLET_PASS").map(Zeroizing::new),
            unlock_secs: parse_or(&get, "WALLET_UNLOCK_SECS", DEFAULT_UNLOCK_SECS)?,
            rpc_timeout: Duration::from_secs(parse_or(&get, "WALLET_RPC_TIMEOUT_SECS", 30)?),
            throttle_rate_per_sec: parse_positive(&get, "THROTTLE_RATE_PER_SEC", 5)?,
            throttle_max_wait: Duration::from_secs(parse_or(&get, "THROTTLE_MAX_WAIT_SECS", 30)?),
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 60)?),
        })
    }
}

/// `<data dir>/plutus/plutus.db`, falling back to the working directory.
pub fn default_db_path() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plutus")
        .join("plutus.db")
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}

fn parse_positive<G>(get: &G, var: &'static str, default: u32) -> Result<u32, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, var, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("db_path", &self.db_path)
            .field("bind_addr", &self.bind_addr)
            .field("rpc_url", &self.rpc_url)
            .field("rpc_user", &self.rpc_user)
            .field("rpc_password", &"[REDACTED]")
            .field("wallet_passphrase", &self.wallet_passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("unlock_secs", &self.unlock_secs)
            .field("rpc_timeout", &self.rpc_timeout)
            .field("throttle_rate_per_sec", &self.throttle_rate_per_sec)
            .field("throttle_max_wait", &self.throttle_max_wait)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
